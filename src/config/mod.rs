mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config).with_context(|| format!("Invalid config file: {:?}", path))?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./ffbridge.toml",
        "~/.config/ffbridge/config.toml",
        "/etc/ffbridge/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Problems found in a config that parsed but cannot be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("bridge.signals.capacity cannot be 0")]
    ZeroCapacity,

    #[error("logging.filter cannot be empty")]
    EmptyFilter,
}

/// Validate configuration
fn validate_config(config: &Config) -> std::result::Result<(), ConfigError> {
    if config.bridge.signals.capacity == 0 {
        return Err(ConfigError::ZeroCapacity);
    }

    if config.mock.frame_interval_ms > 10_000 {
        tracing::warn!(
            "mock.frame_interval_ms is {} ms; commands will take a long time",
            config.mock.frame_interval_ms
        );
    }

    if let Some(filter) = &config.logging.filter {
        if filter.trim().is_empty() {
            return Err(ConfigError::EmptyFilter);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffbridge_core::{DrainOrder, LogLevel, OverflowPolicy};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_from_empty_file() {
        let file = write_config("");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.bridge.signals.capacity, 256);
        assert_eq!(config.bridge.signals.order, DrainOrder::Fifo);
        assert_eq!(config.bridge.tool_log_level, LogLevel::Info);
        assert_eq!(config.mock.frames, ffbridge_mock::DEFAULT_FRAMES);
        assert!(config.logging.filter.is_none());
    }

    #[test]
    fn test_full_config() {
        let file = write_config(
            r#"
[bridge]
tool_log_level = "debug"

[bridge.signals]
capacity = 8
overflow = "drop_newest"
order = "lifo"

[mock]
frame_interval_ms = 40
frames = 250
version = "n6.1"

[logging]
filter = "ffbridge=debug"
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.bridge.tool_log_level, LogLevel::Debug);
        assert_eq!(config.bridge.signals.capacity, 8);
        assert_eq!(config.bridge.signals.overflow, OverflowPolicy::DropNewest);
        assert_eq!(config.bridge.signals.order, DrainOrder::Lifo);
        assert_eq!(config.mock.frame_interval_ms, 40);
        assert_eq!(config.mock.frames, 250);
        assert_eq!(config.mock.version, "n6.1");
        assert_eq!(config.logging.filter.as_deref(), Some("ffbridge=debug"));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let file = write_config("[bridge.signals]\ncapacity = 0\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::ZeroCapacity)
        ));
    }

    #[test]
    fn test_empty_filter_rejected() {
        let file = write_config("[logging]\nfilter = \"  \"\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("logging.filter cannot be empty"));
    }

    #[test]
    fn test_unknown_order_rejected() {
        let file = write_config("[bridge.signals]\norder = \"random\"\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/ffbridge.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
