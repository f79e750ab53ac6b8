use ffbridge_core::BridgeOptions;
use ffbridge_mock::{DEFAULT_FRAMES, MOCK_VERSION};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub bridge: BridgeOptions,

    #[serde(default)]
    pub mock: MockConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the mock tool the host embeds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MockConfig {
    /// Delay between frames in milliseconds (0 = as fast as possible)
    #[serde(default)]
    pub frame_interval_ms: u64,

    /// Frames produced when a command does not pass `-frames`
    #[serde(default = "default_frames")]
    pub frames: u64,

    /// Version string reported by `-version`
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_frames() -> u64 {
    DEFAULT_FRAMES
}

fn default_version() -> String {
    MOCK_VERSION.to_string()
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 0,
            frames: default_frames(),
            version: default_version(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when RUST_LOG is not set
    #[serde(default)]
    pub filter: Option<String>,
}
