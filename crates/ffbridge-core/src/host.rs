//! Binding between the bridge and the embedding host's runtime.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Severity of a message logged by the embedded tool.
///
/// Ordered from most to least severe, so `level <= threshold` means
/// "at least as severe as `threshold`".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Panic,
    Fatal,
    Error,
    Warning,
    #[default]
    Info,
    Verbose,
    Debug,
    Trace,
}

impl LogLevel {
    /// Map a numeric libav log level (`AV_LOG_*`) to a [`LogLevel`].
    ///
    /// Values between two named levels round toward the less severe one.
    /// Returns `None` for `AV_LOG_QUIET` and below.
    pub fn from_av_level(level: i32) -> Option<Self> {
        Some(match level {
            i32::MIN..=-1 => return None,
            0..=7 => Self::Panic,
            8..=15 => Self::Fatal,
            16..=23 => Self::Error,
            24..=31 => Self::Warning,
            32..=39 => Self::Info,
            40..=47 => Self::Verbose,
            48..=55 => Self::Debug,
            _ => Self::Trace,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Panic => "panic",
            Self::Fatal => "fatal",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Verbose => "verbose",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callbacks the embedded tool uses to reach back into the host.
pub trait Host: Send + Sync {
    /// Name of the host runtime, for diagnostics.
    fn name(&self) -> &str {
        "host"
    }

    /// Receive one log line from the embedded tool.
    fn log(&self, level: LogLevel, message: &str);
}

/// Shared reference to a bound host.
pub type HostHandle = Arc<dyn Host>;

/// Holds the host handle the tool's callbacks currently route to.
#[derive(Default)]
pub struct HostBinding {
    host: RwLock<Option<HostHandle>>,
    loads: AtomicU64,
}

impl HostBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a binding that starts attached to `host`.
    pub fn with_host(host: HostHandle) -> Self {
        let binding = Self::new();
        binding.load(host);
        binding
    }

    /// Attach a host, replacing any previously bound one.
    pub fn load(&self, host: HostHandle) {
        tracing::debug!(host = host.name(), "binding host");
        let previous = self.host.write().replace(host);
        self.loads.fetch_add(1, Ordering::Relaxed);
        drop(previous);
    }

    /// Detach the host. Returns the handle that was bound, if any.
    pub fn unload(&self) -> Option<HostHandle> {
        let previous = self.host.write().take();
        if let Some(host) = &previous {
            tracing::debug!(host = host.name(), "unbinding host");
        }
        previous
    }

    pub fn current(&self) -> Option<HostHandle> {
        self.host.read().clone()
    }

    pub fn is_bound(&self) -> bool {
        self.host.read().is_some()
    }

    /// Number of times a host has been loaded.
    pub fn loads(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }

    /// Route a tool log line to the host, or to `tracing` when unbound.
    ///
    /// The lock is released before the host callback runs.
    pub fn log(&self, level: LogLevel, message: &str) {
        match self.current() {
            Some(host) => host.log(level, message),
            None => log_to_tracing(level, message),
        }
    }
}

impl fmt::Debug for HostBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostBinding")
            .field("host", &self.current().map(|h| h.name().to_string()))
            .field("loads", &self.loads())
            .finish()
    }
}

/// Emit a tool log line as a `tracing` event under the `ffbridge::tool` target.
pub fn log_to_tracing(level: LogLevel, message: &str) {
    let message = message.trim_end();
    match level {
        LogLevel::Panic | LogLevel::Fatal | LogLevel::Error => {
            tracing::error!(target: "ffbridge::tool", "{}", message)
        }
        LogLevel::Warning => tracing::warn!(target: "ffbridge::tool", "{}", message),
        LogLevel::Info => tracing::info!(target: "ffbridge::tool", "{}", message),
        LogLevel::Verbose | LogLevel::Debug => {
            tracing::debug!(target: "ffbridge::tool", "{}", message)
        }
        LogLevel::Trace => tracing::trace!(target: "ffbridge::tool", "{}", message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingHost {
        lines: Mutex<Vec<(LogLevel, String)>>,
    }

    impl Host for RecordingHost {
        fn name(&self) -> &str {
            "recording"
        }

        fn log(&self, level: LogLevel, message: &str) {
            self.lines.lock().push((level, message.to_string()));
        }
    }

    #[test]
    fn test_av_level_mapping() {
        assert_eq!(LogLevel::from_av_level(-8), None);
        assert_eq!(LogLevel::from_av_level(0), Some(LogLevel::Panic));
        assert_eq!(LogLevel::from_av_level(16), Some(LogLevel::Error));
        assert_eq!(LogLevel::from_av_level(24), Some(LogLevel::Warning));
        assert_eq!(LogLevel::from_av_level(32), Some(LogLevel::Info));
        assert_eq!(LogLevel::from_av_level(48), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_av_level(56), Some(LogLevel::Trace));
    }

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Error < LogLevel::Info);
        assert!(LogLevel::Trace > LogLevel::Debug);
    }

    #[test]
    fn test_log_routes_to_bound_host() {
        let host = Arc::new(RecordingHost::default());
        let binding = HostBinding::with_host(host.clone());
        binding.log(LogLevel::Warning, "low disk");
        assert_eq!(
            host.lines.lock().as_slice(),
            &[(LogLevel::Warning, "low disk".to_string())]
        );
    }

    #[test]
    fn test_unload_releases_host() {
        let host = Arc::new(RecordingHost::default());
        let binding = HostBinding::new();
        binding.load(host.clone());
        assert_eq!(Arc::strong_count(&host), 2);

        assert!(binding.unload().is_some());
        assert_eq!(Arc::strong_count(&host), 1);

        binding.log(LogLevel::Info, "goes to tracing");
        assert!(host.lines.lock().is_empty());
    }

    #[test]
    fn test_repeated_load_unload_is_idempotent() {
        let host = Arc::new(RecordingHost::default());
        let binding = HostBinding::new();
        for _ in 0..3 {
            binding.load(host.clone());
            binding.load(host.clone());
            binding.unload();
            assert!(binding.unload().is_none());
        }
        assert!(!binding.is_bound());
        assert_eq!(binding.loads(), 6);
        assert_eq!(Arc::strong_count(&host), 1);
    }
}
