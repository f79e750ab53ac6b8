//! Host-side implementations of the bridge callbacks.

use ffbridge_core::{host::log_to_tracing, Host, LogLevel, Surface, VideoFrame};
use std::sync::atomic::{AtomicU64, Ordering};

/// Forwards tool log lines to `tracing` under the `ffbridge::tool` target.
#[derive(Debug, Default)]
pub struct TracingHost;

impl Host for TracingHost {
    fn name(&self) -> &str {
        "ffbridge"
    }

    fn log(&self, level: LogLevel, message: &str) {
        for line in message.lines().filter(|l| !l.trim().is_empty()) {
            log_to_tracing(level, line);
        }
    }
}

/// Output surface that records frames in the log instead of drawing them.
#[derive(Debug)]
pub struct LogSurface {
    label: String,
    frames: AtomicU64,
}

impl LogSurface {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            frames: AtomicU64::new(0),
        }
    }

    /// Frames presented so far.
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }
}

impl Surface for LogSurface {
    fn label(&self) -> &str {
        &self.label
    }

    fn present(&self, frame: &VideoFrame) {
        let n = self.frames.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!(
            surface = %self.label,
            pts = frame.pts,
            width = frame.width,
            height = frame.height,
            bytes = frame.data.len(),
            "frame {}",
            n
        );
    }
}

impl Drop for LogSurface {
    fn drop(&mut self) {
        tracing::debug!(surface = %self.label, frames = self.frames(), "surface released");
    }
}
