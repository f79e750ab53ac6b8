//! ffbridge - host application for the in-process tool bridge
//!
//! This library crate exposes the host pieces for integration testing.

pub mod config;
pub mod host;
pub mod runner;

use ffbridge_core::Bridge;
use ffbridge_mock::MockTool;
use std::sync::Arc;
use std::time::Duration;

/// Build a bridge hosting the mock tool, with the tracing host loaded.
pub fn build_bridge(config: &config::Config) -> Bridge<MockTool> {
    let tool = MockTool::new()
        .with_frame_interval(Duration::from_millis(config.mock.frame_interval_ms))
        .with_default_frames(config.mock.frames)
        .with_version(config.mock.version.clone());

    let bridge = Bridge::builder(tool)
        .options(config.bridge.clone())
        .build();
    bridge.on_host_load(Arc::new(host::TracingHost));
    bridge
}
