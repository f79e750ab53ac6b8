//! # ffbridge-core
//!
//! Reentrancy bridge for running a process-oriented media tool (an
//! ffmpeg-style `main`) repeatedly inside a long-lived host process.
//!
//! This crate provides:
//!
//! - **Configuration registry** ([`ToolGlobals`]) -- every mutable option
//!   cell the tool reads, with one canonical baseline.
//! - **Reset** ([`ResetCoordinator`]) -- puts the registry back to baseline
//!   before each invocation so runs do not leak state into each other.
//! - **Argument marshalling** ([`marshal`]) -- one command string to an
//!   argument vector, plus a C `argv` for foreign entry points.
//! - **Exit interception** ([`CapturePoint`], [`request_exit`]) -- turns the
//!   tool's process-termination path into an exit code.
//! - **Control signals** ([`ControlSignals`]) -- keys injected by the host
//!   while a command runs.
//! - **Output surface** ([`SurfaceRegistry`]) -- the host rendering target.
//! - **Host binding** ([`HostBinding`]) -- where tool callbacks such as
//!   logging are routed.
//! - **Bridge** ([`Bridge`]) -- the boundary operations the host calls.
//!
//! ## Example
//!
//! ```
//! use ffbridge_core::{ArgumentVector, Bridge, EmbeddedTool, Invocation, ToolOutcome};
//!
//! struct Quitter;
//!
//! impl EmbeddedTool for Quitter {
//!     fn name(&self) -> &str {
//!         "quitter"
//!     }
//!
//!     fn main(&mut self, _args: &ArgumentVector, inv: &mut Invocation<'_>) -> ToolOutcome {
//!         while let Some(key) = inv.read_signal() {
//!             if key == 'q' as i32 {
//!                 inv.exit(255);
//!             }
//!         }
//!         ToolOutcome::Completed(0)
//!     }
//! }
//!
//! let bridge = Bridge::new(Quitter);
//! bridge.send_control_signal('q' as i32);
//! assert_eq!(bridge.run_command("quitter"), 255);
//! assert_eq!(bridge.run_command("quitter"), 0);
//! ```

pub mod bridge;
mod error;
pub mod foreign;
pub mod globals;
pub mod host;
pub mod intercept;
pub mod marshal;
pub mod reset;
pub mod signals;
pub mod surface;
pub mod tool;

// Re-exports
pub use bridge::{
    Bridge, BridgeBuilder, BridgeOptions, Completion, RunReport, MARSHAL_FAILURE_CODE,
};
pub use error::{MarshalError, Result};
pub use foreign::{ForeignMain, ForeignTool};
pub use globals::{
    FilterGraph, InputFile, InputStream, MediaType, OptionDict, OutputFile, ToolGlobals,
    VideoSync,
};
pub use host::{Host, HostBinding, HostHandle, LogLevel};
pub use intercept::{
    request_exit, CapturePoint, ExitRequest, Resolution, EXIT_OFFSET, PANIC_EXIT_CODE,
};
pub use marshal::{marshal, ArgumentVector, CArgv};
pub use reset::ResetCoordinator;
pub use signals::{ControlSignals, DrainOrder, OverflowPolicy, SignalConfig, NO_SIGNAL};
pub use surface::{Surface, SurfaceHandle, SurfaceRegistry, VideoFrame};
pub use tool::{EmbeddedTool, Invocation, ToolOutcome};
