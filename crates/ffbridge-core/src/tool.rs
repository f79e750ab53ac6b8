//! The seam between the bridge and the embedded tool.

use crate::globals::ToolGlobals;
use crate::host::{HostBinding, LogLevel};
use crate::intercept;
use crate::marshal::ArgumentVector;
use crate::signals::ControlSignals;
use crate::surface::{SurfaceHandle, SurfaceRegistry, VideoFrame};

/// How the tool's entry point finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolOutcome {
    /// `main` returned this status.
    Completed(i32),
    /// The tool wanted to terminate the process with this status.
    RequestedExit(i32),
}

/// A process-oriented tool that can be run repeatedly in-process.
///
/// Implementations read their options from the [`Invocation`] rather than
/// from process-wide state. A fatal path deep in the call stack may call
/// [`Invocation::exit`] instead of threading a value back up.
pub trait EmbeddedTool: Send {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// The tool's `main`.
    fn main(&mut self, args: &ArgumentVector, invocation: &mut Invocation<'_>) -> ToolOutcome;
}

impl<T: EmbeddedTool + ?Sized> EmbeddedTool for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn main(&mut self, args: &ArgumentVector, invocation: &mut Invocation<'_>) -> ToolOutcome {
        (**self).main(args, invocation)
    }
}

/// Everything one run of the tool may touch.
///
/// Lives for exactly one invocation. The registry is borrowed mutably; the
/// signal queue, surface registry and host binding are shared with the
/// host's control thread.
pub struct Invocation<'a> {
    globals: &'a mut ToolGlobals,
    signals: &'a ControlSignals,
    surfaces: &'a SurfaceRegistry,
    host: &'a HostBinding,
    log_level: LogLevel,
}

impl<'a> Invocation<'a> {
    pub fn new(
        globals: &'a mut ToolGlobals,
        signals: &'a ControlSignals,
        surfaces: &'a SurfaceRegistry,
        host: &'a HostBinding,
        log_level: LogLevel,
    ) -> Self {
        Self {
            globals,
            signals,
            surfaces,
            host,
            log_level,
        }
    }

    pub fn globals(&self) -> &ToolGlobals {
        self.globals
    }

    pub fn globals_mut(&mut self) -> &mut ToolGlobals {
        self.globals
    }

    /// Next injected control signal, if any. Never blocks.
    pub fn read_signal(&self) -> Option<i32> {
        self.signals.pop()
    }

    /// The queue behind [`Invocation::read_signal`].
    pub fn signals(&self) -> &'a ControlSignals {
        self.signals
    }

    /// The output surface bound right now.
    ///
    /// The host may rebind at any time; call again before each frame to pick
    /// up a new surface.
    pub fn surface(&self) -> Option<SurfaceHandle> {
        self.surfaces.current()
    }

    /// Present a frame on the current surface. Returns `false` when no
    /// surface is bound.
    pub fn present(&self, frame: &VideoFrame) -> bool {
        match self.surface() {
            Some(surface) => {
                surface.present(frame);
                true
            }
            None => false,
        }
    }

    /// Log through the host, dropping lines less severe than the configured
    /// level.
    pub fn log(&self, level: LogLevel, message: &str) {
        if level <= self.log_level {
            self.host.log(level, message);
        }
    }

    /// Terminate this invocation with `code`.
    ///
    /// Unwinds to the invocation boundary; the host receives `code` as the
    /// exit status.
    pub fn exit(&self, code: i32) -> ! {
        intercept::request_exit(code)
    }
}
