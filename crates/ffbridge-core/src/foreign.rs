//! Adapter for tools linked in through a C `main`-style entry point.
//!
//! The C side reaches back into the bridge through two exported hooks:
//! [`ffbridge_read_virtual_key`] from its interactive-input poll and
//! [`ffbridge_request_exit`] from its process-termination path. Both are
//! only meaningful while [`ForeignTool::main`] is on the stack.
//!
//! `ffbridge_request_exit` unwinds through the C frames between the hook
//! and the entry point, so the C code must be built with unwind tables
//! (`-fexceptions` or equivalent) and must not hold resources it expects to
//! release on that path.

use crate::intercept;
use crate::marshal::ArgumentVector;
use crate::signals::{ControlSignals, NO_SIGNAL};
use crate::tool::{EmbeddedTool, Invocation, ToolOutcome};
use libc::{c_char, c_int};
use std::cell::Cell;
use std::ptr;

/// Signature of a C `int main(int argc, char **argv)` entry point.
pub type ForeignMain = unsafe extern "C-unwind" fn(c_int, *mut *mut c_char) -> c_int;

thread_local! {
    static ACTIVE_SIGNALS: Cell<*const ControlSignals> = const { Cell::new(ptr::null()) };
}

/// An [`EmbeddedTool`] backed by a foreign entry point.
#[derive(Debug, Clone)]
pub struct ForeignTool {
    name: String,
    entry: ForeignMain,
}

impl ForeignTool {
    /// Wrap a C entry point.
    ///
    /// # Safety
    ///
    /// `entry` must behave like a C `main`: it reads at most `argc` entries
    /// of `argv` plus the null sentinel and does not free them.
    pub unsafe fn new(name: impl Into<String>, entry: ForeignMain) -> Self {
        Self {
            name: name.into(),
            entry,
        }
    }
}

impl EmbeddedTool for ForeignTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn main(&mut self, args: &ArgumentVector, invocation: &mut Invocation<'_>) -> ToolOutcome {
        let mut argv = match args.to_c_argv() {
            Ok(argv) => argv,
            Err(e) => {
                invocation.log(crate::LogLevel::Error, &format!("{}: {}", self.name, e));
                return ToolOutcome::RequestedExit(1);
            }
        };

        let _scope = SignalScope::enter(invocation.signals());
        // SAFETY: the constructor's contract covers the entry point; argv
        // outlives the call and carries its null sentinel.
        let code = unsafe { (self.entry)(argv.argc(), argv.argv()) };
        ToolOutcome::Completed(code)
    }
}

struct SignalScope {
    previous: *const ControlSignals,
}

impl SignalScope {
    fn enter(signals: &ControlSignals) -> Self {
        let previous = ACTIVE_SIGNALS.with(|active| active.replace(signals as *const _));
        Self { previous }
    }
}

impl Drop for SignalScope {
    fn drop(&mut self) {
        ACTIVE_SIGNALS.with(|active| active.set(self.previous));
    }
}

/// Pop the next control signal for the foreign invocation running on this
/// thread. Returns `-1` when the queue is empty or nothing is running.
#[no_mangle]
pub extern "C" fn ffbridge_read_virtual_key() -> c_int {
    ACTIVE_SIGNALS.with(|active| {
        let signals = active.get();
        if signals.is_null() {
            return NO_SIGNAL;
        }
        // SAFETY: set by SignalScope from a reference that outlives the
        // scope, and cleared before that reference goes away.
        unsafe { &*signals }.pop().unwrap_or(NO_SIGNAL)
    })
}

/// Terminate the foreign invocation running on this thread with `code`.
///
/// Aborts the process if no invocation is armed, since unwinding into
/// arbitrary C callers is not an option.
#[no_mangle]
pub extern "C-unwind" fn ffbridge_request_exit(code: c_int) -> ! {
    if !intercept::is_armed() {
        tracing::error!(code, "exit requested outside of an invocation");
        std::process::abort();
    }
    intercept::request_exit(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::globals::ToolGlobals;
    use crate::host::{HostBinding, LogLevel};
    use crate::intercept::{CapturePoint, Resolution};
    use crate::marshal::marshal;
    use crate::surface::SurfaceRegistry;
    use std::ffi::CStr;

    unsafe extern "C-unwind" fn count_args(argc: c_int, argv: *mut *mut c_char) -> c_int {
        let mut n = 0;
        while !(*argv.add(n)).is_null() {
            n += 1;
        }
        assert_eq!(n as c_int, argc);
        assert_eq!(CStr::from_ptr(*argv).to_str().unwrap(), "tool");
        argc
    }

    unsafe extern "C-unwind" fn drain_then_exit(_argc: c_int, _argv: *mut *mut c_char) -> c_int {
        let mut sum = 0;
        loop {
            let key = ffbridge_read_virtual_key();
            if key == NO_SIGNAL {
                break;
            }
            sum += key;
        }
        ffbridge_request_exit(sum)
    }

    fn run(tool: &mut ForeignTool, command: &str, signals: &ControlSignals) -> Resolution<ToolOutcome> {
        let mut globals = ToolGlobals::baseline();
        let surfaces = SurfaceRegistry::new();
        let host = HostBinding::new();
        let args = marshal(command).unwrap();
        CapturePoint::arm().run(|| {
            let mut inv = Invocation::new(&mut globals, signals, &surfaces, &host, LogLevel::Info);
            tool.main(&args, &mut inv)
        })
    }

    #[test]
    fn test_argv_reaches_entry_point() {
        let mut tool = unsafe { ForeignTool::new("tool", count_args) };
        let signals = ControlSignals::default();
        let resolution = run(&mut tool, "tool -i in.mkv out.mp4", &signals);
        assert_eq!(resolution, Resolution::Returned(ToolOutcome::Completed(4)));
    }

    #[test]
    fn test_hooks_read_signals_and_exit() {
        let mut tool = unsafe { ForeignTool::new("tool", drain_then_exit) };
        let signals = ControlSignals::default();
        signals.push(2);
        signals.push(3);

        match run(&mut tool, "tool", &signals) {
            Resolution::Exited(request) => assert_eq!(request.code(), 5),
            other => panic!("unexpected resolution: {other:?}"),
        }
        assert!(signals.is_empty());
        assert_eq!(ffbridge_read_virtual_key(), NO_SIGNAL);
    }

    #[test]
    fn test_interior_nul_requests_exit() {
        let mut tool = unsafe { ForeignTool::new("tool", count_args) };
        let signals = ControlSignals::default();
        let resolution = run(&mut tool, "tool bad\0arg", &signals);
        assert_eq!(resolution, Resolution::Returned(ToolOutcome::RequestedExit(1)));
    }
}
