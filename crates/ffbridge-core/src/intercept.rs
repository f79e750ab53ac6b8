//! Capture of the embedded tool's process-termination path.
//!
//! The tool was written to run as a whole process and bails out of fatal
//! paths by terminating it. Inside a host that would take the host down
//! too. Instead, the tool calls [`request_exit`], which unwinds to the
//! [`CapturePoint`] armed at the invocation boundary, and the exit request
//! becomes an ordinary exit code.
//!
//! This is the one place the bridge transfers control non-structurally.
//! Tools that can return an exit request as a value should prefer
//! [`crate::ToolOutcome::RequestedExit`].

use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};

/// Offset added to an exit code before it travels through the unwind path.
///
/// Keeps a requested exit of `0` distinguishable from "nothing was raised".
/// [`request_exit`] adds it and [`CapturePoint::run`] subtracts it, so a raw
/// value `v` surfaces as `v - EXIT_OFFSET`.
pub const EXIT_OFFSET: i32 = 100;

/// Exit code reported when the tool panics instead of requesting an exit.
pub const PANIC_EXIT_CODE: i32 = 255;

thread_local! {
    static ARMED: Cell<usize> = const { Cell::new(0) };
}

/// Unwind payload carrying an offset-encoded exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitRequest {
    raw: i32,
}

impl ExitRequest {
    /// Encode an exit code for the unwind path.
    pub fn new(code: i32) -> Self {
        Self {
            raw: code.wrapping_add(EXIT_OFFSET),
        }
    }

    /// Wrap an already-encoded value.
    pub fn from_raw(raw: i32) -> Self {
        Self { raw }
    }

    /// The value as raised.
    pub fn raw(&self) -> i32 {
        self.raw
    }

    /// The exit code the tool asked for.
    pub fn code(&self) -> i32 {
        self.raw.wrapping_sub(EXIT_OFFSET)
    }
}

/// Whether the current thread is inside an armed capture point.
pub fn is_armed() -> bool {
    ARMED.with(|armed| armed.get() > 0)
}

/// Terminate the running invocation with `code`.
///
/// Unwinds to the nearest armed [`CapturePoint`] on this thread without
/// running the panic hook.
///
/// # Panics
///
/// Panics if no capture point is armed on the current thread: there is no
/// invocation boundary to return to.
pub fn request_exit(code: i32) -> ! {
    raise(ExitRequest::new(code))
}

/// Raise an already-encoded exit request.
///
/// # Panics
///
/// Panics if no capture point is armed on the current thread.
pub fn raise(request: ExitRequest) -> ! {
    if !is_armed() {
        panic!(
            "exit({}) requested outside of an armed capture point",
            request.code()
        );
    }
    panic::resume_unwind(Box::new(request))
}

/// How an armed capture point resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    /// The entry point returned normally.
    Returned(T),
    /// The entry point raised an [`ExitRequest`].
    Exited(ExitRequest),
    /// The entry point panicked with something other than an exit request.
    Panicked(String),
}

/// A single-use capture point for one invocation.
///
/// Consumed by [`CapturePoint::run`], so it cannot be resolved twice.
#[derive(Debug)]
#[must_use = "a capture point does nothing until it runs an entry point"]
pub struct CapturePoint {
    _private: (),
}

impl CapturePoint {
    /// Establish a fresh capture point.
    pub fn arm() -> Self {
        Self { _private: () }
    }

    /// Run `entry` with the capture point armed.
    ///
    /// Exactly one [`Resolution`] is produced, whichever way `entry` leaves.
    pub fn run<T, F>(self, entry: F) -> Resolution<T>
    where
        F: FnOnce() -> T,
    {
        let guard = ArmedGuard::enter();
        // State the entry point mutated before unwinding is abandoned here and
        // overwritten by the next reset.
        let outcome = panic::catch_unwind(AssertUnwindSafe(entry));
        drop(guard);

        match outcome {
            Ok(value) => Resolution::Returned(value),
            Err(payload) => match payload.downcast::<ExitRequest>() {
                Ok(request) => Resolution::Exited(*request),
                Err(payload) => Resolution::Panicked(panic_message(payload.as_ref())),
            },
        }
    }
}

struct ArmedGuard;

impl ArmedGuard {
    fn enter() -> Self {
        ARMED.with(|armed| armed.set(armed.get() + 1));
        Self
    }
}

impl Drop for ArmedGuard {
    fn drop(&mut self) {
        ARMED.with(|armed| armed.set(armed.get().saturating_sub(1)));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
