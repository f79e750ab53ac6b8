//! Invocation boundary exposed to the host application.

use crate::error::MarshalError;
use crate::globals::ToolGlobals;
use crate::host::{HostBinding, HostHandle, LogLevel};
use crate::intercept::{CapturePoint, Resolution, PANIC_EXIT_CODE};
use crate::marshal::marshal;
use crate::reset::ResetCoordinator;
use crate::signals::{ControlSignals, SignalConfig};
use crate::surface::{SurfaceHandle, SurfaceRegistry};
use crate::tool::{EmbeddedTool, Invocation, ToolOutcome};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Exit code returned when the command string cannot be marshalled.
pub const MARSHAL_FAILURE_CODE: i32 = -1;

/// Tunables for a [`Bridge`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeOptions {
    #[serde(default)]
    pub signals: SignalConfig,

    /// Least severe tool log level forwarded to the host.
    #[serde(default)]
    pub tool_log_level: LogLevel,
}

/// How one invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The command could not be marshalled; the tool never ran.
    Rejected(MarshalError),
    /// The tool's entry point returned this status.
    Returned(i32),
    /// The tool requested termination with this status.
    Exited(i32),
    /// The tool panicked.
    Panicked(String),
}

impl Completion {
    /// The integer reported to the host.
    pub fn code(&self) -> i32 {
        match self {
            Self::Rejected(_) => MARSHAL_FAILURE_CODE,
            Self::Returned(code) | Self::Exited(code) => *code,
            Self::Panicked(_) => PANIC_EXIT_CODE,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code() == 0
    }
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(e) => write!(f, "rejected: {e}"),
            Self::Returned(code) => write!(f, "returned {code}"),
            Self::Exited(code) => write!(f, "exited {code}"),
            Self::Panicked(msg) => write!(f, "panicked: {msg}"),
        }
    }
}

/// Result of [`Bridge::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub command: String,
    pub completion: Completion,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn exit_code(&self) -> i32 {
        self.completion.code()
    }
}

struct Engine<T> {
    tool: T,
    registry: ResetCoordinator,
    invocations: u64,
}

/// Runs an [`EmbeddedTool`] repeatedly inside the host process.
///
/// Each call to [`Bridge::run_command`] resets the tool's configuration
/// registry, splits the command into arguments, and runs the tool's entry
/// point behind a capture point, so an exit request comes back as an exit
/// code instead of ending the process.
///
/// Invocations are serialized. The signal queue, output surface and host
/// binding can be used from other threads while a command runs.
///
/// # Example
///
/// ```
/// use ffbridge_core::{ArgumentVector, Bridge, EmbeddedTool, Invocation, ToolOutcome};
///
/// struct Version;
///
/// impl EmbeddedTool for Version {
///     fn name(&self) -> &str {
///         "version"
///     }
///
///     fn main(&mut self, args: &ArgumentVector, inv: &mut Invocation<'_>) -> ToolOutcome {
///         if args.options().iter().any(|a| a == "-version") {
///             return ToolOutcome::Completed(0);
///         }
///         inv.exit(1)
///     }
/// }
///
/// let bridge = Bridge::new(Version);
/// assert_eq!(bridge.run_command("tool -version"), 0);
/// assert_eq!(bridge.run_command("tool -bogus"), 1);
/// assert_eq!(bridge.run_command(""), -1);
/// ```
pub struct Bridge<T> {
    engine: Mutex<Engine<T>>,
    signals: ControlSignals,
    surfaces: SurfaceRegistry,
    host: HostBinding,
    options: BridgeOptions,
}

impl<T: EmbeddedTool> Bridge<T> {
    /// Create a bridge with default options and no host bound.
    pub fn new(tool: T) -> Self {
        Self::builder(tool).build()
    }

    pub fn builder(tool: T) -> BridgeBuilder<T> {
        BridgeBuilder {
            tool,
            options: BridgeOptions::default(),
            host: None,
        }
    }

    /// Run one command and return its exit code.
    ///
    /// Returns [`MARSHAL_FAILURE_CODE`] if the command is empty or blank;
    /// otherwise the tool's own exit status.
    pub fn run_command(&self, command: &str) -> i32 {
        self.run(command).exit_code()
    }

    /// Run one command and report how it ended.
    pub fn run(&self, command: &str) -> RunReport {
        let started = Instant::now();
        let mut engine = self.engine.lock();
        let engine = &mut *engine;

        engine.registry.reset();

        let args = match marshal(command) {
            Ok(args) => args,
            Err(e) => {
                tracing::warn!(command, error = %e, "rejecting command");
                self.host.log(LogLevel::Warning, &format!("invalid argument: {e}"));
                return RunReport {
                    command: command.to_string(),
                    completion: Completion::Rejected(e),
                    elapsed: started.elapsed(),
                };
            }
        };

        engine.invocations += 1;
        tracing::info!(
            tool = engine.tool.name(),
            invocation = engine.invocations,
            argc = args.argc(),
            "running {}",
            args
        );

        let tool = &mut engine.tool;
        let globals = engine.registry.globals_mut();
        let resolution = CapturePoint::arm().run(|| {
            let mut invocation = Invocation::new(
                globals,
                &self.signals,
                &self.surfaces,
                &self.host,
                self.options.tool_log_level,
            );
            tool.main(&args, &mut invocation)
        });

        let completion = match resolution {
            Resolution::Returned(ToolOutcome::Completed(code)) => {
                tracing::info!(code, "tool returned");
                Completion::Returned(code)
            }
            Resolution::Returned(ToolOutcome::RequestedExit(code)) => {
                tracing::info!(code, "tool requested exit");
                Completion::Exited(code)
            }
            Resolution::Exited(request) => {
                tracing::warn!(raw = request.raw(), code = request.code(), "tool exited");
                Completion::Exited(request.code())
            }
            Resolution::Panicked(message) => {
                tracing::error!(%message, "tool panicked");
                self.host
                    .log(LogLevel::Fatal, &format!("tool panicked: {message}"));
                Completion::Panicked(message)
            }
        };

        RunReport {
            command: command.to_string(),
            completion,
            elapsed: started.elapsed(),
        }
    }

    /// Bind the surface the tool renders into, or clear it with `None`.
    pub fn set_output_surface(&self, surface: Option<SurfaceHandle>) {
        self.surfaces.bind(surface);
    }

    /// The surface currently bound, if any.
    pub fn output_surface(&self) -> Option<SurfaceHandle> {
        self.surfaces.current()
    }

    /// Queue a control signal for the running (or next) invocation.
    pub fn send_control_signal(&self, code: i32) {
        self.signals.push(code);
    }

    /// Attach the host runtime the tool's callbacks report to.
    pub fn on_host_load(&self, host: HostHandle) {
        self.host.load(host);
    }

    /// Detach the host runtime and release the bound output surface.
    pub fn on_host_unload(&self) {
        self.host.unload();
        self.surfaces.clear();
    }

    pub fn signals(&self) -> &ControlSignals {
        &self.signals
    }

    pub fn host(&self) -> &HostBinding {
        &self.host
    }

    pub fn options(&self) -> &BridgeOptions {
        &self.options
    }

    /// Look at the registry as the last invocation left it.
    ///
    /// Blocks while a command is running.
    pub fn inspect_globals<R>(&self, f: impl FnOnce(&ToolGlobals) -> R) -> R {
        f(self.engine.lock().registry.globals())
    }

    /// Access the tool between invocations.
    ///
    /// Blocks while a command is running.
    pub fn with_tool<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.engine.lock().tool)
    }

    /// Number of invocations that reached the tool's entry point.
    pub fn invocations(&self) -> u64 {
        self.engine.lock().invocations
    }
}

impl<T> fmt::Debug for Bridge<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("signals", &self.signals)
            .field("surfaces", &self.surfaces)
            .field("host", &self.host)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Bridge`].
pub struct BridgeBuilder<T> {
    tool: T,
    options: BridgeOptions,
    host: Option<HostHandle>,
}

impl<T: EmbeddedTool> BridgeBuilder<T> {
    pub fn options(mut self, options: BridgeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn signal_config(mut self, config: SignalConfig) -> Self {
        self.options.signals = config;
        self
    }

    pub fn tool_log_level(mut self, level: LogLevel) -> Self {
        self.options.tool_log_level = level;
        self
    }

    /// Bind a host from the start instead of through
    /// [`Bridge::on_host_load`].
    pub fn host(mut self, host: HostHandle) -> Self {
        self.host = Some(host);
        self
    }

    pub fn build(self) -> Bridge<T> {
        let host = match self.host {
            Some(host) => HostBinding::with_host(host),
            None => HostBinding::new(),
        };

        Bridge {
            engine: Mutex::new(Engine {
                tool: self.tool,
                registry: ResetCoordinator::new(),
                invocations: 0,
            }),
            signals: ControlSignals::new(self.options.signals),
            surfaces: SurfaceRegistry::new(),
            host,
            options: self.options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marshal::ArgumentVector;

    /// Sets a flag per argument and reports whether it started from baseline.
    struct Flagger {
        saw_baseline: Vec<bool>,
    }

    impl EmbeddedTool for Flagger {
        fn name(&self) -> &str {
            "flagger"
        }

        fn main(&mut self, args: &ArgumentVector, inv: &mut Invocation<'_>) -> ToolOutcome {
            self.saw_baseline.push(inv.globals().is_baseline());
            for arg in args.options() {
                match arg.as_str() {
                    "-hide_banner" => inv.globals_mut().hide_banner = true,
                    "-y" => inv.globals_mut().nb_output_dumped += 1,
                    "-fail" => inv.exit(2),
                    "-panic" => panic!("bad state"),
                    "-quit" => return ToolOutcome::RequestedExit(0),
                    _ => {}
                }
            }
            ToolOutcome::Completed(0)
        }
    }

    fn bridge() -> Bridge<Flagger> {
        Bridge::new(Flagger {
            saw_baseline: Vec::new(),
        })
    }

    #[test]
    fn test_marshal_failure_code() {
        let bridge = bridge();
        assert_eq!(bridge.run_command(""), MARSHAL_FAILURE_CODE);
        assert_eq!(bridge.run_command("   "), MARSHAL_FAILURE_CODE);
        assert_eq!(bridge.invocations(), 0);
    }

    #[test]
    fn test_completion_variants() {
        let bridge = bridge();
        assert_eq!(bridge.run("t").completion, Completion::Returned(0));
        assert_eq!(bridge.run("t -fail").completion, Completion::Exited(2));
        assert_eq!(bridge.run("t -quit").completion, Completion::Exited(0));
        assert_eq!(
            bridge.run("t -panic").completion,
            Completion::Panicked("bad state".to_string())
        );
        assert_eq!(bridge.run_command("t -panic"), PANIC_EXIT_CODE);
    }

    #[test]
    fn test_each_run_starts_from_baseline() {
        let bridge = bridge();
        bridge.run_command("t -hide_banner -y -fail");
        assert!(bridge.inspect_globals(|g| g.hide_banner));
        bridge.run_command("t -y -panic");
        bridge.run_command("t");
        bridge.with_tool(|tool| assert_eq!(tool.saw_baseline, vec![true, true, true]));
    }

    #[test]
    fn test_unload_clears_surface() {
        #[derive(Debug)]
        struct Null;
        impl crate::surface::Surface for Null {
            fn label(&self) -> &str {
                "null"
            }
            fn present(&self, _frame: &crate::surface::VideoFrame) {}
        }

        let bridge = bridge();
        bridge.set_output_surface(Some(std::sync::Arc::new(Null)));
        assert!(bridge.output_surface().is_some());
        bridge.on_host_unload();
        assert!(bridge.output_surface().is_none());
        bridge.on_host_unload();
    }

    #[test]
    fn test_completion_display() {
        assert_eq!(Completion::Exited(3).to_string(), "exited 3");
        assert_eq!(
            Completion::Rejected(MarshalError::EmptyCommand).to_string(),
            "rejected: empty command"
        );
    }
}
