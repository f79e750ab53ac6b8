//! Deterministic mock of an ffmpeg-style tool for the ffbridge contract.
//!
//! The mock contains no codec or container logic. It parses a small option
//! set into [`ffbridge_core::ToolGlobals`], then "transcodes" by emitting
//! blank frames to the bound output surface while polling control signals,
//! which is enough to drive the bridge the way the real tool would.
//!
//! Mock-only options: `-frames <n>` (frames to produce), `-s <WxH>` (frame
//! size), `-exit <code>` (take the abrupt-exit path halfway through the run)
//! and `-crash` (panic halfway through the run).

mod options;

pub use options::{Action, RunSettings};

use bytes::Bytes;
use ffbridge_core::{
    ArgumentVector, EmbeddedTool, Invocation, LogLevel, ToolOutcome, VideoFrame,
};
use std::thread;
use std::time::Duration;

/// Version string reported by `-version` unless overridden.
pub const MOCK_VERSION: &str = "6.0-mock";

/// Frames produced when `-frames` is not given.
pub const DEFAULT_FRAMES: u64 = 10;

/// What one invocation of the mock observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockRun {
    pub args: Vec<String>,
    /// Whether the registry was at its baseline when `main` was entered.
    pub started_from_baseline: bool,
    pub frames_rendered: u64,
    pub signals: Vec<i32>,
    /// Set when a `q` signal ended the run early.
    pub quit_requested: bool,
}

/// Mock embedded tool.
#[derive(Debug)]
pub struct MockTool {
    version: String,
    frame_interval: Duration,
    default_frames: u64,
    history: Vec<MockRun>,
}

impl MockTool {
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: MOCK_VERSION.to_string(),
            frame_interval: Duration::ZERO,
            default_frames: DEFAULT_FRAMES,
            history: Vec::new(),
        }
    }

    /// Sleep this long between frames, giving a host time to inject signals.
    #[must_use]
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    #[must_use]
    pub fn with_default_frames(mut self, frames: u64) -> Self {
        self.default_frames = frames;
        self
    }

    /// Every invocation that reached `main`, oldest first.
    pub fn history(&self) -> &[MockRun] {
        &self.history
    }

    pub fn last_run(&self) -> Option<&MockRun> {
        self.history.last()
    }

    fn banner(&self, program: &str, inv: &Invocation<'_>) {
        inv.log(
            LogLevel::Info,
            &format!(
                "{program} version {} Copyright (c) the ffbridge developers",
                self.version
            ),
        );
        inv.log(LogLevel::Info, "configuration: --enable-mock");
    }
}

impl Default for MockTool {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddedTool for MockTool {
    fn name(&self) -> &str {
        "mock"
    }

    fn main(&mut self, args: &ArgumentVector, inv: &mut Invocation<'_>) -> ToolOutcome {
        // Recorded before anything can unwind so aborted runs show up too.
        self.history.push(MockRun {
            args: args.as_slice().to_vec(),
            started_from_baseline: inv.globals().is_baseline(),
            frames_rendered: 0,
            signals: Vec::new(),
            quit_requested: false,
        });

        let action = options::parse(args.options(), self.default_frames, inv);
        match action {
            Action::Version => {
                self.banner(args.program(), inv);
                ToolOutcome::Completed(0)
            }
            Action::Help => {
                if !inv.globals().hide_banner {
                    self.banner(args.program(), inv);
                }
                inv.log(
                    LogLevel::Info,
                    &format!(
                        "usage: {} [options] [[infile options] -i infile]... \
                         {{[outfile options] outfile}}...",
                        args.program()
                    ),
                );
                ToolOutcome::Completed(0)
            }
            Action::Transcode(settings) => {
                if !inv.globals().hide_banner {
                    self.banner(args.program(), inv);
                }
                let interval = self.frame_interval;
                if let Some(run) = self.history.last_mut() {
                    transcode(&settings, interval, run, inv);
                }
                ToolOutcome::Completed(inv.globals().main_return_code)
            }
        }
    }
}

fn transcode(
    settings: &RunSettings,
    frame_interval: Duration,
    run: &mut MockRun,
    inv: &mut Invocation<'_>,
) {
    let g = inv.globals_mut();
    g.nb_output_dumped = g.output_files.len() as u32;
    let mut dumps = Vec::new();
    for (i, input) in g.input_files.iter().enumerate() {
        dumps.push(format!(
            "Input #{i}, {}, from '{}':",
            input.format.as_deref().unwrap_or("auto"),
            input.url
        ));
        for stream in g.streams_of(i) {
            dumps.push(format!(
                "  Stream #{i}:{}: {:?}",
                stream.index, stream.media_type
            ));
        }
    }
    for (i, output) in g.output_files.iter().enumerate() {
        dumps.push(format!(
            "Output #{i}, {}, to '{}':",
            output.format.as_deref().unwrap_or("auto"),
            output.url
        ));
    }
    for line in &dumps {
        inv.log(LogLevel::Info, line);
    }
    inv.log(LogLevel::Info, "Press [q] to stop, [?] for help");

    let payload = Bytes::from(vec![
        0u8;
        settings.width as usize * settings.height as usize * 3 / 2
    ]);

    if settings.frames == 0 {
        inject_failure(settings, inv, 0);
    }

    for pts in 0..settings.frames {
        if inv.globals().stdin_interaction {
            while let Some(code) = inv.read_signal() {
                run.signals.push(code);
                if handle_key(code, inv) {
                    run.quit_requested = true;
                }
            }
            if run.quit_requested {
                break;
            }
        }

        if pts == settings.frames / 2 {
            inject_failure(settings, inv, pts);
        }

        inv.present(&VideoFrame {
            width: settings.width,
            height: settings.height,
            pts: pts as i64,
            data: payload.clone(),
        });
        run.frames_rendered += 1;

        if !frame_interval.is_zero() {
            thread::sleep(frame_interval);
        }
    }

    if inv.globals().print_stats != 0 {
        inv.log(
            LogLevel::Info,
            &format!("frame={} fps=0.0 q=-1.0 Lsize=N/A", run.frames_rendered),
        );
    }
}

/// React to an interactive key. Returns `true` for quit.
fn handle_key(code: i32, inv: &Invocation<'_>) -> bool {
    match u8::try_from(code).map(char::from) {
        Ok('q') => {
            inv.log(LogLevel::Info, "[q] command received. Exiting.");
            true
        }
        Ok('?') => {
            inv.log(
                LogLevel::Info,
                "key    function\n?      show this help\nq      quit",
            );
            false
        }
        Ok(key) => {
            inv.log(LogLevel::Debug, &format!("ignoring key '{key}'"));
            false
        }
        Err(_) => {
            inv.log(LogLevel::Debug, &format!("ignoring signal {code}"));
            false
        }
    }
}

fn inject_failure(settings: &RunSettings, inv: &Invocation<'_>, pts: u64) {
    if let Some(code) = settings.exit_code {
        fail_deep(inv, code, 3);
    }
    if settings.crash {
        panic!("mock tool crashed at frame {pts}");
    }
}

/// Stand-in for a fatal error a few frames deep in the pipeline.
fn fail_deep(inv: &Invocation<'_>, code: i32, depth: u32) {
    if depth == 0 {
        inv.log(LogLevel::Fatal, &format!("Conversion failed with status {code}"));
        inv.exit(code);
    }
    fail_deep(inv, code, depth - 1);
}
