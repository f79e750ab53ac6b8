//! Runs bridge invocations off the async runtime.
//!
//! One worker on tokio's blocking pool drains a job queue, so commands run
//! strictly in the order they were submitted. Control signals bypass the
//! queue and go straight to the bridge, which is how a key reaches the
//! command that is running.

use ffbridge_core::{Bridge, EmbeddedTool, RunReport};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};

type Callback = Box<dyn FnOnce(RunReport) + Send>;
type BridgeAction<T> = Box<dyn FnOnce(&Bridge<T>) + Send>;

enum Job<T> {
    Run { command: String, on_finish: Callback },
    Apply(BridgeAction<T>),
}

/// Async front end for a shared [`Bridge`].
///
/// Must be created inside a tokio runtime.
pub struct CommandRunner<T> {
    bridge: Arc<Bridge<T>>,
    jobs: mpsc::UnboundedSender<Job<T>>,
    worker: JoinHandle<()>,
}

impl<T: EmbeddedTool + 'static> CommandRunner<T> {
    pub fn new(bridge: Arc<Bridge<T>>) -> Self {
        let (jobs, mut queue) = mpsc::unbounded_channel::<Job<T>>();
        let worker_bridge = Arc::clone(&bridge);
        let worker = tokio::task::spawn_blocking(move || {
            while let Some(job) = queue.blocking_recv() {
                match job {
                    Job::Run { command, on_finish } => on_finish(worker_bridge.run(&command)),
                    Job::Apply(action) => action(&worker_bridge),
                }
            }
            tracing::debug!("command worker stopped");
        });

        Self {
            bridge,
            jobs,
            worker,
        }
    }

    /// The bridge, for sending signals to the running command.
    pub fn bridge(&self) -> &Arc<Bridge<T>> {
        &self.bridge
    }

    /// Queue `command`; the receiver resolves with its report.
    pub fn submit(&self, command: impl Into<String>) -> oneshot::Receiver<RunReport> {
        let (tx, rx) = oneshot::channel();
        self.submit_with(command, move |report| {
            let _ = tx.send(report);
        });
        rx
    }

    /// Queue `command` and hand its report to `on_finish`.
    ///
    /// `on_finish` runs on the worker before the next job starts, so
    /// callbacks fire in submission order.
    pub fn submit_with<F>(&self, command: impl Into<String>, on_finish: F)
    where
        F: FnOnce(RunReport) + Send + 'static,
    {
        let command = command.into();
        tracing::debug!(%command, "queueing command");
        self.enqueue(Job::Run {
            command,
            on_finish: Box::new(on_finish),
        });
    }

    /// Run `action` against the bridge once every job queued before it has
    /// finished, e.g. to rebind the output surface between two commands.
    pub fn then<F>(&self, action: F)
    where
        F: FnOnce(&Bridge<T>) + Send + 'static,
    {
        self.enqueue(Job::Apply(Box::new(action)));
    }

    /// Stop accepting jobs and wait for the queued ones to finish.
    pub async fn finish(self) -> Result<Arc<Bridge<T>>, JoinError> {
        let Self {
            bridge,
            jobs,
            worker,
        } = self;
        drop(jobs);
        worker.await?;
        Ok(bridge)
    }

    fn enqueue(&self, job: Job<T>) {
        if self.jobs.send(job).is_err() {
            tracing::error!("command worker has stopped, dropping job");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::LogSurface;
    use ffbridge_core::{Completion, Surface, VideoFrame};
    use ffbridge_mock::MockTool;
    use std::time::Duration;

    fn runner(interval: Duration) -> CommandRunner<MockTool> {
        let tool = MockTool::new().with_frame_interval(interval);
        CommandRunner::new(Arc::new(Bridge::new(tool)))
    }

    #[tokio::test]
    async fn test_submit_returns_report() {
        let runner = runner(Duration::ZERO);
        let report = runner.submit("ffmpeg -version").await.unwrap();
        assert_eq!(report.completion, Completion::Returned(0));
        assert_eq!(report.command, "ffmpeg -version");
    }

    #[derive(Debug)]
    struct FirstFrame(mpsc::UnboundedSender<i64>);

    impl Surface for FirstFrame {
        fn label(&self) -> &str {
            "first-frame"
        }

        fn present(&self, frame: &VideoFrame) {
            let _ = self.0.send(frame.pts);
        }
    }

    #[tokio::test]
    async fn test_quit_while_running() {
        let runner = runner(Duration::from_millis(5));
        let (tx, mut rx) = mpsc::unbounded_channel();
        runner
            .bridge()
            .set_output_surface(Some(Arc::new(FirstFrame(tx))));
        let handle = runner.submit("ffmpeg -frames 100000 out.mp4");

        // Wait for the run to start rendering before asking it to stop.
        assert_eq!(rx.recv().await, Some(0));
        runner.bridge().send_control_signal('q' as i32);

        let report = handle.await.unwrap();
        assert_eq!(report.exit_code(), 0);
        runner.bridge().with_tool(|tool| {
            let run = tool.last_run().unwrap();
            assert!(run.quit_requested);
            assert!(run.frames_rendered < 100_000);
        });
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_commands_run_in_submission_order() {
        let runner = runner(Duration::from_millis(1));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let commands: Vec<String> = (0..16).map(|i| format!("ffmpeg -frames 2 o{i}.mp4")).collect();
        for command in &commands {
            let tx = tx.clone();
            runner.submit_with(command.as_str(), move |report| {
                let _ = tx.send(report.command);
            });
        }
        drop(tx);

        let bridge = runner.finish().await.unwrap();
        let mut finished = Vec::new();
        while let Some(command) = rx.recv().await {
            finished.push(command);
        }
        assert_eq!(finished, commands);

        bridge.with_tool(|tool| {
            let outputs: Vec<&str> = tool
                .history()
                .iter()
                .map(|r| r.args.last().map(String::as_str).unwrap_or_default())
                .collect();
            let expected: Vec<String> = (0..16).map(|i| format!("o{i}.mp4")).collect();
            assert_eq!(outputs, expected);
            assert!(tool.history().iter().all(|r| r.started_from_baseline));
        });
    }

    #[tokio::test]
    async fn test_mixed_outcomes_report_in_order() {
        let runner = runner(Duration::ZERO);
        let (tx, mut rx) = mpsc::unbounded_channel();

        for cmd in ["ffmpeg -exit 3 a.mp4", "ffmpeg b.mp4", "ffmpeg", "  "] {
            let tx = tx.clone();
            runner.submit_with(cmd, move |report| {
                let _ = tx.send(report.exit_code());
            });
        }
        drop(tx);

        let bridge = runner.finish().await.unwrap();
        let mut codes = Vec::new();
        while let Some(code) = rx.recv().await {
            codes.push(code);
        }
        assert_eq!(codes, vec![3, 0, 1, -1]);
        assert_eq!(bridge.invocations(), 3);
    }

    #[tokio::test]
    async fn test_surface_changes_apply_between_commands() {
        let runner = runner(Duration::from_millis(1));
        let surface = Arc::new(LogSurface::new("queued"));

        let bound = Arc::clone(&surface);
        runner.then(move |bridge| bridge.set_output_surface(Some(bound)));
        runner.submit_with("ffmpeg -frames 3 a.mp4", |_| {});
        runner.then(|bridge| bridge.set_output_surface(None));
        let last = runner.submit("ffmpeg -frames 4 b.mp4");

        assert_eq!(last.await.unwrap().exit_code(), 0);
        assert_eq!(surface.frames(), 3);
        assert!(runner.bridge().output_surface().is_none());
    }
}
