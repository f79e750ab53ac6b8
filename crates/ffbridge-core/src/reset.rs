//! Restores the configuration registry before each invocation.

use crate::globals::ToolGlobals;

/// Sole owner of the [`ToolGlobals`] registry.
///
/// The embedded tool only ever borrows the registry for the duration of one
/// invocation; between invocations the coordinator puts every cell back to
/// its baseline.
#[derive(Debug, Default)]
pub struct ResetCoordinator {
    globals: ToolGlobals,
    resets: u64,
}

impl ResetCoordinator {
    /// Create a coordinator whose registry starts at the baseline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set every cell back to its baseline value.
    ///
    /// Does not look at the current values; whatever the previous run left
    /// behind (including a run that unwound halfway) is overwritten.
    pub fn reset(&mut self) {
        self.globals = ToolGlobals::baseline();
        self.resets += 1;
    }

    /// Read access to the registry.
    pub fn globals(&self) -> &ToolGlobals {
        &self.globals
    }

    /// Mutable access to the registry for the running tool.
    pub fn globals_mut(&mut self) -> &mut ToolGlobals {
        &mut self.globals
    }

    /// Number of resets performed so far.
    pub fn resets(&self) -> u64 {
        self.resets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::globals::{FilterGraph, OutputFile, VideoSync};

    #[test]
    fn test_reset_restores_every_touched_cell() {
        let mut coordinator = ResetCoordinator::new();
        {
            let g = coordinator.globals_mut();
            g.output_files.push(OutputFile {
                url: "out.mp4".into(),
                ..Default::default()
            });
            g.filtergraphs.push(FilterGraph {
                index: 0,
                description: "scale=640:-2".into(),
                simple: true,
            });
            g.sdp_filename = Some("session.sdp".into());
            g.video_sync_method = VideoSync::Cfr;
            g.stats_period = 1;
            g.hide_banner = true;
            g.stdin_interaction = false;
            g.nb_output_dumped = 3;
            g.main_return_code = 1;
            g.codec_opts.insert("preset".into(), "fast".into());
        }
        assert!(!coordinator.globals().is_baseline());

        coordinator.reset();
        assert!(coordinator.globals().is_baseline());
        assert_eq!(coordinator.resets(), 1);
    }

    #[test]
    fn test_reset_is_unconditional() {
        let mut coordinator = ResetCoordinator::new();
        coordinator.reset();
        coordinator.reset();
        assert!(coordinator.globals().is_baseline());
        assert_eq!(coordinator.resets(), 2);
    }
}
