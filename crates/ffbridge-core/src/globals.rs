//! Mutable configuration cells read by the embedded tool during a run.
//!
//! The tool was written to run once per process and keeps its option state
//! in process-wide variables. Here that state lives in [`ToolGlobals`], an
//! explicit context handed to the tool by reference and put back to
//! [`ToolGlobals::baseline`] before every invocation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key/value option dictionary (codec, format, scaler and resampler options).
pub type OptionDict = BTreeMap<String, String>;

/// Kind of elementary stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Video,
    Audio,
    Subtitle,
    Data,
    Attachment,
    #[default]
    Unknown,
}

/// Video frame-rate synchronisation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoSync {
    /// Pick a method from the output muxer's capabilities.
    #[default]
    Auto,
    Passthrough,
    Cfr,
    Vfr,
    VsCfr,
    Drop,
}

/// A stream demuxed from one of the input files.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InputStream {
    /// Index into [`ToolGlobals::input_files`].
    pub file_index: usize,
    /// Stream index within its file.
    pub index: usize,
    pub media_type: MediaType,
    /// Decoder name, if one was forced on the command line.
    pub codec: Option<String>,
    /// Whether the stream is ignored by every output.
    pub discard: bool,
}

/// An input opened with `-i`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InputFile {
    pub url: String,
    /// Forced demuxer (`-f` before `-i`).
    pub format: Option<String>,
    pub options: OptionDict,
}

/// An output file with its muxer settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OutputFile {
    pub url: String,
    /// Forced muxer (`-f` before the output url).
    pub format: Option<String>,
    pub overwrite: bool,
    pub options: OptionDict,
}

/// A filter graph declared by `-vf`, `-af` or `-filter_complex`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterGraph {
    pub index: usize,
    pub description: String,
    /// Simple graphs have one input and one output bound to a single stream.
    pub simple: bool,
}

/// Every mutable configuration cell the embedded tool consults during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolGlobals {
    pub input_streams: Vec<InputStream>,
    pub input_files: Vec<InputFile>,
    pub output_files: Vec<OutputFile>,
    pub filtergraphs: Vec<FilterGraph>,

    pub vstats_filename: Option<String>,
    pub sdp_filename: Option<String>,
    /// Target of `-progress`.
    pub progress_url: Option<String>,
    pub filter_hw_device: Option<String>,
    pub filter_nbthreads: Option<String>,

    pub audio_drift_threshold: f32,
    pub dts_delta_threshold: f32,
    pub dts_error_threshold: f32,
    pub video_sync_method: VideoSync,
    pub frame_drop_threshold: f32,

    pub do_benchmark: bool,
    pub do_benchmark_all: bool,
    pub do_hex_dump: bool,
    pub do_pkt_dump: bool,
    pub copy_ts: bool,
    pub start_at_zero: bool,
    pub copy_tb: i32,
    pub debug_ts: bool,
    pub exit_on_error: bool,
    pub abort_on_flags: i32,
    pub print_stats: i32,
    pub qp_hist: bool,
    pub stdin_interaction: bool,
    pub max_error_rate: f32,
    pub filter_complex_nbthreads: i32,
    pub vstats_version: i32,
    pub auto_conversion_filters: bool,
    /// Interval between progress reports, in microseconds.
    pub stats_period: i64,
    pub nb_output_dumped: u32,
    pub main_return_code: i32,
    pub ignore_unknown_streams: bool,
    pub copy_unknown_streams: bool,
    pub do_psnr: bool,
    pub hide_banner: bool,
    pub want_sdp: bool,

    pub sws_dict: OptionDict,
    pub swr_opts: OptionDict,
    pub format_opts: OptionDict,
    pub codec_opts: OptionDict,
}

impl ToolGlobals {
    /// The value every cell holds when an invocation starts.
    ///
    /// Written as a single struct literal: adding a cell without a baseline
    /// does not compile.
    pub fn baseline() -> Self {
        Self {
            input_streams: Vec::new(),
            input_files: Vec::new(),
            output_files: Vec::new(),
            filtergraphs: Vec::new(),

            vstats_filename: None,
            sdp_filename: None,
            progress_url: None,
            filter_hw_device: None,
            filter_nbthreads: None,

            audio_drift_threshold: 0.1,
            dts_delta_threshold: 10.0,
            dts_error_threshold: 3600.0 * 30.0,
            video_sync_method: VideoSync::Auto,
            frame_drop_threshold: 0.0,

            do_benchmark: false,
            do_benchmark_all: false,
            do_hex_dump: false,
            do_pkt_dump: false,
            copy_ts: false,
            start_at_zero: false,
            copy_tb: -1,
            debug_ts: false,
            exit_on_error: false,
            abort_on_flags: 0,
            print_stats: -1,
            qp_hist: false,
            stdin_interaction: true,
            max_error_rate: 2.0 / 3.0,
            filter_complex_nbthreads: 0,
            vstats_version: 2,
            auto_conversion_filters: true,
            stats_period: 500_000,
            nb_output_dumped: 0,
            main_return_code: 0,
            ignore_unknown_streams: false,
            copy_unknown_streams: false,
            do_psnr: false,
            hide_banner: false,
            want_sdp: true,

            sws_dict: OptionDict::new(),
            swr_opts: OptionDict::new(),
            format_opts: OptionDict::new(),
            codec_opts: OptionDict::new(),
        }
    }

    /// Whether every cell currently holds its baseline value.
    pub fn is_baseline(&self) -> bool {
        *self == Self::baseline()
    }

    /// Input streams belonging to the given input file.
    pub fn streams_of(&self, file_index: usize) -> impl Iterator<Item = &InputStream> {
        self.input_streams
            .iter()
            .filter(move |s| s.file_index == file_index)
    }
}

impl Default for ToolGlobals {
    fn default() -> Self {
        Self::baseline()
    }
}
