//! Option handling for the mock tool.
//!
//! Covers the handful of global and per-file options the bridge tests care
//! about. Values land in [`ToolGlobals`] the same way the real tool's
//! option table writes its process-wide variables.

use ffbridge_core::{
    FilterGraph, InputFile, InputStream, Invocation, LogLevel, MediaType, OptionDict, OutputFile,
    VideoSync,
};

/// What option parsing decided the run should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// `-version`.
    Version,
    /// `-h`, `-help`.
    Help,
    /// Transcode with the parsed settings.
    Transcode(RunSettings),
}

/// Settings that only exist in the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    /// Frames to produce before finishing on its own.
    pub frames: u64,
    pub width: u32,
    pub height: u32,
    /// `-exit <code>`: take the abrupt-exit path once the run starts.
    pub exit_code: Option<i32>,
    /// `-crash`: panic once the run starts.
    pub crash: bool,
}

/// Per-file options collected until the next `-i` or output url.
#[derive(Debug, Default)]
struct Pending {
    format: Option<String>,
    options: OptionDict,
}

/// Parse `options` into the invocation's registry.
///
/// Fatal parse errors are logged and take the abrupt-exit path with status
/// 1, as the real tool does.
pub fn parse(options: &[String], default_frames: u64, inv: &mut Invocation<'_>) -> Action {
    let mut settings = RunSettings {
        frames: default_frames,
        width: 320,
        height: 240,
        exit_code: None,
        crash: false,
    };
    let mut pending = Pending::default();
    let mut overwrite = false;

    let mut iter = options.iter();
    while let Some(opt) = iter.next() {
        let Some(name) = opt.strip_prefix('-').filter(|n| !n.is_empty()) else {
            add_output(opt, &mut pending, overwrite, inv);
            continue;
        };

        match name {
            "version" => return Action::Version,
            "h" | "help" | "-help" => return Action::Help,

            "hide_banner" => inv.globals_mut().hide_banner = true,
            "y" => overwrite = true,
            "n" => overwrite = false,
            "stdin" => inv.globals_mut().stdin_interaction = true,
            "nostdin" => inv.globals_mut().stdin_interaction = false,
            "benchmark" => inv.globals_mut().do_benchmark = true,
            "benchmark_all" => inv.globals_mut().do_benchmark_all = true,
            "copyts" => inv.globals_mut().copy_ts = true,
            "start_at_zero" => inv.globals_mut().start_at_zero = true,
            "debug_ts" => inv.globals_mut().debug_ts = true,
            "xerror" => inv.globals_mut().exit_on_error = true,
            "psnr" => inv.globals_mut().do_psnr = true,
            "dump" => inv.globals_mut().do_pkt_dump = true,
            "hex" => inv.globals_mut().do_hex_dump = true,
            "qphist" => inv.globals_mut().qp_hist = true,
            "ignore_unknown" => inv.globals_mut().ignore_unknown_streams = true,
            "copy_unknown" => inv.globals_mut().copy_unknown_streams = true,
            "stats" => inv.globals_mut().print_stats = 1,
            "nostats" => inv.globals_mut().print_stats = 0,
            "crash" => settings.crash = true,

            "stats_period" => {
                let v = next_value(&mut iter, name, inv);
                let seconds: f64 = parse_number(name, &v, inv);
                if seconds <= 0.0 {
                    inv.log(
                        LogLevel::Error,
                        &format!("Invalid stats_period '{v}': must be positive"),
                    );
                    inv.exit(1);
                }
                inv.globals_mut().stats_period = (seconds * 1_000_000.0) as i64;
            }
            "vstats_file" => {
                let v = next_value(&mut iter, name, inv);
                inv.globals_mut().vstats_filename = Some(v);
            }
            "sdp_file" => {
                let v = next_value(&mut iter, name, inv);
                inv.globals_mut().sdp_filename = Some(v);
            }
            "progress" => {
                let v = next_value(&mut iter, name, inv);
                inv.globals_mut().progress_url = Some(v);
            }
            "filter_hw_device" => {
                let v = next_value(&mut iter, name, inv);
                inv.globals_mut().filter_hw_device = Some(v);
            }
            "filter_threads" => {
                let v = next_value(&mut iter, name, inv);
                inv.globals_mut().filter_nbthreads = Some(v);
            }
            "filter_complex_threads" => {
                let v = next_value(&mut iter, name, inv);
                inv.globals_mut().filter_complex_nbthreads = parse_number(name, &v, inv);
            }
            "copytb" => {
                let v = next_value(&mut iter, name, inv);
                inv.globals_mut().copy_tb = parse_number(name, &v, inv);
            }
            "max_error_rate" => {
                let v = next_value(&mut iter, name, inv);
                inv.globals_mut().max_error_rate = parse_number(name, &v, inv);
            }
            "vsync" | "fps_mode" => {
                let v = next_value(&mut iter, name, inv);
                let method = parse_vsync(&v).unwrap_or_else(|| {
                    inv.log(LogLevel::Error, &format!("Invalid value {v} for {name}"));
                    inv.exit(1)
                });
                inv.globals_mut().video_sync_method = method;
            }
            "frames" | "vframes" => {
                let v = next_value(&mut iter, name, inv);
                settings.frames = parse_number(name, &v, inv);
            }
            "s" => {
                let v = next_value(&mut iter, name, inv);
                let (w, h) = parse_size(&v).unwrap_or_else(|| {
                    inv.log(LogLevel::Error, &format!("Invalid frame size: {v}."));
                    inv.exit(1)
                });
                settings.width = w;
                settings.height = h;
            }
            "exit" => {
                let v = next_value(&mut iter, name, inv);
                settings.exit_code = Some(parse_number(name, &v, inv));
            }

            "f" => pending.format = Some(next_value(&mut iter, name, inv)),
            "vf" | "af" | "filter" => {
                let description = next_value(&mut iter, name, inv);
                let g = inv.globals_mut();
                let index = g.filtergraphs.len();
                g.filtergraphs.push(FilterGraph {
                    index,
                    description,
                    simple: true,
                });
            }
            "filter_complex" | "lavfi" => {
                let description = next_value(&mut iter, name, inv);
                let g = inv.globals_mut();
                let index = g.filtergraphs.len();
                g.filtergraphs.push(FilterGraph {
                    index,
                    description,
                    simple: false,
                });
            }
            "c" | "codec" | "vcodec" | "acodec" | "scodec" => {
                let codec = next_value(&mut iter, name, inv);
                inv.globals_mut()
                    .codec_opts
                    .insert(name.to_string(), codec.clone());
                pending.options.insert(name.to_string(), codec);
            }
            n if n.starts_with("c:") || n.starts_with("codec:") => {
                let codec = next_value(&mut iter, n, inv);
                inv.globals_mut()
                    .codec_opts
                    .insert(n.to_string(), codec.clone());
                pending.options.insert(n.to_string(), codec);
            }
            "sws_flags" => {
                let v = next_value(&mut iter, name, inv);
                inv.globals_mut().sws_dict.insert("flags".to_string(), v);
            }
            "i" => {
                let url = next_value(&mut iter, name, inv);
                add_input(url, &mut pending, inv);
            }
            other => {
                inv.log(LogLevel::Error, &format!("Unrecognized option '{other}'."));
                inv.log(
                    LogLevel::Fatal,
                    "Error splitting the argument list: Option not found",
                );
                inv.exit(1);
            }
        }
    }

    let g = inv.globals();
    if g.input_files.is_empty() && g.output_files.is_empty() {
        inv.log(
            LogLevel::Warning,
            "Use -h to get full help or, even better, run 'man ffmpeg'",
        );
        inv.exit(1);
    }
    if g.output_files.is_empty() {
        inv.log(LogLevel::Fatal, "At least one output file must be specified");
        inv.exit(1);
    }

    Action::Transcode(settings)
}

fn next_value(
    iter: &mut std::slice::Iter<'_, String>,
    name: &str,
    inv: &Invocation<'_>,
) -> String {
    match iter.next() {
        Some(v) => v.clone(),
        None => {
            inv.log(
                LogLevel::Error,
                &format!("Missing argument for option '{name}'."),
            );
            inv.exit(1)
        }
    }
}

fn add_input(url: String, pending: &mut Pending, inv: &mut Invocation<'_>) {
    let Pending { format, options } = std::mem::take(pending);
    let g = inv.globals_mut();
    let file_index = g.input_files.len();
    g.input_files.push(InputFile {
        url,
        format,
        options,
    });
    for (index, media_type) in [MediaType::Video, MediaType::Audio].into_iter().enumerate() {
        g.input_streams.push(InputStream {
            file_index,
            index,
            media_type,
            codec: None,
            discard: false,
        });
    }
}

fn add_output(url: &str, pending: &mut Pending, overwrite: bool, inv: &mut Invocation<'_>) {
    let Pending { format, options } = std::mem::take(pending);
    inv.globals_mut().output_files.push(OutputFile {
        url: url.to_string(),
        format,
        overwrite,
        options,
    });
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str, inv: &Invocation<'_>) -> T {
    match value.parse() {
        Ok(v) => v,
        Err(_) => {
            inv.log(
                LogLevel::Error,
                &format!("Expected number for {name} but found: {value}"),
            );
            inv.exit(1)
        }
    }
}

fn parse_vsync(value: &str) -> Option<VideoSync> {
    Some(match value {
        "auto" | "-1" => VideoSync::Auto,
        "passthrough" | "0" => VideoSync::Passthrough,
        "cfr" | "1" => VideoSync::Cfr,
        "vfr" | "2" => VideoSync::Vfr,
        "vscfr" => VideoSync::VsCfr,
        "drop" => VideoSync::Drop,
        _ => return None,
    })
}

/// Largest `(w + 128) * (h + 128)` a frame may have, the same bound the real
/// tool's image size check applies.
const MAX_PADDED_PIXELS: u64 = i32::MAX as u64 / 8;

fn parse_size(value: &str) -> Option<(u32, u32)> {
    let (w, h) = value.split_once('x')?;
    let w: u32 = w.parse().ok()?;
    let h: u32 = h.parse().ok()?;
    if w == 0 || h == 0 {
        return None;
    }
    let padded = (u64::from(w) + 128).checked_mul(u64::from(h) + 128)?;
    (padded < MAX_PADDED_PIXELS).then_some((w, h))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("320x240"), Some((320, 240)));
        assert_eq!(parse_size("7680x4320"), Some((7680, 4320)));
        assert_eq!(parse_size("0x240"), None);
        assert_eq!(parse_size("320"), None);
        assert_eq!(parse_size("wide x tall"), None);
    }

    #[test]
    fn test_parse_size_rejects_oversized_frames() {
        assert_eq!(parse_size("1000000x1000000"), None);
        assert_eq!(parse_size("4294967295x4294967295"), None);
        assert_eq!(parse_size("16384x16384"), None);
        assert_eq!(parse_size("70000x70000"), None);
    }
}
