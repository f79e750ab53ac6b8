mod cli;

use ffbridge::{build_bridge, config, host::LogSurface, runner::CommandRunner};
use ffbridge_core::{ToolGlobals, MARSHAL_FAILURE_CODE};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = config::load_config_or_default(cli.config.as_deref())?;

    // Initialize logging
    // RUST_LOG wins, then the config file, then defaults based on the verbose flag
    let env_filter = std::env::var("RUST_LOG")
        .ok()
        .or_else(|| config.logging.filter.clone())
        .unwrap_or_else(|| {
            if cli.verbose {
                "ffbridge=trace,ffbridge_core=trace,ffbridge_mock=debug".to_string()
            } else {
                "ffbridge=info,ffbridge_core=info,ffbridge_mock=info".to_string()
            }
        });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            keys,
            surface,
            dump_state,
            command,
        } => run_once(&config, &command.join(" "), keys.as_deref(), surface, dump_state),
        Commands::Repl => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(repl(&config))?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate { path } => {
            let path = path.or(cli.config);
            validate_config(path.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Baseline => {
            let json = serde_json::to_string_pretty(&ToolGlobals::baseline())?;
            println!("{}", json);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Version => {
            println!("ffbridge {}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Status as a shell sees it: the low eight bits of the tool's code.
fn process_status(code: i32) -> ExitCode {
    ExitCode::from(code.rem_euclid(256) as u8)
}

fn run_once(
    config: &config::Config,
    command: &str,
    keys: Option<&str>,
    surface: bool,
    dump_state: bool,
) -> Result<ExitCode> {
    let bridge = build_bridge(config);

    for key in keys.unwrap_or_default().chars() {
        bridge.send_control_signal(key as i32);
    }
    if surface {
        bridge.set_output_surface(Some(Arc::new(LogSurface::new("cli"))));
    }

    let report = bridge.run(command);
    tracing::info!(
        elapsed_ms = report.elapsed.as_millis() as u64,
        "{}: {}",
        report.command,
        report.completion
    );
    if report.exit_code() == MARSHAL_FAILURE_CODE {
        eprintln!("ffbridge: {}", report.completion);
    }

    if dump_state {
        let json = bridge
            .inspect_globals(|g| serde_json::to_string_pretty(g))
            .context("Failed to serialize tool state")?;
        println!("{}", json);
    }

    bridge.on_host_unload();
    Ok(process_status(report.exit_code()))
}

async fn repl(config: &config::Config) -> Result<()> {
    let runner = CommandRunner::new(Arc::new(build_bridge(config)));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (directive, rest) = line.split_once(' ').unwrap_or((line, ""));
        match (directive, rest.trim()) {
            (":quit", _) => break,
            // Keys are meant for the command that is running now.
            (":key", keys) => {
                for key in keys.chars() {
                    runner.bridge().send_control_signal(key as i32);
                }
            }
            (":surface", "on") => runner.then(|bridge| {
                bridge.set_output_surface(Some(Arc::new(LogSurface::new("repl"))));
            }),
            (":surface", "off") => runner.then(|bridge| bridge.set_output_surface(None)),
            (cmd, _) if cmd.starts_with(':') => {
                eprintln!("unknown directive: {}", line);
            }
            _ => runner.submit_with(line, |report| {
                println!("{} -> {}", report.command, report.completion);
            }),
        }
    }

    let bridge = runner
        .finish()
        .await
        .context("Command worker failed")?;
    bridge.on_host_unload();
    tracing::debug!(invocations = bridge.invocations(), "repl finished");
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    let signals = &config.bridge.signals;
    println!(
        "  Signal queue: capacity {}, {:?}, {:?}",
        signals.capacity, signals.overflow, signals.order
    );
    println!("  Tool log level: {}", config.bridge.tool_log_level.as_str());
    println!(
        "  Mock: version {}, {} frames, {} ms/frame",
        config.mock.version, config.mock.frames, config.mock.frame_interval_ms
    );

    Ok(())
}
