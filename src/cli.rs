use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ffbridge")]
#[command(author, version, about = "Run a process-oriented media tool repeatedly in-process")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one command through the bridge and exit with its status
    Run {
        /// Keys to queue as control signals before the command starts
        #[arg(long)]
        keys: Option<String>,

        /// Bind a logging output surface for the run
        #[arg(long)]
        surface: bool,

        /// Print the tool's configuration registry as JSON after the run
        #[arg(long)]
        dump_state: bool,

        /// Command to run, e.g. `ffmpeg -i in.mkv out.mp4`
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Read commands from stdin and run them one after another
    Repl,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses --config or defaults if not specified)
        path: Option<PathBuf>,
    },

    /// Print the registry baseline as JSON
    Baseline,

    /// Display version information
    Version,
}
