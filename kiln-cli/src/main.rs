//! kiln — declarative build pipeline runner.
//!
//! # Usage
//!
//! ```text
//! kiln [TASK]                      run TASK (default: "default")
//! kiln --list                      show the task table
//! kiln archive --dry-run           print the expanded step plan
//! kiln --base <dir> --config <file> cdnjs
//! ```

mod commands;

use anyhow::Result;
use clap::Parser;

use commands::run::RunArgs;

#[derive(Parser, Debug)]
#[command(
    name = "kiln",
    version,
    about = "Run declarative build pipelines",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    run: RunArgs,

    /// Log every file written or removed.
    #[arg(short, long, global = true)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    cli.run.run()
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
