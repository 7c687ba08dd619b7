use clap::Parser;
use std::path::PathBuf;

/// Headless stagecast display: JSON-line commands on stdin, events on stdout.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Engine configuration (JSON). Defaults apply when omitted.
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Do not acknowledge loads and widget creation automatically; wait for
    /// renderer signals on stdin instead.
    #[arg(long = "manual-signals")]
    pub manual_signals: bool,
}
