use clap::Parser;
use tracing::error;

use stagecast_lib::cli::Args;

fn main() {
    let args = Args::parse();
    stagecast_lib::init_logging();

    if let Err(e) = stagecast_lib::run(args) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
