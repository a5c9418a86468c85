//! formcheck - cross-platform form acceptance tests
//!
//! Runs the same scenario contracts against a native mobile app and a web
//! app on a remote automation grid or a local backend.

use clap::Parser;
use formcheck::{cli, commands, common::logging};
use commands::Commands;

#[derive(Parser)]
#[command(name = "formcheck", about = "Cross-platform form acceptance tests")]
#[command(version, long_about = None)]
struct Cli {
    /// Log debug output from formcheck
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_cli(cli.verbose);

    match cli::dispatch(cli.command).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
