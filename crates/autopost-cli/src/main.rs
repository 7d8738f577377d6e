use autopost_cli::{Cli, dispatch, exit_code};
use autopost_core::{LoggingDestination, init_logging};
use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = init_logging(LoggingDestination::FileAndStderr) {
        eprintln!("Warning: logging disabled: {err}");
    }

    if let Err(err) = dispatch(cli).await {
        eprintln!("Error: {err:#}");
        std::process::exit(exit_code(&err));
    }
}
