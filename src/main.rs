use clap::Parser;

mod cli;
mod config;
mod state;
mod store;
mod tui;

use cli::Cli;
use tui::{Painter, THEME};

#[tokio::main]
async fn main() {
    // Parsed first so --verbose can pick the log level.
    let cli = Cli::parse();

    // Logs go to stderr; RUST_LOG overrides the level.
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let painter = Painter::new(!cli.no_color && std::env::var_os("NO_COLOR").is_none());
    if let Err(err) = cli.execute().await {
        eprintln!("{} {:#}", painter.fg("Error:", THEME.error), err);
        std::process::exit(1);
    }
}
