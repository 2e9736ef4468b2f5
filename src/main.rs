mod backlog;
mod campaign;
mod cli;
mod config;
mod dispatch;
mod escalation;
mod model;
mod storage;
mod transcript;

use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use config::Config;
use storage::Storage;

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose {
            "tierfix=debug"
        } else {
            "tierfix=info"
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };
    let storage = Storage::new(config.store_paths());

    if let Err(e) = cli::run(cli.command, &config, &storage) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
