mod cli;
mod config;
mod core;
mod models;
mod sources;

#[cfg(feature = "gui")]
mod gui;

use clap::Parser;

fn main() {
    simple_logging::log_to_stderr(log::LevelFilter::Info);

    let cli = cli::Cli::parse();

    if let Err(e) = cli::run(cli) {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
