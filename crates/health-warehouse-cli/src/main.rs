//! Health warehouse CLI entry point
//!
//! Loads `.env`, sets up logging, then delegates to the command module.
//! Errors go to stderr with a non-zero exit code.

mod args;
mod commands;

use args::Cli;

fn main() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    if let Err(e) = commands::run(Cli::parse_args()) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
