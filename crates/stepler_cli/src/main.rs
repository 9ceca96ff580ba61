//! `stepler` terminal host.
//!
//! # Responsibility
//! - Expose timeline operations as subcommands over the SQLite store.
//! - Drive the rollover, reminder and midnight timers with `stepler run`.

mod commands;
mod handlers;
mod notify;
mod output;

use clap::Parser;
use commands::Cli;

fn main() {
    let cli = Cli::parse();
    if let Err(e) = handlers::dispatch(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
