// src/main.rs
use anyhow::Result;
use clap::Parser;

use audiomatch::cli::{self, Cli};

fn main() -> Result<()> {
    let args = Cli::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    cli::run(args)
}
