// Copyright 2026 ecourts-causelist contributors
// SPDX-License-Identifier: MIT

//! ecourts-causelist — entry point.

mod cli;

use clap::Parser;

use cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = cli::run(cli).await {
        tracing::debug!("run failed: {e:?}");
        println!("  Error: {e:#}");
        std::process::exit(1);
    }
}
