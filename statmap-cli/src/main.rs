//! ## statmap-cli
//! **Command line front end**
//!
//! Drives the counting programs against synthetic traffic (`simulate`),
//! keeps them running while the stats reader polls the tables (`watch`),
//! lists the pinned table definitions (`maps`) and prints the effective
//! configuration (`config`).

use anyhow::Result;
use clap::Parser;

mod commands;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    commands::run_command(cli).await
}
