//! Waypoint - Entry Point

use clap::Parser;
use waypoint::{Cli, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    run(Cli::parse()).await
}
