//! personlink CLI — walks from a biography page to the people it links to.
//!
//! Each run records the people it finds, and the sentences connecting them,
//! in a local database.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
