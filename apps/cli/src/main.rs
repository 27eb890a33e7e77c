//! AgendaFetch CLI: gathers the files linked from an agenda document.
//!
//! Reads the Drive folders linked from a Google Docs agenda, picks the files
//! whose names match the configured keywords, and copies them into a single
//! freshly rebuilt output folder.

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
