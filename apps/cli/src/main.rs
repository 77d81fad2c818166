//! Brochurizer CLI: turn a company website into a Markdown brochure.
//!
//! Picks the relevant pages with a language model, aggregates their text,
//! streams a brochure draft and optionally translates and exports it.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    // A missing .env is fine; the environment may already carry the settings.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
