//! SiteInventory CLI: content inventory for a website.
//!
//! Resolves a domain's sitemap (or falls back to site search), classifies
//! the content pages and deep-reads the most valuable ones, then prints the
//! inventory as JSON.

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
