// Agentic Code Studio - Main entry point

use anyhow::Result;
use clap::Parser;

use agentic_studio::cli::{self, Cli};
use agentic_studio::config::load_config;
use agentic_studio::logging;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    logging::init(args.verbose);

    let config = load_config(args.config.as_deref())?;

    let code = cli::run(args.command, config).await?;
    std::process::exit(code);
}
