//! Clipdeck CLI
//!
//! Command-line interface for the clipdeck editor state engine.

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{debug, info};

use clipdeck::cli::commands::{self, Workspace};
use clipdeck::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    debug!("Clipdeck v{}", env!("CARGO_PKG_VERSION"));

    let Some(command) = cli.command else {
        println!("Clipdeck v{}", env!("CARGO_PKG_VERSION"));
        println!("Use --help for available commands");
        return Ok(());
    };

    let workspace = Workspace::open(&cli.store, cli.config.as_deref())
        .with_context(|| format!("opening store at {}", cli.store.display()))?;
    info!("Using store {}", cli.store.display());

    match command {
        Commands::New { name } => commands::new_project(&workspace, name.as_deref()).await?,
        Commands::Show { json } => commands::show(&workspace, json).await?,
        Commands::Apply { actions } => commands::apply(&workspace, &actions)
            .await
            .with_context(|| format!("applying {}", actions.display()))?,
        Commands::Import { file } => commands::import(&workspace, &file)
            .await
            .with_context(|| format!("importing {}", file.display()))?,
        Commands::Export { file } => commands::export(&workspace, &file).await?,
        Commands::Range { start, end } => commands::range(&workspace, start, end).await?,
    }

    Ok(())
}
