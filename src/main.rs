//! Bindery - a directive-driven template assembler for blog pages.

mod build;
mod cli;
mod config;
mod data;
mod dom;
mod fetch;
mod logger;
mod template;

use anyhow::Result;
use build::{assemble_page, export_page, inspect_page};
use clap::Parser;
use cli::{Cli, Commands};
use config::BinderyConfig;
use std::path::Path;

fn main() -> Result<()> {
    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));
    let config: &'static BinderyConfig = Box::leak(Box::new(load_config(cli)?));

    match &cli.command {
        Commands::Assemble { assemble_args, output } => {
            assemble_page(config, assemble_args, output.as_deref())
        }
        Commands::Inspect { assemble_args } => inspect_page(config, assemble_args),
        Commands::Export { assemble_args, output } => {
            export_page(config, assemble_args, output.as_deref())
        }
    }
}

/// Load and validate configuration from CLI arguments.
///
/// A missing config file is not an error: published pages assemble fine on
/// pure defaults. Validation still rejects command/config combinations that
/// cannot work, such as an authoring build without a template source.
fn load_config(cli: &'static Cli) -> Result<BinderyConfig> {
    let root = cli.root.as_deref().unwrap_or(Path::new("./"));
    let config_path = root.join(&cli.config);

    let mut config = if config_path.exists() {
        BinderyConfig::from_path(&config_path)?
    } else {
        BinderyConfig::default()
    };
    config.update_with_cli(cli);
    config.validate()?;

    Ok(config)
}
