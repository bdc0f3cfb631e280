//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Bindery page assembler CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root; template, fragment and data targets resolve against it
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Config file name (default: bindery.toml)
    #[arg(short = 'C', long, default_value = "bindery.toml")]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Shared assembly arguments for all commands
#[derive(clap::Args, Debug, Clone)]
pub struct AssembleArgs {
    /// Host page to assemble (relative to root)
    pub page: PathBuf,

    /// Assemble from the template embedded in the page instead of
    /// retrieving template sources
    #[arg(short, long)]
    pub published: bool,

    /// Override the data document path template
    ///
    /// The page's file name is appended to it, so `--data-path /drafts`
    /// with page `posts/april.html` retrieves `/drafts/april.html`.
    #[arg(long = "data-path")]
    pub data_path: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Assemble a page and write the result to the output directory
    Assemble {
        #[command(flatten)]
        assemble_args: AssembleArgs,

        /// Write the assembled page here instead of the output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print a page's extracted widget records as JSON
    Inspect {
        #[command(flatten)]
        assemble_args: AssembleArgs,
    },

    /// Save the resolved template (fragments inlined, widgets unfilled),
    /// named after the page's file name
    Export {
        #[command(flatten)]
        assemble_args: AssembleArgs,

        /// Write the exported template here instead of the output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    pub fn assemble_args(&self) -> &AssembleArgs {
        match &self.command {
            Commands::Assemble { assemble_args, .. }
            | Commands::Inspect { assemble_args }
            | Commands::Export { assemble_args, .. } => assemble_args,
        }
    }

    pub const fn is_export(&self) -> bool {
        matches!(self.command, Commands::Export { .. })
    }
}
