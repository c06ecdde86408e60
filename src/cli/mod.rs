//! Command-line interface, parsed with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Iconarr - Media Library Folder Icons
/// Watches a media library and applies fetched posters as folder icons
#[derive(Parser)]
#[command(name = "iconarr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path, overriding the default search order
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch the library and process folders as they change
    #[command(alias = "w", alias = "daemon")]
    Watch,

    /// Process every folder in the library once, then exit
    #[command(alias = "s")]
    Scan {
        /// Re-fetch posters even when fresh ones exist
        #[arg(long)]
        force: bool,
    },

    /// Process a single folder
    #[command(alias = "p")]
    Process {
        /// Folder to process
        path: PathBuf,
        /// Re-fetch the poster even when a fresh one exists
        #[arg(long)]
        force: bool,
    },

    /// Create a default config file
    #[command(alias = "--init")]
    Init,
}
