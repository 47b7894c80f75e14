//! mmpass CLI - command-line frontend for the mmpass vault.

mod clipboard;
mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// A minimalist encrypted credential vault over KeePass databases.
#[derive(Parser, Debug)]
#[command(name = "mmpass", version)]
struct Args {
    /// Path to the vault file (defaults to the platform data directory).
    #[arg(short = 'f', long, global = true)]
    vault: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new vault.
    Init,
    /// Add a credential entry.
    Add {
        #[arg(short, long, default_value = "")]
        username: String,
        /// Password for the entry; prompted for when omitted.
        #[arg(short, long)]
        password: Option<String>,
        #[arg(short, long, default_value = "")]
        website: String,
        #[arg(short, long, default_value = "")]
        notes: String,
        /// Mark the entry as a favorite.
        #[arg(long)]
        favorite: bool,
    },
    /// List entries.
    List {
        /// One of: all, favorites, deleted.
        #[arg(short = 't', long, default_value = "all")]
        filter: String,
        /// Case-insensitive substring match on website or username.
        #[arg(short, long)]
        query: Option<String>,
    },
    /// Show a single entry.
    Show {
        id: String,
        /// Print the password instead of masking it.
        #[arg(long)]
        reveal: bool,
        /// Copy the password to the clipboard, cleared after 30 seconds.
        #[arg(short, long)]
        copy: bool,
    },
    /// Update fields of an entry.
    Edit {
        id: String,
        #[arg(short, long)]
        username: Option<String>,
        #[arg(short, long)]
        password: Option<String>,
        #[arg(short, long)]
        website: Option<String>,
        #[arg(short, long)]
        notes: Option<String>,
        /// Set or clear the favorite flag.
        #[arg(long)]
        favorite: Option<bool>,
    },
    /// Move an entry to the Recycle Bin, or purge it with --hard.
    Rm {
        id: String,
        /// Permanently delete instead of moving to the Recycle Bin.
        #[arg(long)]
        hard: bool,
    },
    /// Restore an entry from the Recycle Bin.
    Restore { id: String },
    /// Read or write a config value stored inside the vault.
    Config {
        #[command(subcommand)]
        action: commands::ConfigAction,
    },
    /// Import entries from a JSON array of records.
    Import { file: PathBuf },
    /// Generate a random password.
    Gen {
        #[arg(short, long, default_value_t = 16)]
        length: usize,
        #[arg(long)]
        no_symbols: bool,
        #[arg(long)]
        no_digits: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("mmpass=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let vault_path = match args.vault {
        Some(path) => path,
        None => default_vault_path()?,
    };
    tracing::debug!(path = %vault_path.display(), "using vault");

    commands::run(vault_path, args.command)
}

fn default_vault_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().context("could not determine the user data directory")?;
    Ok(data_dir.join("mmpass").join("vault.kdbx"))
}
