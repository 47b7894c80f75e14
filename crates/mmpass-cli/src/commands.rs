//! Command implementations over the session boundary.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use mmpass_core::generate::{self, PasswordSpec};
use mmpass_core::{import_records, EntryDraft, EntryFilter, EntryPatch, ImportRecord, Session};

use crate::clipboard;
use crate::Command;

/// How long a copied password stays on the clipboard.
const CLIPBOARD_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Read a config value.
    Get {
        key: String,
        /// Value to print when the key is not set.
        #[arg(long, default_value = "")]
        default: String,
    },
    /// Write a config value.
    Set { key: String, value: String },
}

pub fn run(vault_path: PathBuf, command: Command) -> Result<()> {
    match command {
        Command::Init => init(vault_path),
        Command::Gen {
            length,
            no_symbols,
            no_digits,
        } => {
            let spec = PasswordSpec {
                length,
                symbols: !no_symbols,
                digits: !no_digits,
                ..PasswordSpec::default()
            };
            let password = generate::generate_password(&spec);
            let strength = generate::password_strength(&password);
            println!("{password}");
            eprintln!("strength: {} ({}/4)", strength.label, strength.score);
            Ok(())
        }
        command => {
            let mut session = unlock(vault_path)?;
            dispatch(&mut session, command)
        }
    }
}

fn init(vault_path: PathBuf) -> Result<()> {
    let mut session = Session::new(vault_path);
    if session.is_initialized() {
        bail!("a vault already exists at {}", session.path().display());
    }
    if let Some(parent) = session.path().parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let passphrase = rpassword::prompt_password("New master passphrase: ")?;
    let confirm = rpassword::prompt_password("Confirm master passphrase: ")?;
    if passphrase != confirm {
        bail!("passphrases do not match");
    }
    let strength = generate::password_strength(&passphrase);
    if strength.score < 2 {
        eprintln!("warning: passphrase strength is {} ({}/4)", strength.label, strength.score);
    }

    session.create_vault(&passphrase)?;
    println!("Created vault at {}", session.path().display());
    Ok(())
}

fn unlock(vault_path: PathBuf) -> Result<Session> {
    let mut session = Session::new(vault_path);
    if !session.is_initialized() {
        bail!(
            "no vault found at {}; run `mmpass init` first",
            session.path().display()
        );
    }
    let passphrase = rpassword::prompt_password("Master passphrase: ")?;
    if !session.unlock(&passphrase)? {
        bail!("invalid master passphrase");
    }
    Ok(session)
}

fn dispatch(session: &mut Session, command: Command) -> Result<()> {
    match command {
        Command::Add {
            username,
            password,
            website,
            notes,
            favorite,
        } => {
            let password = match password {
                Some(password) => password,
                None => rpassword::prompt_password("Entry password: ")?,
            };
            let entry = session.store_mut()?.add_entry(EntryDraft {
                username,
                password,
                website,
                notes,
                is_favorite: favorite,
            })?;
            println!("Added {} ({})", entry.title, entry.id);
            Ok(())
        }
        Command::List { filter, query } => {
            let filter: EntryFilter = filter.parse().map_err(anyhow::Error::msg)?;
            let entries = session.store()?.list_entries(filter, query.as_deref());
            if entries.is_empty() {
                println!("No entries.");
                return Ok(());
            }
            for entry in entries {
                let star = if entry.is_favorite { "*" } else { " " };
                println!(
                    "{} {} {:<24} {:<20} {}",
                    entry.id, star, entry.title, entry.username, entry.website
                );
            }
            Ok(())
        }
        Command::Show { id, reveal, copy } => {
            let Some(entry) = session.store()?.get_entry(&id) else {
                bail!("no entry with id {id}");
            };
            println!("title:    {}", entry.title);
            println!("username: {}", entry.username);
            if reveal {
                println!("password: {}", entry.password);
            } else {
                println!("password: ********");
            }
            println!("website:  {}", entry.website);
            println!("notes:    {}", entry.notes);
            println!("favorite: {}", entry.is_favorite);
            if let Some(created) = entry.created {
                println!("created:  {}", created.format("%Y-%m-%d %H:%M"));
            }
            if copy {
                let pending = clipboard::copy_with_clear(&entry.password, CLIPBOARD_TIMEOUT)?;
                println!(
                    "Password copied; clipboard clears in {}s...",
                    CLIPBOARD_TIMEOUT.as_secs()
                );
                // Keep the process alive so the clear can run.
                pending.wait();
            }
            Ok(())
        }
        Command::Edit {
            id,
            username,
            password,
            website,
            notes,
            favorite,
        } => {
            if session.store()?.get_entry(&id).is_none() {
                bail!("no entry with id {id}");
            }
            session.store_mut()?.update_entry(
                &id,
                EntryPatch {
                    username,
                    password,
                    website,
                    notes,
                    is_favorite: favorite,
                },
            )?;
            println!("Updated {id}");
            Ok(())
        }
        Command::Rm { id, hard } => {
            session.store_mut()?.delete_entry(&id, !hard)?;
            if hard {
                println!("Permanently deleted {id}");
            } else {
                println!("Moved {id} to the Recycle Bin");
            }
            Ok(())
        }
        Command::Restore { id } => {
            session.store_mut()?.restore_entry(&id)?;
            println!("Restored {id}");
            Ok(())
        }
        Command::Config { action } => match action {
            ConfigAction::Get { key, default } => {
                println!("{}", session.store()?.get_config_or(&key, &default));
                Ok(())
            }
            ConfigAction::Set { key, value } => {
                session.store_mut()?.set_config(&key, &value)?;
                Ok(())
            }
        },
        Command::Import { file } => {
            let contents = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let rows: Vec<ImportRecord> = serde_json::from_str(&contents)
                .with_context(|| format!("failed to parse {}", file.display()))?;
            let total = rows.len();
            let imported = import_records(session.store_mut()?, rows);
            println!("Imported {imported} of {total} rows");
            Ok(())
        }
        Command::Init | Command::Gen { .. } => unreachable!("handled before unlock"),
    }
}
