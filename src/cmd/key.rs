//! API key management commands — `pagelens key`.

use anyhow::Result;
use pagelens::keystore::Keystore;

use super::super::KeyCommands;

pub fn cmd_key(command: &KeyCommands) -> Result<()> {
    let keystore = Keystore::open_default()?;

    match command {
        KeyCommands::Set { key } => {
            keystore.store(key)?;
            println!("API key saved to {}", keystore.path().display());
        }
        KeyCommands::Clear => {
            keystore.clear()?;
            println!("API key cleared.");
        }
        KeyCommands::Status => match keystore.load()? {
            Some(_) => println!("API key present ({})", keystore.path().display()),
            None => {
                println!("No API key saved.");
                println!();
                println!("Save one with:");
                println!("  pagelens key set <KEY>");
            }
        },
    }

    Ok(())
}
