//! The `settings` subcommands, for inspecting and editing the user's `settings.toml`
use crate::settings::{Settings, get_settings_file_path};
use anyhow::{Context, Result};
use clap::Subcommand;
use std::fs;
use std::path::Path;

/// Subcommands for settings
#[derive(Subcommand)]
pub enum SettingsSubcommands {
    /// Open the settings file in a text editor, creating it first if needed
    Edit,
    /// Print where the settings file is read from
    Path,
    /// Check that the settings file is valid and print the cadences it gives
    Check,
    /// Print the contents of a settings file with every option at its default
    DumpDefault,
}

impl SettingsSubcommands {
    /// Run the subcommand
    pub fn execute(self) -> Result<()> {
        let file_path = get_settings_file_path();
        match self {
            Self::Edit => {
                write_default_if_missing(&file_path)?;
                println!("Opening settings file for editing: {}", file_path.display());
                edit::edit_file(&file_path)
                    .with_context(|| format!("Could not edit {}", file_path.display()))?;
            }
            Self::Path => println!("{}", file_path.display()),
            Self::Check => {
                let settings = Settings::load_from_path(&file_path)?;
                let cadence = settings.cadence();
                println!(
                    "Settings OK. Refreshing every {}s while the market is open and every {}s \
                     while it is closed.",
                    cadence.open_secs, cadence.closed_secs
                );
            }
            Self::DumpDefault => print!("{}", Settings::default_file_contents()?),
        }

        Ok(())
    }
}

/// Write a settings file full of defaults to `file_path`, unless one is already there
fn write_default_if_missing(file_path: &Path) -> Result<()> {
    if file_path.is_file() {
        return Ok(());
    }

    if let Some(config_dir) = file_path.parent() {
        fs::create_dir_all(config_dir)
            .with_context(|| format!("Failed to create directory: {}", config_dir.display()))?;
    }
    fs::write(file_path, Settings::default_file_contents()?)
        .with_context(|| format!("Failed to write settings file: {}", file_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_default_if_missing() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("config").join("settings.toml");
        write_default_if_missing(&file_path).unwrap();
        assert_eq!(
            Settings::load_from_path(&file_path).unwrap(),
            Settings::default()
        );

        // Edits made by the user survive
        fs::write(&file_path, "seed = 3\n").unwrap();
        write_default_if_missing(&file_path).unwrap();
        assert_eq!(Settings::load_from_path(&file_path).unwrap().seed, Some(3));
    }
}
