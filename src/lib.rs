//! Common functionality for the fuel cycle simulation engine.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod animation;
pub mod cli;
pub mod clock;
pub mod finance;
pub mod graph;
pub mod id;
pub mod input;
pub mod log;
pub mod market;
pub mod model;
pub mod output;
pub mod perturb;
pub mod rng;
pub mod scheduler;
pub mod session;
pub mod settings;
pub mod timer;
pub mod units;

#[cfg(test)]
mod fixture;

/// The name of the folder, within the user's config directory, holding program configuration
const CONFIG_DIR_NAME: &str = "fuelcycle";

/// Get the path to the folder containing program configuration files.
///
/// Falls back to the current directory if the platform has no config directory.
pub fn get_fuelcycle_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        return PathBuf::new();
    };
    config_dir.push(CONFIG_DIR_NAME);

    config_dir
}
