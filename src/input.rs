//! Common routines for handling reference data.
use crate::graph::SupplyChain;
use crate::model::project::ReactorCatalogue;
use crate::model::reactor::ReactorClassMap;
use anyhow::{Context, Result};
use include_dir::{Dir, include_dir};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

pub mod reactor;
use reactor::{read_reactor_catalogue, read_reactor_classes};
pub mod supply_chain;
use supply_chain::read_supply_chain;

/// The reference data bundled with the program
const REFERENCE_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/data");

/// Format an error message to include the file path. To be used with `anyhow::Context`.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Read and deserialise a TOML file
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Where reference data files are read from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReferenceSource {
    /// The files bundled with the program
    #[default]
    Embedded,
    /// A directory on disk containing files with the same names as the bundled ones
    Directory(PathBuf),
}

impl ReferenceSource {
    /// Create a source from an optional directory, falling back to the bundled files
    pub fn from_dir(dir: Option<&Path>) -> Self {
        dir.map_or(Self::Embedded, |dir| Self::Directory(dir.to_path_buf()))
    }

    /// Read and deserialise the named TOML file from this source
    pub fn read<T: DeserializeOwned>(&self, file_name: &str) -> Result<T> {
        match self {
            Self::Embedded => {
                let contents = REFERENCE_DIR
                    .get_file(file_name)
                    .and_then(|file| file.contents_utf8())
                    .with_context(|| format!("Bundled reference file {file_name} not found"))?;
                toml::from_str(contents).with_context(|| input_err_msg(file_name))
            }
            Self::Directory(dir) => read_toml(&dir.join(file_name)),
        }
    }
}

/// Read-only reference tables consumed by the models
#[derive(Debug, Clone)]
pub struct ReferenceData {
    /// Capital costs for each reactor class
    pub reactor_classes: ReactorClassMap,
    /// Reactor designs for project estimates
    pub reactor_catalogue: ReactorCatalogue,
    /// The supply chain flow graph
    pub supply_chain: SupplyChain,
}

impl ReferenceData {
    /// Load all reference data from the given source
    pub fn load(source: &ReferenceSource) -> Result<Self> {
        Ok(Self {
            reactor_classes: read_reactor_classes(source)?,
            reactor_catalogue: read_reactor_catalogue(source)?,
            supply_chain: read_supply_chain(source)?,
        })
    }

    /// Load the reference data bundled with the program
    pub fn bundled() -> Result<Self> {
        Self::load(&ReferenceSource::Embedded)
    }
}
