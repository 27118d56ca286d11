//! Writing information about a run alongside its results.
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use platform_info::{PlatformInfo, PlatformInfoAPI, UNameAPI};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Written next to the CSV files in the output directory
const METADATA_FILE_NAME: &str = "metadata.toml";

/// Build-time constants generated by `build.rs`
mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// The short git hash of the build, marked if the tree was dirty
fn git_hash() -> String {
    match (built_info::GIT_COMMIT_HASH_SHORT, built_info::GIT_DIRTY) {
        (None, _) => "unknown".into(),
        (Some(hash), Some(true)) => format!("{hash}-dirty"),
        (Some(hash), _) => hash.into(),
    }
}

/// Information about a single evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMetadata {
    /// Which model was evaluated
    pub model: String,
    /// Seed for the random source, if one was given
    pub seed: Option<u64>,
    /// When the result was produced
    pub datetime: String,
}

impl RunMetadata {
    /// Describe a run of `model` which produced its result at `timestamp`
    pub fn new(model: &str, seed: Option<u64>, timestamp: NaiveDateTime) -> Self {
        Self {
            model: model.into(),
            seed,
            datetime: timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// The full contents of the metadata file
#[derive(Serialize)]
struct MetadataFile<'a> {
    run: &'a RunMetadata,
    program: ProgramMetadata,
    platform: PlatformMetadata,
}

#[derive(Serialize)]
struct ProgramMetadata {
    name: &'static str,
    version: &'static str,
    /// The target triple of the build
    target: &'static str,
    is_debug: bool,
    rustc_version: &'static str,
    build_time_utc: &'static str,
    git_commit_hash: String,
}

impl ProgramMetadata {
    fn new() -> Self {
        Self {
            name: built_info::PKG_NAME,
            version: built_info::PKG_VERSION,
            target: built_info::TARGET,
            is_debug: built_info::DEBUG,
            rustc_version: built_info::RUSTC_VERSION,
            build_time_utc: built_info::BUILT_TIME_UTC,
            git_commit_hash: git_hash(),
        }
    }
}

/// The operating system and machine, as reported by [`PlatformInfo`]
#[derive(Serialize)]
struct PlatformMetadata {
    os: String,
    os_release: String,
    arch: String,
}

impl PlatformMetadata {
    fn new() -> Result<Self> {
        let info = PlatformInfo::new()
            .map_err(|err| anyhow::anyhow!("{err}"))
            .context("Unable to determine platform info")?;

        let lossy = |value: &std::ffi::OsStr| value.to_string_lossy().into_owned();
        Ok(Self {
            os: lossy(info.osname()),
            os_release: lossy(info.release()),
            arch: lossy(info.machine()),
        })
    }
}

/// Write metadata for a run to `metadata.toml` in `output_path`
pub fn write_metadata(output_path: &Path, run: &RunMetadata) -> Result<()> {
    let contents = toml::to_string(&MetadataFile {
        run,
        program: ProgramMetadata::new(),
        platform: PlatformMetadata::new()?,
    })?;
    let file_path = output_path.join(METADATA_FILE_NAME);
    fs::write(&file_path, contents)
        .with_context(|| format!("Failed to write {}", file_path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::timestamp;
    use rstest::rstest;
    use tempfile::tempdir;

    #[rstest]
    fn test_write_metadata(timestamp: NaiveDateTime) {
        let dir = tempdir().unwrap();
        let run = RunMetadata::new("mining", Some(7), timestamp);
        write_metadata(dir.path(), &run).unwrap();

        let contents = fs::read_to_string(dir.path().join(METADATA_FILE_NAME)).unwrap();
        let table: toml::Table = toml::from_str(&contents).unwrap();
        assert_eq!(table["run"]["model"].as_str(), Some("mining"));
        assert_eq!(table["run"]["seed"].as_integer(), Some(7));
        assert_eq!(
            table["run"]["datetime"].as_str(),
            Some("2024-01-06 00:00:00")
        );
        assert_eq!(table["program"]["name"].as_str(), Some("fuelcycle"));
        assert!(table["platform"]["arch"].as_str().is_some());
    }
}
