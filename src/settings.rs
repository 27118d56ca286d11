//! User settings, read from `settings.toml` in the fuelcycle config directory.
use crate::get_fuelcycle_config_dir;
use crate::input::read_toml;
use crate::log::{DEFAULT_LOG_LEVEL, parse_log_level};
use crate::market::{Cadence, MarketHours};
use crate::model::series::PERIODS_PER_YEAR;
use crate::perturb::PerturbationConfig;
use crate::rng::{DEFAULT_COST_BAND, DEFAULT_OUTPUT_BAND, DEFAULT_SERIES_BAND, JitterBand};
use crate::scheduler::{DEFAULT_TAIL_WINDOW, RefreshConfig};
use anyhow::{Context, Result, ensure};
use chrono::TimeDelta;
use documented::DocumentedFields;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::{Path, PathBuf};

const SETTINGS_FILE_NAME: &str = "settings.toml";

/// Shown in place of a seed in the default settings file
const EXAMPLE_SEED: u64 = 42;

const DEFAULT_SETTINGS_FILE_HEADER: &str = "# This file contains the program settings for fuelcycle
# Uncomment a setting to change its value.
";

/// Location of the user's settings file
pub fn get_settings_file_path() -> PathBuf {
    get_fuelcycle_config_dir().join(SETTINGS_FILE_NAME)
}

/// Tunable behaviour of sessions and the command line tools.
///
/// Every field is optional in the file; missing fields take their default.
#[derive(Debug, Clone, DocumentedFields, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Log level used unless `FUELCYCLE_LOG_LEVEL` is set (error, warn, info, debug or trace)
    pub log_level: String,
    /// Seed for the random source. If absent, a new seed is drawn for every session.
    pub seed: Option<u64>,
    /// First hour of the trading day (0-23)
    pub market_open_hour: u32,
    /// Last hour of the trading day (0-23)
    pub market_close_hour: u32,
    /// Seconds between refreshes while the market is open
    pub open_refresh_secs: u32,
    /// Seconds between refreshes while the market is closed
    pub closed_refresh_secs: u32,
    /// Half width of the band used to vary the periods of generated time series
    pub series_band: JitterBand,
    /// Half width of the band for live movement in costs
    pub cost_band: JitterBand,
    /// Half width of the band for live movement in output
    pub output_band: JitterBand,
    /// Number of most recent periods moved by each refresh
    pub tail_window: usize,
    /// Duration of displayed number transitions, in milliseconds
    pub animation_duration_ms: u32,
    /// Simulated latency of the first evaluation, in milliseconds
    pub initial_load_latency_ms: u32,
}

impl Default for Settings {
    fn default() -> Self {
        let market_hours = MarketHours::default();
        let cadence = Cadence::default();
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            seed: None,
            market_open_hour: market_hours.open_hour,
            market_close_hour: market_hours.close_hour,
            open_refresh_secs: cadence.open_secs,
            closed_refresh_secs: cadence.closed_secs,
            series_band: DEFAULT_SERIES_BAND,
            cost_band: DEFAULT_COST_BAND,
            output_band: DEFAULT_OUTPUT_BAND,
            tail_window: DEFAULT_TAIL_WINDOW,
            animation_duration_ms: 1000,
            initial_load_latency_ms: 1500,
        }
    }
}

impl Settings {
    /// Load and validate the user's settings file, or use the defaults if there isn't one
    pub fn load() -> Result<Settings> {
        Self::load_from_path(&get_settings_file_path())
    }

    /// Read from the specified path, falling back to defaults if the file doesn't exist
    pub fn load_from_path(file_path: &Path) -> Result<Settings> {
        let settings: Settings = if file_path.is_file() {
            read_toml(file_path)?
        } else {
            return Ok(Settings::default());
        };
        settings
            .validate()
            .with_context(|| format!("Invalid settings in {}", file_path.display()))?;

        Ok(settings)
    }

    /// Check that the values of settings are consistent
    pub fn validate(&self) -> Result<()> {
        parse_log_level(&self.log_level)?;
        self.market_hours().validate()?;
        self.cadence().validate()?;
        ensure!(
            self.animation_duration_ms > 0,
            "Animation duration must be greater than zero"
        );
        ensure!(
            self.tail_window <= PERIODS_PER_YEAR,
            "Tail window of {} is longer than the {PERIODS_PER_YEAR} periods of a time series",
            self.tail_window
        );

        Ok(())
    }

    /// The configured market hours
    pub fn market_hours(&self) -> MarketHours {
        MarketHours {
            open_hour: self.market_open_hour,
            close_hour: self.market_close_hour,
        }
    }

    /// The configured refresh cadence
    pub fn cadence(&self) -> Cadence {
        Cadence {
            open_secs: self.open_refresh_secs,
            closed_secs: self.closed_refresh_secs,
        }
    }

    /// Configuration for the refresh scheduler
    pub fn refresh_config(&self) -> RefreshConfig {
        RefreshConfig {
            market_hours: self.market_hours(),
            cadence: self.cadence(),
            tail_window: self.tail_window,
            perturbation: PerturbationConfig {
                cost_band: self.cost_band,
                output_band: self.output_band,
            },
        }
    }

    /// Duration of displayed number transitions
    pub fn animation_duration(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.animation_duration_ms.into())
    }

    /// Delay before the first evaluation of a session
    pub fn initial_load_latency(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.initial_load_latency_ms.into())
    }

    /// A settings file with every option commented out at its default value.
    ///
    /// Each option is preceded by its documentation. The seed has no default, so it is shown with
    /// an example value.
    pub fn default_file_contents() -> Result<String> {
        let example = Settings {
            seed: Some(EXAMPLE_SEED),
            ..Settings::default()
        };
        let defaults = toml::to_string(&example).context("Could not convert settings to TOML")?;

        let mut out = DEFAULT_SETTINGS_FILE_HEADER.to_string();
        for (field, entry) in defaults
            .lines()
            .filter_map(|line| Some((line.split_once('=')?.0.trim(), line.trim())))
        {
            let docs = Settings::get_field_docs(field)
                .with_context(|| format!("Missing doc comment for field {field}"))?;
            writeln!(&mut out)?;
            for doc_line in docs.lines() {
                writeln!(&mut out, "# # {}", doc_line.trim())?;
            }
            writeln!(&mut out, "# {entry}")?;
        }

        Ok(out)
    }
}
