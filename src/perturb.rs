//! Simulates live market movement by jittering the most recent part of a previous result.
use crate::model::DerivedResult;
use crate::rng::{DEFAULT_COST_BAND, DEFAULT_OUTPUT_BAND, JitterBand};
use chrono::NaiveDateTime;
use rand::Rng;
use serde::Deserialize;
use thiserror::Error;

/// The tail window is longer than the time series it applies to
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Tail window of {window} periods exceeds time series length of {len}")]
pub struct InvalidWindowError {
    /// The requested window
    pub window: usize,
    /// The length of the time series
    pub len: usize,
}

/// The bands from which perturbation factors are drawn
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PerturbationConfig {
    /// Band for the shared market factor applied to costs
    pub cost_band: JitterBand,
    /// Band for the per-period factor applied to output
    pub output_band: JitterBand,
}

impl Default for PerturbationConfig {
    fn default() -> Self {
        Self {
            cost_band: DEFAULT_COST_BAND,
            output_band: DEFAULT_OUTPUT_BAND,
        }
    }
}

/// Produce a new result by perturbing `previous`.
///
/// A single market factor is drawn from the cost band and applied both to the headline cost and
/// to the cost of each of the last `tail_window` periods. Each of those periods also has its output
/// scaled by its own factor drawn from the output band. All earlier periods are copied unchanged.
///
/// A window of zero only moves the headline cost.
pub fn perturb<R: Rng + ?Sized>(
    previous: &DerivedResult,
    tail_window: usize,
    config: &PerturbationConfig,
    rng: &mut R,
    timestamp: NaiveDateTime,
) -> Result<DerivedResult, InvalidWindowError> {
    let len = previous.timeline.len();
    if tail_window > len {
        return Err(InvalidWindowError {
            window: tail_window,
            len,
        });
    }

    let mut result = previous.clone();
    let market_factor = config.cost_band.sample(rng);
    result.metrics.scale_headline_cost(market_factor);
    for entry in result.timeline.tail_mut(tail_window) {
        entry.output *= config.output_band.sample(rng);
        entry.cost *= market_factor;
    }
    result.timestamp = timestamp;

    Ok(result)
}
