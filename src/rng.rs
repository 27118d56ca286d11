//! Injectable random sources and bounded multiplicative jitter.
//!
//! All randomness in the engine flows through a caller-supplied [`rand::Rng`], so that results can
//! be reproduced exactly by seeding a [`StdRng`].
use anyhow::{Result, ensure};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// A symmetric band of multiplicative factors around 1.0.
///
/// A band with a half width of `0.15` draws factors uniformly from `[0.85, 1.15]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct JitterBand(f64);

/// Band used to vary the periods of generated time series
pub const DEFAULT_SERIES_BAND: JitterBand = JitterBand(0.15);

/// Band from which live market movement in costs is drawn
pub const DEFAULT_COST_BAND: JitterBand = JitterBand(0.05);

/// Band from which live movement in physical output is drawn
pub const DEFAULT_OUTPUT_BAND: JitterBand = JitterBand(0.02);

impl JitterBand {
    /// Create a new band, checking that the half width lies in `[0, 1)`.
    ///
    /// A half width of one or more could produce zero or negative factors.
    pub fn new(half_width: f64) -> Result<Self> {
        ensure!(
            half_width.is_finite() && (0.0..1.0).contains(&half_width),
            "Jitter half width must be a number in the range [0, 1), got {half_width}"
        );

        Ok(Self(half_width))
    }

    /// The half width of the band
    pub fn half_width(self) -> f64 {
        self.0
    }

    /// Lowest factor which can be drawn
    pub fn min(self) -> f64 {
        1.0 - self.0
    }

    /// Highest factor which can be drawn
    pub fn max(self) -> f64 {
        1.0 + self.0
    }

    /// Whether `factor` could have been drawn from this band
    pub fn contains(self, factor: f64) -> bool {
        (self.min()..=self.max()).contains(&factor)
    }

    /// Draw a factor from the band
    pub fn sample<R: Rng + ?Sized>(self, rng: &mut R) -> f64 {
        if self.0 <= 0.0 {
            return 1.0;
        }

        rng.gen_range(self.min()..=self.max())
    }
}

impl TryFrom<f64> for JitterBand {
    type Error = anyhow::Error;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<JitterBand> for f64 {
    fn from(band: JitterBand) -> Self {
        band.0
    }
}

/// Create the random source for a session.
///
/// If no seed is given, the generator is seeded from system entropy.
pub fn create_rng(seed: Option<u64>) -> StdRng {
    if let Some(seed) = seed {
        debug!("Seeding random source with {seed}");
        StdRng::seed_from_u64(seed)
    } else {
        StdRng::from_entropy()
    }
}
