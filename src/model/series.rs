//! Monthly time series attached to model results.
use crate::rng::JitterBand;
use rand::Rng;
use serde::Serialize;

/// The number of periods in every time series
pub const PERIODS_PER_YEAR: usize = 12;

/// Labels for the periods of a time series
const PERIOD_LABELS: [&str; PERIODS_PER_YEAR] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Costs in a time series are reported in thousands of dollars
const COST_SCALE: f64 = 1000.0;

/// A single period of a [`TimeSeries`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodEntry {
    /// Label for the period (e.g. "Jan")
    pub label: &'static str,
    /// Physical output over the period (tonnes of material or MWh of electricity)
    pub output: f64,
    /// Cost over the period in thousands of dollars
    pub cost: f64,
}

impl PeriodEntry {
    /// Whether both metrics are finite and non-negative
    pub fn is_valid(&self) -> bool {
        [self.output, self.cost]
            .iter()
            .all(|value| value.is_finite() && *value >= 0.0)
    }
}

/// A fixed-length sequence of periods.
///
/// The length is always [`PERIODS_PER_YEAR`]; only the values of entries can be changed once the
/// series has been generated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TimeSeries(Vec<PeriodEntry>);

impl TimeSeries {
    /// Generate a series by spreading an annual aggregate over the year.
    ///
    /// For every period a single factor `r` is drawn from `band`. The period's output is its
    /// pro-rated share of `annual_output` scaled by `r`, and its cost is `unit_cost` times that
    /// output, scaled by `r` again.
    ///
    /// # Arguments
    ///
    /// * `annual_output` - Output over the whole year
    /// * `unit_cost` - Cost per unit of output in dollars
    /// * `band` - The band from which variation factors are drawn
    /// * `rng` - Random source
    pub fn generate<R: Rng + ?Sized>(
        annual_output: f64,
        unit_cost: f64,
        band: JitterBand,
        rng: &mut R,
    ) -> Self {
        let share = annual_output / PERIODS_PER_YEAR as f64;
        let entries = PERIOD_LABELS
            .iter()
            .map(|&label| {
                let factor = band.sample(rng);
                let output = share * factor;
                PeriodEntry {
                    label,
                    output,
                    cost: unit_cost * output * factor / COST_SCALE,
                }
            })
            .collect();

        Self(entries)
    }

    /// The number of periods
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the series has no periods
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The periods in chronological order
    pub fn entries(&self) -> &[PeriodEntry] {
        &self.0
    }

    /// Iterate over the periods in chronological order
    pub fn iter(&self) -> impl Iterator<Item = &PeriodEntry> {
        self.0.iter()
    }

    /// Mutable access to the most recent `count` periods
    pub(crate) fn tail_mut(&mut self, count: usize) -> &mut [PeriodEntry] {
        let start = self.0.len().saturating_sub(count);
        &mut self.0[start..]
    }

    /// The first entry which is negative or non-finite, if any
    pub fn first_invalid(&self) -> Option<&PeriodEntry> {
        self.0.iter().find(|entry| !entry.is_valid())
    }

    /// Sum of output over all periods
    pub fn total_output(&self) -> f64 {
        self.0.iter().map(|entry| entry.output).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::create_rng;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_generate_length_and_labels() {
        let band = JitterBand::new(0.15).unwrap();
        let series = TimeSeries::generate(1200.0, 10.0, band, &mut create_rng(Some(1)));
        assert_eq!(series.len(), PERIODS_PER_YEAR);
        assert_eq!(series.entries()[0].label, "Jan");
        assert_eq!(series.entries()[11].label, "Dec");
        assert!(series.first_invalid().is_none());
    }

    #[test]
    fn test_generate_without_variation() {
        let band = JitterBand::new(0.0).unwrap();
        let series = TimeSeries::generate(1200.0, 10.0, band, &mut create_rng(Some(1)));
        for entry in series.iter() {
            assert_approx_eq!(f64, entry.output, 100.0);
            assert_approx_eq!(f64, entry.cost, 1.0); // 10 * 100 / 1000
        }
        assert_approx_eq!(f64, series.total_output(), 1200.0, epsilon = 1e-9);
    }

    #[test]
    fn test_generate_within_band() {
        let band = JitterBand::new(0.15).unwrap();
        let series = TimeSeries::generate(1200.0, 10.0, band, &mut create_rng(Some(3)));
        for entry in series.iter() {
            let factor = entry.output / 100.0;
            assert!(band.contains(factor));
            assert_approx_eq!(f64, entry.cost, 10.0 * entry.output * factor / 1000.0);
        }
    }

    #[test]
    fn test_tail_mut() {
        let band = JitterBand::new(0.0).unwrap();
        let mut series = TimeSeries::generate(1200.0, 10.0, band, &mut create_rng(Some(1)));
        assert_eq!(series.tail_mut(2).len(), 2);
        assert_eq!(series.tail_mut(2)[0].label, "Nov");
        assert_eq!(series.tail_mut(0).len(), 0);
    }

    #[test]
    fn test_invalid_entry_detected() {
        let band = JitterBand::new(0.0).unwrap();
        let mut series = TimeSeries::generate(1200.0, 10.0, band, &mut create_rng(Some(1)));
        series.tail_mut(1)[0].cost = f64::NAN;
        assert_eq!(series.first_invalid().unwrap().label, "Dec");
    }
}
