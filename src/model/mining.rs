//! The mining simulator model.
use super::parameters::{InvalidParameterError, MiningParameters};
use super::series::TimeSeries;
use crate::rng::JitterBand;
use rand::Rng;
use serde::Serialize;

/// Fraction of the theoretical purity which processing achieves
const PURITY_LOSS_FACTOR: f64 = 0.98;

/// Purity can never reach 100%
const MAX_PURITY_PERCENT: f64 = 99.9;

/// Headline metrics produced by the mining model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MiningMetrics {
    /// Material produced in tonnes
    pub production_volume: f64,
    /// Cost of production in $/kg
    pub cost_per_kg: f64,
    /// Purity of the product as a percentage
    pub purity: f64,
    /// Emissions in tonnes of CO2
    pub carbon_impact: f64,
}

impl MiningMetrics {
    /// Calculate the headline metrics for a validated set of parameters
    fn calculate(params: &MiningParameters) -> Self {
        let efficiency = params.technology.efficiency();
        let production_volume =
            params.deposit_size * params.concentration * params.extraction_efficiency * efficiency;
        let cost_per_kg = params.labour_cost
            * params.location.cost_factor()
            * params.material.cost_factor()
            / (params.concentration * efficiency);
        let purity = (params.concentration * efficiency * PURITY_LOSS_FACTOR * 100.0)
            .min(MAX_PURITY_PERCENT);
        let carbon_impact = production_volume * params.technology.emission_factor();

        Self {
            production_volume,
            cost_per_kg,
            purity,
            carbon_impact,
        }
    }
}

/// Evaluate the mining model.
///
/// Parameters are validated before anything is calculated.
pub fn evaluate_mining<R: Rng + ?Sized>(
    params: &MiningParameters,
    band: JitterBand,
    rng: &mut R,
) -> Result<(MiningMetrics, TimeSeries), InvalidParameterError> {
    params.validate()?;

    let metrics = MiningMetrics::calculate(params);
    let timeline = TimeSeries::generate(
        metrics.production_volume,
        metrics.cost_per_kg,
        band,
        rng,
    );

    Ok((metrics, timeline))
}
