//! The reactor cost model.
use super::parameters::{InvalidParameterError, ReactorClass, ReactorParameters};
use super::series::TimeSeries;
use crate::finance::{
    annual_emissions, annual_generation, capital_cost_from_per_kw, emissions_from_grams_per_kwh,
    levelised_cost, total_capital_cost,
};
use crate::rng::JitterBand;
use crate::units::{
    Capacity, Dimensionless, Emissions, Energy, Money, MoneyPerCapacity, MoneyPerEnergy,
};
use indexmap::IndexMap;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Reference information about a class of reactor
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReactorClassInfo {
    /// Human-readable description
    pub description: String,
    /// Overnight capital cost in $/kW
    pub capital_cost_per_kw: f64,
}

/// Reference information for every reactor class
pub type ReactorClassMap = IndexMap<ReactorClass, ReactorClassInfo>;

/// Headline metrics produced by the reactor cost model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReactorMetrics {
    /// Levelised cost of electricity
    pub levelised_cost: MoneyPerEnergy,
    /// Electricity generated per year
    pub annual_generation: Energy,
    /// Overnight capital cost of the plant
    pub total_capital_cost: Money,
    /// Capital spent in each year of construction
    pub annual_capital_spend: Money,
    /// Emissions per year of operation in tonnes of CO2
    pub annual_emissions: Emissions,
}

/// Evaluate the reactor cost model.
///
/// A capacity factor of zero passes the range check but produces no generation, which would make
/// the levelised cost undefined, so it is rejected here.
pub fn evaluate_reactor<R: Rng + ?Sized>(
    params: &ReactorParameters,
    classes: &ReactorClassMap,
    band: JitterBand,
    rng: &mut R,
) -> Result<(ReactorMetrics, TimeSeries), InvalidParameterError> {
    params.validate()?;

    let class_info = classes.get(&params.reactor_class).ok_or_else(|| {
        InvalidParameterError::new(
            "reactor_class",
            f64::NAN,
            format!("no reference cost for reactor class {}", params.reactor_class),
        )
    })?;
    let capital_cost: MoneyPerCapacity = capital_cost_from_per_kw(class_info.capital_cost_per_kw);

    let capacity = Capacity(params.capacity);
    let generation = annual_generation(capacity, Dimensionless(params.capacity_factor));
    let variable_cost = MoneyPerEnergy(params.fuel_cost + params.om_cost);
    let levelised_cost =
        levelised_cost(capital_cost, capacity, variable_cost, generation).ok_or_else(|| {
            InvalidParameterError::new(
                "capacity_factor",
                params.capacity_factor,
                "annual generation must be greater than zero",
            )
        })?;

    let total_capital_cost = total_capital_cost(capital_cost, capacity);
    let metrics = ReactorMetrics {
        levelised_cost,
        annual_generation: generation,
        total_capital_cost,
        annual_capital_spend: total_capital_cost / Dimensionless(params.construction_time),
        annual_emissions: annual_emissions(
            generation,
            emissions_from_grams_per_kwh(params.carbon_intensity),
        ),
    };
    let timeline = TimeSeries::generate(generation.value(), levelised_cost.value(), band, rng);

    Ok((metrics, timeline))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::reactor_classes;
    use crate::rng::create_rng;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn band() -> JitterBand {
        JitterBand::new(0.15).unwrap()
    }

    #[rstest]
    fn test_evaluate_reactor(reactor_classes: ReactorClassMap) {
        let params = ReactorParameters {
            reactor_class: ReactorClass::Smr,
            capacity: 300.0,
            capacity_factor: 0.9,
            construction_time: 4.0,
            fuel_cost: 7.0,
            om_cost: 15.0,
            carbon_intensity: 12.0,
        };
        let (metrics, timeline) =
            evaluate_reactor(&params, &reactor_classes, band(), &mut create_rng(Some(1))).unwrap();

        // SMR fixture costs 4000 $/kW
        assert_approx_eq!(Energy, metrics.annual_generation, Energy(2_365_200.0));
        assert_approx_eq!(Money, metrics.total_capital_cost, Money(1.2e9));
        assert_approx_eq!(Money, metrics.annual_capital_spend, Money(3e8));
        assert_approx_eq!(
            MoneyPerEnergy,
            metrics.levelised_cost,
            MoneyPerEnergy(529.356_671_740_233_4),
            epsilon = 1e-8
        );
        assert_approx_eq!(
            Emissions,
            metrics.annual_emissions,
            Emissions(28_382.4),
            epsilon = 1e-6
        );
        assert_eq!(timeline.len(), 12);
    }

    #[rstest]
    fn test_zero_capacity_factor_rejected(reactor_classes: ReactorClassMap) {
        let params = ReactorParameters {
            capacity_factor: 0.0,
            ..ReactorParameters::default()
        };
        let err = evaluate_reactor(&params, &reactor_classes, band(), &mut create_rng(None))
            .unwrap_err();
        assert_eq!(err.field, "capacity_factor");
    }

    #[rstest]
    fn test_large_reactor_costs_more_per_kw(reactor_classes: ReactorClassMap) {
        let evaluate_class = |reactor_class| {
            let params = ReactorParameters {
                reactor_class,
                ..ReactorParameters::default()
            };
            evaluate_reactor(&params, &reactor_classes, band(), &mut create_rng(Some(1)))
                .unwrap()
                .0
        };
        let large = evaluate_class(ReactorClass::Large);
        let smr = evaluate_class(ReactorClass::Smr);
        assert!(large.levelised_cost > smr.levelised_cost);
    }

    #[test]
    fn test_missing_class_rejected() {
        let err = evaluate_reactor(
            &ReactorParameters::default(),
            &ReactorClassMap::new(),
            band(),
            &mut create_rng(None),
        )
        .unwrap_err();
        assert_eq!(err.field, "reactor_class");
    }
}
