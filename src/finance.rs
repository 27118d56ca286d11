//! General functions related to finance.
use crate::units::{
    Capacity, Dimensionless, Emissions, EmissionsPerEnergy, Energy, Hours, Money,
    MoneyPerCapacity, MoneyPerEnergy,
};

/// Number of hours in a (non-leap) year
pub const HOURS_PER_YEAR: Hours = Hours(8760.0);

/// Number of kilowatts in a megawatt
const KW_PER_MW: f64 = 1000.0;

/// Number of kilowatt hours in a megawatt hour
const KWH_PER_MWH: f64 = 1000.0;

/// Number of grams in a tonne
const GRAMS_PER_TONNE: f64 = 1e6;

/// Convert an overnight capital cost given in $/kW into [`MoneyPerCapacity`] ($/MW)
pub fn capital_cost_from_per_kw(per_kw: f64) -> MoneyPerCapacity {
    MoneyPerCapacity(per_kw * KW_PER_MW)
}

/// Convert a carbon intensity given in gCO2/kWh into tonnes of CO2 per MWh
pub fn emissions_from_grams_per_kwh(grams_per_kwh: f64) -> EmissionsPerEnergy {
    EmissionsPerEnergy(grams_per_kwh * KWH_PER_MWH / GRAMS_PER_TONNE)
}

/// Calculates the energy generated in a year by a plant of the given capacity.
pub fn annual_generation(capacity: Capacity, capacity_factor: Dimensionless) -> Energy {
    capacity * capacity_factor * HOURS_PER_YEAR
}

/// Total overnight capital cost of a plant
pub fn total_capital_cost(capital_cost: MoneyPerCapacity, capacity: Capacity) -> Money {
    capital_cost * capacity
}

/// Calculates the levelised cost of energy.
///
/// The full overnight capital cost is charged against a single year of generation, on top of the
/// variable (fuel plus O&M) cost of that generation.
///
/// Returns `None` if the generation is not strictly positive, as the cost is then undefined.
pub fn levelised_cost(
    capital_cost: MoneyPerCapacity,
    capacity: Capacity,
    variable_cost: MoneyPerEnergy,
    generation: Energy,
) -> Option<MoneyPerEnergy> {
    if generation <= Energy(0.0) || !generation.is_finite() {
        return None;
    }

    let total_cost = total_capital_cost(capital_cost, capacity) + variable_cost * generation;
    Some(total_cost / generation)
}

/// Annual emissions for the given generation and carbon intensity
pub fn annual_emissions(generation: Energy, intensity: EmissionsPerEnergy) -> Emissions {
    intensity * generation
}
