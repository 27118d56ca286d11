//! Capital cost and timeline estimates for building a fleet of reactors.
use super::parameters::{InvalidParameterError, ParameterRange};
use crate::id::define_id_type;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

define_id_type! {ReactorTypeID}

/// The permitted range of the country cost factor
pub const COUNTRY_FACTOR_RANGE: ParameterRange = ParameterRange::new(0.5, 2.0);

/// Annual fuel spend as a fraction of fuel cost times capacity
const FUEL_SPEND_FRACTION: f64 = 0.1;

/// Decommissioning provision as a fraction of base capital cost (low estimate)
const DECOMMISSIONING_FRACTION_MIN: f64 = 0.1;

/// Decommissioning provision as a fraction of base capital cost (high estimate)
const DECOMMISSIONING_FRACTION_MAX: f64 = 0.15;

/// Years added to the build time for licensing and permitting
const LICENSING_YEARS: Estimate = Estimate { min: 1.0, max: 3.0 };

/// Extra years added when more than one reactor is built
const FLEET_OVERLAP_YEARS: Estimate = Estimate { min: 0.5, max: 1.0 };

/// A low and high estimate of some quantity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, derive_more::Add)]
pub struct Estimate {
    /// Low estimate
    pub min: f64,
    /// High estimate
    pub max: f64,
}

impl Estimate {
    fn scale(self, factor: f64) -> Self {
        Self {
            min: self.min * factor,
            max: self.max * factor,
        }
    }
}

/// An entry in the catalogue of buildable reactor designs
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReactorType {
    /// Human-readable name
    pub name: String,
    /// Capital cost per reactor in millions of dollars
    pub capital_cost: Estimate,
    /// Build time in years
    pub build_time: Estimate,
    /// Fuel cost in $/MWh
    pub fuel_cost: f64,
    /// Net electrical capacity in MW
    pub capacity: f64,
}

/// The catalogue of reactor designs, keyed by ID
pub type ReactorCatalogue = IndexMap<ReactorTypeID, ReactorType>;

/// Options for a project estimate
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectOptions {
    /// Number of reactors to build
    pub count: u32,
    /// Whether to include fuel costs
    pub include_fuel: bool,
    /// Whether to include a decommissioning provision
    pub include_decommissioning: bool,
    /// Multiplier reflecting regional construction costs
    pub country_factor: f64,
}

impl Default for ProjectOptions {
    fn default() -> Self {
        Self {
            count: 1,
            include_fuel: true,
            include_decommissioning: true,
            country_factor: 1.0,
        }
    }
}

/// The outcome of a project estimate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectEstimate {
    /// Total cost in millions of dollars
    pub total_cost: Estimate,
    /// Total cost per MW of installed capacity, in millions of dollars
    pub cost_per_mw: Estimate,
    /// Time from licensing to operation in years
    pub timeline: Estimate,
}

/// Estimate the cost and duration of building `options.count` reactors of the given type
pub fn estimate_project(
    reactor: &ReactorType,
    options: &ProjectOptions,
) -> Result<ProjectEstimate, InvalidParameterError> {
    if options.count == 0 {
        return Err(InvalidParameterError::new(
            "count",
            0.0,
            "at least one reactor must be built",
        ));
    }
    COUNTRY_FACTOR_RANGE.check("country_factor", options.country_factor)?;

    let count = f64::from(options.count);
    let base = reactor.capital_cost.scale(count);

    let mut total = base;
    if options.include_decommissioning {
        total = total
            + Estimate {
                min: base.min * DECOMMISSIONING_FRACTION_MIN,
                max: base.max * DECOMMISSIONING_FRACTION_MAX,
            };
    }
    if options.include_fuel {
        let fuel = reactor.fuel_cost * reactor.capacity * count * FUEL_SPEND_FRACTION;
        total = total + Estimate { min: fuel, max: fuel };
    }
    let total_cost = total.scale(options.country_factor);

    let mut timeline = reactor.build_time + LICENSING_YEARS;
    if options.count > 1 {
        timeline = timeline + FLEET_OVERLAP_YEARS;
    }

    Ok(ProjectEstimate {
        total_cost,
        cost_per_mw: total_cost.scale(1.0 / (reactor.capacity * count)),
        timeline,
    })
}
