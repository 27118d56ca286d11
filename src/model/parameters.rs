//! Defines the user-adjustable inputs of the parametric models and their declared domains.
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};
use thiserror::Error;

/// A parameter value which falls outside its declared domain
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid value {value} for parameter `{field}`: {reason}")]
pub struct InvalidParameterError {
    /// The name of the offending field
    pub field: &'static str,
    /// The rejected value
    pub value: f64,
    /// Why the value was rejected
    pub reason: String,
}

impl InvalidParameterError {
    /// Create a new error for the given field
    pub fn new(field: &'static str, value: f64, reason: impl Into<String>) -> Self {
        Self {
            field,
            value,
            reason: reason.into(),
        }
    }
}

/// The declared (inclusive) domain of a numeric parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterRange {
    /// Smallest permitted value
    pub min: f64,
    /// Largest permitted value
    pub max: f64,
}

impl ParameterRange {
    /// Create a new range
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Whether `value` is finite and lies within the range
    pub fn contains(self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }

    /// Clamp `value` into the range.
    ///
    /// Infinities go to the nearest bound and NaN goes to the lower bound.
    pub fn clamp(self, value: f64) -> f64 {
        if value.is_nan() {
            return self.min;
        }

        value.clamp(self.min, self.max)
    }

    /// Check that `value` lies in the range, returning an error naming `field` if not
    pub fn check(self, field: &'static str, value: f64) -> Result<(), InvalidParameterError> {
        if self.contains(value) {
            Ok(())
        } else {
            Err(InvalidParameterError::new(
                field,
                value,
                format!("must be a number between {} and {}", self.min, self.max),
            ))
        }
    }
}

/// Size of ore deposit in tonnes
pub const DEPOSIT_SIZE_RANGE: ParameterRange = ParameterRange::new(1000.0, 20000.0);
/// Ore concentration as a fraction
pub const CONCENTRATION_RANGE: ParameterRange = ParameterRange::new(0.01, 0.5);
/// Extraction efficiency as a fraction
pub const EXTRACTION_EFFICIENCY_RANGE: ParameterRange = ParameterRange::new(0.5, 0.95);
/// Labour cost in $/hour
pub const LABOUR_COST_RANGE: ParameterRange = ParameterRange::new(20.0, 100.0);

/// Reactor capacity in MW
pub const CAPACITY_RANGE: ParameterRange = ParameterRange::new(1.0, 1500.0);
/// Capacity factor as a fraction
pub const CAPACITY_FACTOR_RANGE: ParameterRange = ParameterRange::new(0.0, 1.0);
/// Construction time in years
pub const CONSTRUCTION_TIME_RANGE: ParameterRange = ParameterRange::new(1.0, 15.0);
/// Fuel cost in $/MWh
pub const FUEL_COST_RANGE: ParameterRange = ParameterRange::new(0.0, 100.0);
/// Operation and maintenance cost in $/MWh
pub const OM_COST_RANGE: ParameterRange = ParameterRange::new(0.0, 100.0);
/// Lifecycle carbon intensity in gCO2/kWh
pub const CARBON_INTENSITY_RANGE: ParameterRange = ParameterRange::new(0.0, 50.0);

/// The ore processing technology used at a mine
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TechnologyTier {
    /// Conventional processing
    Basic,
    /// Modern processing
    #[default]
    Advanced,
    /// State-of-the-art processing
    CuttingEdge,
}

impl TechnologyTier {
    /// Multiplier applied to recovered material. Increases with tier.
    pub fn efficiency(self) -> f64 {
        match self {
            Self::Basic => 0.7,
            Self::Advanced => 0.85,
            Self::CuttingEdge => 0.95,
        }
    }

    /// Tonnes of CO2 emitted per tonne of material produced. Decreases with tier.
    pub fn emission_factor(self) -> f64 {
        match self {
            Self::Basic => 0.15,
            Self::Advanced => 0.08,
            Self::CuttingEdge => 0.04,
        }
    }
}

/// The country in which a mine operates
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Location {
    /// Australia
    Australia,
    /// Canada
    #[default]
    Canada,
    /// Kazakhstan
    Kazakhstan,
    /// Namibia
    Namibia,
    /// United States
    Usa,
}

impl Location {
    /// Multiplier applied to labour costs at this location
    pub fn cost_factor(self) -> f64 {
        match self {
            Self::Australia => 1.1,
            Self::Canada => 1.0,
            Self::Kazakhstan => 0.8,
            Self::Namibia => 0.75,
            Self::Usa => 1.2,
        }
    }
}

/// The material being mined
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Material {
    /// Uranium ore (U3O8)
    #[default]
    Uranium,
    /// Zirconium, used for fuel cladding
    Zirconium,
    /// Hafnium, used in control rods
    Hafnium,
    /// Lithium, used for coolant chemistry
    Lithium,
    /// Beryllium, used as a moderator and reflector
    Beryllium,
    /// Nuclear-grade graphite
    Graphite,
}

impl Material {
    /// Multiplier reflecting how expensive the material is to process
    pub fn cost_factor(self) -> f64 {
        match self {
            Self::Uranium => 1.0,
            Self::Zirconium => 1.2,
            Self::Hafnium => 2.5,
            Self::Lithium => 1.8,
            Self::Beryllium => 3.0,
            Self::Graphite => 0.7,
        }
    }
}

/// The class of reactor, which determines its overnight capital cost
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReactorClass {
    /// Large light-water reactor
    Large,
    /// Small modular reactor
    #[default]
    Smr,
}

/// Inputs for the mining model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MiningParameters {
    /// Size of the ore deposit in tonnes
    pub deposit_size: f64,
    /// Fraction of the ore which is the target material
    pub concentration: f64,
    /// Fraction of the material which is extracted
    pub extraction_efficiency: f64,
    /// Labour cost in $/hour
    pub labour_cost: f64,
    /// Processing technology
    pub technology: TechnologyTier,
    /// Mine location
    pub location: Location,
    /// Material being mined
    pub material: Material,
}

impl Default for MiningParameters {
    fn default() -> Self {
        Self {
            deposit_size: 5000.0,
            concentration: 0.15,
            extraction_efficiency: 0.8,
            labour_cost: 50.0,
            technology: TechnologyTier::default(),
            location: Location::default(),
            material: Material::default(),
        }
    }
}

impl MiningParameters {
    /// Check every numeric field against its declared range
    pub fn validate(&self) -> Result<(), InvalidParameterError> {
        DEPOSIT_SIZE_RANGE.check("deposit_size", self.deposit_size)?;
        CONCENTRATION_RANGE.check("concentration", self.concentration)?;
        EXTRACTION_EFFICIENCY_RANGE.check("extraction_efficiency", self.extraction_efficiency)?;
        LABOUR_COST_RANGE.check("labour_cost", self.labour_cost)?;

        Ok(())
    }

    /// A copy with every numeric field clamped into its declared range
    pub fn clamped(&self) -> Self {
        Self {
            deposit_size: DEPOSIT_SIZE_RANGE.clamp(self.deposit_size),
            concentration: CONCENTRATION_RANGE.clamp(self.concentration),
            extraction_efficiency: EXTRACTION_EFFICIENCY_RANGE.clamp(self.extraction_efficiency),
            labour_cost: LABOUR_COST_RANGE.clamp(self.labour_cost),
            ..self.clone()
        }
    }
}

/// Inputs for the reactor cost model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReactorParameters {
    /// Class of reactor
    pub reactor_class: ReactorClass,
    /// Net electrical capacity in MW
    pub capacity: f64,
    /// Fraction of the year spent generating at full capacity
    pub capacity_factor: f64,
    /// Construction time in years
    pub construction_time: f64,
    /// Fuel cost in $/MWh
    pub fuel_cost: f64,
    /// Operation and maintenance cost in $/MWh
    pub om_cost: f64,
    /// Lifecycle carbon intensity in gCO2/kWh
    pub carbon_intensity: f64,
}

impl Default for ReactorParameters {
    fn default() -> Self {
        Self {
            reactor_class: ReactorClass::default(),
            capacity: 300.0,
            capacity_factor: 0.9,
            construction_time: 4.0,
            fuel_cost: 7.0,
            om_cost: 15.0,
            carbon_intensity: 12.0,
        }
    }
}

impl ReactorParameters {
    /// Check every numeric field against its declared range
    pub fn validate(&self) -> Result<(), InvalidParameterError> {
        CAPACITY_RANGE.check("capacity", self.capacity)?;
        CAPACITY_FACTOR_RANGE.check("capacity_factor", self.capacity_factor)?;
        CONSTRUCTION_TIME_RANGE.check("construction_time", self.construction_time)?;
        FUEL_COST_RANGE.check("fuel_cost", self.fuel_cost)?;
        OM_COST_RANGE.check("om_cost", self.om_cost)?;
        CARBON_INTENSITY_RANGE.check("carbon_intensity", self.carbon_intensity)?;

        Ok(())
    }

    /// A copy with every numeric field clamped into its declared range
    pub fn clamped(&self) -> Self {
        Self {
            capacity: CAPACITY_RANGE.clamp(self.capacity),
            capacity_factor: CAPACITY_FACTOR_RANGE.clamp(self.capacity_factor),
            construction_time: CONSTRUCTION_TIME_RANGE.clamp(self.construction_time),
            fuel_cost: FUEL_COST_RANGE.clamp(self.fuel_cost),
            om_cost: OM_COST_RANGE.clamp(self.om_cost),
            carbon_intensity: CARBON_INTENSITY_RANGE.clamp(self.carbon_intensity),
            ..self.clone()
        }
    }
}

/// Parse a `key=value` override as given on the command line
pub fn parse_override(s: &str) -> Result<(String, String)> {
    let Some((key, value)) = s.split_once('=') else {
        bail!("Parameter override must be of the form key=value, got: {s}");
    };

    let key = key.trim();
    if key.is_empty() {
        bail!("Parameter override has an empty key: {s}");
    }

    Ok((key.to_string(), value.trim().to_string()))
}

/// Apply `key=value` overrides to a set of parameters.
///
/// Values which parse as numbers are treated as numbers; anything else is treated as the label of
/// an enum variant. Unknown keys and unknown labels are rejected. No range checking is done here.
pub fn apply_overrides<T>(params: &T, overrides: &[(String, String)]) -> Result<T>
where
    T: Serialize + for<'de> Deserialize<'de>,
{
    let mut table: toml::Table = toml::from_str(&toml::to_string(params)?)?;
    for (key, value) in overrides {
        let value = match value.parse::<f64>() {
            Ok(number) => toml::Value::Float(number),
            Err(_) => toml::Value::String(value.clone()),
        };
        table.insert(key.clone(), value);
    }

    toml::from_str(&toml::to_string(&table)?).context("Invalid parameter override")
}
