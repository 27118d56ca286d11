//! The parametric models which map a set of parameters to derived metrics.
use crate::input::ReferenceData;
use crate::rng::{DEFAULT_SERIES_BAND, JitterBand};
use crate::units::Dimensionless;
use chrono::NaiveDateTime;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

pub mod mining;
pub mod parameters;
pub mod project;
pub mod reactor;
pub mod series;
use mining::{MiningMetrics, evaluate_mining};
use parameters::{InvalidParameterError, MiningParameters, ReactorParameters};
use reactor::{ReactorClassMap, ReactorMetrics, evaluate_reactor};
use series::TimeSeries;

/// The inputs to one of the parametric models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum ParameterSet {
    /// Inputs for the mining simulator
    Mining(MiningParameters),
    /// Inputs for the reactor cost calculator
    Reactor(ReactorParameters),
}

impl ParameterSet {
    /// Check every field against its declared domain
    pub fn validate(&self) -> Result<(), InvalidParameterError> {
        match self {
            Self::Mining(params) => params.validate(),
            Self::Reactor(params) => params.validate(),
        }
    }

    /// The name of the model these parameters are for
    pub fn model_name(&self) -> &'static str {
        match self {
            Self::Mining(_) => "mining",
            Self::Reactor(_) => "reactor",
        }
    }
}

/// The named scalar metrics of a model result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultMetrics {
    /// Metrics from the mining model
    Mining(MiningMetrics),
    /// Metrics from the reactor cost model
    Reactor(ReactorMetrics),
}

impl ResultMetrics {
    /// The cost metric which live market movement acts on.
    ///
    /// This is the cost per kg for mining and the levelised cost for reactors.
    pub fn headline_cost(&self) -> f64 {
        match self {
            Self::Mining(metrics) => metrics.cost_per_kg,
            Self::Reactor(metrics) => metrics.levelised_cost.value(),
        }
    }

    /// Multiply the headline cost by `factor`, leaving other metrics unchanged
    pub fn scale_headline_cost(&mut self, factor: f64) {
        match self {
            Self::Mining(metrics) => metrics.cost_per_kg *= factor,
            Self::Reactor(metrics) => {
                metrics.levelised_cost = metrics.levelised_cost * Dimensionless(factor);
            }
        }
    }
}

/// The output of evaluating one of the models
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedResult {
    /// Headline metrics
    pub metrics: ResultMetrics,
    /// Monthly breakdown of output and cost
    pub timeline: TimeSeries,
    /// When the result was produced
    pub timestamp: NaiveDateTime,
}

/// Evaluates parameter sets against a fixed set of reference data
#[derive(Debug, Clone)]
pub struct ModelEvaluator {
    reference: Rc<ReferenceData>,
    series_band: JitterBand,
}

impl ModelEvaluator {
    /// Create a new evaluator.
    ///
    /// # Arguments
    ///
    /// * `reference` - Reference tables (e.g. capital cost by reactor class)
    /// * `series_band` - The band from which time series variation factors are drawn
    pub fn new(reference: Rc<ReferenceData>, series_band: JitterBand) -> Self {
        Self {
            reference,
            series_band,
        }
    }

    /// The reference data used by this evaluator
    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    /// Evaluate a set of parameters.
    ///
    /// The parameters are validated before any calculation is done. The result is fully determined
    /// by `params`, the state of `rng` and `timestamp`.
    pub fn evaluate<R: Rng + ?Sized>(
        &self,
        params: &ParameterSet,
        rng: &mut R,
        timestamp: NaiveDateTime,
    ) -> Result<DerivedResult, InvalidParameterError> {
        evaluate_with(
            params,
            &self.reference.reactor_classes,
            self.series_band,
            rng,
            timestamp,
        )
    }
}

/// Evaluate a set of parameters with the default time series band.
///
/// See [`ModelEvaluator::evaluate`].
pub fn evaluate<R: Rng + ?Sized>(
    params: &ParameterSet,
    reference: &ReferenceData,
    rng: &mut R,
    timestamp: NaiveDateTime,
) -> Result<DerivedResult, InvalidParameterError> {
    evaluate_with(
        params,
        &reference.reactor_classes,
        DEFAULT_SERIES_BAND,
        rng,
        timestamp,
    )
}

fn evaluate_with<R: Rng + ?Sized>(
    params: &ParameterSet,
    reactor_classes: &ReactorClassMap,
    series_band: JitterBand,
    rng: &mut R,
    timestamp: NaiveDateTime,
) -> Result<DerivedResult, InvalidParameterError> {
    let (metrics, timeline) = match params {
        ParameterSet::Mining(params) => {
            let (metrics, timeline) = evaluate_mining(params, series_band, rng)?;
            (ResultMetrics::Mining(metrics), timeline)
        }
        ParameterSet::Reactor(params) => {
            let (metrics, timeline) = evaluate_reactor(params, reactor_classes, series_band, rng)?;
            (ResultMetrics::Reactor(metrics), timeline)
        }
    };

    Ok(DerivedResult {
        metrics,
        timeline,
        timestamp,
    })
}
