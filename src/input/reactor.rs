//! Code for reading reactor reference data.
use super::{ReferenceSource, input_err_msg};
use crate::model::parameters::ReactorClass;
use crate::model::project::{Estimate, ReactorCatalogue};
use crate::model::reactor::ReactorClassMap;
use anyhow::{Context, Result, ensure};
use strum::IntoEnumIterator;

const REACTOR_CLASSES_FILE_NAME: &str = "reactor_classes.toml";
const REACTOR_CATALOGUE_FILE_NAME: &str = "reactor_catalogue.toml";

/// Read capital costs for each reactor class.
///
/// Every class must be present and have a positive cost.
pub fn read_reactor_classes(source: &ReferenceSource) -> Result<ReactorClassMap> {
    let classes: ReactorClassMap = source.read(REACTOR_CLASSES_FILE_NAME)?;
    validate_reactor_classes(&classes).with_context(|| input_err_msg(REACTOR_CLASSES_FILE_NAME))?;

    Ok(classes)
}

fn validate_reactor_classes(classes: &ReactorClassMap) -> Result<()> {
    for class in ReactorClass::iter() {
        let info = classes
            .get(&class)
            .with_context(|| format!("Missing capital cost for reactor class {class}"))?;
        ensure!(
            info.capital_cost_per_kw.is_finite() && info.capital_cost_per_kw > 0.0,
            "Capital cost for reactor class {class} must be a positive number"
        );
    }

    Ok(())
}

/// Read the catalogue of reactor designs for project estimates
pub fn read_reactor_catalogue(source: &ReferenceSource) -> Result<ReactorCatalogue> {
    let catalogue: ReactorCatalogue = source.read(REACTOR_CATALOGUE_FILE_NAME)?;
    validate_reactor_catalogue(&catalogue)
        .with_context(|| input_err_msg(REACTOR_CATALOGUE_FILE_NAME))?;

    Ok(catalogue)
}

fn check_estimate(estimate: Estimate, what: &str) -> Result<()> {
    ensure!(
        estimate.min.is_finite() && estimate.max.is_finite(),
        "{what} must be finite"
    );
    ensure!(
        0.0 < estimate.min && estimate.min <= estimate.max,
        "{what} must be positive, with min no greater than max"
    );

    Ok(())
}

fn validate_reactor_catalogue(catalogue: &ReactorCatalogue) -> Result<()> {
    ensure!(!catalogue.is_empty(), "Reactor catalogue cannot be empty");
    for (id, reactor) in catalogue {
        check_estimate(reactor.capital_cost, &format!("Capital cost for {id}"))?;
        check_estimate(reactor.build_time, &format!("Build time for {id}"))?;
        ensure!(
            reactor.capacity.is_finite() && reactor.capacity > 0.0,
            "Capacity for {id} must be a positive number"
        );
        ensure!(
            reactor.fuel_cost.is_finite() && reactor.fuel_cost >= 0.0,
            "Fuel cost for {id} cannot be negative"
        );
    }

    Ok(())
}
