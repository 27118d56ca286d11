//! Fixtures for tests
use crate::graph::SupplyChain;
use crate::input::ReferenceData;
use crate::model::parameters::{MiningParameters, ReactorClass};
use crate::model::project::{Estimate, ReactorCatalogue, ReactorType};
use crate::model::reactor::{ReactorClassInfo, ReactorClassMap};
use crate::model::{DerivedResult, ParameterSet, evaluate};
use crate::rng::create_rng;
use chrono::{NaiveDate, NaiveDateTime};
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!($result.unwrap_err().to_string(), $msg);
    };
}
pub(crate) use assert_error;

/// Saturday 6 January 2024 at midnight, outside market hours
#[fixture]
pub fn timestamp() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 6)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

#[fixture]
pub fn reactor_classes() -> ReactorClassMap {
    [
        (ReactorClass::Large, "Large light-water reactor", 9000.0),
        (ReactorClass::Smr, "Small modular reactor", 4000.0),
    ]
    .into_iter()
    .map(|(class, description, capital_cost_per_kw)| {
        let info = ReactorClassInfo {
            description: description.into(),
            capital_cost_per_kw,
        };
        (class, info)
    })
    .collect()
}

#[fixture]
pub fn reactor_catalogue() -> ReactorCatalogue {
    let reactor = |name: &str, cost: (f64, f64), build: (f64, f64), fuel_cost, capacity| {
        ReactorType {
            name: name.into(),
            capital_cost: Estimate {
                min: cost.0,
                max: cost.1,
            },
            build_time: Estimate {
                min: build.0,
                max: build.1,
            },
            fuel_cost,
            capacity,
        }
    };

    [
        (
            "smr",
            reactor("SMR", (3000.0, 5000.0), (3.0, 5.0), 45.0, 300.0),
        ),
        (
            "large",
            reactor("Large PWR", (6000.0, 12000.0), (7.0, 10.0), 40.0, 1100.0),
        ),
        (
            "microreactor",
            reactor("Microreactor", (100.0, 300.0), (1.0, 2.0), 65.0, 10.0),
        ),
    ]
    .into_iter()
    .map(|(id, reactor)| (id.into(), reactor))
    .collect()
}

#[fixture]
pub fn reference_data() -> ReferenceData {
    ReferenceData::bundled().unwrap()
}

#[fixture]
pub fn supply_chain(reference_data: ReferenceData) -> SupplyChain {
    reference_data.supply_chain
}

/// The result of evaluating the mining model with default parameters
#[fixture]
pub fn mining_result(reference_data: ReferenceData, timestamp: NaiveDateTime) -> DerivedResult {
    let params = ParameterSet::Mining(MiningParameters::default());
    evaluate(&params, &reference_data, &mut create_rng(Some(1)), timestamp).unwrap()
}
