//! Flattening results into records and writing them to disk.
use crate::model::{DerivedResult, ResultMetrics};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::Path;

pub mod metadata;
pub use metadata::{RunMetadata, write_metadata};

/// The output file name for headline metrics
const RESULTS_FILE_NAME: &str = "results.csv";

/// The output file name for the monthly breakdown
const TIMELINE_FILE_NAME: &str = "timeline.csv";

/// Format used for timestamps in output files
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A single labelled value, as handed to spreadsheet export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    /// Human-readable name of the metric
    pub label: String,
    /// The value of the metric
    pub value: f64,
    /// The unit the value is expressed in
    pub unit: String,
}

impl ExportRecord {
    fn new(label: &str, value: f64, unit: &str) -> Self {
        Self {
            label: label.into(),
            value,
            unit: unit.into(),
        }
    }
}

/// Flatten the headline metrics of a result into a list of records
pub fn export_records(result: &DerivedResult) -> Vec<ExportRecord> {
    match &result.metrics {
        ResultMetrics::Mining(metrics) => vec![
            ExportRecord::new("Production volume", metrics.production_volume, "t"),
            ExportRecord::new("Cost per kg", metrics.cost_per_kg, "$/kg"),
            ExportRecord::new("Purity", metrics.purity, "%"),
            ExportRecord::new("Carbon impact", metrics.carbon_impact, "t CO2"),
        ],
        ResultMetrics::Reactor(metrics) => vec![
            ExportRecord::new("Levelised cost", metrics.levelised_cost.value(), "$/MWh"),
            ExportRecord::new(
                "Annual generation",
                metrics.annual_generation.value(),
                "MWh",
            ),
            ExportRecord::new(
                "Total capital cost",
                metrics.total_capital_cost.value(),
                "$",
            ),
            ExportRecord::new(
                "Annual capital spend",
                metrics.annual_capital_spend.value(),
                "$",
            ),
            ExportRecord::new(
                "Annual emissions",
                metrics.annual_emissions.value(),
                "t CO2",
            ),
        ],
    }
}

/// Create the output directory (and its parents) if it doesn't already exist
pub fn create_output_directory(output_dir: &Path) -> Result<()> {
    if output_dir.is_dir() {
        // already exists
        return Ok(());
    }

    fs::create_dir_all(output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            output_dir.display()
        )
    })?;

    Ok(())
}

/// Represents a row in the results CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ResultRow {
    timestamp: String,
    label: String,
    value: f64,
    unit: String,
}

/// Represents a row in the timeline CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct TimelineRow {
    timestamp: String,
    period: String,
    output: f64,
    cost: f64,
}

/// Writes successive results to CSV files.
///
/// Every row carries the timestamp of the result it came from, so a session which refreshes its
/// result can keep appending to the same files.
pub struct DataWriter {
    results_writer: csv::Writer<File>,
    timeline_writer: csv::Writer<File>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    pub fn create(output_path: &Path) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(&file_path)
                .with_context(|| format!("Failed to create {}", file_path.display()))
        };

        Ok(Self {
            results_writer: new_writer(RESULTS_FILE_NAME)?,
            timeline_writer: new_writer(TIMELINE_FILE_NAME)?,
        })
    }

    /// Write the headline metrics and timeline of a result
    pub fn write_result(&mut self, result: &DerivedResult) -> Result<()> {
        let timestamp = result.timestamp.format(TIMESTAMP_FORMAT).to_string();

        for record in export_records(result) {
            self.results_writer.serialize(ResultRow {
                timestamp: timestamp.clone(),
                label: record.label,
                value: record.value,
                unit: record.unit,
            })?;
        }

        for entry in result.timeline.iter() {
            self.timeline_writer.serialize(TimelineRow {
                timestamp: timestamp.clone(),
                period: entry.label.into(),
                output: entry.output,
                cost: entry.cost,
            })?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.results_writer.flush()?;
        self.timeline_writer.flush()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{mining_result, reference_data, timestamp};
    use crate::input::ReferenceData;
    use crate::model::parameters::ReactorParameters;
    use crate::model::{ParameterSet, evaluate};
    use crate::rng::create_rng;
    use chrono::NaiveDateTime;
    use itertools::Itertools;
    use rstest::rstest;
    use tempfile::tempdir;

    #[rstest]
    fn test_export_records_mining(mining_result: DerivedResult) {
        let records = export_records(&mining_result);
        assert_eq!(
            records.iter().map(|record| record.label.as_str()).collect_vec(),
            ["Production volume", "Cost per kg", "Purity", "Carbon impact"]
        );
        assert_eq!(records[1].unit, "$/kg");
        assert_eq!(
            records[1].value.to_bits(),
            mining_result.metrics.headline_cost().to_bits()
        );
    }

    #[rstest]
    fn test_export_records_reactor(reference_data: ReferenceData, timestamp: NaiveDateTime) {
        let params = ParameterSet::Reactor(ReactorParameters::default());
        let result =
            evaluate(&params, &reference_data, &mut create_rng(Some(1)), timestamp).unwrap();
        let records = export_records(&result);
        assert_eq!(records.len(), 5);
        assert_eq!(records[0].label, "Levelised cost");
        assert_eq!(records[0].unit, "$/MWh");
    }

    #[test]
    fn test_create_output_directory() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("a").join("b");
        create_output_directory(&output_dir).unwrap();
        assert!(output_dir.is_dir());

        // Already exists
        create_output_directory(&output_dir).unwrap();
    }

    #[rstest]
    fn test_write_result(mining_result: DerivedResult) {
        let dir = tempdir().unwrap();
        {
            let mut writer = DataWriter::create(dir.path()).unwrap();
            writer.write_result(&mining_result).unwrap();
            writer.flush().unwrap();
        }

        let rows: Vec<ResultRow> = csv::Reader::from_path(dir.path().join(RESULTS_FILE_NAME))
            .unwrap()
            .into_deserialize()
            .try_collect()
            .unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].timestamp, "2024-01-06T00:00:00");
        assert_eq!(rows[2].label, "Purity");

        let rows: Vec<TimelineRow> = csv::Reader::from_path(dir.path().join(TIMELINE_FILE_NAME))
            .unwrap()
            .into_deserialize()
            .try_collect()
            .unwrap();
        assert_eq!(rows.len(), mining_result.timeline.len());
        assert_eq!(rows[0].period, "Jan");
        assert_eq!(
            rows[0].output.to_bits(),
            mining_result.timeline.entries()[0].output.to_bits()
        );
    }
}
