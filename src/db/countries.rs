use serde::Deserialize;
use std::path::Path;

use crate::models::{RegionBaseline, ScarcityLevel};

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read dataset: {0}")]
    Read(#[from] csv::Error),
    #[error("dataset contains no usable records")]
    Empty,
}

/// One row of the historical water consumption CSV.
#[derive(Debug, Clone, Deserialize)]
pub struct CountryRecord {
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Total Water Consumption (Billion Cubic Meters)")]
    pub total_water_consumption: f64,
    #[serde(rename = "Per Capita Water Use (Liters per Day)")]
    pub per_capita_water_use: f64,
    #[serde(rename = "Agricultural Water Use (%)")]
    pub agricultural_water_use: f64,
    #[serde(rename = "Industrial Water Use (%)")]
    pub industrial_water_use: f64,
    #[serde(rename = "Household Water Use (%)")]
    pub household_water_use: f64,
    #[serde(rename = "Rainfall Impact (Annual Precipitation in mm)")]
    pub rainfall_impact: f64,
    #[serde(rename = "Groundwater Depletion Rate (%)")]
    pub groundwater_depletion_rate: f64,
    #[serde(rename = "Water Scarcity Level")]
    pub water_scarcity_level: String,
}

impl CountryRecord {
    pub fn baseline(&self) -> RegionBaseline {
        RegionBaseline {
            total_water_consumption: self.total_water_consumption,
            per_capita_water_use: self.per_capita_water_use,
            agricultural_water_use: self.agricultural_water_use,
            industrial_water_use: self.industrial_water_use,
            household_water_use: self.household_water_use,
            rainfall_impact: self.rainfall_impact,
            groundwater_depletion_rate: self.groundwater_depletion_rate,
            water_scarcity_level: ScarcityLevel::from_label(&self.water_scarcity_level).ordinal(),
        }
    }
}

/// Read-only, in-memory copy of the country dataset.
#[derive(Debug, Clone)]
pub struct CountryDataset {
    records: Vec<CountryRecord>,
}

impl CountryDataset {
    pub fn new(records: Vec<CountryRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn country_count(&self) -> usize {
        let mut names: Vec<String> = self.records.iter().map(|r| r.country.to_lowercase()).collect();
        names.sort();
        names.dedup();
        names.len()
    }

    /// Most recent record for a region: exact case-insensitive name match
    /// first, then substring containment.
    pub fn find(&self, region: &str) -> Option<&CountryRecord> {
        let needle = region.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }

        let exact = self
            .records
            .iter()
            .filter(|r| r.country.to_lowercase() == needle)
            .max_by_key(|r| r.year);

        exact.or_else(|| {
            self.records
                .iter()
                .filter(|r| r.country.to_lowercase().contains(&needle))
                .max_by_key(|r| r.year)
        })
    }
}

pub struct CountryRepo;

impl CountryRepo {
    /// Load the dataset from a CSV file. Malformed rows are skipped.
    pub fn load(path: impl AsRef<Path>) -> Result<CountryDataset, DatasetError> {
        let mut reader = csv::Reader::from_path(path.as_ref())?;

        let mut records = Vec::new();
        let mut skipped = 0usize;
        for row in reader.deserialize::<CountryRecord>() {
            match row {
                Ok(record) => records.push(record),
                Err(e) => {
                    skipped += 1;
                    tracing::warn!(error = %e, "Skipping malformed dataset row");
                }
            }
        }

        let dataset = CountryDataset::new(records);
        if dataset.is_empty() {
            return Err(DatasetError::Empty);
        }

        tracing::info!(
            records = dataset.len(),
            countries = dataset.country_count(),
            skipped,
            "Country data loaded"
        );
        Ok(dataset)
    }
}
