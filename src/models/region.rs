use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::types::RegionType;

/// Representative water-usage statistics for a region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionBaseline {
    /// Billion cubic meters per year.
    pub total_water_consumption: f64,
    /// Liters per person per day.
    pub per_capita_water_use: f64,
    pub agricultural_water_use: f64,
    pub industrial_water_use: f64,
    pub household_water_use: f64,
    /// Annual precipitation in mm.
    pub rainfall_impact: f64,
    pub groundwater_depletion_rate: f64,
    /// 0 = low, 1 = moderate, 2 = high.
    pub water_scarcity_level: f64,
}

impl RegionBaseline {
    /// Replace same-named fields with caller supplied values.
    /// Names that are not baseline fields are ignored.
    pub fn with_overrides(mut self, overrides: &HashMap<String, f64>) -> Self {
        for (name, &value) in overrides {
            match name.as_str() {
                "total_water_consumption" => self.total_water_consumption = value,
                "per_capita_water_use" => self.per_capita_water_use = value,
                "agricultural_water_use" => self.agricultural_water_use = value,
                "industrial_water_use" => self.industrial_water_use = value,
                "household_water_use" => self.household_water_use = value,
                "rainfall_impact" => self.rainfall_impact = value,
                "groundwater_depletion_rate" => self.groundwater_depletion_rate = value,
                "water_scarcity_level" => self.water_scarcity_level = value,
                other => tracing::debug!(feature = %other, "Ignoring unknown feature override"),
            }
        }
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Region {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub region_type: RegionType,
}

#[derive(Debug, Serialize)]
pub struct RegionList {
    pub regions: Vec<Region>,
}
