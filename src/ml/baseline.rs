//! Region name → baseline statistics.
//! Lookup order: dataset (exact, then substring), static table, global default.

use std::sync::Arc;

use crate::db::CountryDataset;
use crate::models::RegionBaseline;

pub const DEFAULT_BASELINE: RegionBaseline = baseline(150.0, 135.0, 45.0, 30.0, 25.0, 800.0, 2.5, 1.0);

const fn baseline(
    total: f64,
    per_capita: f64,
    agricultural: f64,
    industrial: f64,
    household: f64,
    rainfall: f64,
    depletion: f64,
    scarcity: f64,
) -> RegionBaseline {
    RegionBaseline {
        total_water_consumption: total,
        per_capita_water_use: per_capita,
        agricultural_water_use: agricultural,
        industrial_water_use: industrial,
        household_water_use: household,
        rainfall_impact: rainfall,
        groundwater_depletion_rate: depletion,
        water_scarcity_level: scarcity,
    }
}

/// Built-in baselines keyed by lower-cased region name.
pub fn static_baseline(name: &str) -> Option<RegionBaseline> {
    let b = match name {
        "india" => baseline(761.0, 145.0, 90.0, 6.0, 4.0, 1100.0, 4.5, 2.0),
        "china" => baseline(598.0, 125.0, 65.0, 22.0, 13.0, 645.0, 3.8, 2.0),
        "usa" | "united states" => baseline(444.0, 300.0, 37.0, 45.0, 18.0, 715.0, 2.2, 1.0),
        "brazil" => baseline(59.5, 165.0, 54.0, 17.0, 29.0, 1761.0, 1.5, 0.0),
        "pakistan" => baseline(183.5, 105.0, 94.0, 2.0, 4.0, 494.0, 5.8, 2.0),
        "egypt" => baseline(77.5, 95.0, 86.0, 6.0, 8.0, 51.0, 6.2, 2.0),
        "saudi arabia" => baseline(24.8, 263.0, 88.0, 6.0, 6.0, 59.0, 7.5, 2.0),
        "maharashtra" => baseline(85.0, 140.0, 85.0, 9.0, 6.0, 1200.0, 5.2, 2.0),
        "gujarat" => baseline(42.0, 128.0, 87.0, 8.0, 5.0, 800.0, 5.8, 2.0),
        "karnataka" => baseline(38.5, 135.0, 86.0, 9.0, 5.0, 1150.0, 4.8, 1.0),
        _ => return None,
    };
    Some(b)
}

#[derive(Clone, Default)]
pub struct BaselineResolver {
    dataset: Option<Arc<CountryDataset>>,
}

impl BaselineResolver {
    pub fn new(dataset: Option<Arc<CountryDataset>>) -> Self {
        Self { dataset }
    }

    pub fn has_dataset(&self) -> bool {
        self.dataset.is_some()
    }

    /// Always returns a baseline; unknown regions get [`DEFAULT_BASELINE`].
    pub fn resolve(&self, region: &str) -> RegionBaseline {
        let key = region.trim().to_lowercase();

        match &self.dataset {
            Some(dataset) => {
                if let Some(record) = dataset.find(&key) {
                    let b = record.baseline();
                    tracing::info!(
                        region = %region,
                        matched = %record.country,
                        year = record.year,
                        consumption_bcm = b.total_water_consumption,
                        per_capita_lpd = b.per_capita_water_use,
                        "Loaded baseline from dataset"
                    );
                    return b;
                }
            }
            None => {
                tracing::warn!(region = %region, "Country dataset not available, using static baselines");
            }
        }

        if let Some(b) = static_baseline(&key) {
            return b;
        }

        tracing::warn!(region = %region, "No baseline found for region, using defaults");
        DEFAULT_BASELINE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::countries::CountryRecord;

    fn record(country: &str, year: i32, total: f64) -> CountryRecord {
        CountryRecord {
            country: country.into(),
            year,
            total_water_consumption: total,
            per_capita_water_use: 100.0,
            agricultural_water_use: 60.0,
            industrial_water_use: 25.0,
            household_water_use: 15.0,
            rainfall_impact: 700.0,
            groundwater_depletion_rate: 2.0,
            water_scarcity_level: "Moderate".into(),
        }
    }

    fn with_dataset(records: Vec<CountryRecord>) -> BaselineResolver {
        BaselineResolver::new(Some(Arc::new(CountryDataset::new(records))))
    }

    #[test]
    fn test_unknown_region_uses_default() {
        let resolver = BaselineResolver::new(None);
        let b = resolver.resolve("Atlantis");
        assert_eq!(b, DEFAULT_BASELINE);
        assert_eq!(b.total_water_consumption, 150.0);
    }

    #[test]
    fn test_normalized_names_resolve_identically() {
        let resolver = BaselineResolver::new(None);
        let a = resolver.resolve("Maharashtra");
        let b = resolver.resolve("  maharashtra ");
        assert_eq!(a, b);
        assert_eq!(a.total_water_consumption, 85.0);
    }

    #[test]
    fn test_dataset_takes_precedence_over_static_table() {
        let resolver = with_dataset(vec![record("India", 2020, 700.0), record("India", 2024, 780.0)]);
        assert_eq!(resolver.resolve("INDIA").total_water_consumption, 780.0);
    }

    #[test]
    fn test_substring_match_in_dataset() {
        let resolver = with_dataset(vec![record("United Kingdom", 2023, 11.0)]);
        assert_eq!(resolver.resolve("kingdom").total_water_consumption, 11.0);
    }

    #[test]
    fn test_static_table_when_dataset_misses() {
        let resolver = with_dataset(vec![record("Canada", 2023, 38.0)]);
        assert_eq!(resolver.resolve("Gujarat").total_water_consumption, 42.0);
        assert_eq!(resolver.resolve("Pune"), DEFAULT_BASELINE);
    }

    #[test]
    fn test_usa_aliases() {
        assert_eq!(static_baseline("usa"), static_baseline("united states"));
        assert!(static_baseline("Usa").is_none());
    }
}
