//! Per-month model inputs derived from a region baseline.
//!
//! Each month gets the seasonal and trend adjusted baseline plus four lag
//! proxies. The lags are fixed fractions of the projected consumption, the
//! same inputs the model was trained against.

use std::collections::HashMap;
use std::f64::consts::PI;

use crate::models::{ForecastMonth, RegionBaseline};

pub const FEATURE_COUNT: usize = 11;

const ANNUAL_GROWTH: f64 = 0.02;
const SEASONAL_AMPLITUDE: f64 = 0.15;
const LAG_FACTORS: [f64; 4] = [0.98, 0.96, 0.94, 0.90];

/// Sinusoidal intra-year demand multiplier for a calendar month (1-12).
pub fn seasonal_factor(month: u32) -> f64 {
    1.0 + SEASONAL_AMPLITUDE * (2.0 * PI * month as f64 / 12.0).sin()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub month: ForecastMonth,
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn new(month: ForecastMonth, values: [f64; FEATURE_COUNT]) -> Self {
        Self { month, values }
    }

    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.values
    }

    /// Projected total consumption (BCM) for this month.
    pub fn projected_consumption(&self) -> f64 {
        self.values[6]
    }
}

pub struct FeatureBuilder;

impl FeatureBuilder {
    /// One vector per month, starting at `start`, in calendar order.
    pub fn build(
        baseline: &RegionBaseline,
        start: ForecastMonth,
        horizon: u32,
        overrides: Option<&HashMap<String, f64>>,
    ) -> Vec<FeatureVector> {
        let b = match overrides {
            Some(o) => baseline.with_overrides(o),
            None => *baseline,
        };

        (0..horizon)
            .map(|i| {
                let month = start.plus(i);
                let year_trend = (month.year - start.year) as f64 * ANNUAL_GROWTH;
                let seasonal = seasonal_factor(month.month);
                let projected = b.total_water_consumption * (1.0 + year_trend) * seasonal;

                FeatureVector::new(
                    month,
                    [
                        b.per_capita_water_use * seasonal,
                        b.agricultural_water_use,
                        b.industrial_water_use,
                        b.household_water_use,
                        b.rainfall_impact * seasonal,
                        b.groundwater_depletion_rate,
                        projected,
                        projected * LAG_FACTORS[0],
                        projected * LAG_FACTORS[1],
                        projected * LAG_FACTORS[2],
                        projected * LAG_FACTORS[3],
                    ],
                )
            })
            .collect()
    }
}
