//! Forecast assembly: demand values → labelled data points, and the
//! synthesized fallback used when no trained model answers.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use rand_distr::StandardNormal;
use std::sync::{Mutex, PoisonError};

use super::features::seasonal_factor;
use crate::models::{ForecastDataPoint, ForecastMonth};

const CONFIDENCE_LOWER: f64 = 0.90;
const CONFIDENCE_UPPER: f64 = 1.10;

const BASE_DEMAND_MLD: std::ops::Range<f64> = 800.0..1200.0;
const TREND_PER_MONTH: std::ops::Range<f64> = -0.5..2.0;
const NOISE_STD_DEV: f64 = 20.0;

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Fixed ±10% band around `demand`, ordered even for negative values.
pub fn confidence_band(demand: f64) -> (f64, f64) {
    let a = round2(demand * CONFIDENCE_LOWER);
    let b = round2(demand * CONFIDENCE_UPPER);
    (a.min(b), a.max(b))
}

fn data_point(month: ForecastMonth, demand: f64, include_confidence: bool) -> ForecastDataPoint {
    let demand_mld = round2(demand);
    let (confidence_lower, confidence_upper) = if include_confidence {
        let (lo, hi) = confidence_band(demand_mld);
        (Some(lo), Some(hi))
    } else {
        (None, None)
    };

    ForecastDataPoint {
        month: month.label(),
        demand_mld,
        confidence_lower,
        confidence_upper,
    }
}

/// Set or clear the bounds of already computed points to match
/// `include_confidence`. Bounds come from the rounded demand, so points built
/// by [`data_point`] are left unchanged.
pub fn apply_confidence(points: &mut [ForecastDataPoint], include_confidence: bool) {
    for point in points {
        if include_confidence {
            let (lo, hi) = confidence_band(point.demand_mld);
            point.confidence_lower = Some(lo);
            point.confidence_upper = Some(hi);
        } else {
            point.confidence_lower = None;
            point.confidence_upper = None;
        }
    }
}

/// Label model output month by month, starting at `start`.
pub fn points_from_values(start: ForecastMonth, values: &[f64], include_confidence: bool) -> Vec<ForecastDataPoint> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| data_point(start.plus(i as u32), v, include_confidence))
        .collect()
}

/// Plausible but random forecast for when the model is missing or fails.
pub struct ForecastSynthesizer {
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl ForecastSynthesizer {
    pub fn new(rng: impl RngCore + Send + 'static) -> Self {
        Self {
            rng: Mutex::new(Box::new(rng)),
        }
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn generate(
        &self,
        region: &str,
        start: ForecastMonth,
        horizon: u32,
        include_confidence: bool,
    ) -> Vec<ForecastDataPoint> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);

        let base = rng.gen_range(BASE_DEMAND_MLD);
        let trend = rng.gen_range(TREND_PER_MONTH);
        tracing::debug!(region = %region, base, trend, "Synthesizing forecast");

        (0..horizon)
            .map(|i| {
                let month = start.plus(i);
                let seasonal = seasonal_factor(month.month);
                let noise: f64 = rng.sample::<f64, _>(StandardNormal) * NOISE_STD_DEV;
                let demand = base + trend * i as f64 + seasonal * base * 0.1 + noise;
                data_point(month, demand, include_confidence)
            })
            .collect()
    }
}

impl Default for ForecastSynthesizer {
    fn default() -> Self {
        Self::from_entropy()
    }
}
