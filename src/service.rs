//! End-to-end forecast pipeline: cache lookup, baseline resolution, feature
//! derivation, prediction with fallback, response assembly, cache store.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{cache_key, ResponseCache};
use crate::ml::baseline::BaselineResolver;
use crate::ml::features::FeatureBuilder;
use crate::ml::forecast::{apply_confidence, points_from_values, ForecastSynthesizer};
use crate::ml::predictor::{run_predictor, Prediction, Predictor};
use crate::models::{
    ForecastMetadata, ForecastMonth, ForecastQuery, ForecastResponse, ForecastSource, CONFIDENCE_LEVEL,
};

pub const FALLBACK_MODEL_VERSION: &str = "1.0.0-fallback";

#[derive(Debug, Clone)]
pub struct ForecastOutcome {
    pub response: ForecastResponse,
    pub cache_hit: bool,
}

pub struct ForecastService {
    resolver: BaselineResolver,
    predictor: Option<Arc<dyn Predictor>>,
    synthesizer: ForecastSynthesizer,
    cache: ResponseCache,
    predict_timeout: Duration,
}

impl ForecastService {
    pub fn new(
        resolver: BaselineResolver,
        predictor: Option<Arc<dyn Predictor>>,
        synthesizer: ForecastSynthesizer,
        cache: ResponseCache,
        predict_timeout: Duration,
    ) -> Self {
        Self {
            resolver,
            predictor,
            synthesizer,
            cache,
            predict_timeout,
        }
    }

    pub fn model_loaded(&self) -> bool {
        self.predictor.is_some()
    }

    pub fn dataset_loaded(&self) -> bool {
        self.resolver.has_dataset()
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub async fn forecast(&self, query: ForecastQuery) -> ForecastOutcome {
        self.forecast_from(query, ForecastMonth::current()).await
    }

    /// Same as [`forecast`](Self::forecast) with an explicit first month.
    pub async fn forecast_from(&self, query: ForecastQuery, start: ForecastMonth) -> ForecastOutcome {
        let key = cache_key(&query.region, query.months_ahead);
        if let Some(mut response) = self.cache.get(&key).await {
            // the key ignores the confidence flag
            apply_confidence(&mut response.forecast, query.include_confidence);
            tracing::info!(region = %query.region, key = %key, "Cache hit");
            return ForecastOutcome {
                response,
                cache_hit: true,
            };
        }

        let baseline = self.resolver.resolve(&query.region);
        let features = FeatureBuilder::build(&baseline, start, query.months_ahead, query.features.as_ref());

        let (forecast, model_version, source) =
            match run_predictor(self.predictor.clone(), features, self.predict_timeout).await {
                Prediction::Model { version, values } => (
                    points_from_values(start, &values, query.include_confidence),
                    version,
                    ForecastSource::Model,
                ),
                Prediction::Fallback(reason) => {
                    tracing::warn!(region = %query.region, reason = %reason, "Using fallback forecast");
                    (
                        self.synthesizer
                            .generate(&query.region, start, query.months_ahead, query.include_confidence),
                        FALLBACK_MODEL_VERSION.to_string(),
                        ForecastSource::Fallback,
                    )
                }
            };

        let mut features_used: Vec<String> = query
            .features
            .as_ref()
            .map(|f| f.keys().cloned().collect())
            .unwrap_or_default();
        features_used.sort();

        let response = ForecastResponse {
            region: query.region.clone(),
            forecast,
            model_version,
            generated_at: Utc::now(),
            confidence_level: CONFIDENCE_LEVEL,
            metadata: ForecastMetadata {
                months_forecasted: query.months_ahead,
                features_used,
                cached: false,
                source,
            },
        };

        self.cache.put(key, response.clone()).await;

        ForecastOutcome {
            response,
            cache_hit: false,
        }
    }
}
