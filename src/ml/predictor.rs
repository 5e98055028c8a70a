//! Trained demand model behind an opaque `predict` call.
//!
//! Every call runs on the blocking pool under a timeout and the outcome is a
//! tagged [`Prediction`]; a broken or missing model degrades to the
//! synthesized forecast instead of failing the request.

use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::features::{FeatureVector, FEATURE_COUNT};

#[derive(Debug, thiserror::Error)]
pub enum PredictorError {
    #[error("failed to read model artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid model artifact: {0}")]
    Format(#[from] serde_json::Error),
    #[error("model expects {expected} features, artifact has {actual}")]
    FeatureCount { expected: usize, actual: usize },
    #[error("prediction failed: {0}")]
    Invocation(String),
}

pub trait Predictor: Send + Sync {
    /// One demand value (MLD) per input vector, same order.
    fn predict(&self, features: &[FeatureVector]) -> Result<Vec<f64>, PredictorError>;

    fn version(&self) -> &str;
}

/// Linear regression exported as JSON:
/// `{"version": "...", "intercept": 0.0, "coefficients": [11 numbers]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct LinearModel {
    version: String,
    intercept: f64,
    coefficients: Vec<f64>,
}

impl LinearModel {
    #[cfg(test)]
    pub fn new(version: impl Into<String>, intercept: f64, coefficients: Vec<f64>) -> Result<Self, PredictorError> {
        let model = Self {
            version: version.into(),
            intercept,
            coefficients,
        };
        model.check()?;
        Ok(model)
    }

    fn check(&self) -> Result<(), PredictorError> {
        if self.coefficients.len() != FEATURE_COUNT {
            return Err(PredictorError::FeatureCount {
                expected: FEATURE_COUNT,
                actual: self.coefficients.len(),
            });
        }
        Ok(())
    }

    /// `Ok(None)` when no artifact exists at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>, PredictorError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)?;
        let model: LinearModel = serde_json::from_str(&raw)?;
        model.check()?;
        Ok(Some(model))
    }
}

impl Predictor for LinearModel {
    fn predict(&self, features: &[FeatureVector]) -> Result<Vec<f64>, PredictorError> {
        features
            .iter()
            .map(|f| {
                if f.values().iter().any(|v| !v.is_finite()) {
                    return Err(PredictorError::Invocation(format!("non-finite input for {}", f.month)));
                }
                Ok(self.intercept
                    + f.values()
                        .iter()
                        .zip(&self.coefficients)
                        .map(|(x, w)| x * w)
                        .sum::<f64>())
            })
            .collect()
    }

    fn version(&self) -> &str {
        &self.version
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    NoModel,
    Failed(String),
    ShapeMismatch { expected: usize, actual: usize },
    NonFinite,
    TimedOut(Duration),
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoModel => write!(f, "model not loaded"),
            Self::Failed(msg) => write!(f, "prediction failed: {msg}"),
            Self::ShapeMismatch { expected, actual } => {
                write!(f, "model returned {actual} values for {expected} months")
            }
            Self::NonFinite => write!(f, "model returned non-finite values"),
            Self::TimedOut(after) => write!(f, "prediction timed out after {}ms", after.as_millis()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    Model { version: String, values: Vec<f64> },
    Fallback(FallbackReason),
}

/// Run the predictor (if any) off the async workers, bounded by `timeout`.
/// A timed-out call is abandoned, not cancelled: it keeps its blocking-pool
/// thread until the model returns.
pub async fn run_predictor(
    predictor: Option<Arc<dyn Predictor>>,
    features: Vec<FeatureVector>,
    timeout: Duration,
) -> Prediction {
    let Some(predictor) = predictor else {
        return Prediction::Fallback(FallbackReason::NoModel);
    };

    let expected = features.len();
    let task = tokio::task::spawn_blocking(move || {
        let values = predictor.predict(&features)?;
        Ok::<_, PredictorError>((predictor.version().to_string(), values))
    });

    let (version, values) = match tokio::time::timeout(timeout, task).await {
        Err(_) => return Prediction::Fallback(FallbackReason::TimedOut(timeout)),
        Ok(Err(join_err)) => return Prediction::Fallback(FallbackReason::Failed(join_err.to_string())),
        Ok(Ok(Err(e))) => return Prediction::Fallback(FallbackReason::Failed(e.to_string())),
        Ok(Ok(Ok(out))) => out,
    };

    if values.len() != expected {
        return Prediction::Fallback(FallbackReason::ShapeMismatch {
            expected,
            actual: values.len(),
        });
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Prediction::Fallback(FallbackReason::NonFinite);
    }

    Prediction::Model { version, values }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ml::baseline::DEFAULT_BASELINE;
    use crate::ml::features::FeatureBuilder;
    use crate::models::ForecastMonth;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Predictor test double with a fixed behaviour.
    pub(crate) enum StubPredictor {
        Constant(f64),
        Error,
        Truncated,
        NotANumber,
        Panics,
        Slow(Duration),
    }

    impl Predictor for StubPredictor {
        fn predict(&self, features: &[FeatureVector]) -> Result<Vec<f64>, PredictorError> {
            match self {
                Self::Constant(v) => Ok(vec![*v; features.len()]),
                Self::Error => Err(PredictorError::Invocation("bad input".into())),
                Self::Truncated => Ok(vec![1.0; features.len().saturating_sub(1)]),
                Self::NotANumber => Ok(vec![f64::NAN; features.len()]),
                Self::Panics => panic!("model crashed"),
                Self::Slow(d) => {
                    std::thread::sleep(*d);
                    Ok(vec![1.0; features.len()])
                }
            }
        }

        fn version(&self) -> &str {
            "stub-1"
        }
    }

    fn features(n: u32) -> Vec<FeatureVector> {
        FeatureBuilder::build(&DEFAULT_BASELINE, ForecastMonth::new(2026, 1), n, None)
    }

    async fn run(stub: StubPredictor, timeout: Duration) -> Prediction {
        let predictor: Arc<dyn Predictor> = Arc::new(stub);
        run_predictor(Some(predictor), features(3), timeout).await
    }

    #[test]
    fn test_linear_model_predict() {
        let mut coefficients = vec![0.0; FEATURE_COUNT];
        coefficients[6] = 2.0;
        let model = LinearModel::new("lin-1", 10.0, coefficients).unwrap();

        let input = features(2);
        let out = model.predict(&input).unwrap();
        assert_eq!(out.len(), 2);
        assert!((out[0] - (10.0 + 2.0 * input[0].projected_consumption())).abs() < 1e-9);
        assert_eq!(model.version(), "lin-1");
    }

    #[test]
    fn test_linear_model_rejects_non_finite_input() {
        let model = LinearModel::new("lin-1", 0.0, vec![1.0; FEATURE_COUNT]).unwrap();
        let mut values = [1.0; FEATURE_COUNT];
        values[4] = f64::INFINITY;
        let input = vec![FeatureVector::new(ForecastMonth::new(2026, 3), values)];

        let err = model.predict(&input).unwrap_err();
        assert_eq!(err.to_string(), "prediction failed: non-finite input for 2026-03");
    }

    #[test]
    fn test_linear_model_rejects_wrong_width() {
        let err = LinearModel::new("lin-1", 0.0, vec![1.0; 5]).unwrap_err();
        assert!(matches!(err, PredictorError::FeatureCount { expected: 11, actual: 5 }));
    }

    #[test]
    fn test_load_missing_artifact() {
        assert!(LinearModel::load("/nonexistent/model.json").unwrap().is_none());
    }

    #[test]
    fn test_load_artifact() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"version":"2.1.0","intercept":5.0,"coefficients":[0,0,0,0,0,0,1,0,0,0,0]}}"#
        )
        .unwrap();

        let model = LinearModel::load(file.path()).unwrap().unwrap();
        assert_eq!(model.version(), "2.1.0");

        let mut bad = NamedTempFile::new().unwrap();
        write!(bad, "not json").unwrap();
        assert!(matches!(LinearModel::load(bad.path()), Err(PredictorError::Format(_))));
    }

    #[tokio::test]
    async fn test_no_model_falls_back() {
        let outcome = run_predictor(None, features(3), Duration::from_secs(1)).await;
        assert_eq!(outcome, Prediction::Fallback(FallbackReason::NoModel));
    }

    #[tokio::test]
    async fn test_model_values_pass_through() {
        let outcome = run(StubPredictor::Constant(900.0), Duration::from_secs(1)).await;
        assert_eq!(
            outcome,
            Prediction::Model {
                version: "stub-1".into(),
                values: vec![900.0; 3]
            }
        );
    }

    #[tokio::test]
    async fn test_failures_are_tagged() {
        let timeout = Duration::from_secs(1);
        assert!(matches!(
            run(StubPredictor::Error, timeout).await,
            Prediction::Fallback(FallbackReason::Failed(_))
        ));
        assert_eq!(
            run(StubPredictor::Truncated, timeout).await,
            Prediction::Fallback(FallbackReason::ShapeMismatch { expected: 3, actual: 2 })
        );
        assert_eq!(
            run(StubPredictor::NotANumber, timeout).await,
            Prediction::Fallback(FallbackReason::NonFinite)
        );
        assert!(matches!(
            run(StubPredictor::Panics, timeout).await,
            Prediction::Fallback(FallbackReason::Failed(_))
        ));
    }

    #[tokio::test]
    async fn test_slow_model_times_out() {
        let outcome = run(StubPredictor::Slow(Duration::from_millis(500)), Duration::from_millis(20)).await;
        assert_eq!(
            outcome,
            Prediction::Fallback(FallbackReason::TimedOut(Duration::from_millis(20)))
        );
    }
}
