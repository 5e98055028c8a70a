use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::types::ForecastSource;

pub const MIN_MONTHS_AHEAD: i64 = 1;
pub const MAX_MONTHS_AHEAD: i64 = 24;
pub const CONFIDENCE_LEVEL: f64 = 0.95;

const MIN_REGION_LEN: usize = 2;
const MAX_REGION_LEN: usize = 100;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("Region cannot be empty")]
    EmptyRegion,
    #[error("region must be between 2 and 100 characters")]
    RegionLength,
    #[error("months_ahead must be between 1 and 24, got {0}")]
    MonthsOutOfRange(i64),
}

impl ValidationError {
    /// Request field the error refers to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::EmptyRegion | Self::RegionLength => "region",
            Self::MonthsOutOfRange(_) => "months_ahead",
        }
    }
}

/// Body of `POST /api/forecast` as sent by clients.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastRequest {
    pub region: String,
    #[serde(default = "default_months_ahead")]
    pub months_ahead: i64,
    #[serde(default = "default_include_confidence")]
    pub include_confidence: bool,
    #[serde(default)]
    pub features: Option<HashMap<String, f64>>,
}

fn default_months_ahead() -> i64 {
    6
}

fn default_include_confidence() -> bool {
    true
}

/// A forecast request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastQuery {
    /// Trimmed and title-cased.
    pub region: String,
    pub months_ahead: u32,
    pub include_confidence: bool,
    pub features: Option<HashMap<String, f64>>,
}

impl ForecastRequest {
    pub fn validate(self) -> Result<ForecastQuery, ValidationError> {
        let trimmed = self.region.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyRegion);
        }
        let len = trimmed.chars().count();
        if !(MIN_REGION_LEN..=MAX_REGION_LEN).contains(&len) {
            return Err(ValidationError::RegionLength);
        }
        if !(MIN_MONTHS_AHEAD..=MAX_MONTHS_AHEAD).contains(&self.months_ahead) {
            return Err(ValidationError::MonthsOutOfRange(self.months_ahead));
        }

        Ok(ForecastQuery {
            region: title_case(trimmed),
            months_ahead: self.months_ahead as u32,
            include_confidence: self.include_confidence,
            features: self.features,
        })
    }
}

/// Upper-case the first letter of every word, lower-case the rest.
/// A word starts after any non-alphabetic character.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDataPoint {
    pub month: String,
    pub demand_mld: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_lower: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_upper: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetadata {
    pub months_forecasted: u32,
    pub features_used: Vec<String>,
    pub cached: bool,
    pub source: ForecastSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub region: String,
    pub forecast: Vec<ForecastDataPoint>,
    pub model_version: String,
    pub generated_at: DateTime<Utc>,
    pub confidence_level: f64,
    pub metadata: ForecastMetadata,
}
