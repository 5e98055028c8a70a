use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScarcityLevel {
    Low,
    Moderate,
    High,
}

impl ScarcityLevel {
    /// Ordinal used as a model input (0 = low, 1 = moderate, 2 = high).
    pub fn ordinal(self) -> f64 {
        match self {
            Self::Low => 0.0,
            Self::Moderate => 1.0,
            Self::High => 2.0,
        }
    }

    /// Dataset labels other than "High" and "Moderate" count as low.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "High" => Self::High,
            "Moderate" => Self::Moderate,
            _ => Self::Low,
        }
    }
}

impl std::fmt::Display for ScarcityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Moderate => write!(f, "moderate"),
            Self::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RegionType {
    State,
    District,
    City,
}

/// Which branch of the pipeline produced a forecast.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ForecastSource {
    Model,
    Fallback,
}

impl std::fmt::Display for ForecastSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Model => write!(f, "model"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// A calendar month, rendered as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ForecastMonth {
    pub year: i32,
    pub month: u32,
}

impl ForecastMonth {
    pub fn new(year: i32, month: u32) -> Self {
        debug_assert!((1..=12).contains(&month));
        Self { year, month }
    }

    pub fn current() -> Self {
        let today = Utc::now().date_naive();
        Self::new(today.year(), today.month())
    }

    /// The month `offset` months after this one.
    pub fn plus(self, offset: u32) -> Self {
        let zero_based = self.month - 1 + offset;
        Self {
            year: self.year + (zero_based / 12) as i32,
            month: zero_based % 12 + 1,
        }
    }

    pub fn label(self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for ForecastMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
