use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub predictor: PredictorConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    #[serde(default = "default_dataset_path")]
    pub dataset_path: String,
    #[serde(default = "default_model_path")]
    pub model_path: String,
}

fn default_dataset_path() -> String {
    "models/cleaned_global_water_consumption.csv".into()
}
fn default_model_path() -> String {
    "models/water_demand_model.json".into()
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dataset_path: default_dataset_path(),
            model_path: default_model_path(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

fn default_cache_ttl() -> u64 {
    3600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,
    #[serde(default = "default_window")]
    pub window_secs: u64,
    /// Key clients by `x-forwarded-for`/`x-real-ip` instead of the peer.
    #[serde(default)]
    pub trust_forwarded_headers: bool,
}

fn default_true() -> bool {
    true
}
fn default_max_requests() -> usize {
    100
}
fn default_window() -> u64 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            max_requests: default_max_requests(),
            window_secs: default_window(),
            trust_forwarded_headers: false,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PredictorConfig {
    #[serde(default = "default_predict_timeout")]
    pub timeout_ms: u64,
}

fn default_predict_timeout() -> u64 {
    2000
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_predict_timeout(),
        }
    }
}

impl PredictorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct JobsConfig {
    #[serde(default = "default_maintenance")]
    pub maintenance_interval_secs: u64,
}

fn default_maintenance() -> u64 {
    300
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            maintenance_interval_secs: default_maintenance(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    /// Empty means any origin.
    #[serde(default = "default_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_origins() -> Vec<String> {
    [
        "http://localhost:5173",
        "http://localhost:8080",
        "http://localhost:8081",
        "http://localhost:3000",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_origins(),
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("WATERCAST")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .try_parsing(true),
            )
            .build()?;

        let app_config: AppConfig = config.try_deserialize()?;
        Ok(app_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_source() {
        let config: AppConfig = config::Config::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 8000);
        assert_eq!(config.cache.ttl(), Duration::from_secs(3600));
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.window(), Duration::from_secs(60));
        assert!(config.rate_limit.enabled);
        assert!(!config.rate_limit.trust_forwarded_headers);
        assert_eq!(config.predictor.timeout(), Duration::from_millis(2000));
        assert_eq!(config.cors.allowed_origins.len(), 4);
    }

    #[test]
    fn test_partial_override() {
        let config: AppConfig = config::Config::builder()
            .set_override("server.port", 9100)
            .unwrap()
            .set_override("rate_limit.max_requests", 5)
            .unwrap()
            .set_override("rate_limit.trust_forwarded_headers", true)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert!(config.rate_limit.trust_forwarded_headers);
    }
}
