//! Configuration structures.

use ats_data::{HttpSettings, KisConfig, KiwoomConfig, RateLimitSignatures};
use ats_pipeline::{CollectorConfig, IndicatorRunnerConfig, RetryPolicy};
use config::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub indicators: IndicatorSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

impl AppConfig {
    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, provider) in [("kiwoom", &self.providers.kiwoom), ("kis", &self.providers.kis)] {
            if provider.max_concurrency == 0 {
                return Err(ConfigError::Message(format!(
                    "providers.{}.max_concurrency must be at least 1",
                    name
                )));
            }
            if provider.max_attempts == 0 {
                return Err(ConfigError::Message(format!(
                    "providers.{}.max_attempts must be at least 1",
                    name
                )));
            }
            if provider.max_pages == 0 {
                return Err(ConfigError::Message(format!(
                    "providers.{}.max_pages must be at least 1",
                    name
                )));
            }
        }
        for (name, batch) in [
            ("fundamentals", &self.providers.fundamentals),
            ("financial_ratio", &self.providers.financial_ratio),
        ] {
            if batch.max_concurrency == 0 {
                return Err(ConfigError::Message(format!(
                    "providers.{}.max_concurrency must be at least 1",
                    name
                )));
            }
        }
        if self.indicators.chunk_size == 0 {
            return Err(ConfigError::Message("indicators.chunk_size must be at least 1".into()));
        }
        if self.indicators.history_limit < self.indicators.min_history {
            return Err(ConfigError::Message(
                "indicators.history_limit must not be below indicators.min_history".into(),
            ));
        }
        Ok(())
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// General app settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "ats-collector".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }

    /// Apply command-line overrides. A missing level keeps the configured
    /// one; `json` can only switch JSON on.
    pub fn with_overrides(mut self, level: Option<&str>, json: bool) -> Self {
        if let Some(level) = level {
            self.level = level.to_string();
        }
        if json {
            self.format = "json".to_string();
        }
        self
    }
}

/// Network-client timeouts shared by all providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 3000,
            request_timeout_ms: 5000,
        }
    }
}

impl HttpConfig {
    pub fn settings(&self) -> HttpSettings {
        HttpSettings {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }
}

/// Per-provider collection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub base_url: String,
    pub max_concurrency: usize,
    pub max_attempts: u32,
    pub backoff_ms: u64,
    pub success_delay_ms: u64,
    pub page_delay_ms: u64,
    pub max_pages: usize,
    pub rate_limit_signatures: Vec<String>,
    pub app_key_env: Option<String>,
    pub app_secret_env: Option<String>,
}

impl ProviderSettings {
    pub fn kiwoom() -> Self {
        Self {
            base_url: "https://api.kiwoom.com".to_string(),
            max_concurrency: 10,
            max_attempts: 3,
            backoff_ms: 1000,
            success_delay_ms: 0,
            page_delay_ms: 50,
            max_pages: 20,
            rate_limit_signatures: vec!["허용된 요청 개수를 초과".to_string()],
            app_key_env: None,
            app_secret_env: None,
        }
    }

    pub fn kis() -> Self {
        Self {
            base_url: "https://openapi.koreainvestment.com:9443".to_string(),
            max_concurrency: 5,
            success_delay_ms: 200,
            rate_limit_signatures: vec!["EGW00201".to_string(), "msg1\":\"초당".to_string()],
            app_key_env: Some("KIS_APP_KEY".to_string()),
            app_secret_env: Some("KIS_APP_SECRET".to_string()),
            ..Self::kiwoom()
        }
    }

    /// Collector tuning derived from these settings.
    pub fn collector_config(&self) -> CollectorConfig {
        CollectorConfig {
            max_concurrency: self.max_concurrency,
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
                backoff: Duration::from_millis(self.backoff_ms),
                success_delay: Duration::from_millis(self.success_delay_ms),
            },
            page_delay: Duration::from_millis(self.page_delay_ms),
            max_pages: self.max_pages,
        }
    }

    /// Collector tuning for a batch job that overrides this provider's pacing.
    pub fn batch_config(&self, batch: &BatchSettings) -> CollectorConfig {
        let mut config = self.collector_config();
        config.max_concurrency = batch.max_concurrency;
        config.retry.backoff = Duration::from_millis(batch.backoff_ms);
        config.retry.success_delay = Duration::from_millis(batch.success_delay_ms);
        config
    }

    pub fn signatures(&self) -> RateLimitSignatures {
        RateLimitSignatures::new(self.rate_limit_signatures.iter().cloned())
    }

    /// Read the app key and secret from the configured environment variables.
    pub fn app_credentials(&self) -> Result<(String, String), ConfigError> {
        let read = |var: &Option<String>, what: &str| {
            let name = var
                .as_deref()
                .ok_or_else(|| ConfigError::Message(format!("no environment variable configured for {}", what)))?;
            std::env::var(name).map_err(|_| ConfigError::Message(format!("{} not set", name)))
        };
        Ok((read(&self.app_key_env, "app key")?, read(&self.app_secret_env, "app secret")?))
    }
}

/// Pacing of one batch job, layered over its provider's settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSettings {
    pub max_concurrency: usize,
    pub backoff_ms: u64,
    pub success_delay_ms: u64,
}

impl BatchSettings {
    pub fn fundamentals() -> Self {
        Self::from(&CollectorConfig::kiwoom_fundamentals())
    }

    pub fn financial_ratio() -> Self {
        Self::from(&CollectorConfig::kis_financial_ratio())
    }
}

impl From<&CollectorConfig> for BatchSettings {
    fn from(config: &CollectorConfig) -> Self {
        Self {
            max_concurrency: config.max_concurrency,
            backoff_ms: config.retry.backoff.as_millis() as u64,
            success_delay_ms: config.retry.success_delay.as_millis() as u64,
        }
    }
}

/// Provider section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "ProviderSettings::kiwoom")]
    pub kiwoom: ProviderSettings,
    #[serde(default = "ProviderSettings::kis")]
    pub kis: ProviderSettings,
    /// Basic information sweep
    #[serde(default = "BatchSettings::fundamentals")]
    pub fundamentals: BatchSettings,
    #[serde(default = "BatchSettings::financial_ratio")]
    pub financial_ratio: BatchSettings,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            kiwoom: ProviderSettings::kiwoom(),
            kis: ProviderSettings::kis(),
            fundamentals: BatchSettings::fundamentals(),
            financial_ratio: BatchSettings::financial_ratio(),
        }
    }
}

impl ProvidersConfig {
    pub fn kiwoom_config(&self, http: &HttpConfig) -> KiwoomConfig {
        KiwoomConfig {
            base_url: self.kiwoom.base_url.clone(),
            http: http.settings(),
            rate_limit_signatures: self.kiwoom.signatures(),
        }
    }

    pub fn kis_config(&self, http: &HttpConfig) -> Result<KisConfig, ConfigError> {
        let (app_key, app_secret) = self.kis.app_credentials()?;
        Ok(KisConfig {
            base_url: self.kis.base_url.clone(),
            app_key,
            app_secret,
            http: http.settings(),
            rate_limit_signatures: self.kis.signatures(),
        })
    }
}

/// Indicator batch settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorSettings {
    pub chunk_size: usize,
    pub history_limit: usize,
    pub min_history: usize,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        let runner = IndicatorRunnerConfig::default();
        Self {
            chunk_size: runner.chunk_size,
            history_limit: runner.history_limit,
            min_history: runner.min_history,
        }
    }
}

impl IndicatorSettings {
    pub fn runner_config(&self) -> IndicatorRunnerConfig {
        IndicatorRunnerConfig {
            chunk_size: self.chunk_size,
            history_limit: self.history_limit,
            min_history: self.min_history,
        }
    }
}

/// Local storage settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Directory holding the CSV snapshot
    pub snapshot_dir: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            snapshot_dir: "data".to_string(),
        }
    }
}
