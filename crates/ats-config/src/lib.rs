//! Configuration management.

mod settings;

pub use settings::{
    AppConfig, AppSettings, BatchSettings, HttpConfig, IndicatorSettings, LoggingConfig,
    ProviderSettings, ProvidersConfig, StorageSettings,
};

use config::{Config, ConfigError, Environment, File};
use std::path::Path;

/// Load configuration from defaults, file and environment, in rising priority.
///
/// Environment keys use the `ATS` prefix and `__` as the nesting separator,
/// e.g. `ATS__PROVIDERS__KIS__MAX_CONCURRENCY=3`.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(Config::try_from(&AppConfig::default())?)
        .add_source(File::from(path).required(true))
        .add_source(
            Environment::with_prefix("ATS")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("providers.kiwoom.rate_limit_signatures")
                .with_list_parse_key("providers.kis.rate_limit_signatures")
                .try_parsing(true),
        )
        .build()?;

    let app: AppConfig = config.try_deserialize()?;
    app.validate()?;
    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(name: &str, body: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("ats-config-{}-{}.toml", name, std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let path = write_config(
            "partial",
            r#"
[providers.kis]
max_concurrency = 3

[indicators]
chunk_size = 50
"#,
        );

        let config = load_config(&path).unwrap();

        assert_eq!(config.providers.kis.max_concurrency, 3);
        assert_eq!(config.providers.kis.success_delay_ms, 200);
        assert_eq!(config.providers.kiwoom.max_concurrency, 10);
        assert_eq!(config.indicators.chunk_size, 50);
        assert_eq!(config.indicators.history_limit, 100);
        assert_eq!(config.http.connect_timeout_ms, 3000);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let path = write_config(
            "invalid",
            r#"
[providers.kiwoom]
max_concurrency = 0
"#,
        );

        assert!(load_config(&path).is_err());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let path = std::env::temp_dir().join("ats-config-does-not-exist.toml");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_shipped_default_file_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/default.toml");
        let config = load_config(&path).unwrap();

        assert_eq!(config, AppConfig::default());
    }
}
