use crate::infrastructure::error::InfraError;
use chrono::NaiveTime;
use chrono_tz::Tz;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

const APP_JSON: &str = "app.json";
const ORACLE_JSON: &str = "oracle.json";
const ALERTS_JSON: &str = "alerts.json";

pub const DEFAULT_REMOTE_BASE_URL: &str = "https://api.aladhan.com/v1/";
pub const DEFAULT_REMOTE_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_PRIMARY_AZAN_SOUND: &str = "makkah.caf";
const DEFAULT_TICK_INTERVAL_MILLIS: u64 = 1_000;
const DEFAULT_ROLLOVER_TIME: &str = "00:01";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigBundle {
    pub app: serde_json::Value,
    pub oracle: serde_json::Value,
    pub alerts: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteOracleConfig {
    pub base_url: Url,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub timezone: Tz,
    pub tick_interval: Duration,
    pub rollover_time: NaiveTime,
    pub remote_oracle: RemoteOracleConfig,
    pub primary_azan_sound: String,
    pub log_level: LevelFilter,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            tick_interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MILLIS),
            rollover_time: NaiveTime::from_hms_opt(0, 1, 0).expect("valid fixed time"),
            remote_oracle: RemoteOracleConfig {
                base_url: Url::parse(DEFAULT_REMOTE_BASE_URL).expect("valid fixed url"),
                timeout: Duration::from_secs(DEFAULT_REMOTE_TIMEOUT_SECONDS),
            },
            primary_azan_sound: DEFAULT_PRIMARY_AZAN_SOUND.to_string(),
            log_level: LevelFilter::Info,
        }
    }
}

fn default_files() -> HashMap<&'static str, serde_json::Value> {
    HashMap::from([
        (
            APP_JSON,
            serde_json::json!({
                "schema": 1,
                "timezone": "UTC",
                "tickIntervalMillis": DEFAULT_TICK_INTERVAL_MILLIS,
                "rolloverTime": DEFAULT_ROLLOVER_TIME,
                "logLevel": DEFAULT_LOG_LEVEL
            }),
        ),
        (
            ORACLE_JSON,
            serde_json::json!({
                "schema": 1,
                "baseUrl": DEFAULT_REMOTE_BASE_URL,
                "timeoutSeconds": DEFAULT_REMOTE_TIMEOUT_SECONDS
            }),
        ),
        (
            ALERTS_JSON,
            serde_json::json!({
                "schema": 1,
                "primaryAzanSound": DEFAULT_PRIMARY_AZAN_SOUND
            }),
        ),
    ])
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    for (name, value) in default_files() {
        let path = config_dir.join(name);
        if !path.exists() {
            let formatted = serde_json::to_string_pretty(&value)?;
            fs::write(path, format!("{formatted}\n"))?;
        }
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_configs(config_dir: &Path) -> Result<ConfigBundle, InfraError> {
    Ok(ConfigBundle {
        app: read_config(&config_dir.join(APP_JSON))?,
        oracle: read_config(&config_dir.join(ORACLE_JSON))?,
        alerts: read_config(&config_dir.join(ALERTS_JSON))?,
    })
}

fn trimmed_str<'a>(value: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

pub fn parse_timezone(value: &str) -> Result<Tz, InfraError> {
    value
        .trim()
        .parse::<Tz>()
        .map_err(|error| InfraError::InvalidConfig(format!("invalid timezone '{value}': {error}")))
}

pub fn read_timezone(config_dir: &Path) -> Result<Option<Tz>, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    trimmed_str(&app, "timezone").map(parse_timezone).transpose()
}

impl ConfigBundle {
    pub fn to_app_config(&self) -> Result<AppConfig, InfraError> {
        let defaults = AppConfig::default();

        let timezone = match trimmed_str(&self.app, "timezone") {
            Some(value) => parse_timezone(value)?,
            None => defaults.timezone,
        };

        let tick_interval = match self.app.get("tickIntervalMillis") {
            None => defaults.tick_interval,
            Some(value) => {
                let millis = value.as_u64().filter(|millis| (1..=1_000).contains(millis));
                let millis = millis.ok_or_else(|| {
                    InfraError::InvalidConfig(format!(
                        "tickIntervalMillis must be within 1..=1000, got {value}"
                    ))
                })?;
                Duration::from_millis(millis)
            }
        };

        let rollover_time = match trimmed_str(&self.app, "rolloverTime") {
            Some(value) => NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| {
                InfraError::InvalidConfig(format!("rolloverTime must be HH:MM, got '{value}'"))
            })?,
            None => defaults.rollover_time,
        };

        let log_level = match trimmed_str(&self.app, "logLevel") {
            Some(value) => value.parse::<LevelFilter>().map_err(|_| {
                InfraError::InvalidConfig(format!(
                    "logLevel must be one of off, error, warn, info, debug, trace; got '{value}'"
                ))
            })?,
            None => defaults.log_level,
        };

        let base_url = match trimmed_str(&self.oracle, "baseUrl") {
            Some(value) => {
                let normalized = if value.ends_with('/') {
                    value.to_string()
                } else {
                    format!("{value}/")
                };
                Url::parse(&normalized).map_err(|error| {
                    InfraError::InvalidConfig(format!("invalid baseUrl '{value}': {error}"))
                })?
            }
            None => defaults.remote_oracle.base_url,
        };

        let timeout = match self.oracle.get("timeoutSeconds") {
            None => defaults.remote_oracle.timeout,
            Some(value) => value
                .as_u64()
                .filter(|seconds| *seconds > 0)
                .map(Duration::from_secs)
                .ok_or_else(|| {
                    InfraError::InvalidConfig(format!(
                        "timeoutSeconds must be a positive integer, got {value}"
                    ))
                })?,
        };

        let primary_azan_sound = trimmed_str(&self.alerts, "primaryAzanSound")
            .map(ToOwned::to_owned)
            .unwrap_or(defaults.primary_azan_sound);

        Ok(AppConfig {
            timezone,
            tick_interval,
            rollover_time,
            remote_oracle: RemoteOracleConfig { base_url, timeout },
            primary_azan_sound,
            log_level,
        })
    }
}

pub fn load_app_config(config_dir: &Path) -> Result<AppConfig, InfraError> {
    load_configs(config_dir)?.to_app_config()
}

pub fn save_timezone(config_dir: &Path, timezone: &str) -> Result<(), InfraError> {
    let timezone = parse_timezone(timezone)?;

    let path = config_dir.join(APP_JSON);
    let mut app = read_config(&path)?;
    let object = app.as_object_mut().ok_or_else(|| {
        InfraError::InvalidConfig(format!("invalid object structure in {}", path.display()))
    })?;
    object.insert(
        "timezone".to_string(),
        serde_json::Value::String(timezone.name().to_string()),
    );

    let formatted = serde_json::to_string_pretty(&app)?;
    fs::write(path, format!("{formatted}\n"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_ID: AtomicUsize = AtomicUsize::new(0);

    struct TempConfigDir {
        path: PathBuf,
    }

    impl TempConfigDir {
        fn new() -> Self {
            let sequence = NEXT_TEMP_ID.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "azan-config-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&path).expect("create temp config dir");
            Self { path }
        }
    }

    impl Drop for TempConfigDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    #[test]
    fn default_configs_load_as_defaults() {
        let dir = TempConfigDir::new();
        ensure_default_configs(&dir.path).expect("write defaults");

        let config = load_app_config(&dir.path).expect("load config");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.remote_oracle.timeout, Duration::from_secs(10));
        assert_eq!(
            config.rollover_time,
            NaiveTime::from_hms_opt(0, 1, 0).expect("valid time")
        );
    }

    #[test]
    fn ensure_default_configs_keeps_existing_files() {
        let dir = TempConfigDir::new();
        ensure_default_configs(&dir.path).expect("write defaults");
        save_timezone(&dir.path, "Asia/Riyadh").expect("save timezone");
        ensure_default_configs(&dir.path).expect("rerun defaults");

        let timezone = read_timezone(&dir.path).expect("read timezone");
        assert_eq!(timezone, Some(chrono_tz::Asia::Riyadh));
    }

    #[test]
    fn rejects_unknown_timezone_and_schema() {
        let dir = TempConfigDir::new();
        ensure_default_configs(&dir.path).expect("write defaults");
        assert!(matches!(
            save_timezone(&dir.path, "Mars/Olympus"),
            Err(InfraError::InvalidConfig(_))
        ));

        fs::write(dir.path.join(APP_JSON), r#"{"schema": 2}"#).expect("overwrite app.json");
        match load_app_config(&dir.path) {
            Err(InfraError::InvalidConfig(message)) => assert!(message.contains("unsupported schema")),
            other => panic!("expected invalid config, got {other:?}"),
        }
    }

    #[test]
    fn rejects_tick_slower_than_one_hertz() {
        let bundle = ConfigBundle {
            app: serde_json::json!({ "schema": 1, "tickIntervalMillis": 5000 }),
            oracle: serde_json::json!({ "schema": 1 }),
            alerts: serde_json::json!({ "schema": 1 }),
        };
        assert!(matches!(
            bundle.to_app_config(),
            Err(InfraError::InvalidConfig(_))
        ));
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let bundle = ConfigBundle {
            app: serde_json::json!({ "schema": 1 }),
            oracle: serde_json::json!({ "schema": 1, "baseUrl": "http://127.0.0.1:9000/v1" }),
            alerts: serde_json::json!({ "schema": 1, "primaryAzanSound": "fajr.caf" }),
        };
        let config = bundle.to_app_config().expect("valid config");
        assert_eq!(config.remote_oracle.base_url.as_str(), "http://127.0.0.1:9000/v1/");
        assert_eq!(config.primary_azan_sound, "fajr.caf");
    }

    #[test]
    fn log_level_is_read_and_validated() {
        let bundle = |level: serde_json::Value| ConfigBundle {
            app: serde_json::json!({ "schema": 1, "logLevel": level }),
            oracle: serde_json::json!({ "schema": 1 }),
            alerts: serde_json::json!({ "schema": 1 }),
        };

        let config = bundle(serde_json::json!("debug")).to_app_config().expect("valid level");
        assert_eq!(config.log_level, LevelFilter::Debug);
        assert!(matches!(
            bundle(serde_json::json!("chatty")).to_app_config(),
            Err(InfraError::InvalidConfig(message)) if message.contains("logLevel")
        ));
    }
}
