use crate::domain::models::{DailyPrayerTimes, Prayer, TimeSource};
use crate::infrastructure::config::RemoteOracleConfig;
use crate::infrastructure::error::OracleError;
use crate::infrastructure::time_oracle::{wall_clock_to_utc, OracleQuery, TimeOracle};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Remote oracle backed by the Aladhan `timings/{unix timestamp}` endpoint.
#[derive(Debug, Clone)]
pub struct AladhanTimingsOracle {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl AladhanTimingsOracle {
    pub fn new(config: &RemoteOracleConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.clone(),
            timeout: config.timeout,
        }
    }

    fn timings_endpoint(&self, timestamp: i64) -> Result<Url, OracleError> {
        self.base_url
            .join(&format!("timings/{timestamp}"))
            .map_err(|error| OracleError::Transport(format!("invalid timings url: {error}")))
    }

    async fn fetch_timings(&self, query: &OracleQuery) -> Result<HashMap<String, String>, OracleError> {
        let endpoint = self.timings_endpoint(query.now.timestamp())?;
        let response = self
            .client
            .get(endpoint)
            .query(&[
                ("latitude", query.coordinate.latitude.to_string()),
                ("longitude", query.coordinate.longitude.to_string()),
                ("method", query.convention.remote_id().to_string()),
            ])
            .send()
            .await
            .map_err(|error| OracleError::Transport(format!("network error while fetching timings: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| OracleError::Transport(format!("failed reading timings response: {error}")))?;

        if !status.is_success() {
            return Err(OracleError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TimingsEnvelope = serde_json::from_str(&body).map_err(|error| {
            OracleError::Payload(format!("invalid timings payload: {error}; body={body}"))
        })?;
        parsed
            .data
            .and_then(|data| data.timings)
            .ok_or_else(|| OracleError::Payload("response did not include data.timings".to_string()))
    }
}

#[derive(Debug, serde::Deserialize)]
struct TimingsEnvelope {
    data: Option<TimingsData>,
}

#[derive(Debug, serde::Deserialize)]
struct TimingsData {
    timings: Option<HashMap<String, String>>,
}

/// Strict `HH:mm` parser.
pub fn parse_clock(raw: &str) -> Option<NaiveTime> {
    let (hour, minute) = raw.trim().split_once(':')?;
    let is_two_digits = |part: &str| part.len() == 2 && part.bytes().all(|byte| byte.is_ascii_digit());
    if !is_two_digits(hour) || !is_two_digits(minute) {
        return None;
    }
    let hour = hour.parse::<u32>().ok()?;
    let minute = minute.parse::<u32>().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Converts the six named wall-clock strings into absolute instants for `date`.
/// Any missing or malformed entry fails the whole set.
pub fn timings_to_daily_times(
    timings: &HashMap<String, String>,
    date: NaiveDate,
    timezone: Tz,
) -> Result<DailyPrayerTimes, OracleError> {
    let resolve = |prayer: Prayer| {
        let raw = timings
            .get(prayer.name())
            .ok_or_else(|| OracleError::IncompleteTimings(format!("missing {}", prayer.name())))?;
        let clock = parse_clock(raw).ok_or_else(|| {
            OracleError::IncompleteTimings(format!("malformed {} value '{raw}'", prayer.name()))
        })?;
        wall_clock_to_utc(date, clock, timezone).ok_or_else(|| {
            OracleError::IncompleteTimings(format!(
                "{} {raw} does not exist on {date} in {}",
                prayer.name(),
                timezone.name()
            ))
        })
    };

    let times = DailyPrayerTimes {
        fajr: resolve(Prayer::Fajr)?,
        sunrise: resolve(Prayer::Sunrise)?,
        dhuhr: resolve(Prayer::Dhuhr)?,
        asr: resolve(Prayer::Asr)?,
        maghrib: resolve(Prayer::Maghrib)?,
        isha: resolve(Prayer::Isha)?,
    };
    times.validate().map_err(OracleError::Payload)?;
    Ok(times)
}

#[async_trait]
impl TimeOracle for AladhanTimingsOracle {
    fn source(&self) -> TimeSource {
        TimeSource::Remote
    }

    async fn daily_times(&self, query: &OracleQuery) -> Result<DailyPrayerTimes, OracleError> {
        let timings = tokio::time::timeout(self.timeout, self.fetch_timings(query))
            .await
            .map_err(|_| OracleError::Timeout {
                seconds: self.timeout.as_secs(),
            })??;
        timings_to_daily_times(&timings, query.local_date(), query.timezone)
    }
}
