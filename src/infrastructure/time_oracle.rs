use crate::domain::convention::CalculationConvention;
use crate::domain::models::{Coordinate, DailyPrayerTimes, TimeSource};
use crate::infrastructure::error::OracleError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OracleQuery {
    pub coordinate: Coordinate,
    pub convention: CalculationConvention,
    pub now: DateTime<Utc>,
    /// Device zone; defines "today" and how wall-clock strings are read.
    pub timezone: Tz,
}

impl OracleQuery {
    pub fn local_date(&self) -> NaiveDate {
        self.now.with_timezone(&self.timezone).date_naive()
    }
}

/// A source of today's six prayer times for a coordinate/convention pair.
#[async_trait]
pub trait TimeOracle: Send + Sync {
    fn source(&self) -> TimeSource;

    async fn daily_times(&self, query: &OracleQuery) -> Result<DailyPrayerTimes, OracleError>;
}

/// Interprets a wall-clock time on `date` in `timezone`. Times inside a DST gap
/// are pushed forward by the gap; ambiguous times take the earlier instant.
pub fn wall_clock_to_utc(date: NaiveDate, time: NaiveTime, timezone: Tz) -> Option<DateTime<Utc>> {
    let local = date.and_time(time);
    timezone
        .from_local_datetime(&local)
        .earliest()
        .or_else(|| {
            timezone
                .from_local_datetime(&(local + Duration::hours(1)))
                .earliest()
        })
        .map(|value| value.with_timezone(&Utc))
}
