use crate::domain::convention::{Adjustments, FallbackParams, IshaRule, TwilightBound};
use crate::domain::models::{Coordinate, DailyPrayerTimes, TimeSource};
use crate::infrastructure::error::OracleError;
use crate::infrastructure::solar::solar_day;
use crate::infrastructure::time_oracle::{OracleQuery, TimeOracle};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

/// Shafi school: Asr when an object's shadow equals its length plus the noon shadow.
pub const SHAFI_SHADOW_FACTOR: f64 = 1.0;

/// At and above this latitude the seasonal bound starts from a seventh of the night.
const SEASONAL_NIGHT_FRACTION_LATITUDE: f64 = 55.0;

/// Offline prayer times for `date`.
///
/// Where Fajr or Isha has no astronomical solution, or falls outside the
/// convention's [`TwilightBound`], the bound is used instead.
/// Returns `None` when the sun does not rise or set on `date`.
pub fn compute_local(
    coordinate: Coordinate,
    params: &FallbackParams,
    date: NaiveDate,
) -> Option<DailyPrayerTimes> {
    let isha_angle = match params.isha {
        IshaRule::Angle(angle) => Some(angle),
        IshaRule::MinutesAfterMaghrib(_) => None,
    };
    let day = solar_day(
        coordinate.latitude,
        coordinate.longitude,
        date,
        params.fajr_angle,
        isha_angle,
        SHAFI_SHADOW_FACTOR,
    )?;

    let night = 24.0 - (day.sunset - day.sunrise);
    let (mut fajr, mut isha_by_angle) = (day.fajr, day.isha);
    let (earliest_fajr, latest_isha) = match params.twilight {
        TwilightBound::MiddleOfTheNight => (day.sunrise - night / 2.0, day.sunset + night / 2.0),
        TwilightBound::Seasonal => {
            if coordinate.latitude >= SEASONAL_NIGHT_FRACTION_LATITUDE {
                fajr = Some(day.sunrise - night / 7.0);
                isha_by_angle = Some(day.sunset + night / 7.0);
            }
            (
                day.sunrise - seasonal_morning_minutes(coordinate.latitude, date) / 60.0,
                day.sunset + seasonal_evening_minutes(coordinate.latitude, date) / 60.0,
            )
        }
    };
    let fajr = fajr
        .filter(|hours| *hours >= earliest_fajr)
        .unwrap_or(earliest_fajr);
    let isha = match params.isha {
        IshaRule::Angle(_) => isha_by_angle
            .filter(|hours| *hours <= latest_isha)
            .unwrap_or(latest_isha),
        IshaRule::MinutesAfterMaghrib(minutes) => day.sunset + f64::from(minutes) / 60.0,
    };

    let midnight = date.and_hms_opt(0, 0, 0)?.and_utc();
    let Adjustments {
        fajr: fajr_offset,
        sunrise: sunrise_offset,
        dhuhr: dhuhr_offset,
        asr: asr_offset,
        maghrib: maghrib_offset,
        isha: isha_offset,
    } = params.adjustments;
    let at = |solar_hours: f64, offset_minutes: i32| -> Option<DateTime<Utc>> {
        let utc_minutes = ((solar_hours - coordinate.longitude / 15.0) * 60.0).round();
        if !utc_minutes.is_finite() {
            return None;
        }
        Some(midnight + Duration::minutes(utc_minutes as i64 + i64::from(offset_minutes)))
    };

    let times = DailyPrayerTimes {
        fajr: at(fajr, fajr_offset)?,
        sunrise: at(day.sunrise, sunrise_offset)?,
        dhuhr: at(day.noon, dhuhr_offset)?,
        asr: at(day.asr, asr_offset)?,
        maghrib: at(day.sunset, maghrib_offset)?,
        isha: at(isha, isha_offset)?,
    };
    times.validate().ok()?;
    Some(times)
}

/// Days since the winter solstice, offset so the seasonal curve starts there.
fn days_since_solstice(latitude: f64, date: NaiveDate) -> f64 {
    let day_of_year = i64::from(date.ordinal());
    let days_in_year = if date.leap_year() { 366 } else { 365 };
    let days = if latitude >= 0.0 {
        let shifted = day_of_year + 10;
        if shifted >= days_in_year { shifted - days_in_year } else { shifted }
    } else {
        let shifted = day_of_year - if date.leap_year() { 173 } else { 172 };
        if shifted < 0 { shifted + days_in_year } else { shifted }
    };
    days as f64
}

/// Piecewise-linear curve through the four seasonal anchors `[a, b, c, d]`.
fn seasonal_curve(anchors: [f64; 4], days: f64) -> f64 {
    let [a, b, c, d] = anchors;
    if days < 91.0 {
        a + (b - a) / 91.0 * days
    } else if days < 137.0 {
        b + (c - b) / 46.0 * (days - 91.0)
    } else if days < 183.0 {
        c + (d - c) / 46.0 * (days - 137.0)
    } else if days < 229.0 {
        d + (c - d) / 46.0 * (days - 183.0)
    } else if days < 275.0 {
        c + (b - c) / 46.0 * (days - 229.0)
    } else {
        b + (a - b) / 91.0 * (days - 275.0)
    }
}

/// Minutes between Fajr and sunrise under the seasonal bound.
pub fn seasonal_morning_minutes(latitude: f64, date: NaiveDate) -> f64 {
    let scale = latitude.abs() / 55.0;
    seasonal_curve(
        [
            75.0 + 28.65 * scale,
            75.0 + 19.44 * scale,
            75.0 + 32.74 * scale,
            75.0 + 48.10 * scale,
        ],
        days_since_solstice(latitude, date),
    )
}

/// Minutes between sunset and Isha under the seasonal bound (general shafaq).
pub fn seasonal_evening_minutes(latitude: f64, date: NaiveDate) -> f64 {
    let scale = latitude.abs() / 55.0;
    seasonal_curve(
        [
            75.0 + 25.60 * scale,
            75.0 + 2.050 * scale,
            75.0 - 9.21 * scale,
            75.0 + 6.14 * scale,
        ],
        days_since_solstice(latitude, date),
    )
}

/// Offline oracle; always available, never touches the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTimeOracle;

#[async_trait]
impl TimeOracle for LocalTimeOracle {
    fn source(&self) -> TimeSource {
        TimeSource::Offline
    }

    async fn daily_times(&self, query: &OracleQuery) -> Result<DailyPrayerTimes, OracleError> {
        let date = query.local_date();
        compute_local(query.coordinate, &query.convention.fallback_params(), date).ok_or(
            OracleError::NoSolution {
                latitude: query.coordinate.latitude,
                date,
            },
        )
    }
}
