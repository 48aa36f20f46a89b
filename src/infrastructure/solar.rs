//! Solar position and the hour angles prayer times are derived from.
//!
//! All clock values are hours of local mean solar time on the requested
//! date; convert to UTC by subtracting `longitude / 15`.

use chrono::{Datelike, NaiveDate};

/// Apparent altitude of the sun's upper limb at sunrise/sunset, below the horizon.
pub const RISE_SET_ANGLE: f64 = 0.833;

const ITERATIONS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunPosition {
    /// Degrees.
    pub declination: f64,
    /// Hours.
    pub equation_of_time: f64,
}

/// Hours of local mean solar time for the raw astronomical events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarDay {
    pub fajr: Option<f64>,
    pub sunrise: f64,
    pub noon: f64,
    pub asr: f64,
    pub sunset: f64,
    pub isha: Option<f64>,
}

/// Julian day at 0h UT of a Gregorian date.
pub fn julian_day(date: NaiveDate) -> f64 {
    let mut year = f64::from(date.year());
    let mut month = f64::from(date.month());
    let day = f64::from(date.day());
    if month <= 2.0 {
        year -= 1.0;
        month += 12.0;
    }
    let century = (year / 100.0).floor();
    let correction = 2.0 - century + (century / 4.0).floor();
    (365.25 * (year + 4716.0)).floor() + (30.6001 * (month + 1.0)).floor() + day + correction
        - 1524.5
}

pub fn sun_position(julian_day: f64) -> SunPosition {
    let days = julian_day - 2_451_545.0;
    let mean_anomaly = fix_angle(357.529 + 0.985_600_28 * days);
    let mean_longitude = fix_angle(280.459 + 0.985_647_36 * days);
    let ecliptic_longitude = fix_angle(
        mean_longitude + 1.915 * sin(mean_anomaly) + 0.020 * sin(2.0 * mean_anomaly),
    );
    let obliquity = 23.439 - 0.000_000_36 * days;

    let right_ascension =
        fix_hour(atan2(cos(obliquity) * sin(ecliptic_longitude), cos(ecliptic_longitude)) / 15.0);
    let mut equation_of_time = mean_longitude / 15.0 - right_ascension;
    if equation_of_time > 12.0 {
        equation_of_time -= 24.0;
    } else if equation_of_time < -12.0 {
        equation_of_time += 24.0;
    }

    SunPosition {
        declination: asin(sin(obliquity) * sin(ecliptic_longitude)),
        equation_of_time,
    }
}

struct SolarCalculator {
    latitude: f64,
    /// Julian day at local mean midnight.
    local_midnight: f64,
}

impl SolarCalculator {
    fn position_at(&self, hours: f64) -> SunPosition {
        sun_position(self.local_midnight + hours / 24.0)
    }

    fn mid_day(&self, hours: f64) -> f64 {
        fix_hour(12.0 - self.position_at(hours).equation_of_time)
    }

    /// Time the sun reaches `angle` degrees below the horizon, before or after noon.
    fn sun_angle_time(&self, angle: f64, hours: f64, before_noon: bool) -> Option<f64> {
        let declination = self.position_at(hours).declination;
        let noon = self.mid_day(hours);
        let cos_hour_angle = (-sin(angle) - sin(declination) * sin(self.latitude))
            / (cos(declination) * cos(self.latitude));
        if !cos_hour_angle.is_finite() || !(-1.0..=1.0).contains(&cos_hour_angle) {
            return None;
        }
        let hour_angle = acos(cos_hour_angle) / 15.0;
        Some(if before_noon {
            noon - hour_angle
        } else {
            noon + hour_angle
        })
    }

    fn asr_time(&self, shadow_factor: f64, hours: f64) -> Option<f64> {
        let declination = self.position_at(hours).declination;
        let angle = -acot(shadow_factor + tan((self.latitude - declination).abs()));
        self.sun_angle_time(angle, hours, false)
    }
}

/// Computes the raw events for `date`. `None` when the sun neither rises nor sets.
pub fn solar_day(
    latitude: f64,
    longitude: f64,
    date: NaiveDate,
    fajr_angle: f64,
    isha_angle: Option<f64>,
    shadow_factor: f64,
) -> Option<SolarDay> {
    let calculator = SolarCalculator {
        latitude,
        local_midnight: julian_day(date) - longitude / (15.0 * 24.0),
    };

    let mut fajr = Some(5.0);
    let mut sunrise = 6.0;
    let mut noon = 12.0;
    let mut asr = 13.0;
    let mut sunset = 18.0;
    let mut isha = isha_angle.map(|_| 18.0);

    for _ in 0..ITERATIONS {
        fajr = fajr.and_then(|hours| calculator.sun_angle_time(fajr_angle, hours, true));
        sunrise = calculator.sun_angle_time(RISE_SET_ANGLE, sunrise, true)?;
        noon = calculator.mid_day(noon);
        asr = calculator.asr_time(shadow_factor, asr)?;
        sunset = calculator.sun_angle_time(RISE_SET_ANGLE, sunset, false)?;
        isha = match (isha, isha_angle) {
            (Some(hours), Some(angle)) => calculator.sun_angle_time(angle, hours, false),
            _ => None,
        };
    }

    Some(SolarDay {
        fajr,
        sunrise,
        noon,
        asr,
        sunset,
        isha,
    })
}

fn sin(degrees: f64) -> f64 {
    degrees.to_radians().sin()
}

fn cos(degrees: f64) -> f64 {
    degrees.to_radians().cos()
}

fn tan(degrees: f64) -> f64 {
    degrees.to_radians().tan()
}

fn asin(value: f64) -> f64 {
    value.asin().to_degrees()
}

fn acos(value: f64) -> f64 {
    value.acos().to_degrees()
}

fn atan2(y: f64, x: f64) -> f64 {
    y.atan2(x).to_degrees()
}

fn acot(value: f64) -> f64 {
    (1.0 / value).atan().to_degrees()
}

fn fix_angle(degrees: f64) -> f64 {
    degrees.rem_euclid(360.0)
}

fn fix_hour(hours: f64) -> f64 {
    hours.rem_euclid(24.0)
}
