use crate::domain::convention::CalculationConvention;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(format!(
                "coordinate.latitude must be within [-90, 90], got {}",
                self.latitude
            ));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(format!(
                "coordinate.longitude must be within [-180, 180], got {}",
                self.longitude
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Prayer {
    Fajr,
    Sunrise,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl Prayer {
    /// Chronological display order.
    pub const ALL: [Prayer; 6] = [
        Prayer::Fajr,
        Prayer::Sunrise,
        Prayer::Dhuhr,
        Prayer::Asr,
        Prayer::Maghrib,
        Prayer::Isha,
    ];

    /// Prayers that may carry an alert. Sunrise is informational only.
    pub const ALERTABLE: [Prayer; 5] = [
        Prayer::Fajr,
        Prayer::Dhuhr,
        Prayer::Asr,
        Prayer::Maghrib,
        Prayer::Isha,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Fajr => "Fajr",
            Self::Sunrise => "Sunrise",
            Self::Dhuhr => "Dhuhr",
            Self::Asr => "Asr",
            Self::Maghrib => "Maghrib",
            Self::Isha => "Isha",
        }
    }

    pub fn is_alertable(self) -> bool {
        !matches!(self, Self::Sunrise)
    }
}

/// Six absolute instants for one calendar day, Fajr through Isha.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DailyPrayerTimes {
    pub fajr: DateTime<Utc>,
    pub sunrise: DateTime<Utc>,
    pub dhuhr: DateTime<Utc>,
    pub asr: DateTime<Utc>,
    pub maghrib: DateTime<Utc>,
    pub isha: DateTime<Utc>,
}

impl DailyPrayerTimes {
    pub fn time(&self, prayer: Prayer) -> DateTime<Utc> {
        match prayer {
            Prayer::Fajr => self.fajr,
            Prayer::Sunrise => self.sunrise,
            Prayer::Dhuhr => self.dhuhr,
            Prayer::Asr => self.asr,
            Prayer::Maghrib => self.maghrib,
            Prayer::Isha => self.isha,
        }
    }

    pub fn ordered(&self) -> [(Prayer, DateTime<Utc>); 6] {
        Prayer::ALL.map(|prayer| (prayer, self.time(prayer)))
    }

    pub fn validate(&self) -> Result<(), String> {
        let ordered = self.ordered();
        for pair in ordered.windows(2) {
            let (earlier, earlier_at) = pair[0];
            let (later, later_at) = pair[1];
            if later_at <= earlier_at {
                return Err(format!(
                    "prayer_times.{} must be after prayer_times.{}",
                    later.name().to_ascii_lowercase(),
                    earlier.name().to_ascii_lowercase()
                ));
            }
        }
        Ok(())
    }

    /// First entry of the six-entry order strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<NextPrayer> {
        self.ordered()
            .into_iter()
            .find(|(_, at)| *at > now)
            .map(|(prayer, at)| NextPrayer {
                prayer,
                at,
                countdown: at - now,
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextPrayer {
    pub prayer: Prayer,
    pub at: DateTime<Utc>,
    pub countdown: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum AlertStyle {
    DefaultTone,
    PrimaryAzanTone,
    CustomTone(String),
    Silent,
}

impl AlertStyle {
    pub fn default_for(prayer: Prayer) -> Self {
        match prayer {
            Prayer::Fajr | Prayer::Asr | Prayer::Maghrib | Prayer::Isha => Self::PrimaryAzanTone,
            Prayer::Dhuhr | Prayer::Sunrise => Self::DefaultTone,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimeSource {
    Remote,
    Offline,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SchedulePhase {
    #[default]
    Idle,
    Resolving,
    Resolved,
}

/// Snapshot published by the schedule engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleState {
    pub phase: SchedulePhase,
    pub current_prayer_times: Option<DailyPrayerTimes>,
    pub next_prayer: Option<Prayer>,
    pub countdown: Option<Duration>,
    pub last_resolution_at: Option<DateTime<Utc>>,
    pub convention: Option<CalculationConvention>,
    pub source: Option<TimeSource>,
}

impl ScheduleState {
    /// Recomputes `next_prayer`/`countdown`; returns whether either changed.
    pub fn refresh_next(&mut self, now: DateTime<Utc>) -> bool {
        let next = self
            .current_prayer_times
            .as_ref()
            .and_then(|times| times.next_after(now));
        let next_prayer = next.map(|value| value.prayer);
        let countdown = next.map(|value| value.countdown);
        if self.next_prayer == next_prayer && self.countdown == countdown {
            return false;
        }
        self.next_prayer = next_prayer;
        self.countdown = countdown;
        true
    }
}
