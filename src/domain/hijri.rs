//! Umm al-Qura Hijri date for a civil day.

use chrono::{Datelike, NaiveDate};
use hijri_date::HijriDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// First Gregorian year the Umm al-Qura tables cover.
pub const HIJRI_MIN_YEAR: i32 = 1938;
/// Last Gregorian year the Umm al-Qura tables cover.
pub const HIJRI_MAX_YEAR: i32 = 2076;

const MONTH_NAMES: [&str; 12] = [
    "Muharram",
    "Safar",
    "Rabi' al-Awwal",
    "Rabi' al-Thani",
    "Jumada al-Ula",
    "Jumada al-Akhirah",
    "Rajab",
    "Sha'ban",
    "Ramadhan",
    "Shawwal",
    "Dhu al-Qi'dah",
    "Dhu al-Hijjah",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HijriDay {
    pub year: u32,
    /// 1 = Muharram.
    pub month: u32,
    pub day: u32,
}

impl HijriDay {
    pub fn month_name(&self) -> &'static str {
        MONTH_NAMES
            .get((self.month as usize).wrapping_sub(1))
            .copied()
            .unwrap_or("Unknown")
    }
}

impl fmt::Display for HijriDay {
    /// Long form, e.g. `1 Ramadhan 1445 AH`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} AH", self.day, self.month_name(), self.year)
    }
}

/// Hijri date of the civil day `today`.
pub fn hijri_date(today: NaiveDate) -> Result<HijriDay, String> {
    let year = today.year();
    if !(HIJRI_MIN_YEAR..=HIJRI_MAX_YEAR).contains(&year) {
        return Err(format!(
            "{today} is outside the supported range {HIJRI_MIN_YEAR}..={HIJRI_MAX_YEAR}"
        ));
    }
    let converted = HijriDate::from_gr(year as usize, today.month() as usize, today.day() as usize)
        .map_err(|error| format!("hijri conversion failed for {today}: {error}"))?;
    Ok(HijriDay {
        year: converted.year() as u32,
        month: converted.month() as u32,
        day: converted.day() as u32,
    })
}
