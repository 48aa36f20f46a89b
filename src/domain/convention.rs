use serde::{Deserialize, Serialize};

/// Index into [`CONVENTIONS`], as chosen explicitly by the user.
pub type ConventionIndex = usize;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CalculationConvention {
    MuslimWorldLeague,
    Egyptian,
    Karachi,
    UmmAlQura,
    Dubai,
    Qatar,
    Kuwait,
    MoonsightingCommittee,
    NorthAmerica,
    Singapore,
    Turkey,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IshaRule {
    /// Sun depression angle below the horizon, in degrees.
    Angle(f64),
    /// Fixed interval after Maghrib.
    MinutesAfterMaghrib(u32),
}

/// Per-prayer minute offsets applied after the astronomical computation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Adjustments {
    pub fajr: i32,
    pub sunrise: i32,
    pub dhuhr: i32,
    pub asr: i32,
    pub maghrib: i32,
    pub isha: i32,
}

impl Adjustments {
    const NONE: Self = Self {
        fajr: 0,
        sunrise: 0,
        dhuhr: 0,
        asr: 0,
        maghrib: 0,
        isha: 0,
    };

    const DHUHR_ONE: Self = Self {
        dhuhr: 1,
        ..Self::NONE
    };
}

/// Bound applied to Fajr and Isha when the sun stays shallow below the horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwilightBound {
    /// Neither may sit further from sunrise/sunset than half the night.
    MiddleOfTheNight,
    /// Minutes before sunrise/after sunset that vary with latitude and season.
    Seasonal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallbackParams {
    pub fajr_angle: f64,
    pub isha: IshaRule,
    pub twilight: TwilightBound,
    pub adjustments: Adjustments,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConventionInfo {
    pub convention: CalculationConvention,
    pub display_name: &'static str,
    pub remote_id: u16,
    pub fallback: FallbackParams,
}

/// Closed convention table. Order defines [`ConventionIndex`].
pub const CONVENTIONS: [ConventionInfo; 11] = [
    ConventionInfo {
        convention: CalculationConvention::MuslimWorldLeague,
        display_name: "Muslim World League",
        remote_id: 3,
        fallback: FallbackParams {
            fajr_angle: 18.0,
            isha: IshaRule::Angle(17.0),
            twilight: TwilightBound::MiddleOfTheNight,
            adjustments: Adjustments::DHUHR_ONE,
        },
    },
    ConventionInfo {
        convention: CalculationConvention::Egyptian,
        display_name: "Egyptian",
        remote_id: 5,
        fallback: FallbackParams {
            fajr_angle: 19.5,
            isha: IshaRule::Angle(17.5),
            twilight: TwilightBound::MiddleOfTheNight,
            adjustments: Adjustments::DHUHR_ONE,
        },
    },
    ConventionInfo {
        convention: CalculationConvention::Karachi,
        display_name: "Karachi",
        remote_id: 1,
        fallback: FallbackParams {
            fajr_angle: 18.0,
            isha: IshaRule::Angle(18.0),
            twilight: TwilightBound::MiddleOfTheNight,
            adjustments: Adjustments::DHUHR_ONE,
        },
    },
    ConventionInfo {
        convention: CalculationConvention::UmmAlQura,
        display_name: "Umm Al-Qura (Makkah)",
        remote_id: 4,
        fallback: FallbackParams {
            fajr_angle: 18.5,
            isha: IshaRule::MinutesAfterMaghrib(90),
            twilight: TwilightBound::MiddleOfTheNight,
            adjustments: Adjustments::NONE,
        },
    },
    ConventionInfo {
        convention: CalculationConvention::Dubai,
        display_name: "Dubai / Gulf",
        remote_id: 8,
        fallback: FallbackParams {
            fajr_angle: 18.2,
            isha: IshaRule::Angle(18.2),
            twilight: TwilightBound::MiddleOfTheNight,
            adjustments: Adjustments {
                sunrise: -3,
                dhuhr: 3,
                asr: 3,
                maghrib: 3,
                ..Adjustments::NONE
            },
        },
    },
    ConventionInfo {
        convention: CalculationConvention::Qatar,
        display_name: "Qatar",
        remote_id: 10,
        fallback: FallbackParams {
            fajr_angle: 18.0,
            isha: IshaRule::MinutesAfterMaghrib(90),
            twilight: TwilightBound::MiddleOfTheNight,
            adjustments: Adjustments::NONE,
        },
    },
    ConventionInfo {
        convention: CalculationConvention::Kuwait,
        display_name: "Kuwait",
        remote_id: 9,
        fallback: FallbackParams {
            fajr_angle: 18.0,
            isha: IshaRule::Angle(17.5),
            twilight: TwilightBound::MiddleOfTheNight,
            adjustments: Adjustments::NONE,
        },
    },
    ConventionInfo {
        convention: CalculationConvention::MoonsightingCommittee,
        display_name: "Moonsighting Committee",
        remote_id: 15,
        fallback: FallbackParams {
            fajr_angle: 18.0,
            isha: IshaRule::Angle(18.0),
            twilight: TwilightBound::Seasonal,
            adjustments: Adjustments {
                dhuhr: 5,
                maghrib: 3,
                ..Adjustments::NONE
            },
        },
    },
    ConventionInfo {
        convention: CalculationConvention::NorthAmerica,
        display_name: "North America (ISNA)",
        remote_id: 2,
        fallback: FallbackParams {
            fajr_angle: 15.0,
            isha: IshaRule::Angle(15.0),
            twilight: TwilightBound::MiddleOfTheNight,
            adjustments: Adjustments::DHUHR_ONE,
        },
    },
    ConventionInfo {
        convention: CalculationConvention::Singapore,
        display_name: "Singapore",
        remote_id: 11,
        fallback: FallbackParams {
            fajr_angle: 20.0,
            isha: IshaRule::Angle(18.0),
            twilight: TwilightBound::MiddleOfTheNight,
            adjustments: Adjustments::DHUHR_ONE,
        },
    },
    ConventionInfo {
        convention: CalculationConvention::Turkey,
        display_name: "Turkey",
        remote_id: 13,
        fallback: FallbackParams {
            fajr_angle: 18.0,
            isha: IshaRule::Angle(17.0),
            twilight: TwilightBound::MiddleOfTheNight,
            adjustments: Adjustments {
                sunrise: -7,
                dhuhr: 5,
                asr: 4,
                maghrib: 7,
                ..Adjustments::NONE
            },
        },
    },
];

impl CalculationConvention {
    pub fn index(self) -> ConventionIndex {
        self as usize
    }

    pub fn from_index(index: ConventionIndex) -> Option<Self> {
        CONVENTIONS.get(index).map(|info| info.convention)
    }

    pub fn info(self) -> &'static ConventionInfo {
        &CONVENTIONS[self.index()]
    }

    pub fn display_name(self) -> &'static str {
        self.info().display_name
    }

    pub fn remote_id(self) -> u16 {
        self.info().remote_id
    }

    pub fn fallback_params(self) -> FallbackParams {
        self.info().fallback
    }
}

/// Exact-match country table; `None` means the universal default applies.
pub fn convention_for_country(country_code: &str) -> Option<CalculationConvention> {
    use CalculationConvention::*;

    let normalized = country_code.to_ascii_uppercase();
    let convention = match normalized.as_str() {
        "SA" => UmmAlQura,
        "AE" | "BH" | "OM" | "YE" => Dubai,
        "QA" => Qatar,
        "KW" => Kuwait,
        "EG" => Egyptian,
        "PK" | "IN" | "BD" => Karachi,
        "US" | "CA" => NorthAmerica,
        "SG" | "MY" => Singapore,
        "TR" => Turkey,
        "GB" => MoonsightingCommittee,
        _ => return None,
    };
    Some(convention)
}

/// Explicit user choice wins; otherwise the country table, then Muslim World League.
pub fn resolve_convention(
    country_code: Option<&str>,
    explicit_choice: Option<ConventionIndex>,
) -> CalculationConvention {
    if let Some(convention) = explicit_choice.and_then(CalculationConvention::from_index) {
        return convention;
    }
    country_code
        .and_then(convention_for_country)
        .unwrap_or(CalculationConvention::MuslimWorldLeague)
}
