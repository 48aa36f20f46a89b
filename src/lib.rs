pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::bootstrap::{bootstrap_workspace, BootstrapResult};
pub use application::notification_scheduler::{
    AlertRescheduler, NotificationScheduler, SchedulingOutcome, SchedulingReport,
};
pub use application::prayer_schedule::{
    NowProvider, PrayerScheduleEngine, ResolutionOutcome, ResolutionRequest,
};
pub use application::service::{BackgroundTasks, PrayerAlertService};
pub use domain::convention::{
    convention_for_country, resolve_convention, CalculationConvention, ConventionIndex, TwilightBound,
    CONVENTIONS,
};
pub use domain::hijri::{hijri_date, HijriDay};
pub use domain::models::{
    AlertStyle, Coordinate, DailyPrayerTimes, NextPrayer, Prayer, SchedulePhase, ScheduleState,
    TimeSource,
};
pub use domain::qibla::{angle_to_qibla, qibla_direction};
pub use infrastructure::aladhan_client::AladhanTimingsOracle;
pub use infrastructure::error::{InfraError, NotificationError, OracleError};
pub use infrastructure::local_oracle::{compute_local, LocalTimeOracle};
pub use infrastructure::logging::init_logging;
pub use infrastructure::notification_center::{
    AlertRequest, AlertSound, CalendarTrigger, InMemoryNotificationCenter, NotificationCenter,
};
pub use infrastructure::settings_store::{InMemorySettingsStore, SettingsStore, SqliteSettingsStore};
pub use infrastructure::time_oracle::{OracleQuery, TimeOracle};
