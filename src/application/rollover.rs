use crate::application::prayer_schedule::{PrayerScheduleEngine, ResolutionOutcome};
use crate::infrastructure::time_oracle::{wall_clock_to_utc, TimeOracle};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

/// Next instant strictly after `now` whose local wall clock reads `rollover_time`.
pub fn next_rollover_at(now: DateTime<Utc>, timezone: Tz, rollover_time: NaiveTime) -> DateTime<Utc> {
    let today = now.with_timezone(&timezone).date_naive();
    let mut date = today;
    for _ in 0..3 {
        if let Some(candidate) = wall_clock_to_utc(date, rollover_time, timezone) {
            if candidate > now {
                return candidate;
            }
        }
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }
    now + Duration::days(1)
}

/// Re-resolves with the last known inputs. Skipped when no location is known yet.
pub async fn roll_over<R, O>(engine: &PrayerScheduleEngine<R, O>) -> Option<ResolutionOutcome>
where
    R: TimeOracle,
    O: TimeOracle,
{
    match engine.resolve_last().await {
        Some(outcome) => {
            log::info!("event=rollover_fired outcome={outcome:?}");
            Some(outcome)
        }
        None => {
            log::info!("event=rollover_skipped reason=no_location");
            None
        }
    }
}

/// Sleeps until each local `rollover_time` and rolls over; never returns.
pub async fn run_rollover_loop<R, O>(engine: Arc<PrayerScheduleEngine<R, O>>, rollover_time: NaiveTime)
where
    R: TimeOracle,
    O: TimeOracle,
{
    loop {
        let now = engine.now();
        let fire_at = next_rollover_at(now, engine.timezone(), rollover_time);
        let wait = (fire_at - now).to_std().unwrap_or_default();
        log::debug!("event=rollover_armed fire_at={}", fire_at.to_rfc3339());
        tokio::time::sleep(wait).await;
        roll_over(&engine).await;
    }
}
