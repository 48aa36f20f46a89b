use crate::application::prayer_schedule::NowProvider;
use crate::domain::models::{AlertStyle, DailyPrayerTimes, Prayer, ScheduleState};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::notification_center::{AlertRequest, AlertSound, NotificationCenter};
use crate::infrastructure::settings_store::SettingsStore;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulingReport {
    pub registered: Vec<String>,
    pub failed: Vec<String>,
    pub skipped_past: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulingOutcome {
    NotAuthorized,
    Scheduled(SchedulingReport),
}

/// Maps a preference to the sound attached to the alert; `None` is silent.
pub fn alert_sound(style: &AlertStyle, primary_azan_sound: &str) -> Option<AlertSound> {
    match style {
        AlertStyle::DefaultTone => Some(AlertSound::Default),
        AlertStyle::PrimaryAzanTone => Some(AlertSound::Named(primary_azan_sound.to_string())),
        AlertStyle::CustomTone(name) => Some(AlertSound::Named(name.clone())),
        AlertStyle::Silent => None,
    }
}

pub struct NotificationScheduler<N, S>
where
    N: NotificationCenter,
    S: SettingsStore,
{
    center: Arc<N>,
    settings: Arc<S>,
    timezone: Tz,
    primary_azan_sound: String,
    now_provider: NowProvider,
}

impl<N, S> NotificationScheduler<N, S>
where
    N: NotificationCenter,
    S: SettingsStore,
{
    pub fn new(center: Arc<N>, settings: Arc<S>, timezone: Tz, primary_azan_sound: String) -> Self {
        Self {
            center,
            settings,
            timezone,
            primary_azan_sound,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    /// Reads every alertable prayer's preference; unreadable entries fall back to defaults.
    pub fn alert_styles(&self) -> HashMap<Prayer, AlertStyle> {
        Prayer::ALERTABLE
            .iter()
            .map(|prayer| {
                let style = self.settings.sound_preference(*prayer).unwrap_or_else(|error| {
                    log::warn!(
                        "event=sound_preference_unavailable prayer={} error={error}",
                        prayer.name()
                    );
                    AlertStyle::default_for(*prayer)
                });
                (*prayer, style)
            })
            .collect()
    }

    pub async fn schedule_with_preferences(
        &self,
        times: &DailyPrayerTimes,
    ) -> Result<SchedulingOutcome, InfraError> {
        let styles = self.alert_styles();
        self.schedule_daily_alerts(times, &styles).await
    }

    /// Replaces every pending alert with one per future alertable prayer.
    ///
    /// A prayer whose registration fails is reported in `failed`; the rest are
    /// still scheduled.
    pub async fn schedule_daily_alerts(
        &self,
        times: &DailyPrayerTimes,
        styles: &HashMap<Prayer, AlertStyle>,
    ) -> Result<SchedulingOutcome, InfraError> {
        if !self.center.is_authorized().await {
            log::info!("event=alert_scheduling_skipped reason=not_authorized");
            return Ok(SchedulingOutcome::NotAuthorized);
        }

        if let Err(error) = self.center.remove_all_pending().await {
            log::warn!("event=alert_cancel_failed error={error}");
            return Err(error.into());
        }

        let now = (self.now_provider)();
        let mut report = SchedulingReport::default();
        for prayer in Prayer::ALERTABLE {
            let at = times.time(prayer);
            if at <= now {
                report.skipped_past += 1;
                continue;
            }
            let style = styles
                .get(&prayer)
                .cloned()
                .unwrap_or_else(|| AlertStyle::default_for(prayer));
            let request = AlertRequest::for_prayer(
                prayer,
                at,
                self.timezone,
                alert_sound(&style, &self.primary_azan_sound),
            );
            let identifier = request.identifier.clone();
            match self.center.add(request).await {
                Ok(()) => report.registered.push(identifier),
                Err(error) => {
                    log::warn!(
                        "event=alert_registration_failed identifier={identifier} error={error}"
                    );
                    report.failed.push(identifier);
                }
            }
        }

        log::info!(
            "event=alerts_scheduled registered={} failed={} skipped_past={}",
            report.registered.len(),
            report.failed.len(),
            report.skipped_past
        );
        Ok(SchedulingOutcome::Scheduled(report))
    }
}

/// Schedules alerts once per new resolution stamp, ignoring tick-only updates.
pub struct AlertRescheduler<N, S>
where
    N: NotificationCenter,
    S: SettingsStore,
{
    scheduler: Arc<NotificationScheduler<N, S>>,
    last_seen: Option<DateTime<Utc>>,
}

impl<N, S> AlertRescheduler<N, S>
where
    N: NotificationCenter,
    S: SettingsStore,
{
    pub fn new(scheduler: Arc<NotificationScheduler<N, S>>) -> Self {
        Self {
            scheduler,
            last_seen: None,
        }
    }

    /// A stamp is only marked as seen once its batch completes, so a failed
    /// batch is retried on the next state update.
    pub async fn observe(&mut self, state: &ScheduleState) -> Option<SchedulingOutcome> {
        let stamp = state.last_resolution_at?;
        if self.last_seen == Some(stamp) {
            return None;
        }
        let times = state.current_prayer_times?;

        match self.scheduler.schedule_with_preferences(&times).await {
            Ok(outcome) => {
                self.last_seen = Some(stamp);
                Some(outcome)
            }
            Err(error) => {
                log::error!("event=alert_scheduling_failed error={error}");
                None
            }
        }
    }
}
