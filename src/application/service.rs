use crate::application::bootstrap::bootstrap_workspace;
use crate::application::notification_scheduler::{AlertRescheduler, NotificationScheduler};
use crate::application::prayer_schedule::{
    PrayerScheduleEngine, ResolutionOutcome, ResolutionRequest,
};
use crate::application::rollover::run_rollover_loop;
use crate::domain::convention::{CalculationConvention, ConventionIndex};
use crate::domain::hijri::{hijri_date, HijriDay};
use crate::domain::models::{Coordinate, ScheduleState};
use crate::domain::qibla::qibla_direction;
use crate::infrastructure::aladhan_client::AladhanTimingsOracle;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::local_oracle::LocalTimeOracle;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::notification_center::NotificationCenter;
use crate::infrastructure::settings_store::{SettingsStore, SqliteSettingsStore};
use crate::infrastructure::time_oracle::TimeOracle;
use chrono::NaiveTime;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Background tasks started by [`PrayerAlertService::spawn_background`]; aborted on drop.
#[derive(Debug)]
pub struct BackgroundTasks {
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundTasks {
    pub fn is_running(&self) -> bool {
        self.handles.iter().any(|handle| !handle.is_finished())
    }
}

impl Drop for BackgroundTasks {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

/// Entry point for location and settings collaborators.
pub struct PrayerAlertService<R, O, N, S>
where
    R: TimeOracle + 'static,
    O: TimeOracle + 'static,
    N: NotificationCenter + 'static,
    S: SettingsStore + 'static,
{
    engine: Arc<PrayerScheduleEngine<R, O>>,
    scheduler: Arc<NotificationScheduler<N, S>>,
    settings: Arc<S>,
    tick_interval: Duration,
    rollover_time: NaiveTime,
}

impl<N> PrayerAlertService<AladhanTimingsOracle, LocalTimeOracle, N, SqliteSettingsStore>
where
    N: NotificationCenter + 'static,
{
    /// Bootstraps `workspace_root`, installs the JSON-lines logger at the
    /// configured level and wires the Aladhan oracle, the offline oracle and
    /// the SQLite settings store around `center`.
    pub fn open(workspace_root: &Path, center: Arc<N>) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(workspace_root)?;
        init_logging(&bootstrap.logs_dir, &bootstrap.config.log_level.to_string())?;
        let engine = PrayerScheduleEngine::new(
            Arc::new(AladhanTimingsOracle::new(&bootstrap.config.remote_oracle)),
            Arc::new(LocalTimeOracle),
            bootstrap.config.timezone,
        );
        let settings = Arc::new(SqliteSettingsStore::new(&bootstrap.settings_path));
        log::info!(
            "event=service_open workspace={} timezone={}",
            bootstrap.workspace_root.display(),
            bootstrap.config.timezone
        );
        Ok(Self::new(engine, center, settings, &bootstrap.config))
    }
}

impl<R, O, N, S> PrayerAlertService<R, O, N, S>
where
    R: TimeOracle + 'static,
    O: TimeOracle + 'static,
    N: NotificationCenter + 'static,
    S: SettingsStore + 'static,
{
    pub fn new(
        engine: PrayerScheduleEngine<R, O>,
        center: Arc<N>,
        settings: Arc<S>,
        config: &AppConfig,
    ) -> Self {
        let scheduler = NotificationScheduler::new(
            center,
            settings.clone(),
            engine.timezone(),
            config.primary_azan_sound.clone(),
        )
        .with_now_provider(engine.now_provider());
        Self {
            engine: Arc::new(engine),
            scheduler: Arc::new(scheduler),
            settings,
            tick_interval: config.tick_interval,
            rollover_time: config.rollover_time,
        }
    }

    pub fn engine(&self) -> &Arc<PrayerScheduleEngine<R, O>> {
        &self.engine
    }

    pub fn scheduler(&self) -> &Arc<NotificationScheduler<N, S>> {
        &self.scheduler
    }

    pub fn subscribe(&self) -> watch::Receiver<ScheduleState> {
        self.engine.subscribe()
    }

    pub fn snapshot(&self) -> ScheduleState {
        self.engine.snapshot()
    }

    pub async fn on_location_update(
        &self,
        coordinate: Coordinate,
        country_code: Option<String>,
    ) -> Result<ResolutionOutcome, InfraError> {
        coordinate.validate().map_err(InfraError::InvalidCoordinate)?;
        let explicit_choice = self.settings.convention_choice().unwrap_or_else(|error| {
            log::warn!("event=convention_choice_unavailable error={error}");
            None
        });
        Ok(self
            .engine
            .resolve(ResolutionRequest {
                coordinate,
                country_code,
                explicit_choice,
            })
            .await)
    }

    /// Persists the choice (`None` = detect from country) and re-resolves when a location is known.
    pub async fn on_convention_changed(
        &self,
        choice: Option<ConventionIndex>,
    ) -> Result<Option<ResolutionOutcome>, InfraError> {
        if let Some(index) = choice {
            if CalculationConvention::from_index(index).is_none() {
                return Err(InfraError::Settings(format!(
                    "unknown calculation convention index {index}"
                )));
            }
        }
        self.settings.set_convention_choice(choice)?;

        let Some(last) = self.engine.last_request() else {
            return Ok(None);
        };
        let outcome = self
            .engine
            .resolve(ResolutionRequest {
                explicit_choice: choice,
                ..last
            })
            .await;
        Ok(Some(outcome))
    }

    /// Bearing to the Kaaba from the last known location.
    pub fn qibla_direction(&self) -> Option<f64> {
        self.engine
            .last_request()
            .map(|request| qibla_direction(request.coordinate))
    }

    /// Today's Hijri date in the configured zone.
    pub fn hijri_today(&self) -> Result<HijriDay, InfraError> {
        let today = self
            .engine
            .now()
            .with_timezone(&self.engine.timezone())
            .date_naive();
        hijri_date(today).map_err(InfraError::Calendar)
    }

    /// Starts the tick, rollover and alert loops on the current tokio runtime.
    pub fn spawn_background(&self) -> BackgroundTasks {
        let tick = tokio::spawn({
            let engine = self.engine.clone();
            let period = self.tick_interval;
            async move {
                let mut interval = tokio::time::interval(period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    interval.tick().await;
                    engine.tick(engine.now());
                }
            }
        });

        let rollover = tokio::spawn(run_rollover_loop(self.engine.clone(), self.rollover_time));

        let alerts = tokio::spawn({
            let mut receiver = self.engine.subscribe();
            let mut rescheduler = AlertRescheduler::new(self.scheduler.clone());
            async move {
                loop {
                    let state = receiver.borrow_and_update().clone();
                    rescheduler.observe(&state).await;
                    if receiver.changed().await.is_err() {
                        break;
                    }
                }
            }
        });

        BackgroundTasks {
            handles: vec![tick, rollover, alerts],
        }
    }
}
