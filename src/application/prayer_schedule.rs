use crate::domain::convention::{resolve_convention, CalculationConvention, ConventionIndex};
use crate::domain::models::{Coordinate, DailyPrayerTimes, SchedulePhase, ScheduleState, TimeSource};
use crate::infrastructure::time_oracle::{OracleQuery, TimeOracle};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Inputs of the most recent `resolve` call, replayed by the daily rollover.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionRequest {
    pub coordinate: Coordinate,
    pub country_code: Option<String>,
    pub explicit_choice: Option<ConventionIndex>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionOutcome {
    Adopted {
        source: TimeSource,
        convention: CalculationConvention,
        resolved_at: DateTime<Utc>,
    },
    /// Both oracles failed; the previous schedule, if any, is still published.
    Unavailable,
    /// A newer request was issued while this one was in flight.
    Superseded,
}

/// Sole writer of [`ScheduleState`]. Consumers observe snapshots via [`subscribe`](Self::subscribe).
pub struct PrayerScheduleEngine<R, O>
where
    R: TimeOracle,
    O: TimeOracle,
{
    remote: Arc<R>,
    offline: Arc<O>,
    timezone: Tz,
    now_provider: NowProvider,
    state: watch::Sender<ScheduleState>,
    sequence: AtomicU64,
    last_request: Mutex<Option<ResolutionRequest>>,
}

impl<R, O> PrayerScheduleEngine<R, O>
where
    R: TimeOracle,
    O: TimeOracle,
{
    pub fn new(remote: Arc<R>, offline: Arc<O>, timezone: Tz) -> Self {
        let (state, _) = watch::channel(ScheduleState::default());
        Self {
            remote,
            offline,
            timezone,
            now_provider: Arc::new(Utc::now),
            state,
            sequence: AtomicU64::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.now_provider)()
    }

    pub fn now_provider(&self) -> NowProvider {
        self.now_provider.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ScheduleState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ScheduleState {
        self.state.borrow().clone()
    }

    pub fn last_request(&self) -> Option<ResolutionRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Resolves today's schedule, remote first with offline fallback.
    ///
    /// Safe to call concurrently: only the most recently issued request may
    /// publish its result.
    pub async fn resolve(&self, request: ResolutionRequest) -> ResolutionOutcome {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        *self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(request.clone());

        let convention = resolve_convention(request.country_code.as_deref(), request.explicit_choice);
        self.state.send_if_modified(|state| {
            if state.phase == SchedulePhase::Resolving {
                return false;
            }
            state.phase = SchedulePhase::Resolving;
            true
        });

        let query = OracleQuery {
            coordinate: request.coordinate,
            convention,
            now: self.now(),
            timezone: self.timezone,
        };
        let fetched = self.fetch(&query).await;

        let mut outcome = ResolutionOutcome::Superseded;
        self.state.send_if_modified(|state| {
            if self.sequence.load(Ordering::SeqCst) != sequence {
                return false;
            }
            let now = self.now();
            match fetched {
                Some((source, times)) => {
                    let resolved_at = next_stamp(state.last_resolution_at, now);
                    state.current_prayer_times = Some(times);
                    state.last_resolution_at = Some(resolved_at);
                    state.convention = Some(convention);
                    state.source = Some(source);
                    state.phase = SchedulePhase::Resolved;
                    state.refresh_next(now);
                    outcome = ResolutionOutcome::Adopted {
                        source,
                        convention,
                        resolved_at,
                    };
                }
                None => {
                    state.phase = if state.current_prayer_times.is_some() {
                        SchedulePhase::Resolved
                    } else {
                        SchedulePhase::Idle
                    };
                    state.refresh_next(now);
                    outcome = ResolutionOutcome::Unavailable;
                }
            }
            true
        });

        if outcome == ResolutionOutcome::Superseded {
            log::info!("event=resolution_superseded sequence={sequence}");
        }
        outcome
    }

    /// Replays the last request. `None` when no location has been seen yet.
    pub async fn resolve_last(&self) -> Option<ResolutionOutcome> {
        let request = self.last_request()?;
        Some(self.resolve(request).await)
    }

    /// Recomputes the next prayer and countdown without touching either oracle.
    pub fn tick(&self, now: DateTime<Utc>) -> bool {
        self.state.send_if_modified(|state| state.refresh_next(now))
    }

    async fn fetch(&self, query: &OracleQuery) -> Option<(TimeSource, DailyPrayerTimes)> {
        match self.remote.daily_times(query).await {
            Ok(times) => return Some((self.remote.source(), times)),
            Err(error) => log::warn!(
                "event=remote_unavailable convention={:?} error={error}",
                query.convention
            ),
        }
        match self.offline.daily_times(query).await {
            Ok(times) => Some((self.offline.source(), times)),
            Err(error) => {
                log::warn!(
                    "event=fallback_unavailable latitude={} error={error}",
                    query.coordinate.latitude
                );
                None
            }
        }
    }
}

/// Adoption stamps must change on every successful resolution.
fn next_stamp(previous: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    match previous {
        Some(previous) if now <= previous => previous + Duration::microseconds(1),
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Prayer;
    use crate::infrastructure::error::OracleError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn fixed_clock(value: &str) -> NowProvider {
        let now = fixed_time(value);
        Arc::new(move || now)
    }

    fn times_starting(fajr: &str) -> DailyPrayerTimes {
        let fajr = fixed_time(fajr);
        DailyPrayerTimes {
            fajr,
            sunrise: fajr + Duration::minutes(80),
            dhuhr: fajr + Duration::minutes(430),
            asr: fajr + Duration::minutes(630),
            maghrib: fajr + Duration::minutes(785),
            isha: fajr + Duration::minutes(870),
        }
    }

    struct ScriptedCall {
        result: Result<DailyPrayerTimes, OracleError>,
        gate: Option<Arc<Notify>>,
    }

    struct FakeOracle {
        source: TimeSource,
        calls: Mutex<VecDeque<ScriptedCall>>,
        queries: Mutex<Vec<OracleQuery>>,
        call_count: AtomicUsize,
    }

    impl FakeOracle {
        fn new(source: TimeSource, results: Vec<Result<DailyPrayerTimes, OracleError>>) -> Self {
            Self::gated(
                source,
                results
                    .into_iter()
                    .map(|result| ScriptedCall { result, gate: None })
                    .collect(),
            )
        }

        fn gated(source: TimeSource, calls: Vec<ScriptedCall>) -> Self {
            Self {
                source,
                calls: Mutex::new(calls.into()),
                queries: Mutex::new(Vec::new()),
                call_count: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TimeOracle for FakeOracle {
        fn source(&self) -> TimeSource {
            self.source
        }

        async fn daily_times(&self, query: &OracleQuery) -> Result<DailyPrayerTimes, OracleError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().expect("queries lock").push(*query);
            let call = self
                .calls
                .lock()
                .expect("calls lock")
                .pop_front()
                .unwrap_or(ScriptedCall {
                    result: Err(OracleError::Transport("no scripted response".to_string())),
                    gate: None,
                });
            if let Some(gate) = call.gate {
                gate.notified().await;
            }
            call.result
        }
    }

    fn request(country_code: Option<&str>) -> ResolutionRequest {
        ResolutionRequest {
            coordinate: Coordinate::new(40.7128, -74.006),
            country_code: country_code.map(str::to_string),
            explicit_choice: None,
        }
    }

    fn engine(
        remote: Vec<Result<DailyPrayerTimes, OracleError>>,
        offline: Vec<Result<DailyPrayerTimes, OracleError>>,
    ) -> (
        PrayerScheduleEngine<FakeOracle, FakeOracle>,
        Arc<FakeOracle>,
        Arc<FakeOracle>,
    ) {
        let remote = Arc::new(FakeOracle::new(TimeSource::Remote, remote));
        let offline = Arc::new(FakeOracle::new(TimeSource::Offline, offline));
        let engine = PrayerScheduleEngine::new(remote.clone(), offline.clone(), Tz::UTC)
            .with_now_provider(fixed_clock("2026-03-10T14:00:00Z"));
        (engine, remote, offline)
    }

    fn unavailable() -> Result<DailyPrayerTimes, OracleError> {
        Err(OracleError::Timeout { seconds: 10 })
    }

    fn no_solution() -> Result<DailyPrayerTimes, OracleError> {
        Err(OracleError::NoSolution {
            latitude: 40.7128,
            date: fixed_time("2026-03-10T00:00:00Z").date_naive(),
        })
    }

    #[tokio::test]
    async fn remote_success_is_adopted_without_fallback() {
        let times = times_starting("2026-03-10T05:00:00Z");
        let (engine, remote, offline) = engine(vec![Ok(times)], vec![]);

        let outcome = engine.resolve(request(Some("US"))).await;

        assert_eq!(
            outcome,
            ResolutionOutcome::Adopted {
                source: TimeSource::Remote,
                convention: CalculationConvention::NorthAmerica,
                resolved_at: fixed_time("2026-03-10T14:00:00Z"),
            }
        );
        assert_eq!(remote.calls(), 1);
        assert_eq!(offline.calls(), 0);
        let queries = remote.queries.lock().expect("queries lock");
        assert_eq!(queries[0].convention, CalculationConvention::NorthAmerica);

        let state = engine.snapshot();
        assert_eq!(state.phase, SchedulePhase::Resolved);
        assert_eq!(state.current_prayer_times, Some(times));
        assert_eq!(state.next_prayer, Some(Prayer::Asr));
        assert_eq!(state.countdown, Some(Duration::minutes(90)));
        assert_eq!(state.source, Some(TimeSource::Remote));
    }

    #[tokio::test]
    async fn remote_failure_falls_back_and_stamps() {
        let offline_times = times_starting("2026-03-10T05:02:00Z");
        let (engine, _remote, offline) = engine(vec![unavailable()], vec![Ok(offline_times)]);

        let outcome = engine.resolve(request(None)).await;

        assert!(matches!(
            outcome,
            ResolutionOutcome::Adopted {
                source: TimeSource::Offline,
                ..
            }
        ));
        assert_eq!(offline.calls(), 1);
        let offline_query = offline.queries.lock().expect("queries lock")[0];
        assert_eq!(offline_query.convention, CalculationConvention::MuslimWorldLeague);
        let state = engine.snapshot();
        assert_eq!(state.current_prayer_times, Some(offline_times));
        assert_eq!(state.last_resolution_at, Some(fixed_time("2026-03-10T14:00:00Z")));
    }

    #[tokio::test]
    async fn both_failing_preserves_previous_schedule_and_stamp() {
        let times = times_starting("2026-03-10T05:00:00Z");
        let (engine, _remote, _offline) =
            engine(vec![Ok(times), unavailable()], vec![no_solution()]);

        engine.resolve(request(None)).await;
        let before = engine.snapshot();
        let outcome = engine.resolve(request(None)).await;
        let after = engine.snapshot();

        assert_eq!(outcome, ResolutionOutcome::Unavailable);
        assert_eq!(after.current_prayer_times, Some(times));
        assert_eq!(after.last_resolution_at, before.last_resolution_at);
        assert_eq!(after.phase, SchedulePhase::Resolved);
    }

    #[tokio::test]
    async fn both_failing_without_history_returns_to_idle() {
        let (engine, _remote, _offline) = engine(vec![unavailable()], vec![no_solution()]);
        assert_eq!(engine.resolve(request(None)).await, ResolutionOutcome::Unavailable);
        let state = engine.snapshot();
        assert_eq!(state.phase, SchedulePhase::Idle);
        assert!(state.current_prayer_times.is_none());
        assert!(state.last_resolution_at.is_none());
    }

    #[tokio::test]
    async fn identical_payloads_resolve_identically_with_fresh_stamps() {
        let times = times_starting("2026-03-10T05:00:00Z");
        let (engine, _remote, _offline) = engine(vec![Ok(times), Ok(times)], vec![]);

        engine.resolve(request(Some("US"))).await;
        let first = engine.snapshot();
        engine.resolve(request(Some("US"))).await;
        let second = engine.snapshot();

        assert_eq!(first.current_prayer_times, second.current_prayer_times);
        assert!(second.last_resolution_at > first.last_resolution_at);
    }

    #[tokio::test]
    async fn explicit_choice_overrides_country() {
        let (engine, remote, _offline) =
            engine(vec![Ok(times_starting("2026-03-10T05:00:00Z"))], vec![]);
        engine
            .resolve(ResolutionRequest {
                explicit_choice: Some(3),
                ..request(Some("US"))
            })
            .await;
        assert_eq!(
            remote.queries.lock().expect("queries lock")[0].convention,
            CalculationConvention::UmmAlQura
        );
        assert_eq!(engine.snapshot().convention, Some(CalculationConvention::UmmAlQura));
    }

    #[tokio::test]
    async fn newer_request_supersedes_in_flight_result() {
        let gate = Arc::new(Notify::new());
        let stale = times_starting("2026-03-10T05:00:00Z");
        let fresh = times_starting("2026-03-10T05:30:00Z");
        let remote = Arc::new(FakeOracle::gated(
            TimeSource::Remote,
            vec![
                ScriptedCall {
                    result: Ok(stale),
                    gate: Some(gate.clone()),
                },
                ScriptedCall {
                    result: Ok(fresh),
                    gate: None,
                },
            ],
        ));
        let offline = Arc::new(FakeOracle::new(TimeSource::Offline, vec![]));
        let engine = Arc::new(
            PrayerScheduleEngine::new(remote.clone(), offline, Tz::UTC)
                .with_now_provider(fixed_clock("2026-03-10T14:00:00Z")),
        );

        let first = tokio::spawn({
            let engine = engine.clone();
            async move { engine.resolve(request(Some("US"))).await }
        });
        while remote.calls() < 1 {
            tokio::task::yield_now().await;
        }

        let second = engine.resolve(request(Some("GB"))).await;
        gate.notify_one();
        let first = first.await.expect("first resolution task");

        assert_eq!(first, ResolutionOutcome::Superseded);
        assert!(matches!(second, ResolutionOutcome::Adopted { .. }));
        let state = engine.snapshot();
        assert_eq!(state.current_prayer_times, Some(fresh));
        assert_eq!(state.convention, Some(CalculationConvention::MoonsightingCommittee));
        assert_eq!(
            engine.last_request().and_then(|request| request.country_code),
            Some("GB".to_string())
        );
    }

    #[tokio::test]
    async fn tick_updates_countdown_without_oracle_calls() {
        let (engine, remote, offline) =
            engine(vec![Ok(times_starting("2026-03-10T05:00:00Z"))], vec![]);
        engine.resolve(request(None)).await;
        let mut receiver = engine.subscribe();
        let _ = receiver.borrow_and_update();

        assert!(engine.tick(fixed_time("2026-03-10T15:00:00Z")));
        assert!(receiver.has_changed().expect("sender alive"));
        assert_eq!(engine.snapshot().countdown, Some(Duration::minutes(30)));
        assert!(!engine.tick(fixed_time("2026-03-10T15:00:00Z")));

        assert!(engine.tick(fixed_time("2026-03-10T20:00:00Z")));
        let state = engine.snapshot();
        assert_eq!(state.next_prayer, None);
        assert_eq!(state.countdown, None);
        assert_eq!(remote.calls() + offline.calls(), 1);
    }

    #[tokio::test]
    async fn resolve_last_without_location_is_skipped() {
        let (engine, remote, _offline) = engine(vec![], vec![]);
        assert_eq!(engine.resolve_last().await, None);
        assert_eq!(remote.calls(), 0);
    }

    #[test]
    fn stamps_strictly_increase_under_a_frozen_clock() {
        let now = fixed_time("2026-03-10T14:00:00Z");
        assert_eq!(next_stamp(None, now), now);
        assert!(next_stamp(Some(now), now) > now);
        let later = now + Duration::seconds(5);
        assert_eq!(next_stamp(Some(now), later), later);
    }
}
