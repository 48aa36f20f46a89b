use crate::domain::models::Prayer;
use crate::infrastructure::error::NotificationError;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Timelike, Utc};
use chrono_tz::Tz;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Wall-clock components a one-shot alert fires at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarTrigger {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl CalendarTrigger {
    pub fn at(instant: DateTime<Utc>, timezone: Tz) -> Self {
        let local = instant.with_timezone(&timezone);
        Self {
            year: local.year(),
            month: local.month(),
            day: local.day(),
            hour: local.hour(),
            minute: local.minute(),
            second: local.second(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertSound {
    Default,
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertRequest {
    pub identifier: String,
    pub trigger: CalendarTrigger,
    pub title: String,
    pub body: String,
    pub sound: Option<AlertSound>,
    pub repeats: bool,
}

impl AlertRequest {
    pub fn for_prayer(
        prayer: Prayer,
        at: DateTime<Utc>,
        timezone: Tz,
        sound: Option<AlertSound>,
    ) -> Self {
        Self {
            identifier: alert_identifier(prayer, at),
            trigger: CalendarTrigger::at(at, timezone),
            title: format!("Time for {}", prayer.name()),
            body: format!("It is time for {} prayer.", prayer.name()),
            sound,
            repeats: false,
        }
    }
}

/// Same prayer at the same instant always yields the same identifier.
pub fn alert_identifier(prayer: Prayer, at: DateTime<Utc>) -> String {
    format!("prayer-{}-{}", prayer.name(), at.timestamp())
}

#[async_trait]
pub trait NotificationCenter: Send + Sync {
    async fn is_authorized(&self) -> bool;
    /// Registering an existing identifier replaces the pending request.
    async fn add(&self, request: AlertRequest) -> Result<(), NotificationError>;
    async fn remove_all_pending(&self) -> Result<(), NotificationError>;
    async fn pending_identifiers(&self) -> Result<Vec<String>, NotificationError>;
}

/// Headless facility that keeps pending requests in memory.
#[derive(Debug)]
pub struct InMemoryNotificationCenter {
    authorized: AtomicBool,
    pending: Mutex<BTreeMap<String, AlertRequest>>,
    failing_identifiers: Mutex<HashSet<String>>,
    fail_next_removal: AtomicBool,
}

impl Default for InMemoryNotificationCenter {
    fn default() -> Self {
        Self {
            authorized: AtomicBool::new(true),
            pending: Mutex::new(BTreeMap::new()),
            failing_identifiers: Mutex::new(HashSet::new()),
            fail_next_removal: AtomicBool::new(false),
        }
    }
}

impl InMemoryNotificationCenter {
    pub fn set_authorized(&self, authorized: bool) {
        self.authorized.store(authorized, Ordering::SeqCst);
    }

    /// Makes the next and every later `add` for `identifier` fail.
    pub fn fail_registration_for(&self, identifier: impl Into<String>) -> Result<(), NotificationError> {
        self.failing_identifiers
            .lock()
            .map_err(|error| NotificationError::Facility(format!("failure lock poisoned: {error}")))?
            .insert(identifier.into());
        Ok(())
    }

    /// Makes the next `remove_all_pending` fail without touching pending requests.
    pub fn fail_next_removal(&self) {
        self.fail_next_removal.store(true, Ordering::SeqCst);
    }

    pub fn pending_requests(&self) -> Result<Vec<AlertRequest>, NotificationError> {
        Ok(self.lock_pending()?.values().cloned().collect())
    }

    fn lock_pending(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, AlertRequest>>, NotificationError> {
        self.pending
            .lock()
            .map_err(|error| NotificationError::Facility(format!("pending lock poisoned: {error}")))
    }
}

#[async_trait]
impl NotificationCenter for InMemoryNotificationCenter {
    async fn is_authorized(&self) -> bool {
        self.authorized.load(Ordering::SeqCst)
    }

    async fn add(&self, request: AlertRequest) -> Result<(), NotificationError> {
        if !self.is_authorized().await {
            return Err(NotificationError::NotAuthorized);
        }
        let should_fail = self
            .failing_identifiers
            .lock()
            .map_err(|error| NotificationError::Facility(format!("failure lock poisoned: {error}")))?
            .contains(&request.identifier);
        if should_fail {
            return Err(NotificationError::Registration {
                identifier: request.identifier,
                reason: "injected failure".to_string(),
            });
        }
        self.lock_pending()?.insert(request.identifier.clone(), request);
        Ok(())
    }

    async fn remove_all_pending(&self) -> Result<(), NotificationError> {
        if self.fail_next_removal.swap(false, Ordering::SeqCst) {
            return Err(NotificationError::Facility("injected removal failure".to_string()));
        }
        self.lock_pending()?.clear();
        Ok(())
    }

    async fn pending_identifiers(&self) -> Result<Vec<String>, NotificationError> {
        Ok(self.lock_pending()?.keys().cloned().collect())
    }
}
