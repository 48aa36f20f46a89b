//! `PrayerAlertService::open` end to end on a temp workspace.
//!
//! Runs in its own test binary because it installs the process-wide logger.

use azan_core::{InMemoryNotificationCenter, InfraError, PrayerAlertService, ScheduleState};
use std::fs;
use std::sync::Arc;

#[test]
fn open_bootstraps_workspace_and_installs_logger() {
    let root = std::env::temp_dir().join(format!("azan-service-open-{}", std::process::id()));
    let _ = fs::remove_dir_all(&root);

    let service = PrayerAlertService::open(&root, Arc::new(InMemoryNotificationCenter::default()))
        .expect("open service");
    assert!(root.join("state").join("azan.sqlite").exists());
    assert_eq!(service.snapshot(), ScheduleState::default());

    let app_json = fs::read_to_string(root.join("config").join("app.json")).expect("read app.json");
    let app: serde_json::Value = serde_json::from_str(&app_json).expect("app.json is json");
    assert_eq!(app["logLevel"], "info");
    assert_eq!(log::max_level(), log::LevelFilter::Info);

    let log_lines = fs::read_to_string(root.join("logs").join("azan.log")).expect("read log");
    assert!(log_lines.contains("event=core_init"));
    assert!(log_lines.contains("event=service_open"));

    // Same workspace again is fine; a second workspace cannot take over the logger.
    PrayerAlertService::open(&root, Arc::new(InMemoryNotificationCenter::default()))
        .expect("reopen same workspace");
    let other = root.join("other");
    assert!(matches!(
        PrayerAlertService::open(&other, Arc::new(InMemoryNotificationCenter::default())),
        Err(InfraError::InvalidConfig(_))
    ));

    let _ = fs::remove_dir_all(&root);
}
