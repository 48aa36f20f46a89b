use crate::domain::convention::ConventionIndex;
use crate::domain::models::{AlertStyle, Prayer};
use crate::infrastructure::error::InfraError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");
const CONVENTION_CHOICE_KEY: &str = "calculation_convention_index";

/// User preferences read at resolution and scheduling time.
pub trait SettingsStore: Send + Sync {
    fn sound_preference(&self, prayer: Prayer) -> Result<AlertStyle, InfraError>;
    fn set_sound_preference(&self, prayer: Prayer, style: &AlertStyle) -> Result<(), InfraError>;
    fn convention_choice(&self) -> Result<Option<ConventionIndex>, InfraError>;
    fn set_convention_choice(&self, choice: Option<ConventionIndex>) -> Result<(), InfraError>;
}

fn sound_key(prayer: Prayer) -> String {
    format!("sound.{}", prayer.name().to_ascii_lowercase())
}

fn encode_style(style: &AlertStyle) -> Result<String, InfraError> {
    Ok(serde_json::to_string(style)?)
}

fn decode_style(prayer: Prayer, raw: Option<String>) -> AlertStyle {
    let Some(raw) = raw else {
        return AlertStyle::default_for(prayer);
    };
    match serde_json::from_str::<AlertStyle>(&raw) {
        Ok(style) => style,
        Err(error) => {
            log::warn!(
                "event=settings_decode_failed key={} error={error}",
                sound_key(prayer)
            );
            AlertStyle::default_for(prayer)
        }
    }
}

fn decode_choice(raw: Option<String>) -> Option<ConventionIndex> {
    raw.and_then(|value| value.trim().parse::<ConventionIndex>().ok())
}

pub fn initialize_settings_database(path: &Path) -> Result<(), InfraError> {
    let connection = Connection::open(path)?;
    connection.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct SqliteSettingsStore {
    db_path: PathBuf,
}

impl SqliteSettingsStore {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }

    fn get_value(&self, key: &str) -> Result<Option<String>, InfraError> {
        let connection = self.connect()?;
        let value = connection
            .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn put_value(&self, key: &str, value: &str) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO settings (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
               value = excluded.value,
               updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn delete_value(&self, key: &str) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute("DELETE FROM settings WHERE key = ?1", [key])?;
        Ok(())
    }
}

impl SettingsStore for SqliteSettingsStore {
    fn sound_preference(&self, prayer: Prayer) -> Result<AlertStyle, InfraError> {
        if !prayer.is_alertable() {
            return Ok(AlertStyle::default_for(prayer));
        }
        Ok(decode_style(prayer, self.get_value(&sound_key(prayer))?))
    }

    fn set_sound_preference(&self, prayer: Prayer, style: &AlertStyle) -> Result<(), InfraError> {
        if !prayer.is_alertable() {
            return Ok(());
        }
        self.put_value(&sound_key(prayer), &encode_style(style)?)
    }

    fn convention_choice(&self) -> Result<Option<ConventionIndex>, InfraError> {
        Ok(decode_choice(self.get_value(CONVENTION_CHOICE_KEY)?))
    }

    fn set_convention_choice(&self, choice: Option<ConventionIndex>) -> Result<(), InfraError> {
        match choice {
            Some(index) => self.put_value(CONVENTION_CHOICE_KEY, &index.to_string()),
            None => self.delete_value(CONVENTION_CHOICE_KEY),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
    values: Mutex<HashMap<String, String>>,
}

impl InMemorySettingsStore {
    fn get_value(&self, key: &str) -> Result<Option<String>, InfraError> {
        let values = self
            .values
            .lock()
            .map_err(|error| InfraError::Settings(format!("settings lock poisoned: {error}")))?;
        Ok(values.get(key).cloned())
    }

    fn update(&self, key: &str, value: Option<String>) -> Result<(), InfraError> {
        let mut values = self
            .values
            .lock()
            .map_err(|error| InfraError::Settings(format!("settings lock poisoned: {error}")))?;
        match value {
            Some(value) => {
                values.insert(key.to_string(), value);
            }
            None => {
                values.remove(key);
            }
        }
        Ok(())
    }
}

impl SettingsStore for InMemorySettingsStore {
    fn sound_preference(&self, prayer: Prayer) -> Result<AlertStyle, InfraError> {
        if !prayer.is_alertable() {
            return Ok(AlertStyle::default_for(prayer));
        }
        Ok(decode_style(prayer, self.get_value(&sound_key(prayer))?))
    }

    fn set_sound_preference(&self, prayer: Prayer, style: &AlertStyle) -> Result<(), InfraError> {
        if !prayer.is_alertable() {
            return Ok(());
        }
        self.update(&sound_key(prayer), Some(encode_style(style)?))
    }

    fn convention_choice(&self) -> Result<Option<ConventionIndex>, InfraError> {
        Ok(decode_choice(self.get_value(CONVENTION_CHOICE_KEY)?))
    }

    fn set_convention_choice(&self, choice: Option<ConventionIndex>) -> Result<(), InfraError> {
        self.update(CONVENTION_CHOICE_KEY, choice.map(|index| index.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_ID: AtomicUsize = AtomicUsize::new(0);

    struct TempDatabase {
        dir: PathBuf,
        path: PathBuf,
    }

    impl TempDatabase {
        fn new() -> Self {
            let sequence = NEXT_TEMP_ID.fetch_add(1, Ordering::Relaxed);
            let dir = std::env::temp_dir().join(format!(
                "azan-settings-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&dir).expect("create temp dir");
            let path = dir.join("azan.sqlite");
            initialize_settings_database(&path).expect("initialize schema");
            Self { dir, path }
        }
    }

    impl Drop for TempDatabase {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.dir);
        }
    }

    #[test]
    fn defaults_apply_when_nothing_is_stored() {
        let database = TempDatabase::new();
        let store = SqliteSettingsStore::new(&database.path);

        assert_eq!(
            store.sound_preference(Prayer::Fajr).expect("read fajr"),
            AlertStyle::PrimaryAzanTone
        );
        assert_eq!(
            store.sound_preference(Prayer::Dhuhr).expect("read dhuhr"),
            AlertStyle::DefaultTone
        );
        assert_eq!(store.convention_choice().expect("read choice"), None);
    }

    #[test]
    fn custom_tone_roundtrips_through_sqlite() {
        let database = TempDatabase::new();
        let store = SqliteSettingsStore::new(&database.path);
        let style = AlertStyle::CustomTone("reed.caf".to_string());

        store
            .set_sound_preference(Prayer::Maghrib, &style)
            .expect("write maghrib");
        let reopened = SqliteSettingsStore::new(&database.path);
        assert_eq!(
            reopened.sound_preference(Prayer::Maghrib).expect("read maghrib"),
            style
        );
    }

    #[test]
    fn sunrise_preference_is_ignored() {
        let store = InMemorySettingsStore::default();
        store
            .set_sound_preference(Prayer::Sunrise, &AlertStyle::Silent)
            .expect("write sunrise");
        assert_eq!(
            store.sound_preference(Prayer::Sunrise).expect("read sunrise"),
            AlertStyle::DefaultTone
        );
    }

    #[test]
    fn undecodable_value_falls_back_to_default() {
        let database = TempDatabase::new();
        let store = SqliteSettingsStore::new(&database.path);
        store
            .put_value(&sound_key(Prayer::Isha), "not-json")
            .expect("write raw value");
        assert_eq!(
            store.sound_preference(Prayer::Isha).expect("read isha"),
            AlertStyle::PrimaryAzanTone
        );
    }

    #[test]
    fn convention_choice_can_be_cleared() {
        let database = TempDatabase::new();
        let store = SqliteSettingsStore::new(&database.path);
        store.set_convention_choice(Some(3)).expect("write choice");
        assert_eq!(store.convention_choice().expect("read choice"), Some(3));
        store.set_convention_choice(None).expect("clear choice");
        assert_eq!(store.convention_choice().expect("read cleared"), None);
    }

    fn alert_style() -> impl Strategy<Value = AlertStyle> {
        prop_oneof![
            Just(AlertStyle::DefaultTone),
            Just(AlertStyle::PrimaryAzanTone),
            Just(AlertStyle::Silent),
            "[A-Za-z0-9_\\-]{1,24}\\.caf".prop_map(AlertStyle::CustomTone),
        ]
    }

    // A written alert style reads back with the same variant and payload.
    proptest! {
        #[test]
        fn alert_style_roundtrips_in_memory(style in alert_style()) {
            let store = InMemorySettingsStore::default();
            store.set_sound_preference(Prayer::Asr, &style).expect("write asr");
            prop_assert_eq!(store.sound_preference(Prayer::Asr).expect("read asr"), style);
        }
    }
}
