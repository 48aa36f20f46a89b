//! Process-wide JSON-lines log sink behind the `log` facade.
//!
//! Every record becomes one JSON object per line in `<logs_dir>/azan.log`.
//! Initialization is idempotent for the same directory and never panics.
//! Re-initializing the same directory with another level switches the level.

use crate::infrastructure::error::InfraError;
use chrono::Utc;
use log::{LevelFilter, Log, Metadata, Record};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const LOG_FILE_NAME: &str = "azan.log";

static LOGGING_STATE: Mutex<Option<PathBuf>> = Mutex::new(None);

struct JsonLineLogger {
    path: PathBuf,
    write_guard: Mutex<()>,
}

impl Log for JsonLineLogger {
    // The facade's max level is the single source of truth.
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let Ok(_guard) = self.write_guard.lock() else {
            return;
        };
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": record.level().as_str().to_ascii_lowercase(),
            "target": record.target(),
            "message": record.args().to_string(),
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(file, "{}", payload);
        }
    }

    fn flush(&self) {}
}

pub fn log_file_path(logs_dir: &Path) -> PathBuf {
    logs_dir.join(LOG_FILE_NAME)
}

/// Installs the JSON-lines logger.
///
/// # Errors
/// - `level` is not a `log` level name.
/// - `logs_dir` cannot be created.
/// - logging was already initialized for a different directory, or another
///   logger owns the facade.
pub fn init_logging(logs_dir: &Path, level: &str) -> Result<(), InfraError> {
    let level = level
        .trim()
        .parse::<LevelFilter>()
        .map_err(|_| InfraError::InvalidConfig(format!("unsupported log level '{level}'")))?;

    let mut state = LOGGING_STATE
        .lock()
        .map_err(|error| InfraError::InvalidConfig(format!("logging lock poisoned: {error}")))?;
    if let Some(active_dir) = state.as_ref() {
        if active_dir == logs_dir {
            if log::max_level() != level {
                log::set_max_level(level);
                log::info!("event=log_level_changed module=logging level={level}");
            }
            return Ok(());
        }
        return Err(InfraError::InvalidConfig(format!(
            "logging already initialized at {}; refusing to switch to {}",
            active_dir.display(),
            logs_dir.display()
        )));
    }

    fs::create_dir_all(logs_dir)?;
    let logger = JsonLineLogger {
        path: log_file_path(logs_dir),
        write_guard: Mutex::new(()),
    };
    log::set_logger(Box::leak(Box::new(logger)))
        .map_err(|error| InfraError::InvalidConfig(format!("failed to install logger: {error}")))?;
    log::set_max_level(level);
    *state = Some(logs_dir.to_path_buf());

    log::info!(
        "event=core_init module=logging status=ok level={} log_dir={}",
        level,
        logs_dir.display()
    );
    Ok(())
}
