use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use nestlist_core::db;

/// How often the event loop wakes up to poll persistence events.
pub const TICK_RATE: Duration = Duration::from_millis(50);

const LOG_FILE: &str = "nestlist.log";

/// Paths and timings the binary runs with.
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub log_path: PathBuf,
    pub tick_rate: Duration,
}

impl HubConfig {
    /// Resolve everything under the XDG data directory, creating it if needed.
    pub fn resolve() -> Result<Self> {
        let data_dir = db::data_dir()?;
        Ok(Self::in_dir(data_dir))
    }

    fn in_dir(data_dir: PathBuf) -> Self {
        Self {
            db_path: data_dir.join(db::DB_FILE),
            log_path: data_dir.join(LOG_FILE),
            data_dir,
            tick_rate: TICK_RATE,
        }
    }
}
