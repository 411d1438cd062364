use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use respite_core::{
    Error, Result,
    stats::StatisticsStore,
    store::StatsRepository,
};

pub const STATE_FILE: &str = "statistics.json";

/// Statistics slot backed by a pretty-printed JSON file.
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(STATE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StatsRepository for JsonFileRepository {
    fn load(&self) -> Result<Option<StatisticsStore>> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::persistence(format!(
                    "read {}: {e}",
                    self.path.display()
                )));
            }
        };

        let trimmed = raw.trim_ascii();
        if trimmed.is_empty() || trimmed == b"null" {
            return Ok(None);
        }

        match serde_json::from_slice(trimmed) {
            Ok(store) => Ok(Some(store)),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "statistics file is corrupt, starting fresh"
                );
                Ok(None)
            }
        }
    }

    fn save(&self, store: &StatisticsStore) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::persistence(format!("create {}: {e}", parent.display())))?;
        }
        let payload = serde_json::to_string_pretty(store)
            .map_err(|e| Error::persistence(e.to_string()))?;

        // Readers only ever see a complete file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, payload)
            .map_err(|e| Error::persistence(format!("write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| Error::persistence(format!("rename {}: {e}", self.path.display())))?;
        Ok(())
    }
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("respite")
}
