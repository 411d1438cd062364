use std::{
    fs,
    path::{Path, PathBuf},
};

use respite_core::config::Settings;

use crate::AppError;

pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("respite")
        .join("config.toml")
}

/// Loads settings from `path`, falling back to defaults when the file
/// does not exist. Missing keys take their default values.
pub fn load(path: &Path) -> Result<Settings, AppError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no settings file, using defaults");
        return Ok(Settings::default());
    }
    let contents = fs::read_to_string(path)?;
    let settings: Settings = toml::from_str(&contents)?;
    settings.validate()?;
    Ok(settings)
}

pub fn save(path: &Path, settings: &Settings) -> Result<(), AppError> {
    settings.validate()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, toml::to_string_pretty(settings)?)?;
    Ok(())
}
