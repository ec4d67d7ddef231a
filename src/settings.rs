use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "claude-checker";
const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Root of the claude.ai API; endpoints are resolved below it.
    pub base_url: String,

    /// Seconds between scheduled usage fetches.
    pub poll_interval_secs: u64,

    /// Per-request timeout in seconds, applied to both endpoints.
    pub request_timeout_secs: u64,

    /// Override for the `User-Agent` header.
    pub user_agent: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            base_url: "https://claude.ai/api".to_string(),
            poll_interval_secs: 300,
            request_timeout_secs: 30,
            user_agent: None,
        }
    }
}

/// Default location: ~/.config/claude-checker/settings.json
pub fn default_settings_path() -> Result<PathBuf, String> {
    let dir =
        dirs::config_dir().ok_or_else(|| "Could not determine config directory".to_string())?;
    Ok(dir.join(APP_DIR_NAME).join(SETTINGS_FILE_NAME))
}

pub fn load_settings(path: &Path) -> AppSettings {
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<AppSettings>(&contents) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Settings: failed to parse {:?}: {}", path, e);
                AppSettings::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => AppSettings::default(),
        Err(e) => {
            log::warn!("Settings: failed to read {:?}: {}", path, e);
            AppSettings::default()
        }
    }
}

/// Values to change in the stored settings; `None` keeps what is there.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsUpdate {
    pub poll_interval_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub base_url: Option<String>,
    pub user_agent: Option<String>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(&self, settings: &mut AppSettings) {
        if let Some(secs) = self.poll_interval_secs {
            settings.poll_interval_secs = secs;
        }
        if let Some(secs) = self.request_timeout_secs {
            settings.request_timeout_secs = secs;
        }
        if let Some(url) = &self.base_url {
            settings.base_url = url.trim().to_string();
        }
        if let Some(agent) = &self.user_agent {
            let agent = agent.trim();
            settings.user_agent = (!agent.is_empty()).then(|| agent.to_string());
        }
    }
}

/// Load the settings at `path`, apply `update` and write the result back.
/// Returns what was written.
pub fn update_settings(path: &Path, update: &SettingsUpdate) -> Result<AppSettings, String> {
    let mut settings = load_settings(path);
    update.apply_to(&mut settings);
    save_settings(path, &settings)?;
    log::info!("Settings: saved {:?}", path);
    Ok(settings)
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> Result<(), String> {
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| format!("Failed to serialize settings: {}", e))?;
    write_replacing(path, json.as_bytes())
}

/// Write `bytes` next to `path`, then move the file into place so readers
/// never see a half-written settings file.
fn write_replacing(path: &Path, bytes: &[u8]) -> Result<(), String> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = dir {
        std::fs::create_dir_all(dir)
            .map_err(|e| format!("Failed to create {:?}: {}", dir, e))?;
    }

    let staged = path.with_extension("json.tmp");
    std::fs::write(&staged, bytes).map_err(|e| format!("Failed to write {:?}: {}", staged, e))?;

    // rename() does not overwrite on Windows
    if cfg!(windows) {
        match std::fs::remove_file(path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                return Err(format!("Failed to replace {:?}: {}", path, e));
            }
            _ => {}
        }
    }

    std::fs::rename(&staged, path).map_err(|e| {
        let _ = std::fs::remove_file(&staged);
        format!("Failed to move settings into {:?}: {}", path, e)
    })
}
