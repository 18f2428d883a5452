use crate::errors::AutomationError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing::warn;

/// Configuration record driving the watcher.
///
/// Replaced wholesale on every settings update; there are no partial
/// updates. Wire names are camelCase to match the deployed message shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringSettings {
    /// Seconds between poll ticks. The settings editor clamps this to
    /// [1, 60], but the watcher tolerates any positive value.
    pub interval: u64,
    /// Master switch
    pub enabled: bool,
    /// Notify the user on detection when auto-action is off
    pub show_alert: bool,
    /// Run the action sequence on detection
    pub auto_change_enabled: bool,
    /// Milliseconds between action-sequence stages
    pub wait_time: u64,
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            interval: 1,
            enabled: false,
            show_alert: true,
            auto_change_enabled: false,
            wait_time: 1000,
        }
    }
}

impl MonitoringSettings {
    /// Delay between poll ticks. Clamped to at least one second in case a
    /// caller bypassed the settings editor.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.interval.max(1))
    }

    /// Delay between action-sequence stages
    pub fn stage_wait(&self) -> Duration {
        Duration::from_millis(self.wait_time)
    }
}

/// Persistence contract for [`MonitoringSettings`]
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> Result<MonitoringSettings, AutomationError>;
    fn save(&self, settings: &MonitoringSettings) -> Result<(), AutomationError>;

    /// Load stored settings, substituting defaults on any failure.
    /// The failure is logged, not surfaced.
    fn read_or_default(&self) -> MonitoringSettings {
        match self.load() {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "failed to load settings, using defaults");
                MonitoringSettings::default()
            }
        }
    }
}

/// JSON file-backed settings store
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self) -> Result<MonitoringSettings, AutomationError> {
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| AutomationError::SettingsLoad(format!("{}: {e}", self.path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| AutomationError::SettingsLoad(format!("{}: {e}", self.path.display())))
    }

    fn save(&self, settings: &MonitoringSettings) -> Result<(), AutomationError> {
        let raw = serde_json::to_string_pretty(settings)
            .map_err(|e| AutomationError::SettingsSave(e.to_string()))?;
        std::fs::write(&self.path, raw)
            .map_err(|e| AutomationError::SettingsSave(format!("{}: {e}", self.path.display())))
    }
}

/// In-memory settings store, for tests and embedders without a filesystem
#[derive(Default)]
pub struct MemoryStore {
    stored: Mutex<Option<MonitoringSettings>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(settings: MonitoringSettings) -> Self {
        Self {
            stored: Mutex::new(Some(settings)),
        }
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<MonitoringSettings, AutomationError> {
        self.stored
            .lock()
            .map_err(|_| AutomationError::SettingsLoad("store lock poisoned".to_string()))?
            .clone()
            .ok_or_else(|| AutomationError::SettingsLoad("nothing stored".to_string()))
    }

    fn save(&self, settings: &MonitoringSettings) -> Result<(), AutomationError> {
        *self
            .stored
            .lock()
            .map_err(|_| AutomationError::SettingsSave("store lock poisoned".to_string()))? =
            Some(settings.clone());
        Ok(())
    }
}
