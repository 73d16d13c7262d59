use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::coords::{NormRect, DEFAULT_REGION_MARGIN};

pub const SETTINGS_FILE: &str = "bd2_bot_settings.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub hotkeys: HotkeySettings,

    #[serde(default)]
    pub timing: TimingSettings,

    #[serde(default)]
    pub detection: DetectionSettings,

    #[serde(default = "default_elements")]
    pub elements: Vec<ElementSettings>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HotkeyKey {
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    Escape,
    Insert,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
    Pause,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotkeyModifiers {
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub meta: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotkeyConfig {
    pub key: Option<HotkeyKey>,
    #[serde(default)]
    pub modifiers: HotkeyModifiers,
}

impl HotkeyConfig {
    pub fn plain(key: HotkeyKey) -> Self {
        Self {
            key: Some(key),
            modifiers: HotkeyModifiers::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotkeySettings {
    pub resume: HotkeyConfig,
    pub pause: HotkeyConfig,
    pub quit: HotkeyConfig,
}

impl Default for HotkeySettings {
    fn default() -> Self {
        Self {
            resume: HotkeyConfig::plain(HotkeyKey::Home),
            pause: HotkeyConfig::plain(HotkeyKey::End),
            quit: HotkeyConfig::plain(HotkeyKey::Escape),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingSettings {
    /// Shortest time one capture/classify/dispatch cycle may take
    pub min_cycle_ms: u64,
    /// Poll interval while paused or awaiting intervention
    pub idle_poll_ms: u64,
    /// Sleep after a cycle failed
    pub fault_backoff_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            min_cycle_ms: 500,
            idle_poll_ms: 500,
            fault_backoff_ms: 1000,
        }
    }
}

impl TimingSettings {
    pub fn min_cycle(&self) -> Duration {
        Duration::from_millis(self.min_cycle_ms)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }

    pub fn fault_backoff(&self) -> Duration {
        Duration::from_millis(self.fault_backoff_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionSettings {
    pub template_dir: PathBuf,
    #[serde(default = "default_region_margin")]
    pub region_margin: f64,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            template_dir: PathBuf::from("img"),
            region_margin: DEFAULT_REGION_MARGIN,
        }
    }
}

fn default_region_margin() -> f64 {
    DEFAULT_REGION_MARGIN
}

/// One reference image as authored with the calibration tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementSettings {
    pub name: String,
    /// Template file, relative to `detection.template_dir`
    pub template: PathBuf,
    /// Search region; `None` searches the whole screen
    #[serde(default)]
    pub region: Option<NormRect>,
    pub confidence: f32,
}

impl ElementSettings {
    fn new(name: &str, confidence: f32) -> Self {
        Self {
            name: name.to_string(),
            template: PathBuf::from(format!("{}.png", name)),
            region: None,
            confidence,
        }
    }
}

fn default_elements() -> Vec<ElementSettings> {
    vec![
        ElementSettings::new("mainline", 0.7),
        ElementSettings::new("skip", 0.7),
        ElementSettings::new("skipChat", 0.8),
        ElementSettings::new("exit", 0.8),
        ElementSettings::new("autoMove", 0.8),
        ElementSettings::new("inter", 0.85),
        ElementSettings::new("war", 0.7),
        ElementSettings::new("confirm", 0.7),
        ElementSettings::new("pause", 0.8),
    ]
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            hotkeys: HotkeySettings::default(),
            timing: TimingSettings::default(),
            detection: DetectionSettings::default(),
            elements: default_elements(),
        }
    }
}

impl AppSettings {
    /// Load settings from `path`. A missing file is created with defaults,
    /// a broken one is reported and replaced by defaults in memory only.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<AppSettings>(&contents) {
                Ok(mut settings) => {
                    info!("Loaded settings from {}", path.display());
                    settings.fill_missing_elements();
                    settings
                }
                Err(e) => {
                    warn!("Ignoring invalid settings file {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                let settings = Self::default();
                match settings.save(path) {
                    Ok(()) => info!("Wrote default settings to {}", path.display()),
                    Err(e) => warn!("Could not write default settings: {:#}", e),
                }
                settings
            }
        }
    }

    /// Append every default element the file does not name. Entries in the
    /// file replace the default of the same name.
    pub fn fill_missing_elements(&mut self) {
        for element in default_elements() {
            if !self.elements.iter().any(|e| e.name == element.name) {
                self.elements.push(element);
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }
}
