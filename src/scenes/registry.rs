use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::core::coords::NormRect;
use crate::scenes::handlers::{Handler, Step};
use crate::settings::AppSettings;

/// A named reference image and where to look for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub template: PathBuf,
    /// Search region; `None` searches the whole screen
    pub region: Option<NormRect>,
    pub confidence: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scene {
    Mainline,
    Interaction,
    Dialogue,
    DeepDialogue,
    Battle,
    BattleEnd,
    Confirm,
    AutoMove,
    Pause,
    Unknown,
}

impl fmt::Display for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scene::Mainline => "Mainline",
            Scene::Interaction => "Interaction",
            Scene::Dialogue => "Dialogue",
            Scene::DeepDialogue => "DeepDialogue",
            Scene::Battle => "Battle",
            Scene::BattleEnd => "BattleEnd",
            Scene::Confirm => "Confirm",
            Scene::AutoMove => "AutoMove",
            Scene::Pause => "Pause",
            Scene::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Which elements must be present or absent for a scene to apply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenePattern {
    required: Vec<(String, bool)>,
    overrides: Vec<(String, f32)>,
}

impl ScenePattern {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `element` to be present (`true`) or absent (`false`).
    pub fn require(mut self, element: &str, present: bool) -> Self {
        match self.required.iter_mut().find(|(name, _)| name == element) {
            Some(entry) => entry.1 = present,
            None => self.required.push((element.to_string(), present)),
        }
        self
    }

    /// Judge `element` against `confidence` instead of its own threshold.
    pub fn with_confidence(mut self, element: &str, confidence: f32) -> Self {
        match self.overrides.iter_mut().find(|(name, _)| name == element) {
            Some(entry) => entry.1 = confidence,
            None => self.overrides.push((element.to_string(), confidence)),
        }
        self
    }

    pub fn requirements(&self) -> impl Iterator<Item = (&str, bool)> {
        self.required.iter().map(|(name, present)| (name.as_str(), *present))
    }

    pub fn confidence_for(&self, element: &str) -> Option<f32> {
        self.overrides
            .iter()
            .find(|(name, _)| name == element)
            .map(|(_, confidence)| *confidence)
    }

    fn referenced(&self) -> impl Iterator<Item = &str> {
        self.required
            .iter()
            .map(|(name, _)| name.as_str())
            .chain(self.overrides.iter().map(|(name, _)| name.as_str()))
    }
}

pub struct SceneEntry {
    pub scene: Scene,
    pub pattern: ScenePattern,
    pub handler: Handler,
    pub description: String,
}

impl SceneEntry {
    pub fn new(scene: Scene, description: &str, pattern: ScenePattern, handler: Handler) -> Self {
        Self {
            scene,
            pattern,
            handler,
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("element '{0}' is registered twice")]
    DuplicateElement(String),
    #[error("scene {0} is registered twice")]
    DuplicateScene(Scene),
    #[error("the Unknown scene cannot be registered")]
    UnknownRegistered,
    #[error("scene {scene} references unregistered element '{element}'")]
    UnregisteredElement { scene: Scene, element: String },
    #[error("confidence {confidence} for '{element}' must lie strictly between 0 and 1")]
    InvalidConfidence { element: String, confidence: f32 },
}

/// Validated element and scene tables. Scene order is classification order.
pub struct Registry {
    elements: Vec<Element>,
    scenes: Vec<SceneEntry>,
}

fn check_confidence(element: &str, confidence: f32) -> Result<(), RegistryError> {
    if confidence > 0.0 && confidence < 1.0 {
        Ok(())
    } else {
        Err(RegistryError::InvalidConfidence {
            element: element.to_string(),
            confidence,
        })
    }
}

impl Registry {
    pub fn new(elements: Vec<Element>, scenes: Vec<SceneEntry>) -> Result<Self, RegistryError> {
        let mut names = HashSet::new();
        for element in &elements {
            if !names.insert(element.name.as_str()) {
                return Err(RegistryError::DuplicateElement(element.name.clone()));
            }
            check_confidence(&element.name, element.confidence)?;
        }

        let mut seen = HashSet::new();
        for entry in &scenes {
            if entry.scene == Scene::Unknown {
                return Err(RegistryError::UnknownRegistered);
            }
            if !seen.insert(entry.scene) {
                return Err(RegistryError::DuplicateScene(entry.scene));
            }

            let handler_refs = entry.handler.elements();
            for element in entry.pattern.referenced().chain(handler_refs) {
                if !names.contains(element) {
                    return Err(RegistryError::UnregisteredElement {
                        scene: entry.scene,
                        element: element.to_string(),
                    });
                }
            }
            for (element, confidence) in &entry.pattern.overrides {
                check_confidence(element, *confidence)?;
            }
        }

        Ok(Self { elements, scenes })
    }

    /// Build the default scene table over the elements from `settings`.
    pub fn from_settings(settings: &AppSettings) -> Result<Self, RegistryError> {
        let elements = settings
            .elements
            .iter()
            .map(|e| Element {
                name: e.name.clone(),
                template: settings.detection.template_dir.join(&e.template),
                region: e.region,
                confidence: e.confidence,
            })
            .collect();
        Self::new(elements, default_scenes())
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn scenes(&self) -> &[SceneEntry] {
        &self.scenes
    }

    pub fn element(&self, name: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.name == name)
    }

    pub fn entry(&self, scene: Scene) -> Option<&SceneEntry> {
        self.scenes.iter().find(|entry| entry.scene == scene)
    }

    /// Every element some pattern mentions, once, in order of first mention.
    pub fn referenced_elements(&self) -> Vec<&Element> {
        let mut seen = HashSet::new();
        self.scenes
            .iter()
            .flat_map(|entry| entry.pattern.referenced())
            .filter(|name| seen.insert(*name))
            .filter_map(|name| self.element(name))
            .collect()
    }
}

fn press(key: &str) -> Step {
    Step::Press(key.to_string())
}

fn wait_ms(ms: u64) -> Step {
    Step::Wait(Duration::from_millis(ms))
}

/// The game's scenes, most specific first where patterns overlap.
pub fn default_scenes() -> Vec<SceneEntry> {
    vec![
        SceneEntry::new(
            Scene::Mainline,
            "Mainline entry",
            ScenePattern::new()
                .require("mainline", true)
                .require("inter", false)
                .require("pause", false),
            Handler::Script(vec![Step::ClickLastSeen("mainline".to_string()), wait_ms(2000)]),
        ),
        SceneEntry::new(
            Scene::Interaction,
            "Interaction prompt",
            ScenePattern::new().require("mainline", true).require("inter", true),
            Handler::Script(vec![press("f"), wait_ms(1000)]),
        ),
        SceneEntry::new(
            Scene::Dialogue,
            "Dialogue",
            ScenePattern::new().require("skip", true).require("mainline", false),
            Handler::Script(vec![press("f2"), wait_ms(1000), press("enter")]),
        ),
        SceneEntry::new(
            Scene::DeepDialogue,
            "Deep dialogue",
            ScenePattern::new().require("skipChat", true),
            Handler::Script(vec![press("enter"), wait_ms(500)]),
        ),
        SceneEntry::new(
            Scene::Battle,
            "In battle",
            ScenePattern::new().require("war", true),
            Handler::Script(vec![Step::Note("Battle in progress".to_string()), wait_ms(2000)]),
        ),
        SceneEntry::new(
            Scene::BattleEnd,
            "Battle end",
            ScenePattern::new().require("exit", true),
            Handler::Script(vec![press("enter"), wait_ms(1000)]),
        ),
        SceneEntry::new(
            Scene::Confirm,
            "Confirmation dialog",
            ScenePattern::new().require("confirm", true),
            Handler::Script(vec![press("enter"), wait_ms(1000)]),
        ),
        SceneEntry::new(
            Scene::AutoMove,
            "Auto move",
            ScenePattern::new().require("autoMove", true),
            Handler::Script(vec![Step::Note("Auto move in progress".to_string()), wait_ms(2000)]),
        ),
        SceneEntry::new(
            Scene::Pause,
            "Manual intervention",
            ScenePattern::new().require("pause", true),
            Handler::RequestIntervention {
                title: "Manual intervention needed".to_string(),
                message: "The bot hit a screen it cannot handle. Sort it out in game, then press the resume hotkey to continue.".to_string(),
                settle: Duration::from_secs(1),
            },
        ),
    ]
}
