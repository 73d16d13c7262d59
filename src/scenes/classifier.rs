use log::debug;

use crate::automation::context::AutomationContext;
use crate::automation::detection::{Detection, Readings};
use crate::scenes::registry::{Registry, Scene, ScenePattern};

/// Probe every element the registry refers to, once each.
///
/// Failed probes come back absent. Present elements update the context's
/// last-seen cache.
pub fn survey(registry: &Registry, ctx: &mut AutomationContext) -> Readings {
    let mut readings = Readings::new();
    for element in registry.referenced_elements() {
        let detection = ctx.probe(element, element.confidence);
        if let Some(point) = detection.point {
            ctx.remember(&element.name, point);
        }
        readings.insert(element.name.clone(), detection);
    }
    readings
}

fn is_present(element: &str, pattern: &ScenePattern, readings: &Readings) -> bool {
    let Some(detection) = readings.get(element) else {
        return false;
    };
    match (pattern.confidence_for(element), detection.score) {
        (Some(threshold), Some(score)) => score > threshold,
        (Some(_), None) => false,
        (None, _) => detection.present,
    }
}

pub fn pattern_matches(pattern: &ScenePattern, readings: &Readings) -> bool {
    pattern
        .requirements()
        .all(|(element, wanted)| is_present(element, pattern, readings) == wanted)
}

/// First registered scene whose pattern holds, else `Unknown`.
pub fn select_scene(registry: &Registry, readings: &Readings) -> Scene {
    registry
        .scenes()
        .iter()
        .find(|entry| pattern_matches(&entry.pattern, readings))
        .map(|entry| entry.scene)
        .unwrap_or(Scene::Unknown)
}

pub fn classify(registry: &Registry, ctx: &mut AutomationContext) -> Scene {
    let readings = survey(registry, ctx);
    let scene = select_scene(registry, &readings);
    debug!(
        "Classified {} ({} of {} elements present)",
        scene,
        readings.values().filter(|d: &&Detection| d.present).count(),
        readings.len()
    );
    scene
}
