use anyhow::{Context, Result};
use log::{info, warn};

use crate::automation::context::AutomationContext;
use crate::scenes::registry::{Registry, Scene};

/// Run the handler registered for `scene`. Scenes without one are skipped.
pub fn dispatch(registry: &Registry, scene: Scene, ctx: &mut AutomationContext) -> Result<()> {
    let Some(entry) = registry.entry(scene) else {
        warn!("No handler registered for scene {}", scene);
        return Ok(());
    };

    info!("Handling {}: {}", scene, entry.description);
    entry
        .handler
        .run(ctx)
        .with_context(|| format!("{} handler failed", scene))
}
