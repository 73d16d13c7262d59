mod automation;
mod controller;
mod core;
mod scenes;
mod settings;

use anyhow::{anyhow, Context, Result};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

use crate::automation::context::AutomationContext;
use crate::automation::detection::NccMatcher;
use crate::controller::RunController;
use crate::core::clock::SystemClock;
use crate::core::control::ControlState;
use crate::core::hotkey::{hotkey_label, spawn_listener};
use crate::core::input::RustAutoGuiInput;
use crate::core::notify::DialogNotifier;
use crate::core::screen_capture::XcapScreen;
use crate::scenes::registry::Registry;
use crate::settings::{AppSettings, SETTINGS_FILE};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    enable_dpi_awareness();

    let settings_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(SETTINGS_FILE));
    let settings = AppSettings::load(&settings_path);

    let registry = Registry::from_settings(&settings).context("Invalid scene table")?;
    info!(
        "Loaded {} scenes over {} elements from {}",
        registry.scenes().len(),
        registry.elements().len(),
        settings.detection.template_dir.display()
    );

    let control = Arc::new(ControlState::new());
    let ctx = AutomationContext::new(
        Box::new(XcapScreen::new()),
        Box::new(NccMatcher),
        Box::new(RustAutoGuiInput::new()?),
        Box::new(DialogNotifier),
        Box::new(SystemClock),
        Arc::clone(&control),
        settings.detection.region_margin,
    );

    let listener = spawn_listener(&settings.hotkeys, Arc::clone(&control))?;
    info!(
        "Hotkeys: {} start/resume, {} pause, {} quit",
        hotkey_label(&settings.hotkeys.resume),
        hotkey_label(&settings.hotkeys.pause),
        hotkey_label(&settings.hotkeys.quit)
    );

    RunController::new(registry, ctx, settings.timing.clone()).run();

    listener
        .join()
        .map_err(|_| anyhow!("Hotkey thread panicked"))?;
    info!("Bye");
    Ok(())
}

/// Keep captured pixels and click coordinates in the same space on scaled displays.
#[cfg(windows)]
fn enable_dpi_awareness() {
    use log::warn;
    use windows::Win32::UI::HiDpi::{SetProcessDpiAwareness, PROCESS_PER_MONITOR_DPI_AWARE};

    if let Err(e) = unsafe { SetProcessDpiAwareness(PROCESS_PER_MONITOR_DPI_AWARE) } {
        warn!("Could not enable DPI awareness: {}", e);
    }
}

#[cfg(not(windows))]
fn enable_dpi_awareness() {}
