use crate::core::control::ControlState;
use crate::settings::{HotkeyConfig, HotkeyKey, HotkeyModifiers, HotkeySettings};
use anyhow::{anyhow, Context, Result};
use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use log::{debug, error, info};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// What a registered hotkey does to the shared control state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyAction {
    Resume,
    Pause,
    Quit,
}

impl HotkeyAction {
    pub fn apply(self, control: &ControlState) {
        match self {
            HotkeyAction::Resume => control.resume(),
            HotkeyAction::Pause => control.pause(),
            HotkeyAction::Quit => control.quit(),
        }
    }
}

pub fn hotkey_label(config: &HotkeyConfig) -> String {
    let Some(key) = config.key else {
        return "Disabled".to_string();
    };

    let mut parts: Vec<&'static str> = Vec::new();
    if config.modifiers.ctrl {
        parts.push("Ctrl");
    }
    if config.modifiers.alt {
        parts.push("Alt");
    }
    if config.modifiers.shift {
        parts.push("Shift");
    }
    if config.modifiers.meta {
        parts.push("Meta");
    }
    parts.push(hotkey_key_label(key));
    parts.join("+")
}

pub fn hotkey_from_config(config: &HotkeyConfig) -> Option<HotKey> {
    let key = config.key?;
    let code = hotkey_key_to_code(key);
    let modifiers = hotkey_modifiers_to_code(config.modifiers);
    if modifiers.is_empty() {
        Some(HotKey::new(None, code))
    } else {
        Some(HotKey::new(Some(modifiers), code))
    }
}

fn hotkey_key_label(key: HotkeyKey) -> &'static str {
    match key {
        HotkeyKey::F1 => "F1",
        HotkeyKey::F2 => "F2",
        HotkeyKey::F3 => "F3",
        HotkeyKey::F4 => "F4",
        HotkeyKey::F5 => "F5",
        HotkeyKey::F6 => "F6",
        HotkeyKey::F7 => "F7",
        HotkeyKey::F8 => "F8",
        HotkeyKey::F9 => "F9",
        HotkeyKey::F10 => "F10",
        HotkeyKey::F11 => "F11",
        HotkeyKey::F12 => "F12",
        HotkeyKey::Escape => "Esc",
        HotkeyKey::Insert => "Insert",
        HotkeyKey::Delete => "Delete",
        HotkeyKey::Home => "Home",
        HotkeyKey::End => "End",
        HotkeyKey::PageUp => "Page Up",
        HotkeyKey::PageDown => "Page Down",
        HotkeyKey::Pause => "Pause",
    }
}

fn hotkey_key_to_code(key: HotkeyKey) -> Code {
    match key {
        HotkeyKey::F1 => Code::F1,
        HotkeyKey::F2 => Code::F2,
        HotkeyKey::F3 => Code::F3,
        HotkeyKey::F4 => Code::F4,
        HotkeyKey::F5 => Code::F5,
        HotkeyKey::F6 => Code::F6,
        HotkeyKey::F7 => Code::F7,
        HotkeyKey::F8 => Code::F8,
        HotkeyKey::F9 => Code::F9,
        HotkeyKey::F10 => Code::F10,
        HotkeyKey::F11 => Code::F11,
        HotkeyKey::F12 => Code::F12,
        HotkeyKey::Escape => Code::Escape,
        HotkeyKey::Insert => Code::Insert,
        HotkeyKey::Delete => Code::Delete,
        HotkeyKey::Home => Code::Home,
        HotkeyKey::End => Code::End,
        HotkeyKey::PageUp => Code::PageUp,
        HotkeyKey::PageDown => Code::PageDown,
        HotkeyKey::Pause => Code::Pause,
    }
}

fn hotkey_modifiers_to_code(modifiers: HotkeyModifiers) -> Modifiers {
    let mut mods = Modifiers::empty();
    if modifiers.ctrl {
        mods |= Modifiers::CONTROL;
    }
    if modifiers.alt {
        mods |= Modifiers::ALT;
    }
    if modifiers.shift {
        mods |= Modifiers::SHIFT;
    }
    if modifiers.meta {
        mods |= Modifiers::META;
    }
    mods
}

/// Pair each configured binding with its action, skipping disabled ones.
pub fn bindings(settings: &HotkeySettings) -> Vec<(HotKey, HotkeyAction)> {
    [
        (&settings.resume, HotkeyAction::Resume),
        (&settings.pause, HotkeyAction::Pause),
        (&settings.quit, HotkeyAction::Quit),
    ]
    .into_iter()
    .filter_map(|(config, action)| hotkey_from_config(config).map(|hotkey| (hotkey, action)))
    .collect()
}

/// Start the thread that owns the global hotkey registrations.
///
/// Returns once the hotkeys are registered (or registration failed). The
/// thread exits after the quit flag is set.
pub fn spawn_listener(settings: &HotkeySettings, control: Arc<ControlState>) -> Result<JoinHandle<()>> {
    let bindings = bindings(settings);
    if !bindings.iter().any(|(_, action)| *action == HotkeyAction::Quit) {
        return Err(anyhow!("A quit hotkey is required"));
    }
    let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();

    let handle = thread::Builder::new()
        .name("hotkeys".to_string())
        .spawn(move || {
            // The manager must live on the thread that receives its events
            let manager = match register_all(&bindings) {
                Ok(manager) => {
                    let _ = ready_tx.send(Ok(()));
                    manager
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            let receiver = GlobalHotKeyEvent::receiver();
            while !control.should_quit() {
                pump_messages();
                match receiver.recv_timeout(Duration::from_millis(50)) {
                    Ok(event) if event.state == HotKeyState::Pressed => {
                        if let Some((_, action)) = bindings.iter().find(|(hotkey, _)| hotkey.id() == event.id) {
                            debug!("Hotkey {:?} pressed", action);
                            action.apply(&control);
                        }
                    }
                    _ => {}
                }
            }

            for (hotkey, _) in &bindings {
                if let Err(e) = manager.unregister(*hotkey) {
                    error!("Failed to unregister hotkey: {}", e);
                }
            }
        })
        .context("Failed to spawn hotkey thread")?;

    ready_rx
        .recv()
        .context("Hotkey thread exited before registering")??;
    Ok(handle)
}

fn register_all(bindings: &[(HotKey, HotkeyAction)]) -> Result<GlobalHotKeyManager> {
    let manager = GlobalHotKeyManager::new().map_err(|e| anyhow!("Failed to create hotkey manager: {}", e))?;
    for (hotkey, action) in bindings {
        manager
            .register(*hotkey)
            .map_err(|e| anyhow!("Failed to register {:?} hotkey: {}", action, e))?;
    }
    info!("Registered {} global hotkeys", bindings.len());
    Ok(manager)
}

/// Hotkey events on Windows arrive through this thread's message queue.
#[cfg(windows)]
fn pump_messages() {
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::WindowsAndMessaging::{DispatchMessageW, PeekMessageW, TranslateMessage, MSG, PM_REMOVE};

    unsafe {
        let mut msg = MSG::default();
        while PeekMessageW(&mut msg, HWND(0), 0, 0, PM_REMOVE).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

#[cfg(not(windows))]
fn pump_messages() {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_include_modifiers() {
        let config = HotkeyConfig {
            key: Some(HotkeyKey::F9),
            modifiers: HotkeyModifiers {
                ctrl: true,
                shift: true,
                ..HotkeyModifiers::default()
            },
        };
        assert_eq!(hotkey_label(&config), "Ctrl+Shift+F9");
        assert_eq!(hotkey_label(&HotkeyConfig { key: None, modifiers: HotkeyModifiers::default() }), "Disabled");
    }

    #[test]
    fn disabled_bindings_are_skipped() {
        let mut settings = HotkeySettings::default();
        settings.pause.key = None;

        let actions: Vec<HotkeyAction> = bindings(&settings).into_iter().map(|(_, action)| action).collect();
        assert_eq!(actions, vec![HotkeyAction::Resume, HotkeyAction::Quit]);
    }

    #[test]
    fn default_bindings_are_distinct() {
        let bound = bindings(&HotkeySettings::default());
        assert_eq!(bound.len(), 3);
        assert_ne!(bound[0].0.id(), bound[1].0.id());
        assert_ne!(bound[1].0.id(), bound[2].0.id());
    }

    #[test]
    fn actions_drive_the_control_state() {
        let control = ControlState::new();
        HotkeyAction::Resume.apply(&control);
        assert!(control.is_running());
        HotkeyAction::Pause.apply(&control);
        assert!(!control.is_running());
        HotkeyAction::Quit.apply(&control);
        assert!(control.should_quit());
    }
}
