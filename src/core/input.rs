use anyhow::{anyhow, Result};
use rustautogui::RustAutoGui;
use std::thread;
use std::time::Duration;

/// Simulated keyboard and mouse used by scene handlers.
pub trait InputDriver {
    /// Press and release a key by name (`"f"`, `"f2"`, `"enter"`, ...).
    fn press_key(&mut self, name: &str) -> Result<()>;

    /// Left click at absolute screen coordinates.
    fn click(&mut self, x: u32, y: u32) -> Result<()>;
}

pub struct RustAutoGuiInput {
    gui: RustAutoGui,
}

impl RustAutoGuiInput {
    pub fn new() -> Result<Self> {
        let gui = RustAutoGui::new(false)
            .map_err(|e| anyhow!("Failed to initialize RustAutoGui: {}", e))?;
        Ok(Self { gui })
    }
}

/// rustautogui spells Enter as "return" and wants lowercase names.
fn command_name(name: &str) -> String {
    match name.to_lowercase().as_str() {
        "enter" => "return".to_string(),
        "esc" => "escape".to_string(),
        other => other.to_string(),
    }
}

impl InputDriver for RustAutoGuiInput {
    fn press_key(&mut self, name: &str) -> Result<()> {
        let result = if name.chars().count() == 1 {
            self.gui.keyboard_input(name)
        } else {
            self.gui.keyboard_command(&command_name(name))
        };
        result.map_err(|e| anyhow!("Failed to press '{}': {}", name, e))
    }

    fn click(&mut self, x: u32, y: u32) -> Result<()> {
        // Two attempts, 50 ms apart
        let mut last_error = String::new();
        for attempt in 0..2 {
            if attempt > 0 {
                thread::sleep(Duration::from_millis(50));
            }

            if let Err(e) = self.gui.move_mouse_to_pos(x, y, 0.0) {
                last_error = e.to_string();
                continue;
            }

            thread::sleep(Duration::from_millis(20));

            match self.gui.left_click() {
                Ok(()) => return Ok(()),
                Err(e) => last_error = e.to_string(),
            }
        }
        Err(anyhow!("Failed to click at ({}, {}): {}", x, y, last_error))
    }
}
