use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::automation::detection::{TemplateLibrary, TemplateMatcher};
use crate::core::clock::Clock;
use crate::core::control::ControlState;
use crate::core::input::InputDriver;
use crate::core::notify::Notifier;
use crate::core::screen_capture::ScreenCapture;

/// Everything a cycle needs to look at the screen and act on it.
///
/// Handlers receive this as their controller handle: it exposes the input
/// driver, the shared control flags and the last place each element was seen.
pub struct AutomationContext {
    pub screen: Box<dyn ScreenCapture>,
    pub matcher: Box<dyn TemplateMatcher>,
    pub input: Box<dyn InputDriver>,
    pub notifier: Box<dyn Notifier>,
    pub clock: Box<dyn Clock>,
    pub control: Arc<ControlState>,
    pub templates: TemplateLibrary,
    pub region_margin: f64,
    screen_size: Option<(u32, u32)>,
    last_seen: HashMap<String, (u32, u32)>,
}

impl AutomationContext {
    pub fn new(
        screen: Box<dyn ScreenCapture>,
        matcher: Box<dyn TemplateMatcher>,
        input: Box<dyn InputDriver>,
        notifier: Box<dyn Notifier>,
        clock: Box<dyn Clock>,
        control: Arc<ControlState>,
        region_margin: f64,
    ) -> Self {
        Self {
            screen,
            matcher,
            input,
            notifier,
            clock,
            control,
            templates: TemplateLibrary::new(),
            region_margin,
            screen_size: None,
            last_seen: HashMap::new(),
        }
    }

    /// Display size, queried once and then assumed stable.
    pub fn screen_size(&mut self) -> Result<(u32, u32)> {
        if let Some(size) = self.screen_size {
            return Ok(size);
        }
        let size = self.screen.screen_size()?;
        self.screen_size = Some(size);
        Ok(size)
    }

    pub fn remember(&mut self, element: &str, point: (u32, u32)) {
        self.last_seen.insert(element.to_string(), point);
    }

    /// Where `element` was last detected, in screen pixels.
    pub fn last_seen(&self, element: &str) -> Option<(u32, u32)> {
        self.last_seen.get(element).copied()
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    pub fn sleep(&mut self, duration: Duration) {
        self.clock.sleep(duration);
    }
}
