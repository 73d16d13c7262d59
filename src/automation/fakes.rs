//! In-memory stand-ins for the screen, matcher, input, dialog and clock.
//!
//! Templates are flat gray squares; the fake matcher looks up the score to
//! report by the template's shade, so each element gets its own knob.

use anyhow::{anyhow, Result};
use image::{GrayImage, Luma, RgbaImage};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::automation::context::AutomationContext;
use crate::automation::detection::{MatchHit, TemplateMatcher};
use crate::core::clock::Clock;
use crate::core::control::ControlState;
use crate::core::coords::{PixelRect, DEFAULT_REGION_MARGIN};
use crate::core::input::InputDriver;
use crate::core::notify::Notifier;
use crate::core::screen_capture::ScreenCapture;
use crate::scenes::registry::Element;

pub const TEMPLATE_SIZE: u32 = 8;

pub fn shade(width: u32, height: u32, value: u8) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([value]))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Key(String),
    Click(u32, u32),
}

struct FakeScreen {
    size: (u32, u32),
    regions: Rc<RefCell<Vec<Option<PixelRect>>>>,
    fail: Rc<Cell<bool>>,
}

impl ScreenCapture for FakeScreen {
    fn screen_size(&mut self) -> Result<(u32, u32)> {
        Ok(self.size)
    }

    fn capture(&mut self, region: Option<PixelRect>) -> Result<RgbaImage> {
        if self.fail.get() {
            return Err(anyhow!("capture device lost"));
        }
        self.regions.borrow_mut().push(region);
        let rect = region.unwrap_or_else(|| PixelRect::full(self.size));
        Ok(RgbaImage::new(rect.width(), rect.height()))
    }
}

struct FakeMatcher {
    hits: Rc<RefCell<HashMap<u8, MatchHit>>>,
}

impl TemplateMatcher for FakeMatcher {
    fn best_match(&self, _haystack: &GrayImage, template: &GrayImage) -> Result<MatchHit> {
        let key = template.get_pixel(0, 0)[0];
        Ok(self.hits.borrow().get(&key).copied().unwrap_or(MatchHit {
            score: 0.0,
            top_left: (0, 0),
        }))
    }
}

struct FakeInput {
    events: Rc<RefCell<Vec<InputEvent>>>,
    fail: Rc<Cell<bool>>,
}

impl InputDriver for FakeInput {
    fn press_key(&mut self, name: &str) -> Result<()> {
        if self.fail.get() {
            return Err(anyhow!("input blocked"));
        }
        self.events.borrow_mut().push(InputEvent::Key(name.to_string()));
        Ok(())
    }

    fn click(&mut self, x: u32, y: u32) -> Result<()> {
        if self.fail.get() {
            return Err(anyhow!("input blocked"));
        }
        self.events.borrow_mut().push(InputEvent::Click(x, y));
        Ok(())
    }
}

struct FakeNotifier {
    shown: Rc<RefCell<Vec<(String, String)>>>,
}

impl Notifier for FakeNotifier {
    fn notify(&mut self, title: &str, message: &str) {
        self.shown.borrow_mut().push((title.to_string(), message.to_string()));
    }
}

/// Virtual time: only sleeping moves the clock.
struct FakeClock {
    start: Instant,
    elapsed: Cell<Duration>,
    sleeps: Rc<RefCell<Vec<Duration>>>,
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed.get()
    }

    fn sleep(&mut self, duration: Duration) {
        self.elapsed.set(self.elapsed.get() + duration);
        self.sleeps.borrow_mut().push(duration);
    }
}

/// Shared handles onto the fakes behind a [`Rig`]'s context.
#[derive(Clone)]
pub struct Probe {
    pub control: Arc<ControlState>,
    regions: Rc<RefCell<Vec<Option<PixelRect>>>>,
    capture_fail: Rc<Cell<bool>>,
    hits: Rc<RefCell<HashMap<u8, MatchHit>>>,
    events: Rc<RefCell<Vec<InputEvent>>>,
    input_fail: Rc<Cell<bool>>,
    shown: Rc<RefCell<Vec<(String, String)>>>,
    sleeps: Rc<RefCell<Vec<Duration>>>,
}

impl Probe {
    pub fn set_score(&self, value: u8, score: f32) {
        self.set_hit(value, score, (0, 0));
    }

    pub fn set_hit(&self, value: u8, score: f32, top_left: (u32, u32)) {
        self.hits.borrow_mut().insert(value, MatchHit { score, top_left });
    }

    pub fn fail_captures(&self, fail: bool) {
        self.capture_fail.set(fail);
    }

    pub fn fail_input(&self, fail: bool) {
        self.input_fail.set(fail);
    }

    pub fn capture_count(&self) -> usize {
        self.regions.borrow().len()
    }

    pub fn captured_regions(&self) -> Vec<Option<PixelRect>> {
        self.regions.borrow().clone()
    }

    pub fn input_events(&self) -> Vec<InputEvent> {
        self.events.borrow().clone()
    }

    pub fn notifications(&self) -> Vec<(String, String)> {
        self.shown.borrow().clone()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

/// An automation context wired to fakes.
pub struct Rig {
    pub ctx: AutomationContext,
    pub probe: Probe,
}

impl Rig {
    pub fn new(screen_size: (u32, u32)) -> Self {
        let probe = Probe {
            control: Arc::new(ControlState::new()),
            regions: Rc::new(RefCell::new(Vec::new())),
            capture_fail: Rc::new(Cell::new(false)),
            hits: Rc::new(RefCell::new(HashMap::new())),
            events: Rc::new(RefCell::new(Vec::new())),
            input_fail: Rc::new(Cell::new(false)),
            shown: Rc::new(RefCell::new(Vec::new())),
            sleeps: Rc::new(RefCell::new(Vec::new())),
        };

        let ctx = AutomationContext::new(
            Box::new(FakeScreen {
                size: screen_size,
                regions: Rc::clone(&probe.regions),
                fail: Rc::clone(&probe.capture_fail),
            }),
            Box::new(FakeMatcher {
                hits: Rc::clone(&probe.hits),
            }),
            Box::new(FakeInput {
                events: Rc::clone(&probe.events),
                fail: Rc::clone(&probe.input_fail),
            }),
            Box::new(FakeNotifier {
                shown: Rc::clone(&probe.shown),
            }),
            Box::new(FakeClock {
                start: Instant::now(),
                elapsed: Cell::new(Duration::ZERO),
                sleeps: Rc::clone(&probe.sleeps),
            }),
            Arc::clone(&probe.control),
            DEFAULT_REGION_MARGIN,
        );

        Self { ctx, probe }
    }

    /// Register a full-screen element whose template is a square of `value`.
    pub fn element(&mut self, name: &str, value: u8, confidence: f32) -> Element {
        let path = PathBuf::from(format!("{}.png", name));
        self.ctx
            .templates
            .insert(path.clone(), shade(TEMPLATE_SIZE, TEMPLATE_SIZE, value));
        Element {
            name: name.to_string(),
            template: path,
            region: None,
            confidence,
        }
    }
}
