use log::info;
use std::sync::atomic::{AtomicBool, Ordering};

/// Where the run loop currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Paused,
    Running,
    AwaitingIntervention,
    Terminating,
}

/// Flags shared between the hotkey thread and the run loop.
///
/// Starts paused. Every flag is an atomic so the hotkey callbacks never
/// block the loop.
#[derive(Debug, Default)]
pub struct ControlState {
    running: AtomicBool,
    intervention: AtomicBool,
    quit: AtomicBool,
}

impl ControlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume hotkey: clears a pending intervention or starts the loop.
    pub fn resume(&self) {
        if self.intervention.swap(false, Ordering::AcqRel) {
            info!("Manual intervention complete, resuming");
        } else {
            info!("Script started");
        }
        self.running.store(true, Ordering::Release);
    }

    pub fn pause(&self) {
        self.running.store(false, Ordering::Release);
        info!("Script paused");
    }

    pub fn quit(&self) {
        self.quit.store(true, Ordering::Release);
        info!("Quit requested");
    }

    /// Raise the intervention flag. Returns `true` only for the call that raised it.
    pub fn flag_intervention(&self) -> bool {
        self.intervention
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn needs_intervention(&self) -> bool {
        self.intervention.load(Ordering::Acquire)
    }

    pub fn should_quit(&self) -> bool {
        self.quit.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> RunPhase {
        if self.should_quit() {
            RunPhase::Terminating
        } else if self.needs_intervention() {
            RunPhase::AwaitingIntervention
        } else if self.is_running() {
            RunPhase::Running
        } else {
            RunPhase::Paused
        }
    }
}
