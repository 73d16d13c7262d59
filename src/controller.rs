use anyhow::Result;
use log::{error, info};

use crate::automation::context::AutomationContext;
use crate::core::control::RunPhase;
use crate::scenes::classifier::classify;
use crate::scenes::dispatcher::dispatch;
use crate::scenes::registry::{Registry, Scene};
use crate::settings::TimingSettings;

/// What one pass through the loop did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Paused or waiting on the operator; nothing was captured
    Idle(RunPhase),
    Cycle(Scene),
    Fault,
    Terminated,
}

/// Drives capture, classify, dispatch and pacing until quit.
pub struct RunController {
    registry: Registry,
    ctx: AutomationContext,
    timing: TimingSettings,
}

impl RunController {
    pub fn new(registry: Registry, ctx: AutomationContext, timing: TimingSettings) -> Self {
        Self { registry, ctx, timing }
    }

    pub fn run(&mut self) {
        info!("Run loop ready, waiting for the resume hotkey");
        while self.tick() != Tick::Terminated {}
        info!("Run loop stopped");
    }

    pub fn tick(&mut self) -> Tick {
        match self.ctx.control.phase() {
            RunPhase::Terminating => Tick::Terminated,
            phase @ (RunPhase::Paused | RunPhase::AwaitingIntervention) => {
                self.ctx.sleep(self.timing.idle_poll());
                Tick::Idle(phase)
            }
            RunPhase::Running => match self.run_cycle() {
                Ok(scene) => Tick::Cycle(scene),
                Err(e) => {
                    error!("Cycle failed: {:#}", e);
                    self.ctx.sleep(self.timing.fault_backoff());
                    Tick::Fault
                }
            },
        }
    }

    fn run_cycle(&mut self) -> Result<Scene> {
        let started = self.ctx.now();

        let scene = classify(&self.registry, &mut self.ctx);
        if scene != Scene::Unknown {
            dispatch(&self.registry, scene, &mut self.ctx)?;
        }

        let elapsed = self.ctx.now().duration_since(started);
        if let Some(rest) = self.timing.min_cycle().checked_sub(elapsed) {
            self.ctx.sleep(rest);
        }
        Ok(scene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::fakes::{InputEvent, Probe, Rig};
    use crate::scenes::registry::default_scenes;
    use std::time::Duration;

    const MAINLINE: u8 = 10;
    const INTER: u8 = 20;
    const PAUSE: u8 = 30;

    /// Controller over the default scene table with fake elements.
    fn controller() -> (RunController, Probe) {
        let mut rig = Rig::new((1920, 1080));
        let elements = vec![
            rig.element("mainline", MAINLINE, 0.7),
            rig.element("inter", INTER, 0.85),
            rig.element("pause", PAUSE, 0.8),
            rig.element("skip", 40, 0.7),
            rig.element("skipChat", 50, 0.8),
            rig.element("war", 60, 0.7),
            rig.element("exit", 70, 0.8),
            rig.element("confirm", 80, 0.7),
            rig.element("autoMove", 90, 0.8),
        ];
        let registry = Registry::new(elements, default_scenes()).unwrap();
        let Rig { ctx, probe } = rig;
        (RunController::new(registry, ctx, TimingSettings::default()), probe)
    }

    #[test]
    fn starts_paused_without_capturing() {
        let (mut controller, probe) = controller();

        assert_eq!(controller.tick(), Tick::Idle(RunPhase::Paused));
        assert_eq!(probe.capture_count(), 0);
        assert_eq!(probe.sleeps(), vec![Duration::from_millis(500)]);
    }

    #[test]
    fn unknown_scene_is_not_dispatched_but_still_paced() {
        let (mut controller, probe) = controller();
        probe.control.resume();

        assert_eq!(controller.tick(), Tick::Cycle(Scene::Unknown));
        assert_eq!(probe.capture_count(), 9);
        assert!(probe.input_events().is_empty());
        assert_eq!(probe.sleeps(), vec![Duration::from_millis(500)]);
    }

    #[test]
    fn mainline_without_interaction_clicks_once() {
        let (mut controller, probe) = controller();
        probe.set_hit(MAINLINE, 0.9, (1700, 30));
        probe.control.resume();

        assert_eq!(controller.tick(), Tick::Cycle(Scene::Mainline));
        assert_eq!(probe.input_events(), vec![InputEvent::Click(1704, 34)]);
        // the handler's own 2 s wait already covers the minimum period
        assert_eq!(probe.sleeps(), vec![Duration::from_secs(2)]);
    }

    #[test]
    fn mainline_with_interaction_presses_f() {
        let (mut controller, probe) = controller();
        probe.set_score(MAINLINE, 0.9);
        probe.set_score(INTER, 0.9);
        probe.control.resume();

        assert_eq!(controller.tick(), Tick::Cycle(Scene::Interaction));
        assert_eq!(probe.input_events(), vec![InputEvent::Key("f".to_string())]);
    }

    #[test]
    fn pause_scene_alerts_once_then_waits_for_resume() {
        let (mut controller, probe) = controller();
        probe.set_score(PAUSE, 0.95);
        probe.control.resume();

        assert_eq!(controller.tick(), Tick::Cycle(Scene::Pause));
        assert_eq!(probe.notifications().len(), 1);
        assert_eq!(probe.control.phase(), RunPhase::AwaitingIntervention);

        let captures = probe.capture_count();
        assert_eq!(controller.tick(), Tick::Idle(RunPhase::AwaitingIntervention));
        assert_eq!(controller.tick(), Tick::Idle(RunPhase::AwaitingIntervention));
        assert_eq!(probe.capture_count(), captures);
        assert_eq!(probe.notifications().len(), 1);

        probe.set_score(PAUSE, 0.1);
        probe.control.resume();
        assert_eq!(controller.tick(), Tick::Cycle(Scene::Unknown));
    }

    #[test]
    fn pause_hotkey_stops_capturing_until_resume() {
        let (mut controller, probe) = controller();
        probe.control.resume();
        controller.tick();
        let captures = probe.capture_count();

        probe.control.pause();
        assert_eq!(controller.tick(), Tick::Idle(RunPhase::Paused));
        assert_eq!(controller.tick(), Tick::Idle(RunPhase::Paused));
        assert_eq!(probe.capture_count(), captures);

        probe.control.resume();
        controller.tick();
        assert_eq!(probe.capture_count(), captures * 2);
    }

    #[test]
    fn handler_failure_backs_off_and_keeps_running() {
        let (mut controller, probe) = controller();
        probe.set_score(MAINLINE, 0.9);
        probe.fail_input(true);
        probe.control.resume();

        assert_eq!(controller.tick(), Tick::Fault);
        assert_eq!(probe.sleeps(), vec![Duration::from_secs(1)]);
        assert_eq!(probe.control.phase(), RunPhase::Running);

        probe.fail_input(false);
        assert_eq!(controller.tick(), Tick::Cycle(Scene::Mainline));
    }

    #[test]
    fn quit_ends_the_loop() {
        let (mut controller, probe) = controller();
        probe.control.resume();
        probe.control.quit();

        assert_eq!(controller.tick(), Tick::Terminated);
        controller.run();
        assert_eq!(probe.capture_count(), 0);
    }
}
