use anyhow::{Context, Result};
use log::{info, warn};
use std::time::Duration;

use crate::automation::context::AutomationContext;

/// One scripted action.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Press(String),
    /// Click where the named element was last detected
    ClickLastSeen(String),
    Wait(Duration),
    Note(String),
}

/// What a scene does once it has been recognised.
#[derive(Debug, Clone, PartialEq)]
pub enum Handler {
    Script(Vec<Step>),
    /// Raise the intervention flag and alert the operator the first time.
    RequestIntervention {
        title: String,
        message: String,
        settle: Duration,
    },
}

impl Handler {
    pub fn run(&self, ctx: &mut AutomationContext) -> Result<()> {
        match self {
            Handler::Script(steps) => {
                for step in steps {
                    run_step(step, ctx)?;
                }
                Ok(())
            }
            Handler::RequestIntervention { title, message, settle } => {
                if ctx.control.flag_intervention() {
                    warn!("Manual intervention needed, press the resume hotkey to continue");
                    ctx.notifier.notify(title, message);
                }
                ctx.sleep(*settle);
                Ok(())
            }
        }
    }

    /// Element names the handler looks up at run time.
    pub fn elements(&self) -> Vec<&str> {
        match self {
            Handler::Script(steps) => steps
                .iter()
                .filter_map(|step| match step {
                    Step::ClickLastSeen(element) => Some(element.as_str()),
                    _ => None,
                })
                .collect(),
            Handler::RequestIntervention { .. } => Vec::new(),
        }
    }
}

fn run_step(step: &Step, ctx: &mut AutomationContext) -> Result<()> {
    match step {
        Step::Press(key) => ctx
            .input
            .press_key(key)
            .with_context(|| format!("Failed to press {}", key)),
        Step::ClickLastSeen(element) => match ctx.last_seen(element) {
            Some((x, y)) => ctx
                .input
                .click(x, y)
                .with_context(|| format!("Failed to click {} at ({}, {})", element, x, y)),
            None => {
                warn!("No known position for {}, skipping click", element);
                Ok(())
            }
        },
        Step::Wait(duration) => {
            ctx.sleep(*duration);
            Ok(())
        }
        Step::Note(text) => {
            info!("{}", text);
            Ok(())
        }
    }
}
