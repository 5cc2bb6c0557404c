// magic-shell/src/telemetry.rs

use std::time::Duration;

use magic_core::term::{CommandCycle, CycleEvent};
use magic_core::{Observer, TimingEvent};
use tracing::{debug, info};

/// Logs how long each command took.
#[derive(Debug, Default)]
pub struct CommandTimer {
    cycle: CommandCycle,
    last: Option<Duration>,
}

impl CommandTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Duration of the most recent completed command.
    pub fn last_duration(&self) -> Option<Duration> {
        self.last
    }

    pub fn completed(&self) -> u64 {
        self.cycle.completed
    }
}

impl Observer for CommandTimer {
    fn on_event(&mut self, event: &TimingEvent) -> anyhow::Result<()> {
        match self.cycle.apply(event) {
            Some(CycleEvent::CommandFinished { duration }) => {
                self.last = Some(duration);
                info!(
                    "command #{} finished in {}",
                    self.cycle.completed,
                    format_duration_short(duration)
                );
            }
            Some(CycleEvent::CommandStarted) => debug!("command started"),
            Some(CycleEvent::PromptShown) => debug!("prompt shown"),
            None => {}
        }
        Ok(())
    }
}

pub fn format_duration_short(d: Duration) -> String {
    let secs = d.as_secs();
    if secs == 0 {
        format!("{}ms", d.as_millis())
    } else if secs < 60 {
        format!("{}.{}s", secs, d.subsec_millis() / 100)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}
