use std::time::{Duration, Instant};

use crate::{MarkerKind, TimingEvent};

/// What a timing event meant for the command cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleEvent {
    CommandStarted,
    CommandFinished { duration: Duration },
    PromptShown,
}

/// Prompt/command state derived from timing events.
#[derive(Debug, Clone, Default)]
pub struct CommandCycle {
    pub in_prompt: bool,
    pub in_command: bool,
    pub completed: u64,
    started_at: Option<Instant>,
}

impl CommandCycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, ev: &TimingEvent) -> Option<CycleEvent> {
        match ev.kind {
            MarkerKind::CommandStart => {
                self.in_command = true;
                self.in_prompt = false;
                self.started_at = Some(ev.at);
                Some(CycleEvent::CommandStarted)
            }
            MarkerKind::CommandEnd => {
                self.in_command = false;
                // A bare end (first prompt, empty command line) has nothing to time.
                let started = self.started_at.take()?;
                self.completed += 1;
                Some(CycleEvent::CommandFinished {
                    duration: ev.at.saturating_duration_since(started),
                })
            }
            MarkerKind::PromptStart => {
                self.in_prompt = true;
                self.in_command = false;
                None
            }
            MarkerKind::PromptEnd => {
                self.in_prompt = true;
                Some(CycleEvent::PromptShown)
            }
        }
    }
}
