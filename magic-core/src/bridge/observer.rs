// magic-core/src/bridge/observer.rs

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::warn;

use crate::error::BridgeError;
use crate::TimingEvent;

/// Receives timing events from the output path.
///
/// Called on the output thread, after the text preceding the marker has been
/// written out. Errors and panics are logged and otherwise ignored.
pub trait Observer: Send {
    fn on_event(&mut self, event: &TimingEvent) -> anyhow::Result<()>;
}

impl<F> Observer for F
where
    F: FnMut(&TimingEvent) -> anyhow::Result<()> + Send,
{
    fn on_event(&mut self, event: &TimingEvent) -> anyhow::Result<()> {
        self(event)
    }
}

/// Observers in subscription order.
#[derive(Default)]
pub struct ObserverSet {
    observers: Vec<Box<dyn Observer>>,
}

impl std::fmt::Debug for ObserverSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverSet")
            .field("len", &self.observers.len())
            .finish()
    }
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: impl Observer + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Deliver `event` to every observer, in order. Returns how many failed.
    pub fn dispatch(&mut self, event: &TimingEvent) -> usize {
        let mut failed = 0;
        for (idx, observer) in self.observers.iter_mut().enumerate() {
            let outcome = catch_unwind(AssertUnwindSafe(|| observer.on_event(event)));
            let error = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => BridgeError::Observer(format!("#{idx} on {}: {e:#}", event.kind.as_str())),
                Err(panic) => BridgeError::Observer(format!(
                    "#{idx} panicked on {}: {}",
                    event.kind.as_str(),
                    panic_message(panic.as_ref())
                )),
            };
            warn!("{}", error);
            failed += 1;
        }
        failed
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
