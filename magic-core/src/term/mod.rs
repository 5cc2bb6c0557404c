//! Terminal-side helpers used by the bridge.
//!
//! - `osc`: the OSC 133 marker protocol (parse, strip, chunk-safe scanning)
//! - `modes`: raw-mode controller for the real terminal
//! - `semantic`: prompt/command cycle derived from timing events
//! - `size`: window size ioctls

pub mod modes;
pub mod osc;
pub mod semantic;
pub mod size;

pub use modes::{TerminalModeController, TerminalModeSnapshot};
pub use osc::{parse, MarkerKind, MarkerScanner, Segment};
pub use semantic::{CommandCycle, CycleEvent};
pub use size::WindowSize;
