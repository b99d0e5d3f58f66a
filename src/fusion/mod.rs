//! Multi-modal fusion, alert debouncing, and alert delivery.
//!
//! Three independent trigger sources feed this layer: the pose pipeline's
//! risk assessment (visual), help-keyword detection (audio), and emergency
//! gestures. The [`FusionMachine`] fuses them into debounced
//! [`AlertEvent`](crate::domain::AlertEvent)s, retains a bounded history,
//! and the engine fans emitted events out to the registered
//! [`AlertSink`]s.

mod history;
mod machine;
mod sink;

pub use history::AlertHistory;
pub use machine::{FusionConfig, FusionMachine};
pub use sink::{AlertSink, ConsoleAlertSink, SinkError, TracingAlertSink};
