//! Alert delivery sinks.

use async_trait::async_trait;
use tracing::warn;

use crate::domain::AlertEvent;

/// Error raised by a sink while delivering an alert.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The sink could not deliver the alert
    #[error("alert delivery failed: {0}")]
    Delivery(String),
}

/// Destination for emitted alerts.
///
/// Sinks are fan-out: every registered sink receives every alert, and one
/// sink failing never blocks the others or the detection path.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Sink name for diagnostics.
    fn name(&self) -> &str;

    /// Deliver one alert.
    async fn deliver(&self, event: &AlertEvent) -> Result<(), SinkError>;
}

/// Sink that prints alerts to stdout.
#[derive(Debug, Default)]
pub struct ConsoleAlertSink;

#[async_trait]
impl AlertSink for ConsoleAlertSink {
    fn name(&self) -> &str {
        "console"
    }

    async fn deliver(&self, event: &AlertEvent) -> Result<(), SinkError> {
        println!(
            "[{}] {} {} (confidence {:.2})",
            event.timestamp().format("%Y-%m-%d %H:%M:%S"),
            event.risk_level(),
            event.message(),
            event.confidence(),
        );
        Ok(())
    }
}

/// Sink that emits alerts as structured log records.
#[derive(Debug, Default)]
pub struct TracingAlertSink;

#[async_trait]
impl AlertSink for TracingAlertSink {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn deliver(&self, event: &AlertEvent) -> Result<(), SinkError> {
        warn!(
            alert_id = %event.id(),
            modalities = %event.modalities(),
            risk_level = %event.risk_level(),
            confidence = event.confidence(),
            message = event.message(),
            "alert"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ModalitySet, RiskLevel};

    fn event() -> AlertEvent {
        AlertEvent::new(
            ModalitySet::new(true, true, false),
            RiskLevel::Critical,
            0.95,
            "EMERGENCY: multiple distress signals detected",
        )
    }

    #[tokio::test]
    async fn test_console_sink_delivers() {
        let sink = ConsoleAlertSink;
        assert!(sink.deliver(&event()).await.is_ok());
        assert_eq!(sink.name(), "console");
    }

    #[tokio::test]
    async fn test_tracing_sink_delivers() {
        let sink = TracingAlertSink;
        assert!(sink.deliver(&event()).await.is_ok());
    }
}
