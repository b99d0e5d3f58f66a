//! Bounded in-memory alert history.

use std::collections::VecDeque;

use crate::domain::{AlertEvent, ModalitySet};

/// Ring buffer of the most recent alert events.
///
/// Append-only from the fusion machine's perspective; when full, the oldest
/// event is evicted. Memory use is bounded regardless of session length.
#[derive(Debug)]
pub struct AlertHistory {
    events: VecDeque<AlertEvent>,
    capacity: usize,
}

impl AlertHistory {
    /// Create an empty history with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    /// Append an event, evicting the oldest when at capacity.
    pub fn push(&mut self, event: AlertEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Widen the modality set of the most recent event, if any.
    pub fn merge_into_last(&mut self, modalities: ModalitySet) {
        if let Some(last) = self.events.back_mut() {
            last.merge_modalities(modalities);
        }
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether any events are retained.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The most recent event, if any.
    pub fn last(&self) -> Option<&AlertEvent> {
        self.events.back()
    }

    /// Snapshot of retained events, oldest first.
    pub fn snapshot(&self) -> Vec<AlertEvent> {
        self.events.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RiskLevel;

    fn event(message: &str) -> AlertEvent {
        AlertEvent::new(
            ModalitySet::new(true, false, false),
            RiskLevel::Critical,
            0.9,
            message,
        )
    }

    #[test]
    fn test_evicts_oldest_at_capacity() {
        let mut history = AlertHistory::new(3);
        for i in 0..5 {
            history.push(event(&format!("alert {i}")));
        }
        assert_eq!(history.len(), 3);
        let snapshot = history.snapshot();
        assert_eq!(snapshot[0].message(), "alert 2");
        assert_eq!(snapshot[2].message(), "alert 4");
    }

    #[test]
    fn test_merge_into_last() {
        let mut history = AlertHistory::new(3);
        history.push(event("first"));
        history.merge_into_last(ModalitySet::new(false, true, false));
        let last = history.last().unwrap();
        assert!(last.modalities().contains(crate::domain::TriggerModality::Audio));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_zero_capacity_clamped_to_one() {
        let mut history = AlertHistory::new(0);
        history.push(event("a"));
        history.push(event("b"));
        assert_eq!(history.len(), 1);
        assert_eq!(history.last().unwrap().message(), "b");
    }
}
