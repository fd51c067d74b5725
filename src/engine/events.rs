// ==========================================
// Cadet Roster - Grade events
// ==========================================
// The engine defines the publisher trait; subscribers (UI, sync jobs)
// receive a GradeEvent after every recompute instead of polling.
// ==========================================

use crate::domain::TransmutedGrade;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// What caused a snapshot to be recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GradeEventType {
    AttendanceChanged,
    LedgerChanged,
    ExamScoresChanged,
    TrainingDayAdded,
    TrainingDayRemoved,
    PolicyChanged,
    ManualRecompute,
}

impl GradeEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GradeEventType::AttendanceChanged => "AttendanceChanged",
            GradeEventType::LedgerChanged => "LedgerChanged",
            GradeEventType::ExamScoresChanged => "ExamScoresChanged",
            GradeEventType::TrainingDayAdded => "TrainingDayAdded",
            GradeEventType::TrainingDayRemoved => "TrainingDayRemoved",
            GradeEventType::PolicyChanged => "PolicyChanged",
            GradeEventType::ManualRecompute => "ManualRecompute",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeEvent {
    pub cadet_id: String,
    pub event_type: GradeEventType,
    pub final_grade: f64,
    pub transmuted_grade: TransmutedGrade,
}

/// Implementors must not block; publishing happens inside the per-cadet lock.
pub trait GradeEventPublisher: Send + Sync {
    fn publish(&self, event: GradeEvent);
}

/// Fan-out over a tokio broadcast channel.
///
/// Slow subscribers lag and lose the oldest events; they never block writers.
#[derive(Debug, Clone)]
pub struct BroadcastGradePublisher {
    sender: broadcast::Sender<GradeEvent>,
}

impl BroadcastGradePublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GradeEvent> {
        self.sender.subscribe()
    }

    pub fn shared(capacity: usize) -> Arc<Self> {
        Arc::new(Self::new(capacity))
    }
}

impl Default for BroadcastGradePublisher {
    fn default() -> Self {
        Self::new(256)
    }
}

impl GradeEventPublisher for BroadcastGradePublisher {
    fn publish(&self, event: GradeEvent) {
        // Err only means nobody is listening
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let publisher = BroadcastGradePublisher::new(4);
        let mut rx = publisher.subscribe();
        publisher.publish(GradeEvent {
            cadet_id: "c1".to_string(),
            event_type: GradeEventType::LedgerChanged,
            final_grade: 80.0,
            transmuted_grade: TransmutedGrade::from_final_grade(80.0),
        });
        let event = rx.recv().await.unwrap();
        assert_eq!(event.cadet_id, "c1");
        assert_eq!(event.transmuted_grade.to_string(), "2.50");
    }

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let publisher = BroadcastGradePublisher::default();
        publisher.publish(GradeEvent {
            cadet_id: "c1".to_string(),
            event_type: GradeEventType::ManualRecompute,
            final_grade: 0.0,
            transmuted_grade: TransmutedGrade::FAILED,
        });
    }
}
