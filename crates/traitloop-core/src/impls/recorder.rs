//! EventRecorder の実装
//!
//! - **TracingRecorder**: Event を tracing に出力（Warning は warn!、Normal は info!）
//! - **MemoryRecorder**: テストや CLI で後から参照するために保持

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::{Event, Object, ObjectKey, Severity};
use crate::ports::EventRecorder;

/// TracingRecorder: tracing へ出力するだけ
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRecorder;

impl EventRecorder for TracingRecorder {
    fn record(&self, subject: &Object, event: Event) {
        let kind = &subject.kind;
        let key = subject.key();
        match event.severity {
            Severity::Normal => tracing::info!(
                subject_kind = %kind, subject = %key, reason = %event.reason,
                "{}", event.message
            ),
            Severity::Warning => tracing::warn!(
                subject_kind = %kind, subject = %key, reason = %event.reason,
                "{}", event.message
            ),
        }
    }
}

/// Event recorded against a subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub subject: ObjectKey,
    pub event: Event,
}

/// MemoryRecorder は記録された Event を順に保持する
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    events: Mutex<Vec<RecordedEvent>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.lock().clone()
    }

    /// Reasons in recording order.
    pub fn reasons(&self) -> Vec<String> {
        self.lock().iter().map(|r| r.event.reason.clone()).collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    // poison されても記録は続ける（panic したテストの巻き添えにしない）
    fn lock(&self) -> MutexGuard<'_, Vec<RecordedEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventRecorder for MemoryRecorder {
    fn record(&self, subject: &Object, event: Event) {
        self.lock().push(RecordedEvent {
            subject: subject.key(),
            event,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::reason;
    use crate::domain::{Kind, StoreError};

    fn subject() -> Object {
        Object::new(Kind::new("core.oam.dev/v1alpha2", "ManualScalerTrait"), ObjectKey::new("default", "t1"))
    }

    #[test]
    fn memory_recorder_keeps_order() {
        let recorder = MemoryRecorder::new();
        recorder.record(&subject(), Event::normal(reason::CANNOT_GET_WORKLOAD, "waiting"));
        recorder.record(
            &subject(),
            Event::warning(reason::CANNOT_APPLY_MODIFICATION, &StoreError::Timeout),
        );

        assert_eq!(
            recorder.reasons(),
            vec![reason::CANNOT_GET_WORKLOAD, reason::CANNOT_APPLY_MODIFICATION]
        );
        let events = recorder.events();
        assert_eq!(events[1].subject, ObjectKey::new("default", "t1"));
        assert_eq!(events[1].event.severity, Severity::Warning);
        assert_eq!(events[1].event.message, "operation timed out");

        recorder.clear();
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn tracing_recorder_accepts_both_severities() {
        TracingRecorder.record(&subject(), Event::normal(reason::TRANSLATION_MODIFIED, "ok"));
        TracingRecorder.record(&subject(), Event::warning(reason::CANNOT_MODIFY_TRANSLATION, &StoreError::Timeout));
    }
}
