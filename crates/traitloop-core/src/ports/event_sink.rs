//! EventRecorder port - イベント記録の抽象化
//!
//! 記録は fire-and-forget です。失敗しても Reconciler には伝播しません。

use crate::domain::{Event, Object};

/// EventRecorder は subject（通常は Trait）に紐づく Event を記録
pub trait EventRecorder: Send + Sync {
    fn record(&self, subject: &Object, event: Event);
}

/// NoopRecorder: 何もしない（デフォルト）
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRecorder;

impl EventRecorder for NoopRecorder {
    fn record(&self, _subject: &Object, _event: Event) {}
}
