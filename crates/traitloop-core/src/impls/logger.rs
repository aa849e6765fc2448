//! TracingLogger - Logger port を tracing に流す実装

use crate::ports::Logger;

/// TracingLogger は debug メッセージを `tracing::debug!` で出力する
///
/// fields は `key=value` を空白区切りで並べた 1 つのフィールドにまとめます。
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, message: &str, fields: &[(&str, String)]) {
        if fields.is_empty() {
            tracing::debug!(target: "traitloop", "{message}");
            return;
        }
        tracing::debug!(target: "traitloop", fields = %render_fields(fields), "{message}");
    }
}

fn render_fields(fields: &[(&str, String)]) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(" ")
}
