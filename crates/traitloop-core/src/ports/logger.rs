//! Logger port - デバッグログの抽象化
//!
//! デフォルトは `impls::TracingLogger`（tracing へ流す）。

/// Logger receives debug messages with key/value fields.
pub trait Logger: Send + Sync {
    fn debug(&self, message: &str, fields: &[(&str, String)]);
}

/// NopLogger: すべて捨てる
#[derive(Debug, Clone, Copy, Default)]
pub struct NopLogger;

impl Logger for NopLogger {
    fn debug(&self, _message: &str, _fields: &[(&str, String)]) {}
}
