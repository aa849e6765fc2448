//! Impls - ports の実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **MemoryStore**: インメモリの ObjectStore（障害注入つき）
//! - **TracingLogger**: Logger → tracing
//! - **TracingRecorder / MemoryRecorder**: EventRecorder
//!
//! 本番用のストア（API server クライアントなど）は別クレートに配置する想定です。

pub mod logger;
pub mod memory_store;
pub mod recorder;

pub use self::logger::TracingLogger;
pub use self::memory_store::{MemoryStore, StoreOp};
pub use self::recorder::{MemoryRecorder, RecordedEvent, TracingRecorder};
