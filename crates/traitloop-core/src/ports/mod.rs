//! Ports - 抽象化レイヤー
//!
//! Reconciler が依存する外部システム（オブジェクトストア、イベント記録、ログ）への
//! インターフェースを定義し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - ストアが source of truth（正本）
//! - 所有権チェックはストアの条件付き書き込みで行う（ロックを使わない）
//! - Event / Logger は fire-and-forget

pub mod applicator;
pub mod event_sink;
pub mod logger;
pub mod store;

// 主要な trait を再エクスポート
pub use self::applicator::{ApplyOption, Applicator, StoreApplicator};
pub use self::event_sink::{EventRecorder, NoopRecorder};
pub use self::logger::{Logger, NopLogger};
pub use self::store::ObjectStore;
