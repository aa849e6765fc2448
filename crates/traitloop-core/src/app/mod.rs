//! App - アプリケーション層
//!
//! ports を組み合わせて Reconcile ループを実装します。
//!
//! # 主要コンポーネント
//! - **ReconcilerBuilder**: Reconciler の構築とワイヤリング（起動時検証）
//! - **Reconciler**: 1 Trait に対する 1 pass の状態機械
//! - **Controller**: WorkQueue から キーを取り出して pass を回す worker 群
//! - **Config**: 待ち時間・タイムアウト・worker 数

pub mod builder;
pub mod config;
pub mod controller;
pub mod reconciler;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, ReconcilerBuilder, ReconcilerOption, TraitKinds};
pub use self::config::{Config, ConfigError, ControllerConfig, ReconcilerConfig};
pub use self::controller::Controller;
pub use self::reconciler::{ReconcileOutcome, Reconciler};
