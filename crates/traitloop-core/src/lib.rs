//! traitloop-core
//!
//! Trait 駆動の reconcile ループ。
//! Trait が参照する Workload の Translation を、差し込まれた Modifier で書き換えて
//! ストアに適用し、結果を Trait の Synced Condition と Event で報告します。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（Kind, Object, Condition, Event, errors）
//! - **ports**: 抽象化レイヤー（ObjectStore, Applicator, EventRecorder, Logger）
//! - **modifier**: Modifier / Accessor と合成（with_accessor, Chain, FieldAccessor）
//! - **queue**: キー単位で直列化する WorkQueue と RetryPolicy
//! - **app**: Reconciler, ReconcilerBuilder, Controller, Config
//! - **impls**: 実装（MemoryStore, TracingLogger, TracingRecorder など開発用）

pub mod app;
pub mod domain;
pub mod impls;
pub mod modifier;
pub mod ports;
pub mod queue;

pub use app::{
    Config, Controller, ControllerConfig, ReconcileOutcome, Reconciler, ReconcilerBuilder,
    ReconcilerConfig, ReconcilerOption, TraitKinds,
};
