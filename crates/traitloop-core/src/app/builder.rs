//! ReconcilerBuilder - Reconciler の構築とワイヤリング
//!
//! # Fail-fast 設計
//! - Kind と Config は build() 時に一度だけ検証する
//! - 不正なら BuildError を返し、pass 中には検証しない

use std::sync::Arc;

use crate::app::config::{ConfigError, ReconcilerConfig};
use crate::app::reconciler::Reconciler;
use crate::domain::{Kind, KindError};
use crate::impls::TracingLogger;
use crate::modifier::{Modifier, NoopModifier};
use crate::ports::{Applicator, EventRecorder, Logger, NoopRecorder, ObjectStore, StoreApplicator};

/// The three kinds a reconciler works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraitKinds {
    /// Kind of the trait driving the modification.
    pub trait_kind: Kind,
    /// Kind of the workload the trait references.
    pub workload_kind: Kind,
    /// Kind of the object the workload is translated into.
    pub translation_kind: Kind,
}

impl TraitKinds {
    pub fn new(trait_kind: Kind, workload_kind: Kind, translation_kind: Kind) -> Self {
        Self {
            trait_kind,
            workload_kind,
            translation_kind,
        }
    }
}

/// BuildError は Reconciler 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("invalid {role} kind: {source}")]
    InvalidKind {
        role: &'static str,
        #[source]
        source: KindError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// ReconcilerOption は構築時の設定。順に適用され、後のものが前を上書きする
pub enum ReconcilerOption {
    Logger(Arc<dyn Logger>),
    Recorder(Arc<dyn EventRecorder>),
    Modifier(Arc<dyn Modifier>),
    Applicator(Arc<dyn Applicator>),
    Config(ReconcilerConfig),
}

/// ReconcilerBuilder はオプションを集めて Reconciler を構築
///
/// # 使用例
/// ```ignore
/// let reconciler = ReconcilerBuilder::new(store, kinds)
///     .with_modifier(Arc::new(with_accessor(ModifyFn(scale), FieldAccessor::new("/deployment"))))
///     .with_recorder(Arc::new(TracingRecorder))
///     .build()?;
/// ```
pub struct ReconcilerBuilder {
    store: Arc<dyn ObjectStore>,
    kinds: TraitKinds,
    logger: Arc<dyn Logger>,
    recorder: Arc<dyn EventRecorder>,
    modifier: Arc<dyn Modifier>,
    applicator: Arc<dyn Applicator>,
    config: ReconcilerConfig,
}

impl ReconcilerBuilder {
    pub fn new(store: Arc<dyn ObjectStore>, kinds: TraitKinds) -> Self {
        Self {
            applicator: Arc::new(StoreApplicator::new(Arc::clone(&store))),
            store,
            kinds,
            logger: Arc::new(TracingLogger),
            recorder: Arc::new(NoopRecorder),
            modifier: Arc::new(NoopModifier),
            config: ReconcilerConfig::default(),
        }
    }

    pub fn option(self, option: ReconcilerOption) -> Self {
        match option {
            ReconcilerOption::Logger(logger) => self.with_logger(logger),
            ReconcilerOption::Recorder(recorder) => self.with_recorder(recorder),
            ReconcilerOption::Modifier(modifier) => self.with_modifier(modifier),
            ReconcilerOption::Applicator(applicator) => self.with_applicator(applicator),
            ReconcilerOption::Config(config) => self.with_config(config),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_recorder(mut self, recorder: Arc<dyn EventRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    pub fn with_modifier(mut self, modifier: Arc<dyn Modifier>) -> Self {
        self.modifier = modifier;
        self
    }

    pub fn with_applicator(mut self, applicator: Arc<dyn Applicator>) -> Self {
        self.applicator = applicator;
        self
    }

    pub fn with_config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate kinds and config, then build.
    pub fn build(self) -> Result<Reconciler, BuildError> {
        for (role, kind) in [
            ("trait", &self.kinds.trait_kind),
            ("workload", &self.kinds.workload_kind),
            ("translation", &self.kinds.translation_kind),
        ] {
            kind.validate()
                .map_err(|source| BuildError::InvalidKind { role, source })?;
        }
        self.config.validate()?;

        Ok(Reconciler::from_parts(
            self.store,
            self.kinds,
            self.config,
            self.modifier,
            self.applicator,
            self.logger,
            self.recorder,
        ))
    }
}
