//! Reconciler - 1 つの Trait に対する 1 回の pass
//!
//! # フロー
//! 1. Trait を取得（NotFound なら何もせず終了）
//! 2. Trait の参照から Workload を取得
//! 3. Workload と同名の Translation を取得
//! 4. Modifier を適用
//! 5. Applicator で永続化（Workload の Uid による controller 条件付き）
//! 6. Synced Condition と Event を記録し、次の requeue 時刻を返す
//!
//! ステップは常にこの順で、pass 内でのリトライはしない。
//! 再実行は返した requeue を見た外側のキューが行います。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::app::builder::{BuildError, ReconcilerBuilder, ReconcilerOption, TraitKinds};
use crate::app::config::ReconcilerConfig;
use crate::domain::events::reason;
use crate::domain::{Condition, Event, ModifyError, Object, ObjectKey, ReconcileError, StoreError};
use crate::modifier::{ModifyContext, Modifier};
use crate::ports::{ApplyOption, Applicator, EventRecorder, Logger, ObjectStore};

/// ReconcileOutcome is the result of one pass.
///
/// The requeue delay and the error are independent: a pass whose status write
/// failed still asks to be requeued.
#[derive(Debug)]
pub struct ReconcileOutcome {
    /// Run the pass again after this delay. None means "don't requeue".
    pub requeue_after: Option<Duration>,
    pub error: Option<ReconcileError>,
}

impl ReconcileOutcome {
    fn done() -> Self {
        Self {
            requeue_after: None,
            error: None,
        }
    }

    fn failed(error: ReconcileError) -> Self {
        Self {
            requeue_after: None,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// How far a pass got before it reported.
enum Progress {
    /// Workload or translation does not exist yet.
    Waiting(Event),
    /// Translation modified and applied.
    Modified,
}

/// A step that failed, with the event reason to report it under.
struct Failure {
    reason: &'static str,
    error: ReconcileError,
}

impl Failure {
    fn new(reason: &'static str, error: ReconcileError) -> Self {
        Self { reason, error }
    }
}

/// Reconciler drives translations of workloads referenced by traits.
pub struct Reconciler {
    store: Arc<dyn ObjectStore>,
    kinds: TraitKinds,
    config: ReconcilerConfig,
    modifier: Arc<dyn Modifier>,
    applicator: Arc<dyn Applicator>,
    logger: Arc<dyn Logger>,
    recorder: Arc<dyn EventRecorder>,
}

impl Reconciler {
    /// Build a reconciler for `kinds`, applying `options` in order.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        kinds: TraitKinds,
        options: impl IntoIterator<Item = ReconcilerOption>,
    ) -> Result<Self, BuildError> {
        options
            .into_iter()
            .fold(ReconcilerBuilder::new(store, kinds), ReconcilerBuilder::option)
            .build()
    }

    pub(crate) fn from_parts(
        store: Arc<dyn ObjectStore>,
        kinds: TraitKinds,
        config: ReconcilerConfig,
        modifier: Arc<dyn Modifier>,
        applicator: Arc<dyn Applicator>,
        logger: Arc<dyn Logger>,
        recorder: Arc<dyn EventRecorder>,
    ) -> Self {
        Self {
            store,
            kinds,
            config,
            modifier,
            applicator,
            logger,
            recorder,
        }
    }

    pub fn kinds(&self) -> &TraitKinds {
        &self.kinds
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Run one pass for the trait at `key`.
    pub async fn reconcile(&self, key: &ObjectKey) -> ReconcileOutcome {
        let deadline = Instant::now() + self.config.timeout;
        self.logger.debug("Reconciling", &[("request", key.to_string())]);

        let mut tr = match bounded(deadline, self.store.get(&self.kinds.trait_kind, key)).await {
            Ok(tr) => tr,
            Err(err) if err.is_not_found() => {
                // 削除済み: 報告先がないので何もしない
                self.logger.debug("Trait no longer exists", &[("request", key.to_string())]);
                return ReconcileOutcome::done();
            }
            Err(err) => return ReconcileOutcome::failed(ReconcileError::GetTrait(err)),
        };

        let ctx = ModifyContext::new(key.clone(), deadline);
        let (condition, event, requeue_after) = match self.sync(&ctx, &tr).await {
            Ok(Progress::Waiting(event)) => {
                (Condition::reconcile_success(), event, self.config.short_wait)
            }
            Ok(Progress::Modified) => (
                Condition::reconcile_success(),
                Event::normal(
                    reason::TRANSLATION_MODIFIED,
                    "Successfully modified the translation of the referenced workload",
                ),
                self.config.long_wait,
            ),
            Err(failure) => {
                self.logger.debug(
                    failure.error.prefix(),
                    &[
                        ("request", key.to_string()),
                        ("error", failure.error.to_string()),
                        ("requeue-after", format!("{:?}", self.config.short_wait)),
                    ],
                );
                (
                    Condition::reconcile_error(&failure.error),
                    Event::warning(failure.reason, &failure.error),
                    self.config.short_wait,
                )
            }
        };

        self.recorder.record(&tr, event);
        tr.set_conditions([condition]);

        let error = bounded(deadline, self.store.update_status(&tr))
            .await
            .err()
            .map(ReconcileError::UpdateStatus);

        ReconcileOutcome {
            requeue_after: Some(requeue_after),
            error,
        }
    }

    /// Steps 2-5. Absence is `Progress::Waiting`, not a failure.
    async fn sync(&self, ctx: &ModifyContext, tr: &Object) -> Result<Progress, Failure> {
        let deadline = ctx.deadline();
        let namespace = &tr.metadata.namespace;

        let reference = tr.workload_reference().map_err(|err| {
            Failure::new(reason::CANNOT_GET_WORKLOAD, ReconcileError::GetWorkload(err))
        })?;
        let workload_key = ObjectKey::new(namespace, &reference.name);
        let workload =
            match bounded(deadline, self.store.get(&self.kinds.workload_kind, &workload_key)).await {
                Ok(workload) => workload,
                Err(err) if err.is_not_found() => {
                    self.logger.debug(
                        "Referenced workload does not exist yet",
                        &[("workload", workload_key.to_string())],
                    );
                    return Ok(Progress::Waiting(Event::normal(
                        reason::CANNOT_GET_WORKLOAD,
                        ReconcileError::GetWorkload(err).to_string(),
                    )));
                }
                Err(err) => {
                    return Err(Failure::new(
                        reason::CANNOT_GET_WORKLOAD,
                        ReconcileError::GetWorkload(err),
                    ));
                }
            };

        // Translation は Workload と同名・同 namespace という前提
        let translation_key = ObjectKey::new(namespace, &workload.metadata.name);
        let mut translation = match bounded(
            deadline,
            self.store.get(&self.kinds.translation_kind, &translation_key),
        )
        .await
        {
            Ok(translation) => translation,
            Err(err) if err.is_not_found() => {
                self.logger.debug(
                    "Translation of the workload does not exist yet",
                    &[("translation", translation_key.to_string())],
                );
                return Ok(Progress::Waiting(Event::normal(
                    reason::CANNOT_GET_TRANSLATION,
                    ReconcileError::GetTranslation(err).to_string(),
                )));
            }
            Err(err) => {
                return Err(Failure::new(
                    reason::CANNOT_GET_TRANSLATION,
                    ReconcileError::GetTranslation(err),
                ));
            }
        };

        let modify_failure =
            |err| Failure::new(reason::CANNOT_MODIFY_TRANSLATION, ReconcileError::Modify(err));
        self.modifier
            .modify(ctx, &mut translation, tr)
            .map_err(modify_failure)?;
        // Modifier は同期なので、終わった時点で期限を確認する
        if ctx.is_expired() {
            return Err(modify_failure(ModifyError::Timeout));
        }

        let apply_failure =
            |err| Failure::new(reason::CANNOT_APPLY_MODIFICATION, ReconcileError::Apply(err));
        let owner = workload.uid().ok_or_else(|| {
            apply_failure(StoreError::Invalid(format!(
                "{} {} has no uid",
                workload.kind, workload_key
            )))
        })?;
        bounded(
            deadline,
            self.applicator
                .apply(&mut translation, &[ApplyOption::MustBeControllableBy(owner)]),
        )
        .await
        .map_err(apply_failure)?;

        self.logger.debug(
            "Successfully modified translation",
            &[
                ("request", ctx.key().to_string()),
                ("translation", translation_key.to_string()),
                ("requeue-after", format!("{:?}", self.config.long_wait)),
            ],
        );
        Ok(Progress::Modified)
    }
}

/// Bound a store call by the pass deadline; expiry is `StoreError::Timeout`.
///
/// A call is not started once the deadline has passed, even if it would
/// complete immediately.
async fn bounded<T>(
    deadline: Instant,
    fut: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    if Instant::now() >= deadline {
        return Err(StoreError::Timeout);
    }
    tokio::time::timeout_at(deadline, fut)
        .await
        .unwrap_or(Err(StoreError::Timeout))
}
