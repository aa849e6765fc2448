//! Controller - WorkQueue と Reconciler をつなぐ worker 群
//!
//! # フロー（worker ごと）
//! 1. WorkQueue::get() で Trait の ObjectKey を取得（同じキーは同時に 1 worker だけ）
//! 2. Reconciler::reconcile() で pass を実行
//! 3. 結果で再投入を決める
//!    - error: backoff 付きで再投入（add_rate_limited）
//!    - requeue_after: backoff をリセットして遅延再投入
//!    - どちらもなし: backoff をリセットして終了
//! 4. WorkQueue::done()

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::app::config::ControllerConfig;
use crate::app::reconciler::Reconciler;
use crate::domain::ObjectKey;
use crate::queue::WorkQueue;

/// Controller handle.
/// - `request_shutdown()` で新しいキーの取得をやめる
/// - `shutdown_and_join()` で全 worker の終了を待つ
pub struct Controller {
    queue: Arc<WorkQueue<ObjectKey>>,
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl Controller {
    /// Spawn `config.workers` workers driving `reconciler`.
    pub fn spawn(reconciler: Arc<Reconciler>, config: &ControllerConfig) -> Self {
        let queue = Arc::new(WorkQueue::new(config.retry.clone()));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = Vec::with_capacity(config.workers);
        for worker_id in 0..config.workers {
            let q = Arc::clone(&queue);
            let r = Arc::clone(&reconciler);
            let mut rx = shutdown_rx.clone();

            let join = tokio::spawn(async move {
                worker_loop(worker_id, q, r, &mut rx).await;
            });
            joins.push(join);
        }

        Self {
            queue,
            shutdown_tx,
            joins,
        }
    }

    /// Ask for a pass over the trait at `key` (e.g. on a watch event).
    pub async fn enqueue(&self, key: ObjectKey) {
        self.queue.add(key).await;
    }

    pub fn queue(&self) -> &Arc<WorkQueue<ObjectKey>> {
        &self.queue
    }

    /// Request shutdown for all workers.
    /// In-flight passes run to completion; no new keys are taken.
    pub async fn request_shutdown(&self) {
        // ignore send error: receivers may already be dropped
        let _ = self.shutdown_tx.send(true);
        self.queue.shut_down().await;
    }

    /// Shutdown and wait for all workers.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown().await;
        for j in self.joins {
            if let Err(e) = j.await {
                warn!(error = %e, "worker task ended abnormally");
            }
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<WorkQueue<ObjectKey>>,
    reconciler: Arc<Reconciler>,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // get は「待つ」可能性があるので select で shutdown と競合させる
        let key = tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            key = queue.get() => key,
        };

        let Some(key) = key else {
            // queue が shut down された
            break;
        };

        let outcome = reconciler.reconcile(&key).await;
        match (outcome.error, outcome.requeue_after) {
            (Some(err), requeue_after) => {
                warn!(worker_id, trait_key = %key, error = %err, "reconcile failed");
                match requeue_after {
                    // backoff と requeue_after の早い方で再実行される
                    Some(delay) => {
                        queue.add_rate_limited(key.clone()).await;
                        queue.add_after(key.clone(), delay).await;
                    }
                    None => queue.add_rate_limited(key.clone()).await,
                }
            }
            (None, Some(delay)) => {
                debug!(worker_id, trait_key = %key, requeue_after = ?delay, "reconciled");
                queue.forget(&key).await;
                queue.add_after(key.clone(), delay).await;
            }
            (None, None) => {
                debug!(worker_id, trait_key = %key, "reconciled, not requeued");
                queue.forget(&key).await;
            }
        }
        queue.done(&key).await;
    }
    debug!(worker_id, "worker stopped");
}
