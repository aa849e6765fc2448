//! MemoryStore - 開発用・テスト用の ObjectStore
//!
//! # 実装詳細
//! - HashMap<(Kind, ObjectKey), Object> を tokio Mutex で保護
//! - resource version による楽観的並行制御（変更がない書き込みは version を進めない）
//! - apply の precondition は同じロックの中で評価する
//! - テスト用の障害注入（次の 1 回だけ失敗させる）と遅延注入

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Kind, Object, ObjectKey, StoreError, Uid};
use crate::ports::ObjectStore;

/// Store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Get,
    UpdateStatus,
    Apply,
}

type StoreKey = (Kind, ObjectKey);

#[derive(Default)]
struct MemoryStoreState {
    objects: HashMap<StoreKey, Object>,
    faults: HashMap<(StoreOp, Kind), StoreError>,
    latency: Option<Duration>,
}

impl MemoryStoreState {
    fn take_fault(&mut self, op: StoreOp, kind: &Kind) -> Result<(), StoreError> {
        match self.faults.remove(&(op, kind.clone())) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// MemoryStore は開発用のオブジェクトストア
///
/// # 使用例
/// ```ignore
/// let store = MemoryStore::new();
/// let workload = store.create(Object::new(kind, ObjectKey::new("default", "w1"))).await?;
/// store.fail_next(StoreOp::Apply, &translation_kind, StoreError::Unavailable("down".into())).await;
/// ```
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryStoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `obj`, assigning a uid and resource version 1.
    pub async fn create(&self, mut obj: Object) -> Result<Object, StoreError> {
        let mut state = self.state.lock().await;
        let key = (obj.kind.clone(), obj.key());
        if state.objects.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                kind: key.0,
                key: key.1,
            });
        }
        obj.metadata.uid.get_or_insert_with(Uid::generate);
        obj.metadata.resource_version = 1;
        state.objects.insert(key, obj.clone());
        Ok(obj)
    }

    /// Remove an object. Returns whether it existed.
    pub async fn delete(&self, kind: &Kind, key: &ObjectKey) -> bool {
        let mut state = self.state.lock().await;
        state.objects.remove(&(kind.clone(), key.clone())).is_some()
    }

    /// Read without fault injection or latency (for assertions).
    pub async fn get_object(&self, kind: &Kind, key: &ObjectKey) -> Option<Object> {
        let state = self.state.lock().await;
        state.objects.get(&(kind.clone(), key.clone())).cloned()
    }

    /// Make the next `op` on objects of `kind` fail with `err`.
    pub async fn fail_next(&self, op: StoreOp, kind: &Kind, err: StoreError) {
        let mut state = self.state.lock().await;
        state.faults.insert((op, kind.clone()), err);
    }

    /// Delay every operation by `latency`.
    pub async fn set_latency(&self, latency: Option<Duration>) {
        self.state.lock().await.latency = latency;
    }

    async fn delay(&self) {
        let latency = self.state.lock().await.latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

fn check_version(current: &Object, desired: &Object) -> Result<(), StoreError> {
    let expected = desired.metadata.resource_version;
    let actual = current.metadata.resource_version;
    if expected != 0 && expected != actual {
        return Err(StoreError::Conflict {
            kind: current.kind.clone(),
            key: current.key(),
            expected,
            actual,
        });
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, kind: &Kind, key: &ObjectKey) -> Result<Object, StoreError> {
        self.delay().await;
        let mut state = self.state.lock().await;
        state.take_fault(StoreOp::Get, kind)?;
        state
            .objects
            .get(&(kind.clone(), key.clone()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: kind.clone(),
                key: key.clone(),
            })
    }

    async fn update_status(&self, obj: &Object) -> Result<Object, StoreError> {
        self.delay().await;
        let mut state = self.state.lock().await;
        state.take_fault(StoreOp::UpdateStatus, &obj.kind)?;
        let current = state
            .objects
            .get_mut(&(obj.kind.clone(), obj.key()))
            .ok_or_else(|| StoreError::NotFound {
                kind: obj.kind.clone(),
                key: obj.key(),
            })?;
        check_version(current, obj)?;

        if current.status != obj.status {
            current.status = obj.status.clone();
            current.metadata.resource_version += 1;
        }
        Ok(current.clone())
    }

    async fn apply(
        &self,
        obj: &Object,
        precondition: &(dyn for<'o> Fn(Option<&'o Object>) -> Result<(), StoreError> + Send + Sync),
    ) -> Result<Object, StoreError> {
        self.delay().await;
        let mut state = self.state.lock().await;
        state.take_fault(StoreOp::Apply, &obj.kind)?;
        let key = (obj.kind.clone(), obj.key());

        // precondition と書き込みの間でロックを手放さない
        precondition(state.objects.get(&key))?;

        if !state.objects.contains_key(&key) {
            let mut created = obj.clone();
            created.metadata.uid.get_or_insert_with(Uid::generate);
            created.metadata.resource_version = 1;
            state.objects.insert(key, created.clone());
            return Ok(created);
        }
        let current = state
            .objects
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound {
                kind: obj.kind.clone(),
                key: obj.key(),
            })?;
        check_version(current, obj)?;

        let changed = current.spec != obj.spec
            || current.metadata.labels != obj.metadata.labels
            || current.metadata.annotations != obj.metadata.annotations
            || current.metadata.owner_references != obj.metadata.owner_references;
        if changed {
            current.spec = obj.spec.clone();
            current.metadata.labels = obj.metadata.labels.clone();
            current.metadata.annotations = obj.metadata.annotations.clone();
            current.metadata.owner_references = obj.metadata.owner_references.clone();
            current.metadata.resource_version += 1;
        }
        Ok(current.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Condition, OwnerReference};
    use crate::ports::ApplyOption;
    use serde_json::json;

    fn kind() -> Kind {
        Kind::new("v1", "Object")
    }

    fn object(name: &str) -> Object {
        Object::new(kind(), ObjectKey::new("default", name)).with_spec(json!({"replicas": 1}))
    }

    fn accept_all(_: Option<&Object>) -> Result<(), StoreError> {
        Ok(())
    }

    #[tokio::test]
    async fn create_assigns_uid_and_version() {
        let store = MemoryStore::new();
        let created = store.create(object("w1")).await.unwrap();
        assert!(created.uid().is_some());
        assert_eq!(created.metadata.resource_version, 1);

        let err = store.create(object("w1")).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = store.get(&kind(), &ObjectKey::new("default", "nope")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn update_status_bumps_version_only_on_change() {
        let store = MemoryStore::new();
        let mut obj = store.create(object("t1")).await.unwrap();

        obj.set_conditions([Condition::reconcile_success()]);
        let updated = store.update_status(&obj).await.unwrap();
        assert_eq!(updated.metadata.resource_version, 2);

        let again = store.update_status(&updated).await.unwrap();
        assert_eq!(again.metadata.resource_version, 2);
    }

    #[tokio::test]
    async fn stale_status_write_conflicts() {
        let store = MemoryStore::new();
        let stale = store.create(object("t1")).await.unwrap();

        let mut fresh = stale.clone();
        fresh.set_conditions([Condition::reconcile_success()]);
        store.update_status(&fresh).await.unwrap();

        let mut stale = stale;
        stale.spec = json!({"replicas": 9});
        stale.set_conditions([Condition::reconcile_error(&StoreError::Timeout)]);
        let err = store.update_status(&stale).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { expected: 1, actual: 2, .. }));
    }

    #[tokio::test]
    async fn update_status_ignores_spec() {
        let store = MemoryStore::new();
        let mut obj = store.create(object("t1")).await.unwrap();
        obj.spec = json!({"replicas": 9});
        obj.set_conditions([Condition::reconcile_success()]);

        let updated = store.update_status(&obj).await.unwrap();
        assert_eq!(updated.spec, json!({"replicas": 1}));
    }

    #[tokio::test]
    async fn apply_creates_absent_object() {
        let store = MemoryStore::new();
        let applied = store.apply(&object("w1"), &accept_all).await.unwrap();
        assert_eq!(applied.metadata.resource_version, 1);
        assert!(store.get_object(&kind(), &ObjectKey::new("default", "w1")).await.is_some());
    }

    #[tokio::test]
    async fn apply_is_idempotent() {
        let store = MemoryStore::new();
        let obj = store.create(object("w1")).await.unwrap();
        let applied = store.apply(&obj, &accept_all).await.unwrap();
        assert_eq!(applied, obj);
    }

    #[tokio::test]
    async fn apply_respects_precondition() {
        let store = MemoryStore::new();
        let mut obj = object("w1");
        let other = Uid::generate();
        obj.set_controller_ref(OwnerReference {
            api_version: "example.org/v1".to_string(),
            kind: "CoolWorkload".to_string(),
            name: "w1".to_string(),
            uid: other,
            controller: true,
        });
        let existing = store.create(obj).await.unwrap();

        let uid = Uid::generate();
        let option = ApplyOption::MustBeControllableBy(uid);
        let mut desired = existing.clone();
        desired.spec = json!({"replicas": 3});
        let err = store
            .apply(&desired, &|current: Option<&Object>| option.check(current))
            .await
            .unwrap_err();

        assert_eq!(err, StoreError::NotControllable { uid });
        let stored = store.get_object(&kind(), &existing.key()).await.unwrap();
        assert_eq!(stored, existing);
    }

    #[tokio::test]
    async fn injected_fault_fires_once() {
        let store = MemoryStore::new();
        store.create(object("w1")).await.unwrap();
        store
            .fail_next(StoreOp::Get, &kind(), StoreError::Unavailable("down".to_string()))
            .await;

        let key = ObjectKey::new("default", "w1");
        let err = store.get(&kind(), &key).await.unwrap_err();
        assert_eq!(err, StoreError::Unavailable("down".to_string()));
        assert!(store.get(&kind(), &key).await.is_ok());
    }
}
