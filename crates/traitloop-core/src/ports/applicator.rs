//! Applicator port - Translation の条件付き永続化

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{Object, StoreError, Uid};
use crate::ports::ObjectStore;

/// ApplyOption は apply 時にストア側で評価される条件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOption {
    /// The current object must be absent, uncontrolled, or controlled by this uid.
    MustBeControllableBy(Uid),
}

impl ApplyOption {
    pub fn check(&self, current: Option<&Object>) -> Result<(), StoreError> {
        match self {
            ApplyOption::MustBeControllableBy(uid) => match current {
                Some(obj) if !obj.is_controllable_by(*uid) => {
                    Err(StoreError::NotControllable { uid: *uid })
                }
                _ => Ok(()),
            },
        }
    }
}

/// Applicator persists a modified object.
#[async_trait]
pub trait Applicator: Send + Sync {
    /// Persist `obj`; on success `obj` is replaced with the stored copy.
    async fn apply(&self, obj: &mut Object, options: &[ApplyOption]) -> Result<(), StoreError>;
}

/// StoreApplicator はストアのネイティブな条件付き apply を使うデフォルト実装
pub struct StoreApplicator {
    store: Arc<dyn ObjectStore>,
}

impl StoreApplicator {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Applicator for StoreApplicator {
    async fn apply(&self, obj: &mut Object, options: &[ApplyOption]) -> Result<(), StoreError> {
        let precondition =
            |current: Option<&Object>| options.iter().try_for_each(|o| o.check(current));
        *obj = self.store.apply(obj, &precondition).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Kind, ObjectKey, OwnerReference};
    use crate::impls::MemoryStore;
    use serde_json::json;

    fn controlled_by(uid: Uid) -> Object {
        let mut obj = Object::new(Kind::new("v1", "Object"), ObjectKey::new("ns", "w1"));
        obj.set_controller_ref(OwnerReference {
            api_version: "example.org/v1".to_string(),
            kind: "CoolWorkload".to_string(),
            name: "w1".to_string(),
            uid,
            controller: true,
        });
        obj
    }

    #[test]
    fn controllable_check_accepts_absent_object() {
        let option = ApplyOption::MustBeControllableBy(Uid::generate());
        assert_eq!(option.check(None), Ok(()));
    }

    #[test]
    fn controllable_check_accepts_same_controller() {
        let uid = Uid::generate();
        let option = ApplyOption::MustBeControllableBy(uid);
        assert_eq!(option.check(Some(&controlled_by(uid))), Ok(()));
    }

    #[test]
    fn controllable_check_rejects_other_controller() {
        let uid = Uid::generate();
        let option = ApplyOption::MustBeControllableBy(uid);
        assert_eq!(
            option.check(Some(&controlled_by(Uid::generate()))),
            Err(StoreError::NotControllable { uid })
        );
    }

    #[tokio::test]
    async fn store_applicator_enforces_options_inside_apply() {
        let store = Arc::new(MemoryStore::new());
        let owner = Uid::generate();
        let existing = store.create(controlled_by(owner)).await.unwrap();
        let applicator = StoreApplicator::new(store.clone());

        let mut desired = existing.clone();
        desired.spec = json!({"replicas": 3});
        let other = Uid::generate();
        let err = applicator
            .apply(&mut desired, &[ApplyOption::MustBeControllableBy(other)])
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::NotControllable { uid: other });
        assert_eq!(store.get_object(&existing.kind, &existing.key()).await.unwrap(), existing);

        applicator
            .apply(&mut desired, &[ApplyOption::MustBeControllableBy(owner)])
            .await
            .unwrap();
        // 成功時は保存後のオブジェクトで置き換わる
        assert_eq!(desired.metadata.resource_version, 2);
        assert_eq!(store.get_object(&existing.kind, &existing.key()).await.unwrap(), desired);
    }
}
