//! ObjectStore port - 共有ストア（API server 相当）への抽象化
//!
//! ストア自体は collaborator であり、ここでは Reconciler が使う
//! get / update_status / 条件付き apply だけを定義します。

use async_trait::async_trait;

use crate::domain::{Kind, Object, ObjectKey, StoreError};

/// ObjectStore は種別付きオブジェクトの正本
///
/// # 設計原則
/// - 書き込みは resource version による楽観的並行制御
/// - apply の precondition チェックと書き込みは原子的（check と write の間に隙間なし）
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read one object. Absence is `StoreError::NotFound`.
    async fn get(&self, kind: &Kind, key: &ObjectKey) -> Result<Object, StoreError>;

    /// Replace only the status of an existing object.
    async fn update_status(&self, obj: &Object) -> Result<Object, StoreError>;

    /// Create `obj`, or patch the existing object with its metadata and spec,
    /// if `precondition` accepts the current object (`None` when absent).
    /// The precondition is evaluated inside the same write and may borrow
    /// from the caller.
    async fn apply(
        &self,
        obj: &Object,
        precondition: &(dyn for<'o> Fn(Option<&'o Object>) -> Result<(), StoreError> + Send + Sync),
    ) -> Result<Object, StoreError>;
}
