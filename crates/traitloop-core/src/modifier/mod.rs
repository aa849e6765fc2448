//! Modifier - Translation を Trait に従って書き換える差し込み口
//!
//! # 二層構造
//! - **Modifier**: オブジェクトを直接書き換える（`ModifyFn` で関数もそのまま使える）
//! - **Accessor**: 外側のオブジェクトから実際に書き換える部分を探し、内側の Modifier に渡す
//!
//! `with_accessor(m, a)` の呼び出しは `a.access(ctx, obj, tr, &m)` と同じ結果になります。
//! Modifier はストアへの I/O を行いません（それは Reconciler の仕事）。

mod field;

pub use self::field::FieldAccessor;

use tokio::time::Instant;

use crate::domain::{ModifyError, Object, ObjectKey};

/// Per-pass context handed to modifiers and accessors.
#[derive(Debug, Clone)]
pub struct ModifyContext {
    key: ObjectKey,
    deadline: Instant,
}

impl ModifyContext {
    pub fn new(key: ObjectKey, deadline: Instant) -> Self {
        Self { key, deadline }
    }

    /// The trait being reconciled.
    pub fn key(&self) -> &ObjectKey {
        &self.key
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

/// Modifier mutates a translated object using data from the trait.
pub trait Modifier: Send + Sync {
    fn modify(&self, ctx: &ModifyContext, obj: &mut Object, tr: &Object) -> Result<(), ModifyError>;
}

/// Accessor locates the part of `obj` to modify and hands it to `inner`.
pub trait Accessor: Send + Sync {
    fn access(
        &self,
        ctx: &ModifyContext,
        obj: &mut Object,
        tr: &Object,
        inner: &dyn Modifier,
    ) -> Result<(), ModifyError>;
}

/// ModifyFn は関数を Modifier として使うためのアダプタ
///
/// ```ignore
/// let m = ModifyFn(|_ctx: &ModifyContext, obj: &mut Object, _tr: &Object| {
///     obj.spec["replicas"] = serde_json::json!(3);
///     Ok(())
/// });
/// ```
#[derive(Clone, Copy)]
pub struct ModifyFn<F>(pub F);

impl<F> Modifier for ModifyFn<F>
where
    F: Fn(&ModifyContext, &mut Object, &Object) -> Result<(), ModifyError> + Send + Sync,
{
    fn modify(&self, ctx: &ModifyContext, obj: &mut Object, tr: &Object) -> Result<(), ModifyError> {
        (self.0)(ctx, obj, tr)
    }
}

/// AccessorFn は関数を Accessor として使うためのアダプタ
#[derive(Clone, Copy)]
pub struct AccessorFn<F>(pub F);

impl<F> Accessor for AccessorFn<F>
where
    F: Fn(&ModifyContext, &mut Object, &Object, &dyn Modifier) -> Result<(), ModifyError>
        + Send
        + Sync,
{
    fn access(
        &self,
        ctx: &ModifyContext,
        obj: &mut Object,
        tr: &Object,
        inner: &dyn Modifier,
    ) -> Result<(), ModifyError> {
        (self.0)(ctx, obj, tr, inner)
    }
}

/// NoopModifier: オブジェクトを変更せず成功する（デフォルト）
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopModifier;

impl Modifier for NoopModifier {
    fn modify(&self, _ctx: &ModifyContext, _obj: &mut Object, _tr: &Object) -> Result<(), ModifyError> {
        Ok(())
    }
}

/// NoopAccessor: 外側のオブジェクトをそのまま内側に渡す（デフォルト）
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAccessor;

impl Accessor for NoopAccessor {
    fn access(
        &self,
        ctx: &ModifyContext,
        obj: &mut Object,
        tr: &Object,
        inner: &dyn Modifier,
    ) -> Result<(), ModifyError> {
        inner.modify(ctx, obj, tr)
    }
}

/// WithAccessor は Accessor 越しに Modifier を適用する合成結果
#[derive(Debug, Clone, Copy)]
pub struct WithAccessor<M, A> {
    modifier: M,
    accessor: A,
}

impl<M: Modifier, A: Accessor> Modifier for WithAccessor<M, A> {
    fn modify(&self, ctx: &ModifyContext, obj: &mut Object, tr: &Object) -> Result<(), ModifyError> {
        self.accessor.access(ctx, obj, tr, &self.modifier)
    }
}

/// Compose `modifier` behind `accessor`.
pub fn with_accessor<M: Modifier, A: Accessor>(modifier: M, accessor: A) -> WithAccessor<M, A> {
    WithAccessor { modifier, accessor }
}

/// Chain は Modifier を順に適用し、最初のエラーで止まる
#[derive(Default)]
pub struct Chain {
    modifiers: Vec<Box<dyn Modifier>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then<M: Modifier + 'static>(mut self, modifier: M) -> Self {
        self.modifiers.push(Box::new(modifier));
        self
    }
}

impl Modifier for Chain {
    fn modify(&self, ctx: &ModifyContext, obj: &mut Object, tr: &Object) -> Result<(), ModifyError> {
        self.modifiers
            .iter()
            .try_for_each(|m| m.modify(ctx, obj, tr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Kind;
    use serde_json::json;
    use std::time::Duration;

    fn ctx() -> ModifyContext {
        ModifyContext::new(
            ObjectKey::new("ns", "t1"),
            Instant::now() + Duration::from_secs(60),
        )
    }

    fn translation() -> Object {
        Object::new(Kind::new("v1", "Object"), ObjectKey::new("ns", "w1"))
            .with_spec(json!({"replicas": 1, "inner": {"replicas": 1}}))
    }

    fn scaler() -> Object {
        Object::new(Kind::new("core.oam.dev/v1alpha2", "ManualScalerTrait"), ObjectKey::new("ns", "t1"))
            .with_spec(json!({"replicaCount": 5}))
    }

    fn set_replicas(_ctx: &ModifyContext, obj: &mut Object, tr: &Object) -> Result<(), ModifyError> {
        obj.spec["replicas"] = tr.spec["replicaCount"].clone();
        Ok(())
    }

    fn wrap_inner(
        ctx: &ModifyContext,
        obj: &mut Object,
        tr: &Object,
        inner: &dyn Modifier,
    ) -> Result<(), ModifyError> {
        let mut view = obj.clone();
        view.spec = obj.spec["inner"].clone();
        inner.modify(ctx, &mut view, tr)?;
        obj.spec["inner"] = view.spec;
        Ok(())
    }

    fn assert_composition_law<M, A>(modifier: M, accessor: A)
    where
        M: Modifier + Clone,
        A: Accessor + Clone,
    {
        let ctx = ctx();
        let tr = scaler();

        let mut composed = translation();
        let composed_result = with_accessor(modifier.clone(), accessor.clone()).modify(&ctx, &mut composed, &tr);

        let mut manual = translation();
        let manual_result = accessor.access(&ctx, &mut manual, &tr, &modifier);

        assert_eq!(composed, manual);
        assert_eq!(composed_result.is_ok(), manual_result.is_ok());
    }

    #[test]
    fn context_expires_at_deadline() {
        assert!(!ctx().is_expired());
        let expired = ModifyContext::new(ObjectKey::new("ns", "t1"), Instant::now());
        assert!(expired.is_expired());
        assert_eq!(expired.key(), &ObjectKey::new("ns", "t1"));
    }

    #[test]
    fn noop_modifier_leaves_object_unchanged() {
        let mut obj = translation();
        NoopModifier.modify(&ctx(), &mut obj, &scaler()).unwrap();
        assert_eq!(obj, translation());
    }

    #[test]
    fn noop_accessor_passes_object_through() {
        let mut with = translation();
        let mut without = translation();
        with_accessor(ModifyFn(set_replicas), NoopAccessor)
            .modify(&ctx(), &mut with, &scaler())
            .unwrap();
        ModifyFn(set_replicas).modify(&ctx(), &mut without, &scaler()).unwrap();
        assert_eq!(with, without);
        assert_eq!(with.spec["replicas"], json!(5));
    }

    #[test]
    fn composition_law_holds_for_defaults() {
        assert_composition_law(NoopModifier, NoopAccessor);
    }

    #[test]
    fn composition_law_holds_for_functions() {
        assert_composition_law(ModifyFn(set_replicas), AccessorFn(wrap_inner));
        assert_composition_law(ModifyFn(set_replicas), NoopAccessor);
        assert_composition_law(NoopModifier, AccessorFn(wrap_inner));
    }

    #[test]
    fn accessor_reaches_sub_object() {
        let mut obj = translation();
        with_accessor(ModifyFn(set_replicas), AccessorFn(wrap_inner))
            .modify(&ctx(), &mut obj, &scaler())
            .unwrap();
        assert_eq!(obj.spec["replicas"], json!(1));
        assert_eq!(obj.spec["inner"]["replicas"], json!(5));
    }

    #[test]
    fn chain_stops_at_first_error() {
        let failing = ModifyFn(
            |_: &ModifyContext, _: &mut Object, _: &Object| -> Result<(), ModifyError> {
                Err(ModifyError::Other("nope".to_string()))
            },
        );
        let never = ModifyFn(|_: &ModifyContext, obj: &mut Object, _: &Object| -> Result<(), ModifyError> {
            obj.spec["touched"] = json!(true);
            Ok(())
        });

        let mut obj = translation();
        let err = Chain::new()
            .then(ModifyFn(set_replicas))
            .then(failing)
            .then(never)
            .modify(&ctx(), &mut obj, &scaler())
            .unwrap_err();

        assert_eq!(err.to_string(), "nope");
        assert_eq!(obj.spec["replicas"], json!(5));
        assert!(obj.spec.get("touched").is_none());
    }
}
