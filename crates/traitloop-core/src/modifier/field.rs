//! FieldAccessor - spec 内の JSON pointer で部分オブジェクトを取り出す Accessor

use crate::domain::{ModifyError, Object};

use super::{Accessor, ModifyContext, Modifier};

/// FieldAccessor hands the value at `pointer` (inside `spec`) to the inner
/// modifier as the spec of a view object, then writes the result back.
///
/// The view keeps the outer object's kind and metadata. An empty pointer
/// selects the whole spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAccessor {
    pointer: String,
}

impl FieldAccessor {
    /// `pointer` is an RFC 6901 JSON pointer, e.g. `/template/spec`.
    pub fn new(pointer: impl Into<String>) -> Self {
        Self {
            pointer: pointer.into(),
        }
    }

    pub fn pointer(&self) -> &str {
        &self.pointer
    }
}

impl Accessor for FieldAccessor {
    fn access(
        &self,
        ctx: &ModifyContext,
        obj: &mut Object,
        tr: &Object,
        inner: &dyn Modifier,
    ) -> Result<(), ModifyError> {
        let not_found = || ModifyError::FieldNotFound {
            path: self.pointer.clone(),
        };

        let sub = obj.spec.pointer(&self.pointer).cloned().ok_or_else(not_found)?;
        let mut view = Object {
            kind: obj.kind.clone(),
            metadata: obj.metadata.clone(),
            spec: sub,
            status: Default::default(),
        };
        inner.modify(ctx, &mut view, tr)?;

        let slot = obj.spec.pointer_mut(&self.pointer).ok_or_else(not_found)?;
        *slot = view.spec;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Kind, ObjectKey};
    use crate::modifier::{with_accessor, ModifyFn};
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::Instant;

    fn ctx() -> ModifyContext {
        ModifyContext::new(ObjectKey::new("ns", "t1"), Instant::now() + Duration::from_secs(60))
    }

    fn wrapper() -> Object {
        Object::new(Kind::new("v1", "Object"), ObjectKey::new("ns", "w1")).with_spec(json!({
            "deployment": {"replicas": 1, "image": "nginx"}
        }))
    }

    fn scale(_ctx: &ModifyContext, obj: &mut Object, _tr: &Object) -> Result<(), ModifyError> {
        obj.spec["replicas"] = json!(4);
        Ok(())
    }

    #[test]
    fn modifies_nested_field_in_place() {
        let tr = Object::new(Kind::new("v1", "Trait"), ObjectKey::new("ns", "t1"));
        let mut obj = wrapper();

        with_accessor(ModifyFn(scale), FieldAccessor::new("/deployment"))
            .modify(&ctx(), &mut obj, &tr)
            .unwrap();

        assert_eq!(obj.spec, json!({"deployment": {"replicas": 4, "image": "nginx"}}));
    }

    #[test]
    fn empty_pointer_selects_whole_spec() {
        let tr = Object::new(Kind::new("v1", "Trait"), ObjectKey::new("ns", "t1"));
        let mut obj = wrapper();

        with_accessor(ModifyFn(scale), FieldAccessor::new(""))
            .modify(&ctx(), &mut obj, &tr)
            .unwrap();

        assert_eq!(obj.spec["replicas"], json!(4));
    }

    #[test]
    fn missing_field_is_an_error_and_leaves_object_untouched() {
        let tr = Object::new(Kind::new("v1", "Trait"), ObjectKey::new("ns", "t1"));
        let mut obj = wrapper();

        let err = with_accessor(ModifyFn(scale), FieldAccessor::new("/statefulset"))
            .modify(&ctx(), &mut obj, &tr)
            .unwrap_err();

        assert!(matches!(err, ModifyError::FieldNotFound { ref path } if path == "/statefulset"));
        assert_eq!(obj, wrapper());
    }
}
