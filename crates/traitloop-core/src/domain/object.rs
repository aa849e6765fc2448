//! Object - ストアに保存される汎用オブジェクト
//!
//! Trait / Workload / Translation はすべて同じ `Object` で表現し、
//! `Kind` で区別します。spec はスキーマを持たない JSON です。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::condition::{Condition, ConditionedStatus};
use super::errors::StoreError;
use super::ids::{ObjectKey, Uid};
use super::kind::Kind;

/// Path of the workload reference inside a trait's spec.
pub const WORKLOAD_REF_FIELD: &str = "workloadRef";

/// OwnerReference はオブジェクトの所有者
///
/// `controller == true` の参照は高々 1 つで、それが権威ある書き手です。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: Uid,
    #[serde(default)]
    pub controller: bool,
}

impl OwnerReference {
    /// A controller reference pointing at `owner`.
    pub fn controller_of(owner: &Object) -> Option<Self> {
        Some(Self {
            api_version: owner.kind.api_version().to_string(),
            kind: owner.kind.kind().to_string(),
            name: owner.metadata.name.clone(),
            uid: owner.metadata.uid?,
            controller: true,
        })
    }
}

/// TypedReference points at an object in the same namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
}

impl TypedReference {
    pub fn to(kind: &Kind, name: impl Into<String>) -> Self {
        Self {
            api_version: kind.api_version().to_string(),
            kind: kind.kind().to_string(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,

    /// Assigned by the store on create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<Uid>,

    /// Optimistic concurrency token. 0 means "unset" and skips the check.
    #[serde(default)]
    pub resource_version: u64,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    #[serde(flatten)]
    pub kind: Kind,
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: serde_json::Value,
    #[serde(default)]
    pub status: ConditionedStatus,
}

impl Object {
    /// An empty object of `kind` named by `key`.
    pub fn new(kind: Kind, key: ObjectKey) -> Self {
        Self {
            kind,
            metadata: ObjectMeta {
                name: key.name,
                namespace: key.namespace,
                ..ObjectMeta::default()
            },
            spec: serde_json::Value::Object(serde_json::Map::new()),
            status: ConditionedStatus::default(),
        }
    }

    pub fn with_spec(mut self, spec: serde_json::Value) -> Self {
        self.spec = spec;
        self
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(&self.metadata.namespace, &self.metadata.name)
    }

    pub fn uid(&self) -> Option<Uid> {
        self.metadata.uid
    }

    /// The single owner reference marked as controller, if any.
    pub fn controller_ref(&self) -> Option<&OwnerReference> {
        self.metadata.owner_references.iter().find(|r| r.controller)
    }

    /// Either uncontrolled or already controlled by `uid`.
    pub fn is_controllable_by(&self, uid: Uid) -> bool {
        self.controller_ref().is_none_or(|r| r.uid == uid)
    }

    /// Replace any controller reference with `owner`.
    pub fn set_controller_ref(&mut self, owner: OwnerReference) {
        self.metadata.owner_references.retain(|r| !r.controller);
        self.metadata.owner_references.push(owner);
    }

    /// The workload this trait points at (`spec.workloadRef`).
    pub fn workload_reference(&self) -> Result<TypedReference, StoreError> {
        let value = self.spec.get(WORKLOAD_REF_FIELD).ok_or_else(|| {
            StoreError::Invalid(format!("{} {} has no workload reference", self.kind, self.key()))
        })?;
        serde_json::from_value(value.clone()).map_err(|e| {
            StoreError::Invalid(format!(
                "{} {} has a malformed workload reference: {e}",
                self.kind,
                self.key()
            ))
        })
    }

    pub fn set_workload_reference(&mut self, reference: &TypedReference) {
        if !self.spec.is_object() {
            self.spec = serde_json::Value::Object(serde_json::Map::new());
        }
        if let Some(spec) = self.spec.as_object_mut() {
            spec.insert(
                WORKLOAD_REF_FIELD.to_string(),
                serde_json::json!({
                    "apiVersion": reference.api_version,
                    "kind": reference.kind,
                    "name": reference.name,
                }),
            );
        }
    }

    pub fn get_condition(&self, condition_type: &str) -> Option<&Condition> {
        self.status.get_condition(condition_type)
    }

    pub fn set_conditions(&mut self, conditions: impl IntoIterator<Item = Condition>) {
        self.status.set_conditions(conditions);
    }
}
