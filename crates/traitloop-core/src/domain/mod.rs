//! Domain model (kinds, ids, objects, conditions, events, errors).

pub mod condition;
pub mod errors;
pub mod events;
pub mod ids;
pub mod kind;
pub mod object;

pub use self::condition::{Condition, ConditionStatus, ConditionedStatus, TYPE_SYNCED};
pub use self::errors::{ModifyError, ReconcileError, StoreError};
pub use self::events::{Event, Severity};
pub use self::ids::{ObjectKey, Uid};
pub use self::kind::{Kind, KindError};
pub use self::object::{Object, ObjectMeta, OwnerReference, TypedReference};
