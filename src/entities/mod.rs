// Entity Models - Contacts, Deals, Sales Reps
//
// Each entity has:
// - A positive integer key assigned by its store (max + 1), never reassigned
// - A draft type (caller-supplied fields for create)
// - A patch type (statically typed partial update, unknown fields rejected)

pub mod contact;
pub mod deal;
pub mod sales_rep;

pub use contact::{Contact, ContactDraft, ContactPatch, ContactStatus, Tags, TAG_SUGGESTIONS};
pub use deal::{Deal, DealDraft, DealPatch, DealStage};
pub use sales_rep::{SalesRep, SalesRepDraft, SalesRepPatch};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Surrogate key of every entity
pub type EntityId = u32;

// ============================================================================
// ENTITY KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Contact,
    Deal,
    SalesRep,
}

impl EntityKind {
    /// Name used in user-facing messages ("Lead with ID 3 not found")
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Contact => "Lead",
            EntityKind::Deal => "Deal",
            EntityKind::SalesRep => "Sales rep",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ENTITY CONTRACT
// ============================================================================

/// Shape shared by everything an `EntityRepository` can hold.
///
/// `from_draft` receives the key and timestamp chosen by the store; the
/// entity decides which of its fields are system-assigned. `apply_patch`
/// is a shallow merge: fields absent from the patch stay untouched.
pub trait Entity:
    Clone + fmt::Debug + PartialEq + Send + Sync + Serialize + DeserializeOwned + 'static
{
    type Draft: Clone + fmt::Debug + Send + Sync + Serialize + DeserializeOwned + 'static;
    type Patch: Clone
        + fmt::Debug
        + Default
        + Send
        + Sync
        + Serialize
        + DeserializeOwned
        + 'static;

    const KIND: EntityKind;

    fn id(&self) -> EntityId;

    fn from_draft(id: EntityId, draft: Self::Draft, now: DateTime<Utc>) -> Self;

    fn apply_patch(&mut self, patch: &Self::Patch);
}

/// Unrecognized textual value for one of the entity enums
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {what} '{value}'")]
pub struct ParseValueError {
    pub what: &'static str,
    pub value: String,
}

/// Overwrite `slot` when the patch carries a value for it
pub(crate) fn merge_field<T: Clone>(slot: &mut T, value: &Option<T>) {
    if let Some(value) = value {
        *slot = value.clone();
    }
}
