// 👤 Contact Entity - a lead owned by a sales rep
//
// Status is the contact's lifecycle category. Tags behave like a set
// (no duplicates) but keep insertion order for display.

use super::{merge_field, Entity, EntityId, EntityKind, ParseValueError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// CONTACT STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    Unqualified,
    Closed,
}

impl ContactStatus {
    pub const ALL: [ContactStatus; 5] = [
        ContactStatus::New,
        ContactStatus::Contacted,
        ContactStatus::Qualified,
        ContactStatus::Unqualified,
        ContactStatus::Closed,
    ];

    /// Wire value ("contacted")
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactStatus::New => "new",
            ContactStatus::Contacted => "contacted",
            ContactStatus::Qualified => "qualified",
            ContactStatus::Unqualified => "unqualified",
            ContactStatus::Closed => "closed",
        }
    }

    /// Display label ("Contacted")
    pub fn label(&self) -> &'static str {
        match self {
            ContactStatus::New => "New",
            ContactStatus::Contacted => "Contacted",
            ContactStatus::Qualified => "Qualified",
            ContactStatus::Unqualified => "Unqualified",
            ContactStatus::Closed => "Closed",
        }
    }
}

impl fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContactStatus {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        ContactStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == lower)
            .ok_or_else(|| ParseValueError {
                what: "contact status",
                value: s.to_string(),
            })
    }
}

// ============================================================================
// TAGS
// ============================================================================

/// Labels suggested while typing a tag
pub const TAG_SUGGESTIONS: [&str; 13] = [
    "Hot Lead",
    "Cold Lead",
    "Warm Lead",
    "Follow Up",
    "Qualified",
    "Unqualified",
    "Enterprise",
    "SMB",
    "Startup",
    "VIP",
    "Referral",
    "Inbound",
    "Outbound",
];

/// Ordered set of tag labels
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Tags(Vec<String>);

impl Tags {
    pub fn new() -> Self {
        Tags(Vec::new())
    }

    /// Add a tag (trimmed). Returns false for blanks and duplicates.
    pub fn insert(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        let tag = tag.trim();
        if tag.is_empty() || self.contains(tag) {
            return false;
        }
        self.0.push(tag.to_string());
        true
    }

    pub fn remove(&mut self, tag: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|t| t != tag);
        self.0.len() != before
    }

    /// Drop the most recently added tag (backspace on an empty input)
    pub fn pop(&mut self) -> Option<String> {
        self.0.pop()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Suggestions matching the partial input that are not already present
    pub fn suggestions(&self, input: &str) -> Vec<&'static str> {
        let needle = input.to_lowercase();
        TAG_SUGGESTIONS
            .iter()
            .copied()
            .filter(|s| s.to_lowercase().contains(&needle) && !self.contains(s))
            .collect()
    }
}

impl From<Vec<String>> for Tags {
    fn from(labels: Vec<String>) -> Self {
        labels.into_iter().collect()
    }
}

impl From<Tags> for Vec<String> {
    fn from(tags: Tags) -> Self {
        tags.0
    }
}

impl<S: Into<String>> FromIterator<S> for Tags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut tags = Tags::new();
        for tag in iter {
            tags.insert(tag);
        }
        tags
    }
}

// ============================================================================
// CONTACT ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(rename = "Id")]
    pub id: EntityId,
    pub name: String,
    pub email: String,
    pub company: String,
    pub phone: String,
    pub status: ContactStatus,
    pub assigned_rep: String,
    #[serde(default)]
    pub tags: Tags,
    pub created_at: DateTime<Utc>,
    pub last_contact: DateTime<Utc>,
}

/// Fields a caller supplies when creating a contact
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContactDraft {
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub status: ContactStatus,
    #[serde(default)]
    pub assigned_rep: String,
    #[serde(default)]
    pub tags: Tags,
}

impl ContactDraft {
    pub fn new(name: impl Into<String>) -> Self {
        ContactDraft {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContactPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ContactStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_rep: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_contact: Option<DateTime<Utc>>,
}

impl ContactPatch {
    pub fn status(status: ContactStatus) -> Self {
        ContactPatch {
            status: Some(status),
            ..Default::default()
        }
    }
}

impl Entity for Contact {
    type Draft = ContactDraft;
    type Patch = ContactPatch;

    const KIND: EntityKind = EntityKind::Contact;

    fn id(&self) -> EntityId {
        self.id
    }

    /// Both timestamps start at creation time
    fn from_draft(id: EntityId, draft: ContactDraft, now: DateTime<Utc>) -> Self {
        Contact {
            id,
            name: draft.name,
            email: draft.email,
            company: draft.company,
            phone: draft.phone,
            status: draft.status,
            assigned_rep: draft.assigned_rep,
            tags: draft.tags,
            created_at: now,
            last_contact: now,
        }
    }

    fn apply_patch(&mut self, patch: &ContactPatch) {
        merge_field(&mut self.name, &patch.name);
        merge_field(&mut self.email, &patch.email);
        merge_field(&mut self.company, &patch.company);
        merge_field(&mut self.phone, &patch.phone);
        merge_field(&mut self.status, &patch.status);
        merge_field(&mut self.assigned_rep, &patch.assigned_rep);
        merge_field(&mut self.tags, &patch.tags);
        merge_field(&mut self.last_contact, &patch.last_contact);
    }
}

// ============================================================================
// TESTS
// ============================================================================
