// 💼 Deal Entity - an opportunity moving through the pipeline
//
// Stage order is the kanban column order. Lead and rep are referenced by
// display name, never by key.

use super::{merge_field, Entity, EntityId, EntityKind, ParseValueError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// DEAL STAGE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DealStage {
    #[default]
    Connected,
    Locked,
    MeetingBooked,
    MeetingDone,
    Negotiation,
    Closed,
    Lost,
}

impl DealStage {
    /// Column order of the pipeline board
    pub const ALL: [DealStage; 7] = [
        DealStage::Connected,
        DealStage::Locked,
        DealStage::MeetingBooked,
        DealStage::MeetingDone,
        DealStage::Negotiation,
        DealStage::Closed,
        DealStage::Lost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DealStage::Connected => "connected",
            DealStage::Locked => "locked",
            DealStage::MeetingBooked => "meeting-booked",
            DealStage::MeetingDone => "meeting-done",
            DealStage::Negotiation => "negotiation",
            DealStage::Closed => "closed",
            DealStage::Lost => "lost",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            DealStage::Connected => "Connected",
            DealStage::Locked => "Locked",
            DealStage::MeetingBooked => "Meeting Booked",
            DealStage::MeetingDone => "Meeting Done",
            DealStage::Negotiation => "Negotiation",
            DealStage::Closed => "Closed",
            DealStage::Lost => "Lost",
        }
    }

    /// Closed and lost deals drop off the timeline
    pub fn is_active(&self) -> bool {
        !matches!(self, DealStage::Closed | DealStage::Lost)
    }

    fn position(&self) -> usize {
        DealStage::ALL
            .iter()
            .position(|stage| stage == self)
            .unwrap_or(0)
    }

    /// Column to the right, if any
    pub fn next(&self) -> Option<DealStage> {
        DealStage::ALL.get(self.position() + 1).copied()
    }

    /// Column to the left, if any
    pub fn previous(&self) -> Option<DealStage> {
        self.position()
            .checked_sub(1)
            .and_then(|i| DealStage::ALL.get(i).copied())
    }
}

impl fmt::Display for DealStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DealStage {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '_'], "-");
        DealStage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == normalized)
            .ok_or_else(|| ParseValueError {
                what: "deal stage",
                value: s.to_string(),
            })
    }
}

// ============================================================================
// DEAL ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    #[serde(rename = "Id")]
    pub id: EntityId,
    pub name: String,
    pub lead_name: String,
    /// Currency amount in dollars
    pub value: f64,
    pub stage: DealStage,
    pub assigned_rep: String,
    /// Free-form label such as "Q1 2024"
    pub timeline: String,
    /// 1 = January
    pub start_month: u8,
    pub end_month: u8,
    /// Percent, 0-100
    pub probability: u8,
    pub created_at: DateTime<Utc>,
}

impl Deal {
    /// Months covered by the timeline bar
    pub fn duration_months(&self) -> i32 {
        i32::from(self.end_month) - i32::from(self.start_month)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DealDraft {
    pub name: String,
    #[serde(default)]
    pub lead_name: String,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub stage: DealStage,
    #[serde(default)]
    pub assigned_rep: String,
    #[serde(default)]
    pub timeline: String,
    pub start_month: u8,
    pub end_month: u8,
    #[serde(default)]
    pub probability: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DealPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<DealStage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_rep: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_month: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_month: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<u8>,
}

impl DealPatch {
    pub fn stage(stage: DealStage) -> Self {
        DealPatch {
            stage: Some(stage),
            ..Default::default()
        }
    }

    pub fn months(start_month: u8, end_month: u8) -> Self {
        DealPatch {
            start_month: Some(start_month),
            end_month: Some(end_month),
            ..Default::default()
        }
    }
}

impl Entity for Deal {
    type Draft = DealDraft;
    type Patch = DealPatch;

    const KIND: EntityKind = EntityKind::Deal;

    fn id(&self) -> EntityId {
        self.id
    }

    fn from_draft(id: EntityId, draft: DealDraft, now: DateTime<Utc>) -> Self {
        Deal {
            id,
            name: draft.name,
            lead_name: draft.lead_name,
            value: draft.value,
            stage: draft.stage,
            assigned_rep: draft.assigned_rep,
            timeline: draft.timeline,
            start_month: draft.start_month,
            end_month: draft.end_month,
            probability: draft.probability,
            created_at: now,
        }
    }

    fn apply_patch(&mut self, patch: &DealPatch) {
        merge_field(&mut self.name, &patch.name);
        merge_field(&mut self.lead_name, &patch.lead_name);
        merge_field(&mut self.value, &patch.value);
        merge_field(&mut self.stage, &patch.stage);
        merge_field(&mut self.assigned_rep, &patch.assigned_rep);
        merge_field(&mut self.timeline, &patch.timeline);
        merge_field(&mut self.start_month, &patch.start_month);
        merge_field(&mut self.end_month, &patch.end_month);
        merge_field(&mut self.probability, &patch.probability);
    }
}

// ============================================================================
// TESTS
// ============================================================================
