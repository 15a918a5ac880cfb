// 🏆 Sales Rep Entity - performance counters for the leaderboard

use super::{merge_field, Entity, EntityId, EntityKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesRep {
    #[serde(rename = "Id")]
    pub id: EntityId,
    pub name: String,
    pub leads_contacted: u32,
    pub meetings_booked: u32,
    pub deals_closed: u32,
    pub revenue: f64,
    #[serde(default)]
    pub is_hunter_of_month: bool,
}

/// A new rep only brings a name; counters always start at zero
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SalesRepDraft {
    pub name: String,
}

impl SalesRepDraft {
    pub fn new(name: impl Into<String>) -> Self {
        SalesRepDraft { name: name.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SalesRepPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leads_contacted: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meetings_booked: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deals_closed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_hunter_of_month: Option<bool>,
}

impl Entity for SalesRep {
    type Draft = SalesRepDraft;
    type Patch = SalesRepPatch;

    const KIND: EntityKind = EntityKind::SalesRep;

    fn id(&self) -> EntityId {
        self.id
    }

    fn from_draft(id: EntityId, draft: SalesRepDraft, _now: DateTime<Utc>) -> Self {
        SalesRep {
            id,
            name: draft.name,
            leads_contacted: 0,
            meetings_booked: 0,
            deals_closed: 0,
            revenue: 0.0,
            is_hunter_of_month: false,
        }
    }

    fn apply_patch(&mut self, patch: &SalesRepPatch) {
        merge_field(&mut self.name, &patch.name);
        merge_field(&mut self.leads_contacted, &patch.leads_contacted);
        merge_field(&mut self.meetings_booked, &patch.meetings_booked);
        merge_field(&mut self.deals_closed, &patch.deals_closed);
        merge_field(&mut self.revenue, &patch.revenue);
        merge_field(&mut self.is_hunter_of_month, &patch.is_hunter_of_month);
    }
}
