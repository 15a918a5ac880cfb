// 🔎 Query/Filter Engine - derive the visible rows from a collection
//
// Filters are AND-combined; an empty criterion never excludes anything.
// Sorting compares the lowercase string form of the chosen field, so numeric
// fields order as text ("9000" sorts after "75000").

use crate::entities::{Contact, ContactStatus, Deal, DealStage, ParseValueError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// FILTERS
// ============================================================================

pub trait Filter<E> {
    fn matches(&self, item: &E) -> bool;

    /// Matching items in source order
    fn apply(&self, items: &[E]) -> Vec<E>
    where
        E: Clone,
    {
        items.iter().filter(|item| self.matches(item)).cloned().collect()
    }
}

/// Lowercased search text as typed, or None when empty
fn needle(search: &Option<String>) -> Option<String> {
    search
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

fn rep_matches(wanted: &Option<String>, rep: &str) -> bool {
    match wanted.as_deref() {
        Some(w) if !w.is_empty() => w == rep,
        _ => true,
    }
}

/// Contacts page filters: search box, status select, rep select
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: Option<ContactStatus>,
    #[serde(default)]
    pub assigned_rep: Option<String>,
}

impl ContactQuery {
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_status(mut self, status: ContactStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_rep(mut self, rep: impl Into<String>) -> Self {
        self.assigned_rep = Some(rep.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        needle(&self.search).is_none()
            && self.status.is_none()
            && self.assigned_rep.as_deref().map_or(true, str::is_empty)
    }
}

impl Filter<Contact> for ContactQuery {
    fn matches(&self, contact: &Contact) -> bool {
        if let Some(text) = needle(&self.search) {
            let hit = contains_ci(&contact.name, &text)
                || contains_ci(&contact.email, &text)
                || contains_ci(&contact.company, &text);
            if !hit {
                return false;
            }
        }

        if let Some(status) = self.status {
            if contact.status != status {
                return false;
            }
        }

        rep_matches(&self.assigned_rep, &contact.assigned_rep)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub stage: Option<DealStage>,
    #[serde(default)]
    pub assigned_rep: Option<String>,
}

impl DealQuery {
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_stage(mut self, stage: DealStage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn with_rep(mut self, rep: impl Into<String>) -> Self {
        self.assigned_rep = Some(rep.into());
        self
    }
}

impl Filter<Deal> for DealQuery {
    fn matches(&self, deal: &Deal) -> bool {
        if let Some(text) = needle(&self.search) {
            if !contains_ci(&deal.name, &text) && !contains_ci(&deal.lead_name, &text) {
                return false;
            }
        }

        if let Some(stage) = self.stage {
            if deal.stage != stage {
                return false;
            }
        }

        rep_matches(&self.assigned_rep, &deal.assigned_rep)
    }
}

/// Options for the rep select: distinct reps in first-seen order
pub fn distinct_reps(contacts: &[Contact]) -> Vec<String> {
    let mut reps: Vec<String> = Vec::new();
    for contact in contacts {
        if !reps.contains(&contact.assigned_rep) {
            reps.push(contact.assigned_rep.clone());
        }
    }
    reps
}

/// Kanban columns: every stage in board order, deals in source order
pub fn group_by_stage(deals: &[Deal]) -> Vec<(DealStage, Vec<Deal>)> {
    DealStage::ALL
        .into_iter()
        .map(|stage| {
            let column = DealQuery::default().with_stage(stage).apply(deals);
            (stage, column)
        })
        .collect()
}

// ============================================================================
// SORTING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }
}

impl FromStr for SortDirection {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Ascending),
            "desc" | "descending" => Ok(SortDirection::Descending),
            _ => Err(ParseValueError {
                what: "sort direction",
                value: s.to_string(),
            }),
        }
    }
}

/// Entities that expose a string sort key per field
pub trait SortKey {
    type Field: Copy + PartialEq + fmt::Debug;

    fn sort_key(&self, field: Self::Field) -> String;
}

/// Current column + direction of a sortable table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec<F> {
    pub field: F,
    pub direction: SortDirection,
}

impl<F: Copy + PartialEq> SortSpec<F> {
    pub fn ascending(field: F) -> Self {
        SortSpec {
            field,
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(field: F) -> Self {
        SortSpec {
            field,
            direction: SortDirection::Descending,
        }
    }

    /// Header click: same column flips direction, new column starts ascending
    pub fn toggle(self, field: F) -> Self {
        if self.field == field {
            SortSpec {
                field,
                direction: self.direction.flipped(),
            }
        } else {
            SortSpec::ascending(field)
        }
    }
}

/// New ordering of `items`; ties keep their source order
pub fn sort_by<E>(items: &[E], spec: &SortSpec<E::Field>) -> Vec<E>
where
    E: SortKey + Clone,
{
    let mut keyed: Vec<(String, &E)> = items
        .iter()
        .map(|item| (item.sort_key(spec.field).to_lowercase(), item))
        .collect();

    keyed.sort_by(|(a, _), (b, _)| {
        let ord: Ordering = a.cmp(b);
        match spec.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });

    keyed.into_iter().map(|(_, item)| item.clone()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContactField {
    #[default]
    Name,
    Email,
    Company,
    Phone,
    Status,
    AssignedRep,
    CreatedAt,
    LastContact,
}

impl ContactField {
    pub const ALL: [ContactField; 8] = [
        ContactField::Name,
        ContactField::Email,
        ContactField::Company,
        ContactField::Phone,
        ContactField::Status,
        ContactField::AssignedRep,
        ContactField::CreatedAt,
        ContactField::LastContact,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContactField::Name => "name",
            ContactField::Email => "email",
            ContactField::Company => "company",
            ContactField::Phone => "phone",
            ContactField::Status => "status",
            ContactField::AssignedRep => "assignedRep",
            ContactField::CreatedAt => "createdAt",
            ContactField::LastContact => "lastContact",
        }
    }
}

impl FromStr for ContactField {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace(['-', '_'], "");
        match key.as_str() {
            "rep" => return Ok(ContactField::AssignedRep),
            "created" => return Ok(ContactField::CreatedAt),
            _ => {}
        }
        ContactField::ALL
            .into_iter()
            .find(|field| field.as_str().to_lowercase() == key)
            .ok_or_else(|| ParseValueError {
                what: "contact field",
                value: s.to_string(),
            })
    }
}

impl SortKey for Contact {
    type Field = ContactField;

    fn sort_key(&self, field: ContactField) -> String {
        match field {
            ContactField::Name => self.name.clone(),
            ContactField::Email => self.email.clone(),
            ContactField::Company => self.company.clone(),
            ContactField::Phone => self.phone.clone(),
            ContactField::Status => self.status.as_str().to_string(),
            ContactField::AssignedRep => self.assigned_rep.clone(),
            ContactField::CreatedAt => self.created_at.to_rfc3339(),
            ContactField::LastContact => self.last_contact.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DealField {
    #[default]
    Name,
    LeadName,
    Value,
    Stage,
    AssignedRep,
    Probability,
    StartMonth,
}

impl DealField {
    pub const ALL: [DealField; 7] = [
        DealField::Name,
        DealField::LeadName,
        DealField::Value,
        DealField::Stage,
        DealField::AssignedRep,
        DealField::Probability,
        DealField::StartMonth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DealField::Name => "name",
            DealField::LeadName => "leadName",
            DealField::Value => "value",
            DealField::Stage => "stage",
            DealField::AssignedRep => "assignedRep",
            DealField::Probability => "probability",
            DealField::StartMonth => "startMonth",
        }
    }
}

impl FromStr for DealField {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace(['-', '_'], "");
        DealField::ALL
            .into_iter()
            .find(|field| field.as_str().to_lowercase() == key)
            .ok_or_else(|| ParseValueError {
                what: "deal field",
                value: s.to_string(),
            })
    }
}

impl SortKey for Deal {
    type Field = DealField;

    fn sort_key(&self, field: DealField) -> String {
        match field {
            DealField::Name => self.name.clone(),
            DealField::LeadName => self.lead_name.clone(),
            DealField::Value => self.value.to_string(),
            DealField::Stage => self.stage.as_str().to_string(),
            DealField::AssignedRep => self.assigned_rep.clone(),
            DealField::Probability => self.probability.to_string(),
            DealField::StartMonth => self.start_month.to_string(),
        }
    }
}

// ============================================================================
// FILTERED VIEW
// ============================================================================

/// Source rows + criteria + cached result. Any change to the source, the
/// query or the sort recomputes the rows from scratch.
#[derive(Debug, Clone)]
pub struct FilteredView<E: SortKey, Q> {
    source: Vec<E>,
    query: Q,
    sort: Option<SortSpec<E::Field>>,
    rows: Vec<E>,
}

impl<E, Q> FilteredView<E, Q>
where
    E: SortKey + Clone,
    Q: Filter<E>,
{
    pub fn new(source: Vec<E>, query: Q, sort: Option<SortSpec<E::Field>>) -> Self {
        let mut view = FilteredView {
            source,
            query,
            sort,
            rows: Vec::new(),
        };
        view.recompute();
        view
    }

    fn recompute(&mut self) {
        let filtered = self.query.apply(&self.source);
        self.rows = match &self.sort {
            Some(spec) => sort_by(&filtered, spec),
            None => filtered,
        };
    }

    pub fn set_source(&mut self, source: Vec<E>) {
        self.source = source;
        self.recompute();
    }

    pub fn set_query(&mut self, query: Q) {
        self.query = query;
        self.recompute();
    }

    pub fn set_sort(&mut self, sort: Option<SortSpec<E::Field>>) {
        self.sort = sort;
        self.recompute();
    }

    pub fn rows(&self) -> &[E] {
        &self.rows
    }

    pub fn source(&self) -> &[E] {
        &self.source
    }

    pub fn query(&self) -> &Q {
        &self.query
    }

    pub fn sort(&self) -> Option<SortSpec<E::Field>> {
        self.sort
    }
}

// ============================================================================
// TESTS
// ============================================================================
