// 📅 Timeline Calendar - month bars for active deals, move and resize
//
// Months are 1-based (1 = January). Every patch built here keeps
// 1 <= start < end <= 12.

use crate::coordinator::{MutationFailure, NoticeText, OptimisticCoordinator};
use crate::entities::{Deal, DealPatch, EntityId};
use serde::{Deserialize, Serialize};

pub const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const FIRST_MONTH: u8 = 1;
const LAST_MONTH: u8 = 12;

pub fn month_label(month: u8) -> &'static str {
    usize::from(month)
        .checked_sub(1)
        .and_then(|i| MONTHS.get(i))
        .copied()
        .unwrap_or("?")
}

// ============================================================================
// MOVE & RESIZE
// ============================================================================

/// Drop the bar so it starts at `month`, keeping its length where December
/// allows
pub fn reschedule(deal: &Deal, month: u8) -> DealPatch {
    let duration = deal.duration_months().clamp(1, 11) as u8;
    let start = month.clamp(FIRST_MONTH, LAST_MONTH - 1);
    let end = start.saturating_add(duration).min(LAST_MONTH);
    DealPatch::months(start, end)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    Start,
    End,
}

/// Drag one edge of the bar to `month`; the other edge stays put
pub fn resize(deal: &Deal, edge: Edge, month: u8) -> DealPatch {
    match edge {
        Edge::Start => {
            let end = deal.end_month.clamp(FIRST_MONTH + 1, LAST_MONTH);
            DealPatch::months(month.clamp(FIRST_MONTH, end - 1), end)
        }
        Edge::End => {
            let start = deal.start_month.clamp(FIRST_MONTH, LAST_MONTH - 1);
            DealPatch::months(start, month.clamp(start + 1, LAST_MONTH))
        }
    }
}

pub fn timeline_text() -> NoticeText {
    NoticeText::new("Deal timeline updated!", "Failed to update deal timeline")
}

impl OptimisticCoordinator<Deal> {
    /// Timeline drop onto `month`
    pub async fn reschedule(&self, id: EntityId, month: u8) -> Result<Deal, MutationFailure> {
        let patch = match self.get(id) {
            Some(deal) => reschedule(&deal, month),
            None => {
                let start = month.clamp(FIRST_MONTH, LAST_MONTH - 1);
                DealPatch::months(start, start + 1)
            }
        };
        self.apply(id, patch, &timeline_text()).await
    }

    /// Shift the whole bar by `delta` months
    pub async fn shift(&self, id: EntityId, delta: i8) -> Result<Deal, MutationFailure> {
        let start = self.get(id).map(|deal| deal.start_month).unwrap_or(FIRST_MONTH);
        let month = (i16::from(start) + i16::from(delta)).clamp(1, 12) as u8;
        self.reschedule(id, month).await
    }

    pub async fn resize(&self, id: EntityId, edge: Edge, month: u8) -> Result<Deal, MutationFailure> {
        let patch = match self.get(id) {
            Some(deal) => resize(&deal, edge, month),
            None => DealPatch::default(),
        };
        self.apply(id, patch, &timeline_text()).await
    }
}

// ============================================================================
// BAR GEOMETRY
// ============================================================================

/// Horizontal placement of a deal bar as percentages of the year
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bar {
    pub left_percent: f64,
    pub width_percent: f64,
}

impl Bar {
    pub fn for_deal(deal: &Deal) -> Self {
        Bar {
            left_percent: (f64::from(deal.start_month) - 1.0) / 12.0 * 100.0,
            width_percent: f64::from(deal.duration_months()) / 12.0 * 100.0,
        }
    }

    /// Start column and cell count on a grid `columns` wide
    pub fn cells(&self, columns: u16) -> (u16, u16) {
        let columns = f64::from(columns);
        let start = (self.left_percent / 100.0 * columns).round().max(0.0);
        let width = (self.width_percent / 100.0 * columns).round().max(1.0);
        (start as u16, width as u16)
    }
}

/// Active deal with its bar, as drawn on the calendar
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineRow {
    pub deal: Deal,
    pub bar: Bar,
    pub label: String,
}

/// Closed and lost deals are left off the calendar
pub fn rows(deals: &[Deal]) -> Vec<TimelineRow> {
    deals
        .iter()
        .filter(|deal| deal.stage.is_active())
        .map(|deal| TimelineRow {
            bar: Bar::for_deal(deal),
            label: format!(
                "{} - {}",
                month_label(deal.start_month),
                month_label(deal.end_month)
            ),
            deal: deal.clone(),
        })
        .collect()
}
