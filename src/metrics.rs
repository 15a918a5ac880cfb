// 📊 Derived Metrics Engine - dashboard, pipeline, timeline and leaderboard numbers
//
// Every function aggregates the full collection it is given (never a
// filtered view) and is pure.

use crate::entities::{Contact, ContactStatus, Deal, DealStage, SalesRep};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

// ============================================================================
// PRIMITIVES
// ============================================================================

pub fn count_where<E>(items: &[E], predicate: impl Fn(&E) -> bool) -> usize {
    items.iter().filter(|item| predicate(item)).count()
}

pub fn sum_by<E>(items: &[E], value: impl Fn(&E) -> f64) -> f64 {
    items.iter().map(value).sum()
}

/// round(100 * numerator / denominator); a zero denominator yields 0
pub fn rate(numerator: u64, denominator: u64) -> u32 {
    if denominator == 0 {
        return 0;
    }
    (100.0 * numerator as f64 / denominator as f64).round() as u32
}

/// Leaderboard score: closed deals weigh most, then meetings, then outreach
pub fn score(rep: &SalesRep) -> u64 {
    u64::from(rep.deals_closed) * 100
        + u64::from(rep.meetings_booked) * 20
        + u64::from(rep.leads_contacted) * 5
}

// ============================================================================
// DASHBOARD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total_contacts: usize,
    pub leads_contacted: usize,
    pub meetings_booked: usize,
    pub deals_closed: usize,
    /// Closed deals per contact, percent
    pub conversion_rate: u32,
}

impl DashboardMetrics {
    pub fn compute(contacts: &[Contact], deals: &[Deal]) -> Self {
        let leads_contacted = count_where(contacts, |c| c.status == ContactStatus::Contacted);
        let meetings_booked = count_where(deals, |d| d.stage == DealStage::MeetingBooked);
        let deals_closed = count_where(deals, |d| d.stage == DealStage::Closed);

        DashboardMetrics {
            total_contacts: contacts.len(),
            leads_contacted,
            meetings_booked,
            deals_closed,
            conversion_rate: rate(deals_closed as u64, contacts.len() as u64),
        }
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageSummary {
    pub stage: DealStage,
    pub title: String,
    pub count: usize,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSummary {
    pub total_deals: usize,
    pub total_value: f64,
    pub closed_deals: usize,
    pub closed_value: f64,
    pub stages: Vec<StageSummary>,
}

impl PipelineSummary {
    pub fn compute(deals: &[Deal]) -> Self {
        let is_closed = |d: &Deal| d.stage == DealStage::Closed;

        let stages = DealStage::ALL
            .into_iter()
            .map(|stage| {
                let in_stage = |d: &Deal| d.stage == stage;
                StageSummary {
                    stage,
                    title: stage.title().to_string(),
                    count: count_where(deals, in_stage),
                    value: deals.iter().filter(|d| in_stage(d)).map(|d| d.value).sum(),
                }
            })
            .collect();

        PipelineSummary {
            total_deals: deals.len(),
            total_value: sum_by(deals, |d| d.value),
            closed_deals: count_where(deals, is_closed),
            closed_value: deals.iter().filter(|d| is_closed(d)).map(|d| d.value).sum(),
            stages,
        }
    }
}

// ============================================================================
// TIMELINE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineSummary {
    pub active_deals: usize,
    pub active_value: f64,
    pub average_duration_months: i64,
    pub average_probability: u32,
}

impl TimelineSummary {
    /// Only deals that are neither closed nor lost count as active
    pub fn compute(deals: &[Deal]) -> Self {
        let active: Vec<&Deal> = deals.iter().filter(|d| d.stage.is_active()).collect();
        let n = active.len();

        let total_duration: i64 = active.iter().map(|d| i64::from(d.duration_months())).sum();
        let total_probability: u64 = active.iter().map(|d| u64::from(d.probability)).sum();

        TimelineSummary {
            active_deals: n,
            active_value: active.iter().map(|d| d.value).sum(),
            average_duration_months: (total_duration as f64 / n.max(1) as f64).round() as i64,
            average_probability: if n == 0 {
                0
            } else {
                (total_probability as f64 / n as f64).round() as u32
            },
        }
    }
}

// ============================================================================
// LEADERBOARD
// ============================================================================

/// dealsClosed desc, then revenue desc, then meetingsBooked desc
pub fn compare_reps(a: &SalesRep, b: &SalesRep) -> Ordering {
    b.deals_closed
        .cmp(&a.deals_closed)
        .then_with(|| b.revenue.total_cmp(&a.revenue))
        .then_with(|| b.meetings_booked.cmp(&a.meetings_booked))
}

pub fn rank_reps(reps: &[SalesRep]) -> Vec<SalesRep> {
    let mut ranked = reps.to_vec();
    ranked.sort_by(compare_reps);
    ranked
}

/// Flagged rep, else the top of the ranking
pub fn hunter_of_month(reps: &[SalesRep]) -> Option<SalesRep> {
    let ranked = rank_reps(reps);
    ranked
        .iter()
        .find(|rep| rep.is_hunter_of_month)
        .or_else(|| ranked.first())
        .cloned()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// 1-based position
    pub rank: usize,
    pub score: u64,
    pub rep: SalesRep,
}

pub fn leaderboard(reps: &[SalesRep]) -> Vec<LeaderboardEntry> {
    rank_reps(reps)
        .into_iter()
        .enumerate()
        .map(|(i, rep)| LeaderboardEntry {
            rank: i + 1,
            score: score(&rep),
            rep,
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamTotals {
    pub leads_contacted: u64,
    pub meetings_booked: u64,
    pub deals_closed: u64,
    pub revenue: f64,
}

impl TeamTotals {
    pub fn compute(reps: &[SalesRep]) -> Self {
        reps.iter().fold(TeamTotals::default(), |mut totals, rep| {
            totals.leads_contacted += u64::from(rep.leads_contacted);
            totals.meetings_booked += u64::from(rep.meetings_booked);
            totals.deals_closed += u64::from(rep.deals_closed);
            totals.revenue += rep.revenue;
            totals
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ContactDraft, DealDraft, Entity};
    use chrono::Utc;

    fn rep(id: u32, name: &str, deals_closed: u32, revenue: f64, meetings_booked: u32) -> SalesRep {
        SalesRep {
            id,
            name: name.to_string(),
            leads_contacted: 10,
            meetings_booked,
            deals_closed,
            revenue,
            is_hunter_of_month: false,
        }
    }

    fn deal(id: u32, stage: DealStage, value: f64, start: u8, end: u8, probability: u8) -> Deal {
        Deal::from_draft(
            id,
            DealDraft {
                name: format!("Deal {}", id),
                lead_name: String::new(),
                value,
                stage,
                assigned_rep: String::new(),
                timeline: String::new(),
                start_month: start,
                end_month: end,
                probability,
            },
            Utc::now(),
        )
    }

    fn contact(id: u32, status: ContactStatus) -> Contact {
        let mut draft = ContactDraft::new(format!("Contact {}", id));
        draft.status = status;
        Contact::from_draft(id, draft, Utc::now())
    }

    #[test]
    fn test_rate_handles_zero_denominator() {
        assert_eq!(rate(5, 0), 0);
        assert_eq!(rate(0, 0), 0);
        assert_eq!(rate(1, 3), 33);
        assert_eq!(rate(2, 3), 67);
        assert_eq!(rate(1, 8), 13); // 12.5 rounds up
    }

    #[test]
    fn test_score() {
        let mut r = rep(1, "A", 2, 0.0, 3);
        r.leads_contacted = 4;
        assert_eq!(score(&r), 280);
    }

    #[test]
    fn test_leaderboard_ordering() {
        let a = rep(1, "A", 5, 100.0, 0);
        let b = rep(2, "B", 5, 200.0, 0);
        let c = rep(3, "C", 3, 500.0, 0);

        let ranked: Vec<String> = rank_reps(&[a, b, c]).into_iter().map(|r| r.name).collect();
        assert_eq!(ranked, vec!["B", "A", "C"]);
    }

    #[test]
    fn test_nan_revenue_still_sorts_consistently() {
        let reps = vec![
            rep(1, "A", 5, f64::NAN, 0),
            rep(2, "B", 5, 200.0, 0),
            rep(3, "C", 5, 100.0, 0),
            rep(4, "D", 2, f64::NAN, 0),
        ];

        let ranked: Vec<String> = rank_reps(&reps).into_iter().map(|r| r.name).collect();
        assert_eq!(ranked, vec!["A", "B", "C", "D"]);
        assert_eq!(compare_reps(&reps[0], &reps[0]), Ordering::Equal);
    }

    #[test]
    fn test_meetings_break_remaining_ties() {
        let a = rep(1, "A", 4, 1000.0, 2);
        let b = rep(2, "B", 4, 1000.0, 9);

        let entries = leaderboard(&[a, b]);
        assert_eq!(entries[0].rep.name, "B");
        assert_eq!(entries[0].rank, 1);
        assert_eq!(entries[1].rank, 2);
        assert_eq!(entries[0].score, 4 * 100 + 9 * 20 + 10 * 5);
    }

    #[test]
    fn test_hunter_of_month_prefers_flag() {
        let top = rep(1, "Top", 9, 900.0, 1);
        let mut flagged = rep(2, "Flagged", 1, 10.0, 1);
        flagged.is_hunter_of_month = true;

        let hunter = hunter_of_month(&[top.clone(), flagged]).unwrap();
        assert_eq!(hunter.name, "Flagged");

        let fallback = hunter_of_month(&[rep(3, "Low", 1, 1.0, 0), top]).unwrap();
        assert_eq!(fallback.name, "Top");

        assert!(hunter_of_month(&[]).is_none());
    }

    #[test]
    fn test_dashboard_metrics() {
        let contacts = vec![
            contact(1, ContactStatus::Contacted),
            contact(2, ContactStatus::Contacted),
            contact(3, ContactStatus::New),
            contact(4, ContactStatus::Qualified),
        ];
        let deals = vec![
            deal(1, DealStage::Closed, 10.0, 1, 2, 100),
            deal(2, DealStage::MeetingBooked, 10.0, 1, 2, 40),
            deal(3, DealStage::Closed, 10.0, 1, 2, 100),
        ];

        let metrics = DashboardMetrics::compute(&contacts, &deals);
        assert_eq!(metrics.total_contacts, 4);
        assert_eq!(metrics.leads_contacted, 2);
        assert_eq!(metrics.meetings_booked, 1);
        assert_eq!(metrics.deals_closed, 2);
        assert_eq!(metrics.conversion_rate, 50);

        let empty = DashboardMetrics::compute(&[], &deals);
        assert_eq!(empty.conversion_rate, 0);
    }

    #[test]
    fn test_pipeline_summary() {
        let deals = vec![
            deal(1, DealStage::Closed, 50000.0, 1, 2, 100),
            deal(2, DealStage::Negotiation, 25000.0, 1, 2, 70),
            deal(3, DealStage::Closed, 15000.0, 1, 2, 100),
        ];

        let summary = PipelineSummary::compute(&deals);
        assert_eq!(summary.total_deals, 3);
        assert_eq!(summary.total_value, 90000.0);
        assert_eq!(summary.closed_deals, 2);
        assert_eq!(summary.closed_value, 65000.0);
        assert_eq!(summary.stages.len(), 7);

        let negotiation = summary
            .stages
            .iter()
            .find(|s| s.stage == DealStage::Negotiation)
            .unwrap();
        assert_eq!(negotiation.count, 1);
        assert_eq!(negotiation.value, 25000.0);
        assert_eq!(negotiation.title, "Negotiation");
    }

    #[test]
    fn test_timeline_summary_ignores_closed_and_lost() {
        let deals = vec![
            deal(1, DealStage::Negotiation, 100.0, 1, 4, 70),
            deal(2, DealStage::Locked, 50.0, 2, 4, 45),
            deal(3, DealStage::Closed, 999.0, 1, 12, 100),
            deal(4, DealStage::Lost, 999.0, 1, 12, 0),
        ];

        let summary = TimelineSummary::compute(&deals);
        assert_eq!(summary.active_deals, 2);
        assert_eq!(summary.active_value, 150.0);
        assert_eq!(summary.average_duration_months, 3); // (3 + 2) / 2 = 2.5
        assert_eq!(summary.average_probability, 58); // 57.5

        let empty = TimelineSummary::compute(&[]);
        assert_eq!(empty.average_duration_months, 0);
        assert_eq!(empty.average_probability, 0);
    }

    #[test]
    fn test_team_totals() {
        let totals = TeamTotals::compute(&[rep(1, "A", 2, 100.0, 3), rep(2, "B", 1, 50.5, 4)]);
        assert_eq!(totals.deals_closed, 3);
        assert_eq!(totals.meetings_booked, 7);
        assert_eq!(totals.leads_contacted, 20);
        assert_eq!(totals.revenue, 150.5);
    }
}
