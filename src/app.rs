// 🧩 CrmApp - wires the three stores and serves one view model per page
//
// Every page reloads what it needs from the stores and derives its numbers
// from the full collections.

use crate::config::CrmConfig;
use crate::coordinator::{Notifier, OptimisticCoordinator};
use crate::entities::{Contact, Deal, SalesRep};
use crate::fixtures::Fixtures;
use crate::metrics::{
    hunter_of_month, leaderboard, DashboardMetrics, LeaderboardEntry, PipelineSummary,
    TeamTotals, TimelineSummary,
};
use crate::pipeline::{board, StageColumn};
use crate::query::{distinct_reps, ContactField, ContactQuery, FilteredView, SortSpec};
use crate::store::{simulated_store, SharedRepository};
use crate::timeline::{rows, TimelineRow};
use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

// ============================================================================
// VIEW MODELS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardPage {
    pub metrics: DashboardMetrics,
    pub hunter_of_month: Option<SalesRep>,
    pub top_performers: Vec<LeaderboardEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactsPage {
    /// Size of the unfiltered collection
    pub total: usize,
    pub rows: Vec<Contact>,
    pub rep_options: Vec<String>,
    pub query: ContactQuery,
    pub sort: SortSpec<ContactField>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelinePage {
    pub summary: PipelineSummary,
    pub columns: Vec<StageColumn>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePage {
    pub summary: TimelineSummary,
    pub rows: Vec<TimelineRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardPage {
    pub entries: Vec<LeaderboardEntry>,
    pub hunter_of_month: Option<SalesRep>,
    pub totals: TeamTotals,
}

// ============================================================================
// APP
// ============================================================================

#[derive(Clone)]
pub struct CrmApp {
    contacts: SharedRepository<Contact>,
    deals: SharedRepository<Deal>,
    sales_reps: SharedRepository<SalesRep>,
}

impl CrmApp {
    pub fn new(
        contacts: SharedRepository<Contact>,
        deals: SharedRepository<Deal>,
        sales_reps: SharedRepository<SalesRep>,
    ) -> Self {
        CrmApp {
            contacts,
            deals,
            sales_reps,
        }
    }

    /// Seeded stores behind the simulated latency, scaled by `latency_scale`
    pub fn from_fixtures(fixtures: Fixtures, latency_scale: f64) -> Self {
        info!(
            contacts = fixtures.contacts.len(),
            deals = fixtures.deals.len(),
            sales_reps = fixtures.sales_reps.len(),
            latency_scale,
            "seeding stores"
        );

        CrmApp::new(
            simulated_store(fixtures.contacts, latency_scale),
            simulated_store(fixtures.deals, latency_scale),
            simulated_store(fixtures.sales_reps, latency_scale),
        )
    }

    pub fn from_config(config: &CrmConfig) -> Result<Self> {
        let fixtures = Fixtures::load(config.fixtures_dir.as_deref())?;
        Ok(Self::from_fixtures(fixtures, config.latency_scale))
    }

    pub fn contacts(&self) -> &SharedRepository<Contact> {
        &self.contacts
    }

    pub fn deals(&self) -> &SharedRepository<Deal> {
        &self.deals
    }

    pub fn sales_reps(&self) -> &SharedRepository<SalesRep> {
        &self.sales_reps
    }

    // ========================================================================
    // PAGES
    // ========================================================================

    /// The three collections load concurrently
    pub async fn dashboard(&self) -> DashboardPage {
        let (contacts, deals, reps) = tokio::join!(
            self.contacts.get_all(),
            self.deals.get_all(),
            self.sales_reps.get_all()
        );
        debug!(contacts = contacts.len(), deals = deals.len(), reps = reps.len(), "dashboard loaded");

        DashboardPage {
            metrics: DashboardMetrics::compute(&contacts, &deals),
            hunter_of_month: hunter_of_month(&reps),
            top_performers: leaderboard(&reps).into_iter().take(3).collect(),
        }
    }

    pub async fn contacts_page(&self, query: ContactQuery, sort: SortSpec<ContactField>) -> ContactsPage {
        let contacts = self.contacts.get_all().await;
        let rep_options = distinct_reps(&contacts);
        let total = contacts.len();
        let view = FilteredView::new(contacts, query, Some(sort));

        ContactsPage {
            total,
            rows: view.rows().to_vec(),
            rep_options,
            query: view.query().clone(),
            sort,
        }
    }

    pub async fn pipeline(&self) -> PipelinePage {
        let deals = self.deals.get_all().await;
        PipelinePage {
            summary: PipelineSummary::compute(&deals),
            columns: board(&deals),
        }
    }

    pub async fn timeline(&self) -> TimelinePage {
        let deals = self.deals.get_all().await;
        TimelinePage {
            summary: TimelineSummary::compute(&deals),
            rows: rows(&deals),
        }
    }

    pub async fn leaderboard(&self) -> LeaderboardPage {
        let reps = self.sales_reps.get_all().await;
        LeaderboardPage {
            entries: leaderboard(&reps),
            hunter_of_month: hunter_of_month(&reps),
            totals: TeamTotals::compute(&reps),
        }
    }

    // ========================================================================
    // COORDINATORS
    // ========================================================================

    /// Loaded deal view for the pipeline and timeline pages
    pub async fn deal_coordinator(&self, notifier: Arc<dyn Notifier>) -> OptimisticCoordinator<Deal> {
        OptimisticCoordinator::load(Arc::clone(&self.deals), notifier).await
    }

    /// Loaded contact view for the contacts page
    pub async fn contact_coordinator(&self, notifier: Arc<dyn Notifier>) -> OptimisticCoordinator<Contact> {
        OptimisticCoordinator::load(Arc::clone(&self.contacts), notifier).await
    }
}
