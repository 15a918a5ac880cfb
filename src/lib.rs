// Pipeline CRM - Core Library
// Exposes all modules for use in the CLI, TUI, API server and tests

pub mod entities;
pub mod error;
pub mod store;       // Entity store + simulated latency
pub mod query;       // Query / filter engine
pub mod metrics;     // Derived metrics
pub mod coordinator; // Optimistic mutations
pub mod contacts;    // Inline contact edits
pub mod pipeline;    // Kanban board
pub mod timeline;    // Month calendar
pub mod fixtures;
pub mod config;
pub mod logging;
pub mod format;
pub mod export;
pub mod app;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use entities::{
    Contact, ContactDraft, ContactPatch, ContactStatus, Deal, DealDraft, DealPatch, DealStage,
    Entity, EntityId, EntityKind, SalesRep, SalesRepDraft, SalesRepPatch, Tags,
};
pub use error::{CrmError, CrmResult};
pub use store::{
    simulated_store, EntityRepository, InMemoryStore, LatencyProfile, SharedRepository,
    SimulatedLatency,
};
pub use query::{
    ContactField, ContactQuery, DealField, DealQuery, Filter, FilteredView, SortDirection,
    SortKey, SortSpec,
};
pub use metrics::{
    DashboardMetrics, LeaderboardEntry, PipelineSummary, StageSummary, TeamTotals,
    TimelineSummary,
};
pub use coordinator::{
    MutationFailure, MutationPhase, Notice, NoticeLevel, NoticeText, Notifier,
    OptimisticCoordinator, RecordingNotifier, TracingNotifier,
};
pub use contacts::ContactEdit;
pub use fixtures::Fixtures;
pub use config::CrmConfig;
pub use app::CrmApp;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
