// 🔁 Optimistic Mutation Coordinator - local view first, store second
//
// A coordinator owns the locally displayed copy of one collection. Updates
// are applied to that copy immediately, then confirmed against the store:
// success replaces the local entity with the store's copy, failure throws
// the local copy away and reloads it from the store.
//
// Attempts are independent. Nothing queues them and nothing serializes two
// attempts on the same entity; the last write observed wins.

use crate::entities::{Entity, EntityId};
use crate::error::CrmError;
use crate::store::SharedRepository;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

// ============================================================================
// NOTICES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Failure,
}

/// User-visible outcome of a mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Failure,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.level == NoticeLevel::Success
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Messages shown for one kind of mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeText {
    pub success: String,
    pub failure: String,
}

impl NoticeText {
    pub fn new(success: impl Into<String>, failure: impl Into<String>) -> Self {
        NoticeText {
            success: success.into(),
            failure: failure.into(),
        }
    }
}

/// Presentation callback receiving every notice
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Sends notices to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => info!(message = %notice.message, "notice"),
            NoticeLevel::Failure => warn!(message = %notice.message, "notice"),
        }
    }
}

/// Keeps every notice in memory (status bars, tests)
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}

// ============================================================================
// ATTEMPT STATE MACHINE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MutationPhase {
    Idle,
    Applying,
    Reconciling,
    RollingBack,
}

impl MutationPhase {
    pub fn can_transition_to(self, next: MutationPhase) -> bool {
        use MutationPhase::*;
        matches!(
            (self, next),
            (Idle, Applying)
                | (Applying, Reconciling)
                | (Applying, RollingBack)
                | (Reconciling, Idle)
                | (RollingBack, Idle)
        )
    }
}

/// One mutation from request to settlement; dropped afterwards
#[derive(Debug)]
struct Attempt {
    id: Uuid,
    entity_id: EntityId,
    phase: MutationPhase,
    trail: Vec<MutationPhase>,
}

impl Attempt {
    fn start(entity_id: EntityId) -> Self {
        Attempt {
            id: Uuid::new_v4(),
            entity_id,
            phase: MutationPhase::Idle,
            trail: vec![MutationPhase::Idle],
        }
    }

    fn advance(&mut self, next: MutationPhase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "illegal transition {:?} -> {:?}",
            self.phase,
            next
        );
        debug!(attempt = %self.id, id = self.entity_id, from = ?self.phase, to = ?next, "mutation phase");
        self.phase = next;
        self.trail.push(next);
    }
}

/// Why a mutation did not stick. The local view has already been reloaded.
#[derive(Debug, thiserror::Error)]
#[error("{notice}")]
pub struct MutationFailure {
    pub attempt: Uuid,
    pub notice: String,
    pub phases: Vec<MutationPhase>,
    #[source]
    pub source: CrmError,
}

// ============================================================================
// COORDINATOR
// ============================================================================

pub struct OptimisticCoordinator<E: Entity> {
    store: SharedRepository<E>,
    view: Arc<RwLock<Vec<E>>>,
    notifier: Arc<dyn Notifier>,
}

impl<E: Entity> Clone for OptimisticCoordinator<E> {
    fn clone(&self) -> Self {
        OptimisticCoordinator {
            store: Arc::clone(&self.store),
            view: Arc::clone(&self.view),
            notifier: Arc::clone(&self.notifier),
        }
    }
}

impl<E: Entity> OptimisticCoordinator<E> {
    /// Starts with an empty view; call `reload` to fill it
    pub fn new(store: SharedRepository<E>, notifier: Arc<dyn Notifier>) -> Self {
        OptimisticCoordinator {
            store,
            view: Arc::new(RwLock::new(Vec::new())),
            notifier,
        }
    }

    /// Build and load in one step
    pub async fn load(store: SharedRepository<E>, notifier: Arc<dyn Notifier>) -> Self {
        let coordinator = Self::new(store, notifier);
        coordinator.reload().await;
        coordinator
    }

    // Guards are never held across an await point.
    fn read_view(&self) -> RwLockReadGuard<'_, Vec<E>> {
        self.view.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_view(&self) -> RwLockWriteGuard<'_, Vec<E>> {
        self.view.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn store(&self) -> &SharedRepository<E> {
        &self.store
    }

    /// Copy of the local view
    pub fn snapshot(&self) -> Vec<E> {
        self.read_view().clone()
    }

    pub fn get(&self, id: EntityId) -> Option<E> {
        self.read_view().iter().find(|item| item.id() == id).cloned()
    }

    /// Replace the local view with a fresh copy of the store
    pub async fn reload(&self) -> usize {
        let fresh = self.store.get_all().await;
        let count = fresh.len();
        *self.write_view() = fresh;

        debug!(kind = %E::KIND, count, "view reloaded");
        count
    }

    /// Optimistic update: patch locally, confirm with the store, and on
    /// failure roll back by reloading the whole collection.
    pub async fn apply(
        &self,
        id: EntityId,
        patch: E::Patch,
        text: &NoticeText,
    ) -> Result<E, MutationFailure> {
        let mut attempt = Attempt::start(id);

        attempt.advance(MutationPhase::Applying);
        {
            let mut view = self.write_view();
            if let Some(local) = view.iter_mut().find(|item| item.id() == id) {
                local.apply_patch(&patch);
            }
        }

        match self.store.update(id, patch).await {
            Ok(confirmed) => {
                attempt.advance(MutationPhase::Reconciling);
                self.replace_local(confirmed.clone());
                self.notifier.notify(Notice::success(text.success.clone()));

                attempt.advance(MutationPhase::Idle);
                info!(attempt = %attempt.id, kind = %E::KIND, id, "mutation confirmed");
                Ok(confirmed)
            }
            Err(source) => {
                attempt.advance(MutationPhase::RollingBack);
                warn!(attempt = %attempt.id, kind = %E::KIND, id, error = %source, "mutation rejected, reloading");
                self.reload().await;
                self.notifier.notify(Notice::failure(text.failure.clone()));

                attempt.advance(MutationPhase::Idle);
                Err(MutationFailure {
                    attempt: attempt.id,
                    notice: text.failure.clone(),
                    phases: attempt.trail,
                    source,
                })
            }
        }
    }

    /// Pessimistic update: the local copy is replaced by the store's copy
    /// only after the store agrees; on failure the view is left untouched.
    pub async fn commit(
        &self,
        id: EntityId,
        patch: E::Patch,
        text: &NoticeText,
    ) -> Result<E, MutationFailure> {
        let attempt = Uuid::new_v4();

        match self.store.update(id, patch).await {
            Ok(confirmed) => {
                self.replace_local(confirmed.clone());
                self.notifier.notify(Notice::success(text.success.clone()));
                info!(attempt = %attempt, kind = %E::KIND, id, "committed");
                Ok(confirmed)
            }
            Err(source) => {
                warn!(attempt = %attempt, kind = %E::KIND, id, error = %source, "commit rejected");
                self.notifier.notify(Notice::failure(text.failure.clone()));
                Err(MutationFailure {
                    attempt,
                    notice: text.failure.clone(),
                    phases: Vec::new(),
                    source,
                })
            }
        }
    }

    /// Pessimistic delete: the local view only changes once the store agrees
    pub async fn remove(&self, id: EntityId, text: &NoticeText) -> Result<(), MutationFailure> {
        let attempt = Uuid::new_v4();

        match self.store.delete(id).await {
            Ok(_) => {
                self.write_view().retain(|item| item.id() != id);
                self.notifier.notify(Notice::success(text.success.clone()));
                info!(attempt = %attempt, kind = %E::KIND, id, "removed");
                Ok(())
            }
            Err(source) => {
                warn!(attempt = %attempt, kind = %E::KIND, id, error = %source, "remove rejected");
                self.notifier.notify(Notice::failure(text.failure.clone()));
                Err(MutationFailure {
                    attempt,
                    notice: text.failure.clone(),
                    phases: Vec::new(),
                    source,
                })
            }
        }
    }

    /// Create through the store, then append the stored copy
    pub async fn insert(&self, draft: E::Draft, text: &NoticeText) -> Result<E, MutationFailure> {
        let attempt = Uuid::new_v4();

        match self.store.create(draft).await {
            Ok(created) => {
                self.write_view().push(created.clone());
                self.notifier.notify(Notice::success(text.success.clone()));
                Ok(created)
            }
            Err(source) => {
                self.notifier.notify(Notice::failure(text.failure.clone()));
                Err(MutationFailure {
                    attempt,
                    notice: text.failure.clone(),
                    phases: Vec::new(),
                    source,
                })
            }
        }
    }

    fn replace_local(&self, confirmed: E) {
        let mut view = self.write_view();
        match view.iter_mut().find(|item| item.id() == confirmed.id()) {
            Some(slot) => *slot = confirmed,
            None => view.push(confirmed),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Deal, DealDraft, DealPatch, DealStage, EntityKind};
    use crate::error::CrmResult;
    use crate::store::{EntityRepository, InMemoryStore, LatencyProfile, SimulatedLatency};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::time::Duration;
    use tokio::time::{sleep, Instant};

    /// Store that accepts reads but rejects every update
    struct RejectingStore(InMemoryStore<Deal>);

    #[async_trait]
    impl EntityRepository<Deal> for RejectingStore {
        async fn get_all(&self) -> Vec<Deal> {
            self.0.get_all().await
        }

        async fn get_by_id(&self, id: EntityId) -> CrmResult<Deal> {
            self.0.get_by_id(id).await
        }

        async fn create(&self, draft: DealDraft) -> CrmResult<Deal> {
            self.0.create(draft).await
        }

        async fn update(&self, id: EntityId, _patch: DealPatch) -> CrmResult<Deal> {
            Err(CrmError::not_found(EntityKind::Deal, id))
        }

        async fn delete(&self, id: EntityId) -> CrmResult<bool> {
            self.0.delete(id).await
        }
    }

    fn deal(id: EntityId, stage: DealStage) -> Deal {
        Deal::from_draft(
            id,
            DealDraft {
                name: format!("Deal {}", id),
                lead_name: "Lead".to_string(),
                value: 1000.0 * id as f64,
                stage,
                assigned_rep: "Mike Wilson".to_string(),
                timeline: "Q1 2024".to_string(),
                start_month: 1,
                end_month: 3,
                probability: 50,
            },
            Utc::now(),
        )
    }

    fn shared(store: &InMemoryStore<Deal>) -> SharedRepository<Deal> {
        Arc::new(store.clone())
    }

    fn text() -> NoticeText {
        NoticeText::new("ok", "failed")
    }

    /// `store` behind the deal latency profile (update takes 300ms)
    fn delayed(store: &InMemoryStore<Deal>) -> SharedRepository<Deal> {
        Arc::new(SimulatedLatency::new(
            store.clone(),
            LatencyProfile::for_kind(EntityKind::Deal),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_view_shows_patch_before_store_confirms() {
        let store = InMemoryStore::with_items(vec![deal(1, DealStage::Negotiation), deal(2, DealStage::Locked)]);
        let notifier = Arc::new(RecordingNotifier::new());
        let coordinator = OptimisticCoordinator::load(delayed(&store), notifier.clone()).await;

        let in_flight = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .apply(1, DealPatch::stage(DealStage::Lost), &text())
                    .await
            })
        };
        sleep(Duration::from_millis(100)).await;

        assert_eq!(coordinator.get(1).unwrap().stage, DealStage::Lost);
        assert_eq!(store.get_by_id(1).await.unwrap().stage, DealStage::Negotiation);
        assert!(notifier.notices().is_empty());

        let confirmed = in_flight.await.unwrap().unwrap();
        assert_eq!(confirmed.stage, DealStage::Lost);
        assert_eq!(store.get_by_id(1).await.unwrap().stage, DealStage::Lost);
        assert_eq!(coordinator.get(1).unwrap(), confirmed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mutations_on_different_entities_are_independent() {
        let store = InMemoryStore::with_items(vec![deal(1, DealStage::Connected), deal(2, DealStage::Locked)]);
        let coordinator = OptimisticCoordinator::load(delayed(&store), Arc::new(TracingNotifier)).await;
        let started = Instant::now();

        let (text1, text2) = (text(), text());
        let (first, second) = tokio::join!(
            coordinator.apply(1, DealPatch::stage(DealStage::Closed), &text1),
            coordinator.apply(2, DealPatch::months(4, 7), &text2),
        );

        // Both round trips overlap instead of queueing
        assert_eq!(started.elapsed(), Duration::from_millis(300));
        assert_eq!(first.unwrap().stage, DealStage::Closed);
        assert_eq!(second.unwrap().start_month, 4);
        assert_eq!(coordinator.snapshot(), store.get_all().await);
        assert_eq!(coordinator.get(2).unwrap().stage, DealStage::Locked);
    }

    #[tokio::test]
    async fn test_commit_waits_for_store() {
        let inner = InMemoryStore::with_items(vec![deal(1, DealStage::Connected)]);
        let rejecting: SharedRepository<Deal> = Arc::new(RejectingStore(inner));
        let notifier = Arc::new(RecordingNotifier::new());
        let coordinator = OptimisticCoordinator::load(rejecting, notifier.clone()).await;

        let failure = coordinator
            .commit(1, DealPatch::stage(DealStage::Closed), &text())
            .await
            .unwrap_err();

        assert!(failure.phases.is_empty());
        assert_eq!(coordinator.get(1).unwrap().stage, DealStage::Connected);
        assert_eq!(notifier.last(), Some(Notice::failure("failed")));

        let store = InMemoryStore::with_items(vec![deal(1, DealStage::Connected)]);
        let coordinator = OptimisticCoordinator::load(shared(&store), notifier.clone()).await;
        let saved = coordinator
            .commit(1, DealPatch::stage(DealStage::Closed), &text())
            .await
            .unwrap();
        assert_eq!(coordinator.get(1).unwrap(), saved);
        assert_eq!(notifier.last(), Some(Notice::success("ok")));
    }

    #[tokio::test]
    async fn test_apply_reconciles_with_store_copy() {
        let store = InMemoryStore::with_items(vec![deal(1, DealStage::Connected), deal(2, DealStage::Locked)]);
        let notifier = Arc::new(RecordingNotifier::new());
        let coordinator = OptimisticCoordinator::load(shared(&store), notifier.clone()).await;

        let confirmed = coordinator
            .apply(1, DealPatch::stage(DealStage::Negotiation), &text())
            .await
            .unwrap();

        assert_eq!(confirmed.stage, DealStage::Negotiation);
        assert_eq!(coordinator.get(1).unwrap(), store.get_by_id(1).await.unwrap());
        assert_eq!(coordinator.snapshot(), store.get_all().await);
        assert_eq!(notifier.last(), Some(Notice::success("ok")));
    }

    #[tokio::test]
    async fn test_rejected_update_rolls_back_to_fresh_get_all() {
        let inner = InMemoryStore::with_items(vec![deal(1, DealStage::Connected), deal(2, DealStage::Locked)]);
        let store: SharedRepository<Deal> = Arc::new(RejectingStore(inner));
        let notifier = Arc::new(RecordingNotifier::new());
        let coordinator = OptimisticCoordinator::load(store.clone(), notifier.clone()).await;
        let before = store.get_all().await;

        let failure = coordinator
            .apply(1, DealPatch::stage(DealStage::Closed), &text())
            .await
            .unwrap_err();

        assert!(failure.source.is_not_found());
        assert_eq!(failure.notice, "failed");
        assert_eq!(
            failure.phases,
            vec![
                MutationPhase::Idle,
                MutationPhase::Applying,
                MutationPhase::RollingBack,
                MutationPhase::Idle
            ]
        );
        assert_eq!(coordinator.snapshot(), before);
        assert_eq!(coordinator.get(1).unwrap().stage, DealStage::Connected);
        assert_eq!(notifier.last(), Some(Notice::failure("failed")));
    }

    #[tokio::test]
    async fn test_entity_deleted_underneath_view() {
        let store = InMemoryStore::with_items(vec![deal(1, DealStage::Connected), deal(2, DealStage::Locked)]);
        let coordinator =
            OptimisticCoordinator::load(shared(&store), Arc::new(TracingNotifier)).await;

        store.delete(2).await.unwrap();
        let result = coordinator.apply(2, DealPatch::stage(DealStage::Closed), &text()).await;

        assert!(result.is_err());
        assert_eq!(coordinator.snapshot().len(), 1);
        assert!(coordinator.get(2).is_none());
    }

    #[tokio::test]
    async fn test_remove_is_pessimistic() {
        let store = InMemoryStore::with_items(vec![deal(1, DealStage::Connected)]);
        let notifier = Arc::new(RecordingNotifier::new());
        let coordinator = OptimisticCoordinator::load(shared(&store), notifier.clone()).await;

        assert!(coordinator.remove(9, &text()).await.is_err());
        assert_eq!(coordinator.snapshot().len(), 1);

        coordinator.remove(1, &text()).await.unwrap();
        assert!(coordinator.snapshot().is_empty());
        assert!(store.is_empty().await);
        assert_eq!(notifier.notices().len(), 2);
    }

    #[tokio::test]
    async fn test_insert_appends_store_copy() {
        let store = InMemoryStore::with_items(vec![deal(4, DealStage::Connected)]);
        let coordinator =
            OptimisticCoordinator::load(shared(&store), Arc::new(TracingNotifier)).await;

        let draft = DealDraft {
            name: "Renewal".to_string(),
            lead_name: String::new(),
            value: 12.5,
            stage: DealStage::Connected,
            assigned_rep: String::new(),
            timeline: String::new(),
            start_month: 2,
            end_month: 5,
            probability: 10,
        };

        let created = coordinator.insert(draft, &text()).await.unwrap();
        assert_eq!(created.id, 5);
        assert_eq!(coordinator.snapshot().last(), Some(&created));
    }

    #[tokio::test]
    async fn test_reload_picks_up_outside_changes() {
        let store = InMemoryStore::with_items(vec![deal(1, DealStage::Connected)]);
        let coordinator =
            OptimisticCoordinator::load(shared(&store), Arc::new(TracingNotifier)).await;

        store.update(1, DealPatch::stage(DealStage::Lost)).await.unwrap();
        assert_eq!(coordinator.get(1).unwrap().stage, DealStage::Connected);

        assert_eq!(coordinator.reload().await, 1);
        assert_eq!(coordinator.get(1).unwrap().stage, DealStage::Lost);
    }

    #[test]
    fn test_phase_transitions() {
        assert!(MutationPhase::Idle.can_transition_to(MutationPhase::Applying));
        assert!(MutationPhase::Applying.can_transition_to(MutationPhase::RollingBack));
        assert!(MutationPhase::Reconciling.can_transition_to(MutationPhase::Idle));
        assert!(!MutationPhase::Idle.can_transition_to(MutationPhase::Reconciling));
        assert!(!MutationPhase::RollingBack.can_transition_to(MutationPhase::Reconciling));
    }
}
