// 🗄️ Entity Store - in-memory collections behind a remote-shaped contract
//
// `InMemoryStore` owns one ordered collection per entity type and hands out
// copies only. `SimulatedLatency` wraps any repository and delays every call
// so consumers treat each operation as a suspension point, exactly as they
// would with a real backend.

use crate::entities::{Entity, EntityId, EntityKind};
use crate::error::{CrmError, CrmResult};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

// ============================================================================
// REPOSITORY CONTRACT
// ============================================================================

/// CRUD contract shared by every store. Every call may suspend, and
/// in-flight calls may complete in any order.
#[async_trait]
pub trait EntityRepository<E: Entity>: Send + Sync {
    /// Copy of the whole collection in insertion order
    async fn get_all(&self) -> Vec<E>;

    async fn get_by_id(&self, id: EntityId) -> CrmResult<E>;

    /// Key becomes max(existing) + 1, or 1 for an empty collection
    async fn create(&self, draft: E::Draft) -> CrmResult<E>;

    /// Shallow merge of `patch` over the stored entity
    async fn update(&self, id: EntityId, patch: E::Patch) -> CrmResult<E>;

    async fn delete(&self, id: EntityId) -> CrmResult<bool>;
}

/// Stores are injected as trait objects
pub type SharedRepository<E> = Arc<dyn EntityRepository<E>>;

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

pub struct InMemoryStore<E> {
    items: Arc<RwLock<Vec<E>>>,
}

impl<E: Entity> InMemoryStore<E> {
    pub fn new() -> Self {
        Self::with_items(Vec::new())
    }

    /// Seed the collection (fixtures); order is kept as given
    pub fn with_items(items: Vec<E>) -> Self {
        InMemoryStore {
            items: Arc::new(RwLock::new(items)),
        }
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

impl<E: Entity> Default for InMemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for InMemoryStore<E> {
    fn clone(&self) -> Self {
        InMemoryStore {
            items: Arc::clone(&self.items),
        }
    }
}

#[async_trait]
impl<E: Entity> EntityRepository<E> for InMemoryStore<E> {
    async fn get_all(&self) -> Vec<E> {
        let items = self.items.read().await;
        debug!(kind = %E::KIND, count = items.len(), "get_all");
        items.clone()
    }

    async fn get_by_id(&self, id: EntityId) -> CrmResult<E> {
        let items = self.items.read().await;
        items
            .iter()
            .find(|item| item.id() == id)
            .cloned()
            .ok_or_else(|| CrmError::not_found(E::KIND, id))
    }

    async fn create(&self, draft: E::Draft) -> CrmResult<E> {
        let mut items = self.items.write().await;
        let id = items.iter().map(|item| item.id()).max().unwrap_or(0) + 1;
        let entity = E::from_draft(id, draft, Utc::now());
        items.push(entity.clone());

        debug!(kind = %E::KIND, id, "created");
        Ok(entity)
    }

    async fn update(&self, id: EntityId, patch: E::Patch) -> CrmResult<E> {
        let mut items = self.items.write().await;
        let entity = items
            .iter_mut()
            .find(|item| item.id() == id)
            .ok_or_else(|| CrmError::not_found(E::KIND, id))?;
        entity.apply_patch(&patch);

        debug!(kind = %E::KIND, id, "updated");
        Ok(entity.clone())
    }

    async fn delete(&self, id: EntityId) -> CrmResult<bool> {
        let mut items = self.items.write().await;
        let index = items
            .iter()
            .position(|item| item.id() == id)
            .ok_or_else(|| CrmError::not_found(E::KIND, id))?;
        items.remove(index);

        debug!(kind = %E::KIND, id, "deleted");
        Ok(true)
    }
}

// ============================================================================
// SIMULATED LATENCY
// ============================================================================

/// Fixed delay per operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyProfile {
    pub get_all: Duration,
    pub get_by_id: Duration,
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl LatencyProfile {
    /// Delays of the mock services the UI was built against
    pub fn for_kind(kind: EntityKind) -> Self {
        let get_all = match kind {
            EntityKind::Contact => 300,
            EntityKind::Deal => 350,
            EntityKind::SalesRep => 250,
        };

        LatencyProfile {
            get_all: Duration::from_millis(get_all),
            get_by_id: Duration::from_millis(200),
            create: Duration::from_millis(400),
            update: Duration::from_millis(300),
            delete: Duration::from_millis(300),
        }
    }

    pub fn instant() -> Self {
        LatencyProfile {
            get_all: Duration::ZERO,
            get_by_id: Duration::ZERO,
            create: Duration::ZERO,
            update: Duration::ZERO,
            delete: Duration::ZERO,
        }
    }

    /// Multiply every delay; negative or NaN factors count as zero
    pub fn scaled(self, factor: f64) -> Self {
        let factor = if factor.is_finite() && factor > 0.0 { factor } else { 0.0 };
        let scale = |delay: Duration| {
            Duration::from_nanos((delay.as_nanos() as f64 * factor).round() as u64)
        };
        LatencyProfile {
            get_all: scale(self.get_all),
            get_by_id: scale(self.get_by_id),
            create: scale(self.create),
            update: scale(self.update),
            delete: scale(self.delete),
        }
    }
}

/// Fake-remote adapter: same contract, every call delayed first
pub struct SimulatedLatency<R> {
    inner: R,
    profile: LatencyProfile,
}

impl<R> SimulatedLatency<R> {
    pub fn new(inner: R, profile: LatencyProfile) -> Self {
        SimulatedLatency { inner, profile }
    }

    pub fn profile(&self) -> LatencyProfile {
        self.profile
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[async_trait]
impl<E, R> EntityRepository<E> for SimulatedLatency<R>
where
    E: Entity,
    R: EntityRepository<E>,
{
    async fn get_all(&self) -> Vec<E> {
        pause(self.profile.get_all).await;
        self.inner.get_all().await
    }

    async fn get_by_id(&self, id: EntityId) -> CrmResult<E> {
        pause(self.profile.get_by_id).await;
        self.inner.get_by_id(id).await
    }

    async fn create(&self, draft: E::Draft) -> CrmResult<E> {
        pause(self.profile.create).await;
        self.inner.create(draft).await
    }

    async fn update(&self, id: EntityId, patch: E::Patch) -> CrmResult<E> {
        pause(self.profile.update).await;
        self.inner.update(id, patch).await
    }

    async fn delete(&self, id: EntityId) -> CrmResult<bool> {
        pause(self.profile.delete).await;
        self.inner.delete(id).await
    }
}

/// Seeded store behind the default latency profile for its kind
pub fn simulated_store<E: Entity>(items: Vec<E>, latency_scale: f64) -> SharedRepository<E> {
    let profile = LatencyProfile::for_kind(E::KIND).scaled(latency_scale);
    Arc::new(SimulatedLatency::new(InMemoryStore::with_items(items), profile))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        Contact, ContactDraft, ContactPatch, ContactStatus, Deal, SalesRep, SalesRepDraft,
    };
    use std::sync::Mutex;
    use tokio::time::Instant;

    fn draft(name: &str) -> ContactDraft {
        ContactDraft {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            company: "Example Co".to_string(),
            phone: "555-0100".to_string(),
            status: ContactStatus::New,
            assigned_rep: "Mike Wilson".to_string(),
            tags: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_keys_are_assigned_in_creation_order() {
        let store: InMemoryStore<Contact> = InMemoryStore::new();

        let a = store.create(draft("Ann")).await.unwrap();
        let b = store.create(draft("Ben")).await.unwrap();
        let c = store.create(draft("Cat")).await.unwrap();

        assert_eq!((a.id, b.id, c.id), (1, 2, 3));
    }

    #[tokio::test]
    async fn test_key_is_one_past_the_maximum() {
        let store: InMemoryStore<SalesRep> = InMemoryStore::new();
        store.create(SalesRepDraft::new("A")).await.unwrap();
        store.create(SalesRepDraft::new("B")).await.unwrap();
        store.create(SalesRepDraft::new("C")).await.unwrap();

        store.delete(2).await.unwrap();
        let next = store.create(SalesRepDraft::new("D")).await.unwrap();
        assert_eq!(next.id, 4);

        store.delete(4).await.unwrap();
        let reused = store.create(SalesRepDraft::new("E")).await.unwrap();
        assert_eq!(reused.id, 4);
    }

    #[tokio::test]
    async fn test_created_entity_is_retrievable() {
        let store: InMemoryStore<Contact> = InMemoryStore::new();
        let created = store.create(draft("Dana")).await.unwrap();

        let fetched = store.get_by_id(created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_update_changes_only_the_patched_field() {
        let store: InMemoryStore<Contact> = InMemoryStore::new();
        let original = store.create(draft("Eve")).await.unwrap();

        let updated = store
            .update(original.id, ContactPatch::status(ContactStatus::Qualified))
            .await
            .unwrap();

        let mut expected = original.clone();
        expected.status = ContactStatus::Qualified;
        assert_eq!(updated, expected);
        assert_eq!(store.get_by_id(original.id).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_update_missing_entity_fails() {
        let store: InMemoryStore<Contact> = InMemoryStore::new();
        let err = store
            .update(42, ContactPatch::status(ContactStatus::Closed))
            .await
            .unwrap_err();

        assert_eq!(err, CrmError::not_found(EntityKind::Contact, 42));
    }

    #[tokio::test]
    async fn test_delete_then_lookup_fails() {
        let store: InMemoryStore<Contact> = InMemoryStore::new();
        let created = store.create(draft("Finn")).await.unwrap();

        assert!(store.delete(created.id).await.unwrap());
        assert!(store.get_by_id(created.id).await.unwrap_err().is_not_found());
        assert!(store.delete(created.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_collection_length_tracks_create_and_delete() {
        let store: InMemoryStore<Contact> = InMemoryStore::new();
        store.create(draft("Gus")).await.unwrap();
        store.create(draft("Hal")).await.unwrap();
        assert_eq!(store.get_all().await.len(), 2);

        let created = store.create(draft("Ivy")).await.unwrap();
        assert_eq!(store.get_all().await.len(), 3);

        store.delete(created.id).await.unwrap();
        assert_eq!(store.get_all().await.len(), 2);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_callers_receive_copies() {
        let store: InMemoryStore<Contact> = InMemoryStore::new();
        store.create(draft("Jo")).await.unwrap();

        let mut copy = store.get_all().await;
        copy[0].name = "Changed".to_string();
        copy.clear();

        let fresh = store.get_all().await;
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].name, "Jo");
    }

    #[tokio::test]
    async fn test_get_all_keeps_insertion_order() {
        let store: InMemoryStore<Contact> = InMemoryStore::new();
        for name in ["Zed", "Amy", "Max"] {
            store.create(draft(name)).await.unwrap();
        }

        let names: Vec<String> = store.get_all().await.into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Zed", "Amy", "Max"]);
    }

    #[test]
    fn test_latency_profiles() {
        let deals = LatencyProfile::for_kind(EntityKind::Deal);
        assert_eq!(deals.get_all, Duration::from_millis(350));
        assert_eq!(deals.create, Duration::from_millis(400));

        let halved = LatencyProfile::for_kind(EntityKind::SalesRep).scaled(0.5);
        assert_eq!(halved.get_all, Duration::from_millis(125));

        assert_eq!(deals.scaled(-1.0), LatencyProfile::instant());
        assert_eq!(deals.scaled(f64::NAN), LatencyProfile::instant());
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_latency_delays_each_call() {
        let store = SimulatedLatency::new(
            InMemoryStore::<Contact>::new(),
            LatencyProfile::for_kind(EntityKind::Contact),
        );

        let start = Instant::now();
        let created = store.create(draft("Kim")).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(400));

        let start = Instant::now();
        store
            .update(created.id, ContactPatch::status(ContactStatus::Contacted))
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_calls_complete_out_of_issue_order() {
        let store: SharedRepository<Deal> = simulated_store(Vec::new(), 1.0);
        let finished = Mutex::new(Vec::new());

        // get_all (350ms) is issued before get_by_id (200ms)
        let slow = async {
            store.get_all().await;
            finished.lock().unwrap().push("get_all");
        };
        let fast = async {
            let _ = store.get_by_id(1).await;
            finished.lock().unwrap().push("get_by_id");
        };
        tokio::join!(slow, fast);

        assert_eq!(*finished.lock().unwrap(), vec!["get_by_id", "get_all"]);
    }

    #[tokio::test]
    async fn test_zero_scale_is_instant() {
        let store: SharedRepository<Contact> = simulated_store(Vec::new(), 0.0);
        let created = store.create(draft("Lou")).await.unwrap();
        assert_eq!(created.id, 1);
    }
}
