// 👥 Contact Editing - inline status/tag edits and deletes, both pessimistic

use crate::coordinator::{MutationFailure, NoticeText, OptimisticCoordinator};
use crate::entities::{Contact, ContactPatch, ContactStatus, EntityId, Tags};

pub fn edit_text() -> NoticeText {
    NoticeText::new("Contact updated successfully!", "Failed to update contact")
}

pub fn delete_text() -> NoticeText {
    NoticeText::new("Contact deleted successfully!", "Failed to delete contact")
}

/// Status and tags of one contact while its row is being edited. Nothing
/// reaches the store until the edit is saved.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactEdit {
    pub id: EntityId,
    pub name: String,
    pub status: ContactStatus,
    pub tags: Tags,
    /// Tag text typed but not added yet
    pub input: String,
}

impl ContactEdit {
    pub fn start(contact: &Contact) -> Self {
        ContactEdit {
            id: contact.id,
            name: contact.name.clone(),
            status: contact.status,
            tags: contact.tags.clone(),
            input: String::new(),
        }
    }

    pub fn cycle_status(&mut self, forward: bool) {
        let all = ContactStatus::ALL;
        let i = all.iter().position(|s| *s == self.status).unwrap_or(0);
        let next = if forward {
            (i + 1) % all.len()
        } else {
            (i + all.len() - 1) % all.len()
        };
        self.status = all[next];
    }

    pub fn type_char(&mut self, c: char) {
        self.input.push(c);
    }

    /// Deletes a typed character, or the last tag once the input is empty
    pub fn backspace(&mut self) {
        if self.input.pop().is_none() {
            self.tags.pop();
        }
    }

    /// Adds the typed text as a tag. False when blank or already present.
    pub fn add_input(&mut self) -> bool {
        let added = self.tags.insert(self.input.as_str());
        if added {
            self.input.clear();
        }
        added
    }

    /// Suggested labels for the current input
    pub fn suggestions(&self) -> Vec<&'static str> {
        self.tags.suggestions(&self.input)
    }

    /// Adds the first suggestion for the current input
    pub fn accept_suggestion(&mut self) -> Option<&'static str> {
        let first = self.suggestions().into_iter().next()?;
        self.tags.insert(first);
        self.input.clear();
        Some(first)
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        self.tags.remove(tag)
    }

    pub fn patch(&self) -> ContactPatch {
        ContactPatch {
            status: Some(self.status),
            tags: Some(self.tags.clone()),
            ..Default::default()
        }
    }
}

impl OptimisticCoordinator<Contact> {
    /// Save an inline edit; the row changes only once the store confirms
    pub async fn edit(&self, id: EntityId, patch: ContactPatch) -> Result<Contact, MutationFailure> {
        self.commit(id, patch, &edit_text()).await
    }

    pub async fn save(&self, edit: &ContactEdit) -> Result<Contact, MutationFailure> {
        self.edit(edit.id, edit.patch()).await
    }

    pub async fn delete_contact(&self, id: EntityId) -> Result<(), MutationFailure> {
        self.remove(id, &delete_text()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::{Notice, RecordingNotifier};
    use crate::entities::{ContactDraft, Entity, EntityKind};
    use crate::error::{CrmError, CrmResult};
    use crate::store::{EntityRepository, InMemoryStore, SharedRepository};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Arc;

    fn contact(id: EntityId, tags: &[&str]) -> Contact {
        let mut draft = ContactDraft::new(format!("Contact {}", id));
        draft.status = ContactStatus::New;
        draft.tags = tags.iter().copied().collect();
        Contact::from_draft(id, draft, Utc::now())
    }

    async fn coordinator(
        items: Vec<Contact>,
    ) -> (InMemoryStore<Contact>, OptimisticCoordinator<Contact>, Arc<RecordingNotifier>) {
        let store = InMemoryStore::with_items(items);
        let shared: SharedRepository<Contact> = Arc::new(store.clone());
        let notifier = Arc::new(RecordingNotifier::new());
        let coordinator = OptimisticCoordinator::load(shared, notifier.clone()).await;
        (store, coordinator, notifier)
    }

    /// Reads work, updates are refused
    struct ReadOnlyStore(InMemoryStore<Contact>);

    #[async_trait]
    impl EntityRepository<Contact> for ReadOnlyStore {
        async fn get_all(&self) -> Vec<Contact> {
            self.0.get_all().await
        }

        async fn get_by_id(&self, id: EntityId) -> CrmResult<Contact> {
            self.0.get_by_id(id).await
        }

        async fn create(&self, draft: ContactDraft) -> CrmResult<Contact> {
            self.0.create(draft).await
        }

        async fn update(&self, id: EntityId, _patch: ContactPatch) -> CrmResult<Contact> {
            Err(CrmError::not_found(EntityKind::Contact, id))
        }

        async fn delete(&self, id: EntityId) -> CrmResult<bool> {
            self.0.delete(id).await
        }
    }

    #[test]
    fn test_status_cycles_both_ways() {
        let mut edit = ContactEdit::start(&contact(1, &[]));
        edit.cycle_status(true);
        assert_eq!(edit.status, ContactStatus::Contacted);
        edit.cycle_status(false);
        edit.cycle_status(false);
        assert_eq!(edit.status, ContactStatus::Closed);
    }

    #[test]
    fn test_tag_input() {
        let mut edit = ContactEdit::start(&contact(1, &["VIP"]));

        for c in " Partner ".chars() {
            edit.type_char(c);
        }
        assert!(edit.add_input());
        assert_eq!(edit.input, "");
        assert_eq!(edit.tags.iter().collect::<Vec<_>>(), vec!["VIP", "Partner"]);

        edit.input = "VIP".to_string();
        assert!(!edit.add_input());
        assert_eq!(edit.input, "VIP");

        edit.backspace();
        assert_eq!(edit.input, "VI");
        assert_eq!(edit.tags.len(), 2);
    }

    #[test]
    fn test_backspace_on_empty_input_drops_last_tag() {
        let mut edit = ContactEdit::start(&contact(1, &["VIP", "SMB"]));
        edit.backspace();
        assert_eq!(edit.tags.iter().collect::<Vec<_>>(), vec!["VIP"]);
    }

    #[test]
    fn test_accept_suggestion_skips_existing_tags() {
        let mut edit = ContactEdit::start(&contact(1, &["Hot Lead"]));
        edit.input = "lead".to_string();

        assert_eq!(edit.suggestions(), vec!["Cold Lead", "Warm Lead"]);
        assert_eq!(edit.accept_suggestion(), Some("Cold Lead"));
        assert!(edit.tags.contains("Cold Lead"));
        assert!(edit.input.is_empty());

        edit.input = "zzz".to_string();
        assert_eq!(edit.accept_suggestion(), None);
    }

    #[test]
    fn test_remove_tag() {
        let mut edit = ContactEdit::start(&contact(1, &["VIP", "SMB"]));
        assert!(edit.remove_tag("VIP"));
        assert!(!edit.remove_tag("VIP"));
        assert_eq!(edit.tags.iter().collect::<Vec<_>>(), vec!["SMB"]);
    }

    #[tokio::test]
    async fn test_save_replaces_row_with_store_copy() {
        let (store, coordinator, notifier) = coordinator(vec![contact(1, &["VIP"]), contact(2, &[])]).await;

        let mut edit = ContactEdit::start(&coordinator.get(1).unwrap());
        edit.cycle_status(true);
        edit.input = "Referral".to_string();
        edit.add_input();

        let saved = coordinator.save(&edit).await.unwrap();

        assert_eq!(saved.status, ContactStatus::Contacted);
        assert_eq!(saved.tags.iter().collect::<Vec<_>>(), vec!["VIP", "Referral"]);
        assert_eq!(coordinator.get(1).unwrap(), store.get_by_id(1).await.unwrap());
        assert_eq!(coordinator.get(2).unwrap().status, ContactStatus::New);
        assert_eq!(notifier.last(), Some(Notice::success("Contact updated successfully!")));
    }

    #[tokio::test]
    async fn test_rejected_edit_leaves_row_untouched() {
        let inner = InMemoryStore::with_items(vec![contact(1, &["VIP"])]);
        let store: SharedRepository<Contact> = Arc::new(ReadOnlyStore(inner));
        let notifier = Arc::new(RecordingNotifier::new());
        let coordinator = OptimisticCoordinator::load(store, notifier.clone()).await;
        let before = coordinator.snapshot();

        let failure = coordinator
            .edit(1, ContactPatch::status(ContactStatus::Closed))
            .await
            .unwrap_err();

        assert_eq!(failure.notice, "Failed to update contact");
        assert_eq!(coordinator.snapshot(), before);
        assert_eq!(notifier.last(), Some(Notice::failure("Failed to update contact")));
    }

    #[tokio::test]
    async fn test_delete_contact_notices() {
        let (_store, coordinator, notifier) = coordinator(vec![contact(1, &[])]).await;

        coordinator.delete_contact(1).await.unwrap();
        assert_eq!(notifier.last(), Some(Notice::success("Contact deleted successfully!")));

        assert!(coordinator.delete_contact(1).await.is_err());
        assert_eq!(notifier.last(), Some(Notice::failure("Failed to delete contact")));
    }
}
