// Error types for the store contract
//
// NotFound is the only failure a store can produce. Loader and binary
// plumbing use anyhow instead (see config.rs, fixtures.rs).

use crate::entities::{EntityId, EntityKind};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrmError {
    #[error("{kind} with ID {id} not found")]
    NotFound { kind: EntityKind, id: EntityId },
}

impl CrmError {
    pub fn not_found(kind: EntityKind, id: EntityId) -> Self {
        CrmError::NotFound { kind, id }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CrmError::NotFound { .. })
    }
}

pub type CrmResult<T> = std::result::Result<T, CrmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_messages_name_the_entity() {
        assert_eq!(
            CrmError::not_found(EntityKind::Deal, 7).to_string(),
            "Deal with ID 7 not found"
        );
        assert_eq!(
            CrmError::not_found(EntityKind::Contact, 3).to_string(),
            "Lead with ID 3 not found"
        );
        assert_eq!(
            CrmError::not_found(EntityKind::SalesRep, 2).to_string(),
            "Sales rep with ID 2 not found"
        );
    }
}
