// =============================================================================
// CLAIM LEDGER — error.rs
// =============================================================================
//
// Every failure a ledger operation can surface. Mutation errors are always
// raised before anything is committed, so receiving one means no entity was
// written, no block was appended and no event was published.
// =============================================================================

use serde::{Deserialize, Serialize};

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Coarse error classes used by callers and by the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Unauthorized,
    DuplicateKey,
    NotFound,
    InvalidState,
    InvalidArgument,
    Storage,
    Corrupted,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("Unauthorized: {reason}")]
    Unauthorized { reason: String },

    #[error("Duplicate {field}: {value}")]
    DuplicateKey { field: &'static str, value: String },

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Invalid state: {reason}")]
    InvalidState { reason: String },

    #[error("Invalid {field}: {reason}")]
    InvalidArgument { field: &'static str, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Chain corrupted at block {index}: {reason}")]
    ChainCorrupted { index: u64, reason: String },
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Unauthorized { .. } => ErrorKind::Unauthorized,
            LedgerError::DuplicateKey { .. } => ErrorKind::DuplicateKey,
            LedgerError::NotFound { .. } => ErrorKind::NotFound,
            LedgerError::InvalidState { .. } => ErrorKind::InvalidState,
            LedgerError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            LedgerError::Storage(_) => ErrorKind::Storage,
            LedgerError::ChainCorrupted { .. } => ErrorKind::Corrupted,
        }
    }

    pub fn unauthorized(reason: impl Into<String>) -> Self {
        LedgerError::Unauthorized { reason: reason.into() }
    }

    pub fn invalid_argument(field: &'static str, reason: impl Into<String>) -> Self {
        LedgerError::InvalidArgument { field, reason: reason.into() }
    }

    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        LedgerError::NotFound { entity, key: key.to_string() }
    }

    // -------------------------------------------------------------------------
    // Named store failures
    // -------------------------------------------------------------------------

    pub fn duplicate_owner(owner: impl ToString) -> Self {
        LedgerError::DuplicateKey { field: "owner", value: owner.to_string() }
    }

    pub fn duplicate_username(username: &str) -> Self {
        LedgerError::DuplicateKey { field: "username", value: username.to_string() }
    }

    pub fn duplicate_did(did: &str) -> Self {
        LedgerError::DuplicateKey { field: "did", value: did.to_string() }
    }

    pub fn owner_has_identity(owner: impl ToString) -> Self {
        LedgerError::DuplicateKey { field: "identity owner", value: owner.to_string() }
    }

    pub fn duplicate_policy_number(number: &str) -> Self {
        LedgerError::DuplicateKey { field: "policy number", value: number.to_string() }
    }

    pub fn duplicate_claim_number(number: &str) -> Self {
        LedgerError::DuplicateKey { field: "claim number", value: number.to_string() }
    }

    pub fn unknown_did(did: &str) -> Self {
        Self::not_found("identity", did)
    }

    pub fn unknown_policy(id: u64) -> Self {
        Self::not_found("policy", id)
    }

    pub fn claim_not_found(id: u64) -> Self {
        Self::not_found("claim", id)
    }

    pub fn claim_not_pending(id: u64, status: impl std::fmt::Display) -> Self {
        LedgerError::InvalidState {
            reason: format!("claim {} is {}, only PENDING claims can be processed", id, status),
        }
    }

    pub fn not_policy_owner(policy_id: u64) -> Self {
        Self::unauthorized(format!("caller did not create policy {}", policy_id))
    }

    pub fn invalid_role(role: &str) -> Self {
        Self::invalid_argument("role", format!("'{}' cannot be self-registered", role))
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(e: std::io::Error) -> Self {
        LedgerError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::Storage(format!("serialization: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_failures_map_to_kinds() {
        assert_eq!(LedgerError::duplicate_username("alice").kind(), ErrorKind::DuplicateKey);
        assert_eq!(LedgerError::unknown_did("did:x").kind(), ErrorKind::NotFound);
        assert_eq!(LedgerError::claim_not_pending(1, "APPROVED").kind(), ErrorKind::InvalidState);
        assert_eq!(LedgerError::not_policy_owner(3).kind(), ErrorKind::Unauthorized);
        assert_eq!(LedgerError::invalid_role("admin").kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_messages_name_the_offending_field() {
        let e = LedgerError::duplicate_policy_number("POL-1");
        assert_eq!(e.to_string(), "Duplicate policy number: POL-1");
        let e = LedgerError::unknown_policy(7);
        assert_eq!(e.to_string(), "policy not found: 7");
    }
}
