// =============================================================================
// CLAIM LEDGER — events.rs
// =============================================================================
//
// Notifications emitted after a mutation has been committed, for external
// subscribers (UI, indexers). Each one names the block that recorded it.
// =============================================================================

use crate::model::{ClaimId, PolicyId, Principal, Role, RoundNumber};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum LedgerEvent {
    #[serde(rename_all = "camelCase")]
    UserRegistered { owner: Principal, username: String, role: Role },
    #[serde(rename_all = "camelCase")]
    IdentityCreated { did: String, owner: Principal },
    #[serde(rename_all = "camelCase")]
    PolicyCreated { policy_id: PolicyId, policy_number: String, did: String, created_by: Principal },
    #[serde(rename_all = "camelCase")]
    ClaimSubmitted { claim_id: ClaimId, claim_number: String, policy_id: PolicyId, amount: u64, submitted_by: Principal },
    #[serde(rename_all = "camelCase")]
    ClaimApproved { claim_id: ClaimId, processed_by: Principal },
    #[serde(rename_all = "camelCase")]
    ClaimRejected { claim_id: ClaimId, processed_by: Principal },
    #[serde(rename_all = "camelCase")]
    TrainingRoundRecorded { round_number: RoundNumber, global_accuracy: u8, nodes_participated: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub id: Uuid,
    pub block_index: u64,
    pub block_hash: String,
    #[serde(flatten)]
    pub event: LedgerEvent,
}

/// Broadcast fan-out. Publishing with nobody listening is not an error.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        EventBus { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    pub fn publish(&self, block_index: u64, block_hash: &str, event: LedgerEvent) -> EventEnvelope {
        let envelope = EventEnvelope {
            id: Uuid::new_v4(),
            block_index,
            block_hash: block_hash.to_string(),
            event,
        };
        let delivered = self.sender.send(envelope.clone()).unwrap_or(0);
        log::debug!("📣 event for block #{} delivered to {} subscriber(s)", block_index, delivered);
        envelope
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
