// =============================================================================
// CLAIM LEDGER — service.rs
// =============================================================================
//
// Shared handle over one Registry for concurrent callers (HTTP handlers,
// background tasks). Mutations take the write lock for their whole
// check → journal → commit sequence, so writes are totally ordered and a
// reader never observes a block without its entity change, or the reverse.
// =============================================================================

use crate::config::LedgerConfig;
use crate::error::LedgerResult;
use crate::events::EventEnvelope;
use crate::registry::Registry;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, RwLock};

#[derive(Clone)]
pub struct LedgerService {
    pub node_id: String,
    registry: Arc<RwLock<Registry>>,
    started: Instant,
}

impl LedgerService {
    pub fn new(node_id: &str, registry: Registry) -> Self {
        LedgerService {
            node_id: node_id.to_string(),
            registry: Arc::new(RwLock::new(registry)),
            started: Instant::now(),
        }
    }

    /// Open the registry described by `config` (replaying its journal).
    pub fn open(config: &LedgerConfig) -> LedgerResult<Self> {
        Ok(Self::new(&config.node_id, Registry::open(config)?))
    }

    pub fn in_memory() -> Self {
        let config = LedgerConfig::in_memory();
        Self::new(&config.node_id, Registry::new(&config))
    }

    /// Run a read-only closure under the shared lock.
    pub async fn read<T>(&self, f: impl FnOnce(&Registry) -> T) -> T {
        let guard = self.registry.read().await;
        f(&guard)
    }

    /// Run a mutation under the exclusive lock.
    pub async fn write<T>(&self, f: impl FnOnce(&mut Registry) -> T) -> T {
        let mut guard = self.registry.write().await;
        f(&mut guard)
    }

    pub async fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.registry.read().await.subscribe()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Principal, Role};
    use crate::registry::tests::{claim_input, identity_input, policy_input};

    fn p(s: &str) -> Principal {
        Principal::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_concurrent_claims_get_distinct_ids() {
        let service = LedgerService::in_memory();
        service
            .write(|r| {
                r.register_user(&p("alice"), "alice", Role::Patient, "Alice")?;
                r.create_identity(&p("alice"), identity_input("did:abc"))?;
                r.register_user(&p("acme"), "acme", Role::Insurance, "Acme")?;
                r.create_policy(&p("acme"), policy_input("POL-1", "did:abc"))?;
                r.register_user(&p("cityhosp"), "cityhosp", Role::Hospital, "City")
            })
            .await
            .unwrap();

        let mut handles = Vec::new();
        for n in 0..16 {
            let svc = service.clone();
            handles.push(tokio::spawn(async move {
                svc.write(|r| r.submit_claim(&p("cityhosp"), claim_input(&format!("CLM-{}", n), 1, "POL-1")))
                    .await
            }));
        }
        let mut ids = Vec::new();
        for h in handles {
            ids.push(h.await.unwrap().unwrap());
        }
        ids.sort();
        assert_eq!(ids, (1..=16).collect::<Vec<u64>>());

        let (len, valid) = service.read(|r| (r.get_chain().len(), r.verify_chain())).await;
        assert_eq!(len, 6 + 16);
        assert!(valid);
    }

    #[tokio::test]
    async fn test_duplicate_registration_race_has_one_winner() {
        let service = LedgerService::in_memory();
        let mut handles = Vec::new();
        for n in 0..8 {
            let svc = service.clone();
            handles.push(tokio::spawn(async move {
                svc.write(|r| r.register_user(&p(&format!("caller{}", n)), "same-name", Role::Patient, ""))
                    .await
            }));
        }
        let mut ok = 0;
        for h in handles {
            if h.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(service.read(|r| r.get_total_counts().users).await, 1);
    }

    #[tokio::test]
    async fn test_subscribe_through_service() {
        let service = LedgerService::in_memory();
        let mut rx = service.subscribe().await;
        service
            .write(|r| r.register_user(&p("acme"), "acme", Role::Insurance, "Acme"))
            .await
            .unwrap();
        assert_eq!(rx.recv().await.unwrap().block_index, 1);
    }
}
