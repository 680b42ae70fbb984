// =============================================================================
// CLAIM LEDGER — registry.rs
// =============================================================================
//
// The orchestrator. Every mutating operation runs the same pipeline:
//
//   1. AccessControl  — caller must hold the role / own the policy
//   2. EntityStore    — stage: uniqueness, existence, state checks
//   3. HashChain      — seal the next block, write it to the journal, append
//   4. EntityStore    — commit the staged entity
//   5. EventBus       — publish the notification
//
// A failure in 1-3 leaves entities, counters, chain and subscribers untouched.
// Replaying a journal feeds each stored block back through the same checks
// (steps 1-2) and compares the result to the recorded payload.
// =============================================================================

use crate::access::AccessControl;
use crate::chain::{Block, BlockType, ChainVerification, HashChain};
use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::events::{EventBus, EventEnvelope, LedgerEvent};
use crate::journal::{FileJournal, Journal, MemoryJournal};
use crate::model::{
    unix_now, Claim, ClaimId, ClaimStatus, Identity, NewClaim, NewIdentity, NewPolicy,
    NewTrainingRound, Policy, PolicyId, Principal, Role, RoundNumber, TotalCounts, TrainingRound,
    User,
};
use crate::store::{ClaimTransition, EntityStore};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

const ADMIN_DISPLAY_NAME: &str = "Administrator";

// -----------------------------------------------------------------------------
// Mutation — one staged, not yet committed state change
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Mutation {
    User(User),
    Identity(Identity),
    Policy(Policy),
    Claim(Claim),
    Transition(ClaimTransition),
    TrainingRound(TrainingRound),
}

impl Mutation {
    fn block_type(&self) -> BlockType {
        match self {
            Mutation::User(_) => BlockType::UserRegistered,
            Mutation::Identity(_) => BlockType::IdentityCreated,
            Mutation::Policy(_) => BlockType::PolicyCreated,
            Mutation::Claim(_) => BlockType::ClaimSubmitted,
            Mutation::Transition(t) if t.status == ClaimStatus::Approved => BlockType::ClaimApproved,
            Mutation::Transition(_) => BlockType::ClaimRejected,
            Mutation::TrainingRound(_) => BlockType::FlTrainingRound,
        }
    }

    fn payload(&self) -> LedgerResult<Value> {
        Ok(match self {
            Mutation::User(u) => serde_json::to_value(u)?,
            Mutation::Identity(i) => serde_json::to_value(i)?,
            Mutation::Policy(p) => serde_json::to_value(p)?,
            Mutation::Claim(c) => serde_json::to_value(c)?,
            Mutation::Transition(t) => serde_json::to_value(t)?,
            Mutation::TrainingRound(r) => serde_json::to_value(r)?,
        })
    }

    fn from_block(block: &Block) -> LedgerResult<Self> {
        fn decode<T: DeserializeOwned>(block: &Block) -> LedgerResult<T> {
            serde_json::from_value(block.payload.clone()).map_err(|e| LedgerError::ChainCorrupted {
                index: block.index,
                reason: format!("{} payload: {}", block.block_type, e),
            })
        }
        let mutation = match block.block_type {
            BlockType::UserRegistered => Mutation::User(decode(block)?),
            BlockType::IdentityCreated => Mutation::Identity(decode(block)?),
            BlockType::PolicyCreated => Mutation::Policy(decode(block)?),
            BlockType::ClaimSubmitted => Mutation::Claim(decode(block)?),
            BlockType::ClaimApproved | BlockType::ClaimRejected => Mutation::Transition(decode(block)?),
            BlockType::FlTrainingRound => Mutation::TrainingRound(decode(block)?),
            BlockType::Genesis => {
                return Err(LedgerError::ChainCorrupted {
                    index: block.index,
                    reason: "GENESIS block after index 0".into(),
                })
            }
        };
        if mutation.block_type() != block.block_type {
            return Err(LedgerError::ChainCorrupted {
                index: block.index,
                reason: format!("{} payload carries a different transition", block.block_type),
            });
        }
        Ok(mutation)
    }

    fn event(&self) -> LedgerEvent {
        match self {
            Mutation::User(u) => LedgerEvent::UserRegistered {
                owner: u.owner.clone(),
                username: u.username.clone(),
                role: u.role,
            },
            Mutation::Identity(i) => LedgerEvent::IdentityCreated { did: i.did.clone(), owner: i.owner.clone() },
            Mutation::Policy(p) => LedgerEvent::PolicyCreated {
                policy_id: p.id,
                policy_number: p.policy_number.clone(),
                did: p.did.clone(),
                created_by: p.created_by.clone(),
            },
            Mutation::Claim(c) => LedgerEvent::ClaimSubmitted {
                claim_id: c.id,
                claim_number: c.claim_number.clone(),
                policy_id: c.policy_id,
                amount: c.amount,
                submitted_by: c.submitted_by.clone(),
            },
            Mutation::Transition(t) if t.status == ClaimStatus::Approved => LedgerEvent::ClaimApproved {
                claim_id: t.claim_id,
                processed_by: t.processed_by.clone(),
            },
            Mutation::Transition(t) => LedgerEvent::ClaimRejected {
                claim_id: t.claim_id,
                processed_by: t.processed_by.clone(),
            },
            Mutation::TrainingRound(r) => LedgerEvent::TrainingRoundRecorded {
                round_number: r.round_number,
                global_accuracy: r.global_accuracy,
                nodes_participated: r.nodes_participated,
            },
        }
    }

    fn summary(&self) -> String {
        match self {
            Mutation::User(u) => format!("user={} role={}", u.username, u.role),
            Mutation::Identity(i) => format!("did={}", i.did),
            Mutation::Policy(p) => format!("policy={} number={}", p.id, p.policy_number),
            Mutation::Claim(c) => format!("claim={} number={} amount={}", c.id, c.claim_number, c.amount),
            Mutation::Transition(t) => format!("claim={} -> {}", t.claim_id, t.status),
            Mutation::TrainingRound(r) => format!("round={} accuracy={}%", r.round_number, r.global_accuracy),
        }
    }
}

fn rejected(operation: &str, caller: &Principal, e: LedgerError) -> LedgerError {
    log::warn!("⛔ {} by {} rejected: {}", operation, caller, e);
    e
}

// -----------------------------------------------------------------------------
// Registry
// -----------------------------------------------------------------------------

pub struct Registry {
    store: EntityStore,
    chain: HashChain,
    journal: Box<dyn Journal>,
    events: EventBus,
}

impl Registry {
    /// In-memory registry; config admins are seeded in the genesis block.
    pub fn new(config: &LedgerConfig) -> Self {
        let mut store = EntityStore::new();
        let chain = Self::genesis(&mut store, &config.admins);
        Registry {
            store,
            chain,
            journal: Box::new(MemoryJournal),
            events: EventBus::new(config.event_capacity),
        }
    }

    /// Registry backed by the configured journal file, or in memory when
    /// none is configured.
    pub fn open(config: &LedgerConfig) -> LedgerResult<Self> {
        match &config.journal_path {
            Some(path) => Self::with_journal(config, Box::new(FileJournal::open(path)?)),
            None => Ok(Self::new(config)),
        }
    }

    /// Replay an existing journal or start a new chain in it.
    pub fn with_journal(config: &LedgerConfig, mut journal: Box<dyn Journal>) -> LedgerResult<Self> {
        let blocks = journal.load()?;
        let events = EventBus::new(config.event_capacity);

        if blocks.is_empty() {
            let mut store = EntityStore::new();
            let chain = Self::genesis(&mut store, &config.admins);
            journal.append(chain.genesis())?;
            log::info!("🧱 Genesis block written to {}", journal.describe());
            return Ok(Registry { store, chain, journal, events });
        }

        let count = blocks.len();
        let chain = HashChain::from_blocks(blocks)?;
        let mut store = EntityStore::new();
        Self::replay_genesis(&mut store, chain.genesis())?;
        let mut registry = Registry { store, chain: HashChain::new(Value::Null), journal, events };
        for block in chain.blocks().iter().skip(1) {
            registry.replay(block)?;
        }
        registry.chain = chain;
        if !config.admins.is_empty() {
            log::info!("ℹ️ Admins come from the existing genesis block; LEDGER_ADMINS ignored");
        }
        log::info!("📜 Replayed {} blocks from {}", count, registry.journal.describe());
        Ok(registry)
    }

    fn admin_user(admin: &Principal, at: i64) -> User {
        User {
            owner: admin.clone(),
            username: admin.as_str().to_string(),
            role: Role::Admin,
            name: ADMIN_DISPLAY_NAME.to_string(),
            registered_at: at,
        }
    }

    fn genesis(store: &mut EntityStore, admins: &[Principal]) -> HashChain {
        let at = unix_now();
        let mut seeded = Vec::new();
        for admin in admins {
            let user = Self::admin_user(admin, at);
            match store.stage_any_user(&user.owner, &user.username, user.role, &user.name, at) {
                Ok(staged) => {
                    store.commit_user(staged.clone());
                    seeded.push(staged);
                }
                Err(e) => log::warn!("Admin {} not seeded: {}", admin, e),
            }
        }
        let chain = if seeded.is_empty() {
            HashChain::new(Value::Null)
        } else {
            HashChain::new(json!({ "admins": seeded }))
        };
        log::info!("🧱 Genesis block {} ({} admin(s))", &chain.genesis().hash[..16], seeded.len());
        chain
    }

    fn replay_genesis(store: &mut EntityStore, genesis: &Block) -> LedgerResult<()> {
        let Some(admins) = genesis.payload.get("admins") else {
            return Ok(());
        };
        let admins: Vec<User> = serde_json::from_value(admins.clone()).map_err(|e| LedgerError::ChainCorrupted {
            index: 0,
            reason: format!("genesis admins: {}", e),
        })?;
        for admin in admins {
            let staged = store
                .stage_any_user(&admin.owner, &admin.username, admin.role, &admin.name, admin.registered_at)
                .map_err(|e| LedgerError::ChainCorrupted { index: 0, reason: e.to_string() })?;
            if staged != admin || admin.role != Role::Admin {
                return Err(LedgerError::ChainCorrupted { index: 0, reason: "malformed admin record".into() });
            }
            store.commit_user(admin);
        }
        Ok(())
    }

    fn replay(&mut self, block: &Block) -> LedgerResult<()> {
        let recorded = Mutation::from_block(block)?;
        let corrupt = |reason: String| LedgerError::ChainCorrupted { index: block.index, reason };
        let restaged = match &recorded {
            Mutation::User(u) => self.check_register_user(&u.owner, &u.username, u.role, &u.name, u.registered_at),
            Mutation::Identity(i) => {
                let input = NewIdentity {
                    did: i.did.clone(),
                    name: i.name.clone(),
                    email: i.email.clone(),
                    id_number: i.id_number.clone(),
                    date_of_birth: i.date_of_birth.clone(),
                };
                self.check_create_identity(&i.owner, &input, i.created_at)
            }
            Mutation::Policy(p) => {
                let input = NewPolicy {
                    policy_number: p.policy_number.clone(),
                    did: p.did.clone(),
                    patient_name: p.patient_name.clone(),
                    policy_type: p.policy_type.clone(),
                    coverage_amount: p.coverage_amount,
                    premium: p.premium,
                    duration_months: p.duration_months,
                    insurance_company: p.insurance_company.clone(),
                };
                self.check_create_policy(&p.created_by, &input, p.created_at)
            }
            Mutation::Claim(c) => {
                let input = NewClaim {
                    claim_number: c.claim_number.clone(),
                    policy_id: c.policy_id,
                    policy_number: c.policy_number.clone(),
                    did: c.did.clone(),
                    patient_name: c.patient_name.clone(),
                    claim_type: c.claim_type.clone(),
                    amount: c.amount,
                    description: c.description.clone(),
                    hospital_name: c.hospital_name.clone(),
                    diagnosis: c.diagnosis.clone(),
                    assessment: c.assessment.clone(),
                };
                self.check_submit_claim(&c.submitted_by, &input, c.submitted_at)
            }
            Mutation::Transition(t) => self.check_process_claim(&t.processed_by, t.claim_id, t.status, t.processed_at),
            Mutation::TrainingRound(r) => {
                let input = NewTrainingRound {
                    global_accuracy: r.global_accuracy,
                    nodes_participated: r.nodes_participated,
                    total_samples: r.total_samples,
                };
                self.check_record_training_round(&r.triggered_by, &input, r.timestamp)
            }
        }
        .map_err(|e| corrupt(e.to_string()))?;
        if restaged != recorded {
            return Err(corrupt("payload does not match the replayed state".into()));
        }
        self.apply(recorded);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Commit pipeline
    // -------------------------------------------------------------------------

    fn apply(&mut self, mutation: Mutation) {
        match mutation {
            Mutation::User(u) => {
                self.store.commit_user(u);
            }
            Mutation::Identity(i) => {
                self.store.commit_identity(i);
            }
            Mutation::Policy(p) => {
                self.store.commit_policy(p);
            }
            Mutation::Claim(c) => {
                self.store.commit_claim(c);
            }
            Mutation::Transition(t) => self.store.apply_transition(&t),
            Mutation::TrainingRound(r) => {
                self.store.commit_training_round(r);
            }
        }
    }

    fn commit(&mut self, mutation: Mutation) -> LedgerResult<EventEnvelope> {
        let block = self.chain.prepare(mutation.block_type(), mutation.payload()?);
        self.journal.append(&block)?;
        let (index, hash) = (block.index, block.hash.clone());
        self.chain.push(block)?;

        let event = mutation.event();
        log::info!("✅ #{} {} {}", index, mutation.block_type(), mutation.summary());
        self.apply(mutation);
        Ok(self.events.publish(index, &hash, event))
    }

    // -------------------------------------------------------------------------
    // Checks (steps 1-2), shared by live operations and replay
    // -------------------------------------------------------------------------

    fn check_register_user(
        &self,
        caller: &Principal,
        username: &str,
        role: Role,
        name: &str,
        at: i64,
    ) -> LedgerResult<Mutation> {
        AccessControl::new(&self.store).require_unregistered(caller)?;
        Ok(Mutation::User(self.store.stage_user(caller, username, role, name, at)?))
    }

    fn check_create_identity(&self, caller: &Principal, input: &NewIdentity, at: i64) -> LedgerResult<Mutation> {
        AccessControl::new(&self.store).require_role(caller, Role::Patient)?;
        Ok(Mutation::Identity(self.store.stage_identity(caller, input, at)?))
    }

    fn check_create_policy(&self, caller: &Principal, input: &NewPolicy, at: i64) -> LedgerResult<Mutation> {
        AccessControl::new(&self.store).require_role(caller, Role::Insurance)?;
        Ok(Mutation::Policy(self.store.stage_policy(caller, input, at)?))
    }

    fn check_submit_claim(&self, caller: &Principal, input: &NewClaim, at: i64) -> LedgerResult<Mutation> {
        AccessControl::new(&self.store).require_role(caller, Role::Hospital)?;
        Ok(Mutation::Claim(self.store.stage_claim(caller, input, at)?))
    }

    fn check_process_claim(
        &self,
        caller: &Principal,
        claim_id: ClaimId,
        status: ClaimStatus,
        at: i64,
    ) -> LedgerResult<Mutation> {
        let access = AccessControl::new(&self.store);
        access.require_role(caller, Role::Insurance)?;
        let claim = self.store.get_claim(claim_id)?;
        let policy = self.store.get_policy(claim.policy_id)?;
        access.require_policy_owner(caller, policy)?;
        Ok(Mutation::Transition(self.store.stage_transition(claim_id, status, caller, at)?))
    }

    fn check_record_training_round(
        &self,
        caller: &Principal,
        input: &NewTrainingRound,
        at: i64,
    ) -> LedgerResult<Mutation> {
        AccessControl::new(&self.store).require_role(caller, Role::Insurance)?;
        Ok(Mutation::TrainingRound(self.store.stage_training_round(caller, input, at)?))
    }

    // -------------------------------------------------------------------------
    // Mutating operations
    // -------------------------------------------------------------------------

    pub fn register_user(&mut self, caller: &Principal, username: &str, role: Role, name: &str) -> LedgerResult<Principal> {
        self.check_register_user(caller, username, role, name, unix_now())
            .and_then(|m| self.commit(m))
            .map(|_| caller.clone())
            .map_err(|e| rejected("registerUser", caller, e))
    }

    pub fn create_identity(&mut self, caller: &Principal, input: NewIdentity) -> LedgerResult<String> {
        self.check_create_identity(caller, &input, unix_now())
            .and_then(|m| self.commit(m))
            .map(|_| input.did)
            .map_err(|e| rejected("createIdentity", caller, e))
    }

    pub fn create_policy(&mut self, caller: &Principal, input: NewPolicy) -> LedgerResult<PolicyId> {
        let result = self.check_create_policy(caller, &input, unix_now()).and_then(|m| {
            let id = match &m {
                Mutation::Policy(p) => p.id,
                _ => 0,
            };
            self.commit(m).map(|_| id)
        });
        result.map_err(|e| rejected("createPolicy", caller, e))
    }

    pub fn submit_claim(&mut self, caller: &Principal, input: NewClaim) -> LedgerResult<ClaimId> {
        let result = self.check_submit_claim(caller, &input, unix_now()).and_then(|m| {
            let id = match &m {
                Mutation::Claim(c) => c.id,
                _ => 0,
            };
            self.commit(m).map(|_| id)
        });
        result.map_err(|e| rejected("submitClaim", caller, e))
    }

    pub fn approve_claim(&mut self, caller: &Principal, claim_id: ClaimId) -> LedgerResult<()> {
        self.check_process_claim(caller, claim_id, ClaimStatus::Approved, unix_now())
            .and_then(|m| self.commit(m))
            .map(|_| ())
            .map_err(|e| rejected("approveClaim", caller, e))
    }

    pub fn reject_claim(&mut self, caller: &Principal, claim_id: ClaimId) -> LedgerResult<()> {
        self.check_process_claim(caller, claim_id, ClaimStatus::Rejected, unix_now())
            .and_then(|m| self.commit(m))
            .map(|_| ())
            .map_err(|e| rejected("rejectClaim", caller, e))
    }

    pub fn record_training_round(&mut self, caller: &Principal, input: NewTrainingRound) -> LedgerResult<RoundNumber> {
        let result = self.check_record_training_round(caller, &input, unix_now()).and_then(|m| {
            let number = match &m {
                Mutation::TrainingRound(r) => r.round_number,
                _ => 0,
            };
            self.commit(m).map(|_| number)
        });
        result.map_err(|e| rejected("recordTrainingRound", caller, e))
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<EventEnvelope> {
        self.events.subscribe()
    }

    pub fn get_user(&self, owner: &Principal) -> LedgerResult<&User> {
        self.store.get_user(owner)
    }

    pub fn get_user_by_username(&self, username: &str) -> LedgerResult<&User> {
        self.store.get_user_by_username(username)
    }

    pub fn get_all_users(&self) -> Vec<&User> {
        self.store.all_users()
    }

    pub fn get_identity(&self, did: &str) -> LedgerResult<&Identity> {
        self.store.get_identity(did)
    }

    pub fn get_my_identity(&self, caller: &Principal) -> LedgerResult<&Identity> {
        self.store.identity_of(caller)
    }

    pub fn get_all_identities(&self) -> Vec<&Identity> {
        self.store.all_identities()
    }

    pub fn is_identity_verified(&self, did: &str) -> LedgerResult<bool> {
        self.store.is_identity_verified(did)
    }

    pub fn get_policy(&self, id: PolicyId) -> LedgerResult<&Policy> {
        self.store.get_policy(id)
    }

    pub fn get_policy_by_number(&self, number: &str) -> LedgerResult<&Policy> {
        self.store.get_policy_by_number(number)
    }

    pub fn get_claim(&self, id: ClaimId) -> LedgerResult<&Claim> {
        self.store.get_claim(id)
    }

    pub fn get_training_round(&self, round_number: RoundNumber) -> LedgerResult<&TrainingRound> {
        self.store.get_training_round(round_number)
    }

    pub fn get_total_counts(&self) -> TotalCounts {
        self.store.counts()
    }

    // -------------------------------------------------------------------------
    // Chain introspection
    // -------------------------------------------------------------------------

    pub fn chain(&self) -> &HashChain {
        &self.chain
    }

    pub fn get_chain(&self) -> &[Block] {
        self.chain.blocks()
    }

    pub fn verify_chain(&self) -> bool {
        self.verify_chain_report().valid
    }

    pub fn verify_chain_report(&self) -> ChainVerification {
        let report = self.chain.verify();
        if let Some(index) = report.first_invalid {
            log::error!("🚨 Chain verification failed at block #{}: {}", index, report.reason.as_deref().unwrap_or("?"));
        }
        report
    }

    #[cfg(test)]
    pub(crate) fn chain_mut(&mut self) -> &mut HashChain {
        &mut self.chain
    }
}

// =============================================================================
// TESTS
// =============================================================================
