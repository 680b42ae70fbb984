// =============================================================================
// CLAIM LEDGER — store.rs
// =============================================================================
//
// Indexed storage for the five entity kinds. Every write is split in two:
//
//   stage_*   — validates uniqueness/existence against current state and
//               builds the entity (assigning the next sequence id) without
//               touching anything
//   commit_*  — inserts a staged entity and its index entries; cannot fail
//
// The registry journals the block between the two steps, so a rejected or
// unpersisted write never leaves partial state and never advances a counter.
// The one-shot helpers (register_user, create_policy, ...) do both at once.
// =============================================================================

use crate::constants::FIRST_SEQUENCE_ID;
use crate::error::{LedgerError, LedgerResult};
use crate::model::{
    Claim, ClaimId, ClaimStatus, Identity, NewClaim, NewIdentity, NewPolicy, NewTrainingRound,
    Policy, PolicyId, PolicyStatus, Principal, Role, RoundNumber, TotalCounts, TrainingRound, User,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A validated approve/reject waiting to be applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimTransition {
    pub claim_id: ClaimId,
    pub policy_id: PolicyId,
    pub status: ClaimStatus,
    pub processed_by: Principal,
    pub processed_at: i64,
}

#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    users: HashMap<Principal, User>,
    user_order: Vec<Principal>,
    usernames: HashMap<String, Principal>,

    identities: HashMap<String, Identity>,
    identity_order: Vec<String>,
    identity_by_owner: HashMap<Principal, String>,

    policies: BTreeMap<PolicyId, Policy>,
    policy_numbers: HashMap<String, PolicyId>,
    last_policy_id: PolicyId,

    claims: BTreeMap<ClaimId, Claim>,
    claim_numbers: HashMap<String, ClaimId>,
    last_claim_id: ClaimId,

    training_rounds: Vec<TrainingRound>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------------

    /// Users reaching the store through self-registration are checked
    /// against the self-registerable role set; seeded admins bypass it.
    pub fn stage_user(
        &self,
        owner: &Principal,
        username: &str,
        role: Role,
        name: &str,
        at: i64,
    ) -> LedgerResult<User> {
        if !role.is_self_registerable() {
            return Err(LedgerError::invalid_role(role.as_str()));
        }
        self.stage_any_user(owner, username, role, name, at)
    }

    pub(crate) fn stage_any_user(
        &self,
        owner: &Principal,
        username: &str,
        role: Role,
        name: &str,
        at: i64,
    ) -> LedgerResult<User> {
        if username.trim().is_empty() {
            return Err(LedgerError::invalid_argument("username", "must not be empty"));
        }
        if self.users.contains_key(owner) {
            return Err(LedgerError::duplicate_owner(owner));
        }
        if self.usernames.contains_key(username) {
            return Err(LedgerError::duplicate_username(username));
        }
        Ok(User {
            owner: owner.clone(),
            username: username.to_string(),
            role,
            name: name.to_string(),
            registered_at: at,
        })
    }

    pub fn commit_user(&mut self, user: User) -> Principal {
        let owner = user.owner.clone();
        self.usernames.insert(user.username.clone(), owner.clone());
        self.user_order.push(owner.clone());
        self.users.insert(owner.clone(), user);
        owner
    }

    pub fn register_user(
        &mut self,
        owner: &Principal,
        username: &str,
        role: Role,
        name: &str,
        at: i64,
    ) -> LedgerResult<Principal> {
        let user = self.stage_user(owner, username, role, name, at)?;
        Ok(self.commit_user(user))
    }

    pub fn get_user(&self, owner: &Principal) -> LedgerResult<&User> {
        self.users.get(owner).ok_or_else(|| LedgerError::not_found("user", owner))
    }

    pub fn get_user_by_username(&self, username: &str) -> LedgerResult<&User> {
        self.usernames
            .get(username)
            .and_then(|owner| self.users.get(owner))
            .ok_or_else(|| LedgerError::not_found("user", username))
    }

    pub fn role_of(&self, owner: &Principal) -> Option<Role> {
        self.users.get(owner).map(|u| u.role)
    }

    /// Registration order.
    pub fn all_users(&self) -> Vec<&User> {
        self.user_order.iter().filter_map(|o| self.users.get(o)).collect()
    }

    // -------------------------------------------------------------------------
    // Identities
    // -------------------------------------------------------------------------

    pub fn stage_identity(&self, owner: &Principal, input: &NewIdentity, at: i64) -> LedgerResult<Identity> {
        input.validate()?;
        if self.identities.contains_key(&input.did) {
            return Err(LedgerError::duplicate_did(&input.did));
        }
        if self.identity_by_owner.contains_key(owner) {
            return Err(LedgerError::owner_has_identity(owner));
        }
        Ok(Identity {
            did: input.did.clone(),
            name: input.name.clone(),
            email: input.email.clone(),
            id_number: input.id_number.clone(),
            date_of_birth: input.date_of_birth.clone(),
            owner: owner.clone(),
            is_verified: true,
            created_at: at,
        })
    }

    pub fn commit_identity(&mut self, identity: Identity) -> String {
        let did = identity.did.clone();
        self.identity_by_owner.insert(identity.owner.clone(), did.clone());
        self.identity_order.push(did.clone());
        self.identities.insert(did.clone(), identity);
        did
    }

    pub fn create_identity(&mut self, owner: &Principal, input: &NewIdentity, at: i64) -> LedgerResult<String> {
        let identity = self.stage_identity(owner, input, at)?;
        Ok(self.commit_identity(identity))
    }

    pub fn get_identity(&self, did: &str) -> LedgerResult<&Identity> {
        self.identities.get(did).ok_or_else(|| LedgerError::unknown_did(did))
    }

    pub fn identity_of(&self, owner: &Principal) -> LedgerResult<&Identity> {
        self.identity_by_owner
            .get(owner)
            .and_then(|did| self.identities.get(did))
            .ok_or_else(|| LedgerError::not_found("identity", owner))
    }

    pub fn is_identity_verified(&self, did: &str) -> LedgerResult<bool> {
        Ok(self.get_identity(did)?.is_verified)
    }

    pub fn all_identities(&self) -> Vec<&Identity> {
        self.identity_order.iter().filter_map(|d| self.identities.get(d)).collect()
    }

    // -------------------------------------------------------------------------
    // Policies
    // -------------------------------------------------------------------------

    pub fn stage_policy(&self, creator: &Principal, input: &NewPolicy, at: i64) -> LedgerResult<Policy> {
        input.validate()?;
        if !self.identities.contains_key(&input.did) {
            return Err(LedgerError::unknown_did(&input.did));
        }
        if self.policy_numbers.contains_key(&input.policy_number) {
            return Err(LedgerError::duplicate_policy_number(&input.policy_number));
        }
        Ok(Policy {
            id: self.next_policy_id(),
            policy_number: input.policy_number.clone(),
            did: input.did.clone(),
            patient_name: input.patient_name.clone(),
            policy_type: input.policy_type.clone(),
            coverage_amount: input.coverage_amount,
            premium: input.premium,
            duration_months: input.duration_months,
            created_by: creator.clone(),
            insurance_company: input.insurance_company.clone(),
            status: PolicyStatus::Active,
            created_at: at,
        })
    }

    pub fn commit_policy(&mut self, policy: Policy) -> PolicyId {
        let id = policy.id;
        self.last_policy_id = self.last_policy_id.max(id);
        self.policy_numbers.insert(policy.policy_number.clone(), id);
        self.policies.insert(id, policy);
        id
    }

    pub fn create_policy(&mut self, creator: &Principal, input: &NewPolicy, at: i64) -> LedgerResult<PolicyId> {
        let policy = self.stage_policy(creator, input, at)?;
        Ok(self.commit_policy(policy))
    }

    pub fn next_policy_id(&self) -> PolicyId {
        self.last_policy_id.max(FIRST_SEQUENCE_ID - 1) + 1
    }

    pub fn get_policy(&self, id: PolicyId) -> LedgerResult<&Policy> {
        self.policies.get(&id).ok_or_else(|| LedgerError::unknown_policy(id))
    }

    pub fn get_policy_by_number(&self, number: &str) -> LedgerResult<&Policy> {
        self.policy_numbers
            .get(number)
            .and_then(|id| self.policies.get(id))
            .ok_or_else(|| LedgerError::not_found("policy", number))
    }

    /// Id order, which is creation order.
    pub fn all_policies(&self) -> impl Iterator<Item = &Policy> {
        self.policies.values()
    }

    // -------------------------------------------------------------------------
    // Claims
    // -------------------------------------------------------------------------

    pub fn stage_claim(&self, submitter: &Principal, input: &NewClaim, at: i64) -> LedgerResult<Claim> {
        input.validate()?;
        let policy = self.get_policy(input.policy_id)?;
        if policy.policy_number != input.policy_number {
            return Err(LedgerError::invalid_argument(
                "policyNumber",
                format!("policy {} is {}, not {}", policy.id, policy.policy_number, input.policy_number),
            ));
        }
        if policy.did != input.did {
            return Err(LedgerError::invalid_argument(
                "did",
                format!("policy {} does not cover {}", policy.id, input.did),
            ));
        }
        if policy.status != PolicyStatus::Active {
            return Err(LedgerError::InvalidState {
                reason: format!("policy {} is {}", policy.id, policy.status),
            });
        }
        if self.claim_numbers.contains_key(&input.claim_number) {
            return Err(LedgerError::duplicate_claim_number(&input.claim_number));
        }
        Ok(Claim {
            id: self.next_claim_id(),
            claim_number: input.claim_number.clone(),
            policy_id: input.policy_id,
            policy_number: input.policy_number.clone(),
            did: input.did.clone(),
            patient_name: input.patient_name.clone(),
            claim_type: input.claim_type.clone(),
            amount: input.amount,
            description: input.description.clone(),
            hospital_name: input.hospital_name.clone(),
            diagnosis: input.diagnosis.clone(),
            submitted_by: submitter.clone(),
            submitted_at: at,
            status: ClaimStatus::Pending,
            assessment: input.assessment.clone(),
            processed_at: 0,
            processed_by: None,
        })
    }

    pub fn commit_claim(&mut self, claim: Claim) -> ClaimId {
        let id = claim.id;
        self.last_claim_id = self.last_claim_id.max(id);
        self.claim_numbers.insert(claim.claim_number.clone(), id);
        self.claims.insert(id, claim);
        id
    }

    pub fn submit_claim(&mut self, submitter: &Principal, input: &NewClaim, at: i64) -> LedgerResult<ClaimId> {
        let claim = self.stage_claim(submitter, input, at)?;
        Ok(self.commit_claim(claim))
    }

    pub fn next_claim_id(&self) -> ClaimId {
        self.last_claim_id.max(FIRST_SEQUENCE_ID - 1) + 1
    }

    pub fn get_claim(&self, id: ClaimId) -> LedgerResult<&Claim> {
        self.claims.get(&id).ok_or_else(|| LedgerError::claim_not_found(id))
    }

    pub fn all_claims(&self) -> impl Iterator<Item = &Claim> {
        self.claims.values()
    }

    /// PENDING is the only legal source state; only the policy creator may
    /// move a claim out of it.
    pub fn stage_transition(
        &self,
        claim_id: ClaimId,
        status: ClaimStatus,
        processor: &Principal,
        at: i64,
    ) -> LedgerResult<ClaimTransition> {
        if !status.is_terminal() {
            return Err(LedgerError::invalid_argument("status", "claims can only move to APPROVED or REJECTED"));
        }
        let claim = self.get_claim(claim_id)?;
        if claim.status != ClaimStatus::Pending {
            return Err(LedgerError::claim_not_pending(claim_id, claim.status));
        }
        let policy = self.get_policy(claim.policy_id)?;
        if &policy.created_by != processor {
            return Err(LedgerError::not_policy_owner(policy.id));
        }
        Ok(ClaimTransition {
            claim_id,
            policy_id: policy.id,
            status,
            processed_by: processor.clone(),
            processed_at: at,
        })
    }

    pub fn apply_transition(&mut self, transition: &ClaimTransition) {
        if let Some(claim) = self.claims.get_mut(&transition.claim_id) {
            claim.status = transition.status;
            claim.processed_at = transition.processed_at;
            claim.processed_by = Some(transition.processed_by.clone());
        }
    }

    pub fn transition_claim(
        &mut self,
        claim_id: ClaimId,
        status: ClaimStatus,
        processor: &Principal,
        at: i64,
    ) -> LedgerResult<()> {
        let transition = self.stage_transition(claim_id, status, processor, at)?;
        self.apply_transition(&transition);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Training rounds
    // -------------------------------------------------------------------------

    pub fn stage_training_round(
        &self,
        triggered_by: &Principal,
        input: &NewTrainingRound,
        at: i64,
    ) -> LedgerResult<TrainingRound> {
        input.validate()?;
        Ok(TrainingRound {
            round_number: self.training_rounds.len() as RoundNumber + 1,
            global_accuracy: input.global_accuracy,
            nodes_participated: input.nodes_participated,
            total_samples: input.total_samples,
            timestamp: at,
            triggered_by: triggered_by.clone(),
        })
    }

    pub fn commit_training_round(&mut self, round: TrainingRound) -> RoundNumber {
        let number = round.round_number;
        self.training_rounds.push(round);
        number
    }

    pub fn get_training_round(&self, round_number: RoundNumber) -> LedgerResult<&TrainingRound> {
        round_number
            .checked_sub(1)
            .and_then(|i| self.training_rounds.get(i as usize))
            .ok_or_else(|| LedgerError::not_found("training round", round_number))
    }

    pub fn all_training_rounds(&self) -> &[TrainingRound] {
        &self.training_rounds
    }

    pub fn counts(&self) -> TotalCounts {
        TotalCounts {
            users: self.users.len() as u64,
            identities: self.identities.len() as u64,
            policies: self.policies.len() as u64,
            claims: self.claims.len() as u64,
            training_rounds: self.training_rounds.len() as u64,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::FraudAssessment;

    fn p(s: &str) -> Principal {
        Principal::new(s).unwrap()
    }

    fn identity(did: &str) -> NewIdentity {
        NewIdentity {
            did: did.into(),
            name: "Alice".into(),
            email: "alice@example.com".into(),
            id_number: "ID-1".into(),
            date_of_birth: "1990-01-01".into(),
        }
    }

    fn policy(number: &str, did: &str) -> NewPolicy {
        NewPolicy {
            policy_number: number.into(),
            did: did.into(),
            patient_name: "Alice".into(),
            policy_type: "health".into(),
            coverage_amount: 500_000,
            premium: 1_200,
            duration_months: 12,
            insurance_company: "Acme".into(),
        }
    }

    fn claim(number: &str, policy_id: PolicyId) -> NewClaim {
        NewClaim {
            claim_number: number.into(),
            policy_id,
            policy_number: "POL-1".into(),
            did: "did:abc".into(),
            patient_name: "Alice".into(),
            claim_type: "surgery".into(),
            amount: 20_000,
            description: "knee".into(),
            hospital_name: "City Hospital".into(),
            diagnosis: "ACL tear".into(),
            assessment: FraudAssessment {
                fraud_score: 10,
                is_fraudulent: false,
                ai_decision: "APPROVED".into(),
                ml_fraud_type: "N/A".into(),
                ml_confidence: 0,
            },
        }
    }

    fn seeded() -> EntityStore {
        let mut store = EntityStore::new();
        store.register_user(&p("alice"), "alice", Role::Patient, "Alice", 1).unwrap();
        store.register_user(&p("acme"), "acme", Role::Insurance, "Acme", 2).unwrap();
        store.create_identity(&p("alice"), &identity("did:abc"), 3).unwrap();
        store.create_policy(&p("acme"), &policy("POL-1", "did:abc"), 4).unwrap();
        store
    }

    #[test]
    fn test_user_uniqueness() {
        let mut store = EntityStore::new();
        store.register_user(&p("a"), "alice", Role::Patient, "Alice", 0).unwrap();
        let dup_owner = store.register_user(&p("a"), "other", Role::Patient, "", 0).unwrap_err();
        assert_eq!(dup_owner, LedgerError::duplicate_owner("a"));
        let dup_name = store.register_user(&p("b"), "alice", Role::Hospital, "", 0).unwrap_err();
        assert_eq!(dup_name, LedgerError::duplicate_username("alice"));
        let admin = store.register_user(&p("c"), "root", Role::Admin, "", 0).unwrap_err();
        assert_eq!(admin.kind(), ErrorKind::InvalidArgument);
        assert_eq!(store.counts().users, 1);
        assert_eq!(store.get_user_by_username("alice").unwrap().owner, p("a"));
    }

    #[test]
    fn test_identity_one_per_owner() {
        let mut store = EntityStore::new();
        store.create_identity(&p("a"), &identity("did:1"), 0).unwrap();
        assert_eq!(
            store.create_identity(&p("b"), &identity("did:1"), 0).unwrap_err(),
            LedgerError::duplicate_did("did:1")
        );
        assert_eq!(
            store.create_identity(&p("a"), &identity("did:2"), 0).unwrap_err(),
            LedgerError::owner_has_identity("a")
        );
        assert_eq!(store.identity_of(&p("a")).unwrap().did, "did:1");
        assert!(store.is_identity_verified("did:1").unwrap());
    }

    #[test]
    fn test_policy_ids_do_not_advance_on_failure() {
        let mut store = seeded();
        assert_eq!(store.get_policy(1).unwrap().policy_number, "POL-1");
        let err = store.create_policy(&p("acme"), &policy("POL-1", "did:abc"), 5).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateKey);
        let err = store.create_policy(&p("acme"), &policy("POL-2", "did:nope"), 5).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(store.next_policy_id(), 2);
        assert_eq!(store.create_policy(&p("acme"), &policy("POL-2", "did:abc"), 6).unwrap(), 2);
        assert_eq!(store.get_policy_by_number("POL-2").unwrap().id, 2);
    }

    #[test]
    fn test_claim_requires_matching_policy() {
        let mut store = seeded();
        assert_eq!(store.submit_claim(&p("h"), &claim("CLM-1", 9), 0).unwrap_err(), LedgerError::unknown_policy(9));
        let mut wrong_did = claim("CLM-1", 1);
        wrong_did.did = "did:zzz".into();
        assert_eq!(store.submit_claim(&p("h"), &wrong_did, 0).unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(store.submit_claim(&p("h"), &claim("CLM-1", 1), 7).unwrap(), 1);
        assert_eq!(
            store.submit_claim(&p("h"), &claim("CLM-1", 1), 8).unwrap_err(),
            LedgerError::duplicate_claim_number("CLM-1")
        );
        let c = store.get_claim(1).unwrap();
        assert_eq!(c.status, ClaimStatus::Pending);
        assert_eq!(c.processed_at, 0);
        assert!(c.processed_by.is_none());
        assert_eq!(store.next_claim_id(), 2);
    }

    #[test]
    fn test_transition_is_terminal_and_owner_only() {
        let mut store = seeded();
        store.submit_claim(&p("h"), &claim("CLM-1", 1), 7).unwrap();
        assert_eq!(
            store.transition_claim(1, ClaimStatus::Approved, &p("other"), 9).unwrap_err(),
            LedgerError::not_policy_owner(1)
        );
        store.transition_claim(1, ClaimStatus::Rejected, &p("acme"), 9).unwrap();
        let c = store.get_claim(1).unwrap();
        assert_eq!(c.status, ClaimStatus::Rejected);
        assert_eq!(c.processed_at, 9);
        assert_eq!(c.processed_by, Some(p("acme")));
        let again = store.transition_claim(1, ClaimStatus::Approved, &p("acme"), 10).unwrap_err();
        assert_eq!(again.kind(), ErrorKind::InvalidState);
        assert_eq!(store.transition_claim(5, ClaimStatus::Approved, &p("acme"), 10).unwrap_err(), LedgerError::claim_not_found(5));
    }

    #[test]
    fn test_training_rounds_are_sequenced() {
        let mut store = EntityStore::new();
        let input = NewTrainingRound { global_accuracy: 87, nodes_participated: 3, total_samples: 120 };
        for expected in 1..=3 {
            let round = store.stage_training_round(&p("acme"), &input, 0).unwrap();
            assert_eq!(store.commit_training_round(round), expected);
        }
        assert_eq!(store.get_training_round(2).unwrap().round_number, 2);
        assert!(store.get_training_round(0).is_err());
        assert!(store.get_training_round(4).is_err());
        let bad = NewTrainingRound { global_accuracy: 140, ..input };
        assert!(store.stage_training_round(&p("acme"), &bad, 0).is_err());
    }

    #[test]
    fn test_listings_keep_insertion_order() {
        let mut store = EntityStore::new();
        for name in ["zed", "amy", "mo"] {
            store.register_user(&p(name), name, Role::Patient, name, 0).unwrap();
        }
        let names: Vec<&str> = store.all_users().iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["zed", "amy", "mo"]);
    }
}
