// =============================================================================
// CLAIM LEDGER — views.rs
// =============================================================================
//
// Read-only, caller-scoped projections over the registry:
//   1. policies_for / search_policies  — which policies a caller may list
//   2. claims_for / claim_for           — hospitals see their claims redacted
//      training_history                — FL rounds for insurers and admins
//   3. analytics                       — per-role portfolio figures
//   4. identifier helpers              — POL/CLM numbers and DIDs for "prepare"
//
// None of these append blocks or touch entity state.
// =============================================================================

use crate::access::AccessControl;
use crate::constants::{CLAIM_NUMBER_PREFIX, DID_PREFIX, POLICY_NUMBER_PREFIX};
use crate::error::{LedgerError, LedgerResult};
use crate::model::{Claim, ClaimId, ClaimStatus, Policy, PolicyStatus, Principal, Role, TrainingRound, User};
use crate::registry::Registry;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const GENERATED_DIGITS: u32 = 6;
const DID_HASH_CHARS: usize = 16;

// -----------------------------------------------------------------------------
// Identifier helpers
// -----------------------------------------------------------------------------

fn random_digits() -> String {
    let n = rand::thread_rng().gen_range(0..10u32.pow(GENERATED_DIGITS));
    format!("{:0width$}", n, width = GENERATED_DIGITS as usize)
}

/// `POL` + 6 random digits. Collisions surface as DuplicateKey on create.
pub fn generate_policy_number() -> String {
    format!("{}{}", POLICY_NUMBER_PREFIX, random_digits())
}

/// `CLM` + 6 random digits.
pub fn generate_claim_number() -> String {
    format!("{}{}", CLAIM_NUMBER_PREFIX, random_digits())
}

/// Deterministic DID from any seed (wallet address, email, ...).
pub fn generate_did(seed: &str) -> String {
    let digest = hex::encode(Sha256::digest(seed.as_bytes()));
    format!("{}{}", DID_PREFIX, &digest[..DID_HASH_CHARS])
}

// -----------------------------------------------------------------------------
// Policy views
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyView {
    #[serde(flatten)]
    pub policy: Policy,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&Policy> for PolicyView {
    fn from(policy: &Policy) -> Self {
        PolicyView { policy: policy.clone(), expires_at: policy.expiry() }
    }
}

pub fn policy_expiry(policy: &Policy) -> Option<DateTime<Utc>> {
    policy.expiry()
}

impl Registry {
    pub fn policies_for(&self, caller: &Principal) -> LedgerResult<Vec<PolicyView>> {
        let store = self.store();
        let user = AccessControl::new(store).require_registered(caller)?;
        let own_did = store.identity_of(caller).ok().map(|i| i.did.as_str());
        let visible = |p: &Policy| match user.role {
            Role::Patient => own_did == Some(p.did.as_str()),
            Role::Insurance => &p.created_by == caller,
            Role::Hospital => p.status == PolicyStatus::Active,
            Role::Admin => true,
        };
        Ok(store.all_policies().filter(|p| visible(p)).map(PolicyView::from).collect())
    }

    /// Hospitals and insurers look up the ACTIVE cover of a patient DID.
    pub fn search_policies(&self, caller: &Principal, did: &str) -> LedgerResult<Vec<PolicyView>> {
        let store = self.store();
        AccessControl::new(store).require_any_role(caller, &[Role::Hospital, Role::Insurance])?;
        if did.trim().is_empty() {
            return Err(LedgerError::invalid_argument("did", "must not be empty"));
        }
        Ok(store
            .all_policies()
            .filter(|p| p.did == did && p.status == PolicyStatus::Active)
            .map(PolicyView::from)
            .collect())
    }

    // -------------------------------------------------------------------------
    // Claim views
    // -------------------------------------------------------------------------

    fn claim_visible_to(&self, user: &User, claim: &Claim) -> bool {
        let store = self.store();
        match user.role {
            Role::Patient => store.identity_of(&user.owner).map(|i| i.did == claim.did).unwrap_or(false),
            Role::Hospital => claim.submitted_by == user.owner,
            Role::Insurance => store
                .get_policy(claim.policy_id)
                .map(|p| p.created_by == user.owner)
                .unwrap_or(false),
            Role::Admin => true,
        }
    }

    fn scoped_claim(user: &User, claim: &Claim) -> Claim {
        if user.role == Role::Hospital {
            claim.clone().redacted_for_hospital()
        } else {
            claim.clone()
        }
    }

    /// Patients see claims on their DID, hospitals their own submissions
    /// (redacted), insurers claims on policies they issued, admins everything.
    pub fn claims_for(&self, caller: &Principal) -> LedgerResult<Vec<Claim>> {
        let user = AccessControl::new(self.store()).require_registered(caller)?;
        Ok(self
            .store()
            .all_claims()
            .filter(|c| self.claim_visible_to(user, c))
            .map(|c| Self::scoped_claim(user, c))
            .collect())
    }

    /// One claim, under the same visibility rules as `claims_for`.
    pub fn claim_for(&self, caller: &Principal, id: ClaimId) -> LedgerResult<Claim> {
        let user = AccessControl::new(self.store()).require_registered(caller)?;
        let claim = self.get_claim(id)?;
        if !self.claim_visible_to(user, claim) {
            return Err(LedgerError::unauthorized(format!("{} may not view claim {}", caller, id)));
        }
        Ok(Self::scoped_claim(user, claim))
    }

    // -------------------------------------------------------------------------
    // Training history
    // -------------------------------------------------------------------------

    pub fn training_history(&self, caller: &Principal) -> LedgerResult<TrainingHistory> {
        AccessControl::new(self.store()).require_any_role(caller, &[Role::Insurance, Role::Admin])?;
        let rounds = self.store().all_training_rounds().to_vec();
        Ok(TrainingHistory { total: rounds.len() as u64, rounds })
    }

    // -------------------------------------------------------------------------
    // Analytics
    // -------------------------------------------------------------------------

    pub fn analytics(&self, caller: &Principal) -> LedgerResult<Analytics> {
        let user = AccessControl::new(self.store()).require_registered(caller)?;
        let policies = self.policies_for(caller)?;
        let claims = self.claims_for(caller)?;
        let counts = self.get_total_counts();

        let active: Vec<&PolicyView> =
            policies.iter().filter(|v| v.policy.status == PolicyStatus::Active).collect();
        let mut a = Analytics {
            role: user.role,
            active_policies: active.len() as u64,
            total_coverage: active.iter().map(|v| v.policy.coverage_amount).sum(),
            total_claims: claims.len() as u64,
            total_users: counts.users,
            total_identities: counts.identities,
            training_rounds: counts.training_rounds,
            ..Analytics::default()
        };
        for claim in &claims {
            match claim.status {
                ClaimStatus::Pending => {
                    a.pending_claims += 1;
                    a.pending_amount += claim.amount;
                }
                ClaimStatus::Approved => {
                    a.approved_claims += 1;
                    a.approved_amount += claim.amount;
                }
                ClaimStatus::Rejected => a.rejected_claims += 1,
            }
            if claim.assessment.is_fraudulent {
                a.fraudulent_claims += 1;
            }
        }
        if a.total_claims > 0 {
            a.fraud_rate = a.fraudulent_claims as f64 * 100.0 / a.total_claims as f64;
        }
        Ok(a)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingHistory {
    pub rounds: Vec<TrainingRound>,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub role: Role,
    pub active_policies: u64,
    pub total_coverage: u64,
    pub total_claims: u64,
    pub pending_claims: u64,
    pub approved_claims: u64,
    pub rejected_claims: u64,
    pub pending_amount: u64,
    pub approved_amount: u64,
    pub fraudulent_claims: u64,
    /// percent of the caller's claims flagged fraudulent
    pub fraud_rate: f64,
    pub total_users: u64,
    pub total_identities: u64,
    pub training_rounds: u64,
}

impl Default for Analytics {
    fn default() -> Self {
        Analytics {
            role: Role::Patient,
            active_policies: 0,
            total_coverage: 0,
            total_claims: 0,
            pending_claims: 0,
            approved_claims: 0,
            rejected_claims: 0,
            pending_amount: 0,
            approved_amount: 0,
            fraudulent_claims: 0,
            fraud_rate: 0.0,
            total_users: 0,
            total_identities: 0,
            training_rounds: 0,
        }
    }
}

impl std::fmt::Display for Analytics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f,
            "╔══════════════════════════════════════════════╗\n\
             ║  CLAIM LEDGER — ANALYTICS ({:<9})          ║\n\
             ╠══════════════════════════════════════════════╣\n\
             ║  Active policies: {:>5}  Coverage: {:>10} ║\n\
             ║  Claims: {:>5}  P/A/R: {:>4}/{:>4}/{:>4}       ║\n\
             ║  Approved: {:>12}  Pending: {:>12}║\n\
             ║  Fraud flagged: {:>5}  Rate: {:>6.2}%        ║\n\
             ║  Users: {:>5}  DIDs: {:>5}  FL rounds: {:>4} ║\n\
             ╚══════════════════════════════════════════════╝",
            self.role.as_str(),
            self.active_policies, self.total_coverage,
            self.total_claims, self.pending_claims, self.approved_claims, self.rejected_claims,
            self.approved_amount, self.pending_amount,
            self.fraudulent_claims, self.fraud_rate,
            self.total_users, self.total_identities, self.training_rounds,
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================
