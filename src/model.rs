// =============================================================================
// CLAIM LEDGER — model.rs
// =============================================================================
//
// Entities held by the registry and the inputs used to create them:
//   1. Principal / Role      — who is calling and what they may do
//   2. User, Identity        — registered principals and their DID records
//   3. Policy, Claim         — insurance contracts and claims against them
//   4. TrainingRound         — recorded federated-learning results
//
// Relations between entities are plain copied identifiers (claim → policy id,
// policy → DID); nothing holds a reference to another entity.
// =============================================================================

use crate::constants::MAX_PERCENT;
use crate::error::{LedgerError, LedgerResult};
use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type PolicyId = u64;
pub type ClaimId = u64;
pub type RoundNumber = u64;

/// Current time as Unix seconds (entity timestamps).
pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

/// Current time as Unix milliseconds (block timestamps).
pub fn unix_now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

// -----------------------------------------------------------------------------
// Principal
// -----------------------------------------------------------------------------

/// Authenticated caller identity handed over by the session layer.
/// Stored trimmed and lowercased so wallet addresses compare case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    pub fn new(raw: &str) -> LedgerResult<Self> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(LedgerError::invalid_argument("caller", "empty principal"));
        }
        Ok(Principal(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Principal {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Principal::new(s)
    }
}

// -----------------------------------------------------------------------------
// Role
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Hospital,
    Insurance,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Hospital => "hospital",
            Role::Insurance => "insurance",
            Role::Admin => "admin",
        }
    }

    /// Admins are seeded from configuration, never self-registered.
    pub fn is_self_registerable(&self) -> bool {
        !matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact, case-sensitive match against the closed role set.
impl FromStr for Role {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patient" => Ok(Role::Patient),
            "hospital" => Ok(Role::Hospital),
            "insurance" => Ok(Role::Insurance),
            "admin" => Ok(Role::Admin),
            other => Err(LedgerError::invalid_argument(
                "role",
                format!("'{}' is not one of patient, hospital, insurance, admin", other),
            )),
        }
    }
}

// -----------------------------------------------------------------------------
// Statuses
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyStatus {
    Active,
    Expired,
    Cancelled,
}

impl fmt::Display for PolicyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PolicyStatus::Active => "ACTIVE",
            PolicyStatus::Expired => "EXPIRED",
            PolicyStatus::Cancelled => "CANCELLED",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimStatus {
    Pending,
    Approved,
    Rejected,
}

impl ClaimStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ClaimStatus::Pending)
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ClaimStatus::Pending => "PENDING",
            ClaimStatus::Approved => "APPROVED",
            ClaimStatus::Rejected => "REJECTED",
        })
    }
}

// -----------------------------------------------------------------------------
// Entities
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub owner: Principal,
    pub username: String,
    pub role: Role,
    pub name: String,
    pub registered_at: i64,
}

/// Self-sovereign identity record. Verified at creation; there is no
/// re-verification path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub did: String,
    pub name: String,
    pub email: String,
    pub id_number: String,
    pub date_of_birth: String,
    pub owner: Principal,
    pub is_verified: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub id: PolicyId,
    pub policy_number: String,
    pub did: String,
    pub patient_name: String,
    pub policy_type: String,
    pub coverage_amount: u64,
    pub premium: u64,
    pub duration_months: u32,
    pub created_by: Principal,
    pub insurance_company: String,
    pub status: PolicyStatus,
    pub created_at: i64,
}

impl Policy {
    /// `created_at` plus `duration_months` calendar months.
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.created_at, 0)?
            .checked_add_months(Months::new(self.duration_months))
    }
}

/// Fraud-scoring output attached to a claim before submission.
/// Opaque to the ledger beyond range checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FraudAssessment {
    pub fraud_score: u8,
    pub is_fraudulent: bool,
    pub ai_decision: String,
    pub ml_fraud_type: String,
    pub ml_confidence: u8,
}

impl FraudAssessment {
    /// What a hospital is allowed to see of its own submissions.
    pub fn hidden() -> Self {
        FraudAssessment {
            fraud_score: 0,
            is_fraudulent: false,
            ai_decision: "PENDING".to_string(),
            ml_fraud_type: "HIDDEN".to_string(),
            ml_confidence: 0,
        }
    }

    fn validate(&self) -> LedgerResult<()> {
        check_percent("fraudScore", self.fraud_score)?;
        check_percent("mlConfidence", self.ml_confidence)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub id: ClaimId,
    pub claim_number: String,
    pub policy_id: PolicyId,
    pub policy_number: String,
    pub did: String,
    pub patient_name: String,
    pub claim_type: String,
    pub amount: u64,
    pub description: String,
    pub hospital_name: String,
    pub diagnosis: String,
    pub submitted_by: Principal,
    pub submitted_at: i64,
    pub status: ClaimStatus,
    #[serde(flatten)]
    pub assessment: FraudAssessment,
    /// 0 until the claim is approved or rejected
    pub processed_at: i64,
    pub processed_by: Option<Principal>,
}

impl Claim {
    pub fn redacted_for_hospital(mut self) -> Self {
        self.assessment = FraudAssessment::hidden();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingRound {
    pub round_number: RoundNumber,
    pub global_accuracy: u8,
    pub nodes_participated: u32,
    pub total_samples: u64,
    pub timestamp: i64,
    pub triggered_by: Principal,
}

/// Entity counts, in the order users, identities, policies, claims, rounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalCounts {
    pub users: u64,
    pub identities: u64,
    pub policies: u64,
    pub claims: u64,
    pub training_rounds: u64,
}

// -----------------------------------------------------------------------------
// Inputs
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIdentity {
    pub did: String,
    pub name: String,
    pub email: String,
    pub id_number: String,
    pub date_of_birth: String,
}

impl NewIdentity {
    pub fn validate(&self) -> LedgerResult<()> {
        require_text("did", &self.did)?;
        require_text("name", &self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPolicy {
    pub policy_number: String,
    pub did: String,
    pub patient_name: String,
    pub policy_type: String,
    pub coverage_amount: u64,
    pub premium: u64,
    pub duration_months: u32,
    pub insurance_company: String,
}

impl NewPolicy {
    pub fn validate(&self) -> LedgerResult<()> {
        require_text("policyNumber", &self.policy_number)?;
        require_text("did", &self.did)?;
        if self.coverage_amount == 0 {
            return Err(LedgerError::invalid_argument("coverageAmount", "must be positive"));
        }
        if self.duration_months == 0 {
            return Err(LedgerError::invalid_argument("durationMonths", "must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClaim {
    pub claim_number: String,
    pub policy_id: PolicyId,
    pub policy_number: String,
    pub did: String,
    pub patient_name: String,
    pub claim_type: String,
    pub amount: u64,
    pub description: String,
    pub hospital_name: String,
    pub diagnosis: String,
    #[serde(flatten)]
    pub assessment: FraudAssessment,
}

impl NewClaim {
    pub fn validate(&self) -> LedgerResult<()> {
        require_text("claimNumber", &self.claim_number)?;
        if self.policy_id == 0 {
            return Err(LedgerError::invalid_argument("policyId", "0 is not a policy id"));
        }
        if self.amount == 0 {
            return Err(LedgerError::invalid_argument("amount", "must be positive"));
        }
        self.assessment.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTrainingRound {
    pub global_accuracy: u8,
    pub nodes_participated: u32,
    pub total_samples: u64,
}

impl NewTrainingRound {
    pub fn validate(&self) -> LedgerResult<()> {
        check_percent("globalAccuracy", self.global_accuracy)
    }
}

fn require_text(field: &'static str, value: &str) -> LedgerResult<()> {
    if value.trim().is_empty() {
        return Err(LedgerError::invalid_argument(field, "must not be empty"));
    }
    Ok(())
}

fn check_percent(field: &'static str, value: u8) -> LedgerResult<()> {
    if value > MAX_PERCENT {
        return Err(LedgerError::invalid_argument(
            field,
            format!("{} exceeds {}", value, MAX_PERCENT),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_principal_is_normalized() {
        let a = Principal::new("  0xABCdef ").unwrap();
        let b = Principal::new("0xabcdef").unwrap();
        assert_eq!(a, b);
        assert_eq!(Principal::new("   ").unwrap_err().kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_role_parse_is_exact() {
        assert_eq!("insurance".parse::<Role>().unwrap(), Role::Insurance);
        assert!("Insurance".parse::<Role>().is_err());
        assert!("doctor".parse::<Role>().is_err());
        assert!(!Role::Admin.is_self_registerable());
        assert!(Role::Hospital.is_self_registerable());
    }

    #[test]
    fn test_policy_expiry_adds_calendar_months() {
        let created = DateTime::parse_from_rfc3339("2024-01-31T00:00:00Z").unwrap();
        let policy = Policy {
            id: 1,
            policy_number: "POL-1".into(),
            did: "did:abc".into(),
            patient_name: "Alice".into(),
            policy_type: "health".into(),
            coverage_amount: 500_000,
            premium: 100,
            duration_months: 1,
            created_by: Principal::new("acme").unwrap(),
            insurance_company: "Acme".into(),
            status: PolicyStatus::Active,
            created_at: created.timestamp(),
        };
        let expiry = policy.expiry().unwrap();
        assert_eq!(expiry.to_rfc3339(), "2024-02-29T00:00:00+00:00");
    }

    #[test]
    fn test_claim_rejects_out_of_range_scores() {
        let claim = NewClaim {
            claim_number: "CLM-1".into(),
            policy_id: 1,
            policy_number: "POL-1".into(),
            did: "did:abc".into(),
            patient_name: "Alice".into(),
            claim_type: "surgery".into(),
            amount: 20_000,
            description: "".into(),
            hospital_name: "City".into(),
            diagnosis: "".into(),
            assessment: FraudAssessment {
                fraud_score: 101,
                is_fraudulent: false,
                ai_decision: "APPROVED".into(),
                ml_fraud_type: "N/A".into(),
                ml_confidence: 0,
            },
        };
        let err = claim.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("fraudScore"));
    }

    #[test]
    fn test_claim_json_is_flat_camel_case() {
        let json = serde_json::json!({
            "claimNumber": "CLM-1", "policyId": 1, "policyNumber": "POL-1",
            "did": "did:abc", "patientName": "Alice", "claimType": "surgery",
            "amount": 20000, "description": "knee", "hospitalName": "City",
            "diagnosis": "ACL", "fraudScore": 12, "isFraudulent": false,
            "aiDecision": "APPROVED", "mlFraudType": "N/A", "mlConfidence": 0
        });
        let claim: NewClaim = serde_json::from_value(json).unwrap();
        assert_eq!(claim.assessment.fraud_score, 12);
        assert!(claim.validate().is_ok());
    }
}
