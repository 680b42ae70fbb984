// =============================================================================
// CLAIM LEDGER — api.rs
// =============================================================================
//
// HTTP surface under /v1. The session layer in front of this node
// authenticates the wallet and forwards it in the `x-caller` header; every
// mutating route and every caller-scoped view requires it.
//
// Error mapping: missing caller 401, Unauthorized 403, NotFound 404,
// DuplicateKey / InvalidState 409, InvalidArgument 400, Storage / corruption 500.
// =============================================================================

use crate::chain::{Block, BlockType, ChainVerification};
use crate::constants::{CALLER_HEADER, VERSION};
use crate::error::{ErrorKind, LedgerError};
use crate::model::{
    Claim, ClaimId, Identity, NewClaim, NewIdentity, NewPolicy, NewTrainingRound, Policy, PolicyId,
    Principal, Role, RoundNumber, TotalCounts, TrainingRound, User,
};
use crate::service::LedgerService;
use crate::views::{generate_claim_number, generate_did, generate_policy_number, Analytics, PolicyView, TrainingHistory};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// -----------------------------------------------------------------------------
// Errors
// -----------------------------------------------------------------------------

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    fn missing_caller() -> Self {
        ApiError {
            status: StatusCode::UNAUTHORIZED,
            kind: "UNAUTHENTICATED",
            message: format!("missing {} header", CALLER_HEADER),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        let (status, kind) = match e.kind() {
            ErrorKind::Unauthorized => (StatusCode::FORBIDDEN, "UNAUTHORIZED"),
            ErrorKind::DuplicateKey => (StatusCode::CONFLICT, "DUPLICATE_KEY"),
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ErrorKind::InvalidState => (StatusCode::CONFLICT, "INVALID_STATE"),
            ErrorKind::InvalidArgument => (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT"),
            ErrorKind::Storage => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE"),
            ErrorKind::Corrupted => (StatusCode::INTERNAL_SERVER_ERROR, "CORRUPTED"),
        };
        ApiError { status, kind, message: e.to_string() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message, "kind": self.kind }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn caller(headers: &HeaderMap) -> ApiResult<Principal> {
    let raw = headers
        .get(CALLER_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(ApiError::missing_caller)?;
    Ok(Principal::new(raw)?)
}

fn created(body: Value) -> (StatusCode, Json<Value>) {
    (StatusCode::CREATED, Json(body))
}

// -----------------------------------------------------------------------------
// Node status
// -----------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatus {
    pub node_id: String,
    pub status: String,
    pub version: String,
    pub blocks: usize,
    pub head_hash: String,
    pub chain_valid: bool,
    pub counts: TotalCounts,
    pub uptime_secs: u64,
    pub timestamp: String,
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn status_handler(State(svc): State<LedgerService>) -> Json<NodeStatus> {
    let (blocks, head_hash, chain_valid, counts) = svc
        .read(|r| (r.chain().len(), r.chain().head().hash.clone(), r.verify_chain(), r.get_total_counts()))
        .await;
    Json(NodeStatus {
        node_id: svc.node_id.clone(),
        status: if chain_valid { "active" } else { "corrupted" }.to_string(),
        version: VERSION.to_string(),
        blocks,
        head_hash,
        chain_valid,
        counts,
        uptime_secs: svc.uptime_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

// -----------------------------------------------------------------------------
// Users
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    pub username: String,
    pub role: String,
    #[serde(default)]
    pub name: String,
}

async fn register_user_handler(
    State(svc): State<LedgerService>,
    headers: HeaderMap,
    Json(req): Json<RegisterUserRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let caller = caller(&headers)?;
    let role: Role = req.role.parse().map_err(|_| LedgerError::invalid_role(&req.role))?;
    let owner = svc.write(|r| r.register_user(&caller, &req.username, role, &req.name)).await?;
    Ok(created(json!({ "owner": owner })))
}

async fn list_users_handler(State(svc): State<LedgerService>) -> Json<Vec<User>> {
    Json(svc.read(|r| r.get_all_users().into_iter().cloned().collect()).await)
}

async fn get_user_handler(State(svc): State<LedgerService>, Path(owner): Path<String>) -> ApiResult<Json<User>> {
    let owner = Principal::new(&owner)?;
    Ok(Json(svc.read(|r| r.get_user(&owner).cloned()).await?))
}

async fn get_user_by_username_handler(
    State(svc): State<LedgerService>,
    Path(username): Path<String>,
) -> ApiResult<Json<User>> {
    Ok(Json(svc.read(|r| r.get_user_by_username(&username).cloned()).await?))
}

// -----------------------------------------------------------------------------
// Identities
// -----------------------------------------------------------------------------

/// An empty `did` is filled with one derived from the caller.
async fn create_identity_handler(
    State(svc): State<LedgerService>,
    headers: HeaderMap,
    Json(mut input): Json<NewIdentity>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let caller = caller(&headers)?;
    if input.did.trim().is_empty() {
        input.did = generate_did(caller.as_str());
    }
    let did = svc.write(|r| r.create_identity(&caller, input)).await?;
    Ok(created(json!({ "did": did })))
}

async fn list_identities_handler(State(svc): State<LedgerService>) -> Json<Vec<Identity>> {
    Json(svc.read(|r| r.get_all_identities().into_iter().cloned().collect()).await)
}

async fn my_identity_handler(State(svc): State<LedgerService>, headers: HeaderMap) -> ApiResult<Json<Identity>> {
    let caller = caller(&headers)?;
    Ok(Json(svc.read(|r| r.get_my_identity(&caller).cloned()).await?))
}

async fn get_identity_handler(State(svc): State<LedgerService>, Path(did): Path<String>) -> ApiResult<Json<Value>> {
    let (identity, verified) = svc
        .read(|r| -> Result<_, LedgerError> { Ok((r.get_identity(&did)?.clone(), r.is_identity_verified(&did)?)) })
        .await?;
    let mut body = serde_json::to_value(identity).map_err(LedgerError::from)?;
    body["verified"] = json!(verified);
    Ok(Json(body))
}

// -----------------------------------------------------------------------------
// Policies
// -----------------------------------------------------------------------------

async fn prepare_policy_handler(State(svc): State<LedgerService>, headers: HeaderMap) -> ApiResult<Json<Value>> {
    let caller = caller(&headers)?;
    svc.read(|r| crate::access::AccessControl::new(r.store()).require_role(&caller, Role::Insurance).map(|_| ()))
        .await?;
    Ok(Json(json!({ "policyNumber": generate_policy_number() })))
}

async fn create_policy_handler(
    State(svc): State<LedgerService>,
    headers: HeaderMap,
    Json(input): Json<NewPolicy>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let caller = caller(&headers)?;
    let id = svc.write(|r| r.create_policy(&caller, input)).await?;
    Ok(created(json!({ "policyId": id })))
}

async fn list_policies_handler(State(svc): State<LedgerService>, headers: HeaderMap) -> ApiResult<Json<Vec<PolicyView>>> {
    let caller = caller(&headers)?;
    Ok(Json(svc.read(|r| r.policies_for(&caller)).await?))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub did: String,
}

async fn search_policies_handler(
    State(svc): State<LedgerService>,
    headers: HeaderMap,
    Query(q): Query<SearchQuery>,
) -> ApiResult<Json<Vec<PolicyView>>> {
    let caller = caller(&headers)?;
    Ok(Json(svc.read(|r| r.search_policies(&caller, &q.did)).await?))
}

async fn get_policy_handler(State(svc): State<LedgerService>, Path(id): Path<PolicyId>) -> ApiResult<Json<PolicyView>> {
    Ok(Json(svc.read(|r| r.get_policy(id).map(PolicyView::from)).await?))
}

async fn get_policy_by_number_handler(
    State(svc): State<LedgerService>,
    Path(number): Path<String>,
) -> ApiResult<Json<Policy>> {
    Ok(Json(svc.read(|r| r.get_policy_by_number(&number).cloned()).await?))
}

// -----------------------------------------------------------------------------
// Claims
// -----------------------------------------------------------------------------

async fn prepare_claim_handler(State(svc): State<LedgerService>, headers: HeaderMap) -> ApiResult<Json<Value>> {
    let caller = caller(&headers)?;
    svc.read(|r| crate::access::AccessControl::new(r.store()).require_role(&caller, Role::Hospital).map(|_| ()))
        .await?;
    Ok(Json(json!({ "claimNumber": generate_claim_number() })))
}

async fn submit_claim_handler(
    State(svc): State<LedgerService>,
    headers: HeaderMap,
    Json(input): Json<NewClaim>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let caller = caller(&headers)?;
    let id = svc.write(|r| r.submit_claim(&caller, input)).await?;
    Ok(created(json!({ "claimId": id })))
}

async fn list_claims_handler(State(svc): State<LedgerService>, headers: HeaderMap) -> ApiResult<Json<Vec<Claim>>> {
    let caller = caller(&headers)?;
    Ok(Json(svc.read(|r| r.claims_for(&caller)).await?))
}

/// Same visibility as the claim listing; hospitals get the redacted view.
async fn get_claim_handler(
    State(svc): State<LedgerService>,
    headers: HeaderMap,
    Path(id): Path<ClaimId>,
) -> ApiResult<Json<Claim>> {
    let caller = caller(&headers)?;
    Ok(Json(svc.read(|r| r.claim_for(&caller, id)).await?))
}

async fn approve_claim_handler(
    State(svc): State<LedgerService>,
    headers: HeaderMap,
    Path(id): Path<ClaimId>,
) -> ApiResult<Json<Value>> {
    let caller = caller(&headers)?;
    svc.write(|r| r.approve_claim(&caller, id)).await?;
    Ok(Json(json!({ "claimId": id, "status": "APPROVED" })))
}

async fn reject_claim_handler(
    State(svc): State<LedgerService>,
    headers: HeaderMap,
    Path(id): Path<ClaimId>,
) -> ApiResult<Json<Value>> {
    let caller = caller(&headers)?;
    svc.write(|r| r.reject_claim(&caller, id)).await?;
    Ok(Json(json!({ "claimId": id, "status": "REJECTED" })))
}

// -----------------------------------------------------------------------------
// Training rounds, counts, analytics
// -----------------------------------------------------------------------------

async fn record_round_handler(
    State(svc): State<LedgerService>,
    headers: HeaderMap,
    Json(input): Json<NewTrainingRound>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let caller = caller(&headers)?;
    let number = svc.write(|r| r.record_training_round(&caller, input)).await?;
    Ok(created(json!({ "roundNumber": number })))
}

async fn training_history_handler(
    State(svc): State<LedgerService>,
    headers: HeaderMap,
) -> ApiResult<Json<TrainingHistory>> {
    let caller = caller(&headers)?;
    Ok(Json(svc.read(|r| r.training_history(&caller)).await?))
}

async fn get_round_handler(
    State(svc): State<LedgerService>,
    Path(round): Path<RoundNumber>,
) -> ApiResult<Json<TrainingRound>> {
    Ok(Json(svc.read(|r| r.get_training_round(round).cloned()).await?))
}

async fn counts_handler(State(svc): State<LedgerService>) -> Json<TotalCounts> {
    Json(svc.read(|r| r.get_total_counts()).await)
}

async fn analytics_handler(State(svc): State<LedgerService>, headers: HeaderMap) -> ApiResult<Json<Analytics>> {
    let caller = caller(&headers)?;
    Ok(Json(svc.read(|r| r.analytics(&caller)).await?))
}

// -----------------------------------------------------------------------------
// Chain explorer
// -----------------------------------------------------------------------------

async fn chain_handler(State(svc): State<LedgerService>) -> Json<Vec<Block>> {
    Json(svc.read(|r| r.get_chain().to_vec()).await)
}

async fn verify_handler(State(svc): State<LedgerService>) -> Json<ChainVerification> {
    Json(svc.read(|r| r.verify_chain_report()).await)
}

async fn block_handler(State(svc): State<LedgerService>, Path(index): Path<u64>) -> ApiResult<Json<Block>> {
    let block = svc.read(|r| r.chain().block(index).cloned()).await;
    Ok(Json(block.ok_or_else(|| LedgerError::not_found("block", index))?))
}

async fn blocks_by_type_handler(
    State(svc): State<LedgerService>,
    Path(block_type): Path<String>,
) -> ApiResult<Json<Vec<Block>>> {
    let block_type: BlockType = block_type.parse()?;
    Ok(Json(svc.read(|r| r.chain().blocks_by_type(block_type).into_iter().cloned().collect()).await))
}

// -----------------------------------------------------------------------------
// Router
// -----------------------------------------------------------------------------

pub fn router(service: LedgerService) -> Router {
    Router::new()
        .route("/v1/health", get(health_handler))
        .route("/v1/status", get(status_handler))
        .route("/v1/users", post(register_user_handler).get(list_users_handler))
        .route("/v1/users/by-username/:username", get(get_user_by_username_handler))
        .route("/v1/users/:owner", get(get_user_handler))
        .route("/v1/identities", post(create_identity_handler).get(list_identities_handler))
        .route("/v1/identities/me", get(my_identity_handler))
        .route("/v1/identities/:did", get(get_identity_handler))
        .route("/v1/policies/prepare", post(prepare_policy_handler))
        .route("/v1/policies", post(create_policy_handler).get(list_policies_handler))
        .route("/v1/policies/search", get(search_policies_handler))
        .route("/v1/policies/by-number/:number", get(get_policy_by_number_handler))
        .route("/v1/policies/:id", get(get_policy_handler))
        .route("/v1/claims/prepare", post(prepare_claim_handler))
        .route("/v1/claims", post(submit_claim_handler).get(list_claims_handler))
        .route("/v1/claims/:id", get(get_claim_handler))
        .route("/v1/claims/:id/approve", post(approve_claim_handler))
        .route("/v1/claims/:id/reject", post(reject_claim_handler))
        .route("/v1/training-rounds", post(record_round_handler).get(training_history_handler))
        .route("/v1/training-rounds/:round", get(get_round_handler))
        .route("/v1/counts", get(counts_handler))
        .route("/v1/analytics", get(analytics_handler))
        .route("/v1/chain", get(chain_handler))
        .route("/v1/chain/verify", get(verify_handler))
        .route("/v1/chain/blocks/:index", get(block_handler))
        .route("/v1/chain/type/:block_type", get(blocks_by_type_handler))
        .with_state(service)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn call(app: &Router, method: &str, uri: &str, caller: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(c) = caller {
            req = req.header(CALLER_HEADER, c);
        }
        let req = match body {
            Some(b) => req
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&b).unwrap()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
        (status, value)
    }

    fn claim_body(number: &str) -> Value {
        json!({
            "claimNumber": number, "policyId": 1, "policyNumber": "POL-1",
            "did": "did:abc", "patientName": "Alice", "claimType": "surgery",
            "amount": 20000, "description": "knee", "hospitalName": "City Hospital",
            "diagnosis": "ACL tear", "fraudScore": 35, "isFraudulent": false,
            "aiDecision": "APPROVED", "mlFraudType": "N/A", "mlConfidence": 0
        })
    }

    async fn seeded_app() -> Router {
        let app = router(LedgerService::in_memory());
        for (who, role) in [("alice", "patient"), ("acme", "insurance"), ("cityhosp", "hospital")] {
            let (s, _) = call(&app, "POST", "/v1/users", Some(who), Some(json!({ "username": who, "role": role, "name": who }))).await;
            assert_eq!(s, StatusCode::CREATED);
        }
        let identity = json!({
            "did": "did:abc", "name": "Alice", "email": "a@example.com",
            "idNumber": "ID-1", "dateOfBirth": "1990-01-01"
        });
        assert_eq!(call(&app, "POST", "/v1/identities", Some("alice"), Some(identity)).await.0, StatusCode::CREATED);
        let policy = json!({
            "policyNumber": "POL-1", "did": "did:abc", "patientName": "Alice",
            "policyType": "health", "coverageAmount": 500000, "premium": 1500,
            "durationMonths": 12, "insuranceCompany": "Acme"
        });
        let (s, body) = call(&app, "POST", "/v1/policies", Some("acme"), Some(policy)).await;
        assert_eq!(s, StatusCode::CREATED);
        assert_eq!(body["policyId"], 1);
        app
    }

    #[tokio::test]
    async fn test_health_and_status() {
        let app = router(LedgerService::in_memory());
        let (s, body) = call(&app, "GET", "/v1/health", None, None).await;
        assert_eq!(s, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        let (_, status) = call(&app, "GET", "/v1/status", None, None).await;
        assert_eq!(status["blocks"], 1);
        assert_eq!(status["chainValid"], true);
        assert_eq!(status["version"], VERSION);
    }

    #[tokio::test]
    async fn test_claim_flow_over_http() {
        let app = seeded_app().await;
        let (s, body) = call(&app, "POST", "/v1/claims", Some("cityhosp"), Some(claim_body("CLM-1"))).await;
        assert_eq!(s, StatusCode::CREATED);
        assert_eq!(body["claimId"], 1);

        let (s, _) = call(&app, "POST", "/v1/claims/1/approve", Some("acme"), None).await;
        assert_eq!(s, StatusCode::OK);
        let (s, body) = call(&app, "POST", "/v1/claims/1/approve", Some("acme"), None).await;
        assert_eq!(s, StatusCode::CONFLICT);
        assert_eq!(body["kind"], "INVALID_STATE");
        assert!(body["error"].as_str().unwrap().contains("APPROVED"));

        let (_, claim) = call(&app, "GET", "/v1/claims/1", Some("acme"), None).await;
        assert_eq!(claim["status"], "APPROVED");
        assert_eq!(claim["fraudScore"], 35);
        let (_, redacted) = call(&app, "GET", "/v1/claims/1", Some("cityhosp"), None).await;
        assert_eq!(redacted["mlFraudType"], "HIDDEN");
        let (_, own) = call(&app, "GET", "/v1/claims/1", Some("alice"), None).await;
        assert_eq!(own["claimNumber"], "CLM-1");
        call(&app, "POST", "/v1/users", Some("rival"), Some(json!({ "username": "rival", "role": "insurance" }))).await;
        let (s, body) = call(&app, "GET", "/v1/claims/1", Some("rival"), None).await;
        assert_eq!(s, StatusCode::FORBIDDEN);
        assert!(body.get("fraudScore").is_none());

        let (_, verify) = call(&app, "GET", "/v1/chain/verify", None, None).await;
        assert_eq!(verify["valid"], true);
        let (_, chain) = call(&app, "GET", "/v1/chain", None, None).await;
        assert_eq!(chain.as_array().unwrap().len(), 9);
        let (_, approvals) = call(&app, "GET", "/v1/chain/type/CLAIM_APPROVED", None, None).await;
        assert_eq!(approvals.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let app = seeded_app().await;
        let (s, _) = call(&app, "POST", "/v1/claims", None, Some(claim_body("CLM-1"))).await;
        assert_eq!(s, StatusCode::UNAUTHORIZED);
        let (s, body) = call(&app, "POST", "/v1/claims", Some("alice"), Some(claim_body("CLM-1"))).await;
        assert_eq!(s, StatusCode::FORBIDDEN);
        assert_eq!(body["kind"], "UNAUTHORIZED");
        assert!(body["error"].as_str().unwrap().starts_with("Unauthorized"));
        let (s, _) = call(&app, "POST", "/v1/users", Some("bob"), Some(json!({ "username": "alice", "role": "patient" }))).await;
        assert_eq!(s, StatusCode::CONFLICT);
        let (s, _) = call(&app, "POST", "/v1/users", Some("bob"), Some(json!({ "username": "bob", "role": "doctor" }))).await;
        assert_eq!(s, StatusCode::BAD_REQUEST);
        let (s, _) = call(&app, "GET", "/v1/policies/9", None, None).await;
        assert_eq!(s, StatusCode::NOT_FOUND);
        let (s, _) = call(&app, "GET", "/v1/chain/type/NOPE", None, None).await;
        assert_eq!(s, StatusCode::BAD_REQUEST);
        let (_, counts) = call(&app, "GET", "/v1/counts", None, None).await;
        assert_eq!(counts["claims"], 0);
        assert_eq!(counts["users"], 3);
    }

    #[tokio::test]
    async fn test_scoped_listings_and_prepare() {
        let app = seeded_app().await;
        let (s, body) = call(&app, "POST", "/v1/policies/prepare", Some("acme"), None).await;
        assert_eq!(s, StatusCode::OK);
        assert!(body["policyNumber"].as_str().unwrap().starts_with("POL"));
        let (s, _) = call(&app, "POST", "/v1/claims/prepare", Some("acme"), None).await;
        assert_eq!(s, StatusCode::FORBIDDEN);

        let (_, mine) = call(&app, "GET", "/v1/policies", Some("alice"), None).await;
        assert_eq!(mine.as_array().unwrap().len(), 1);
        assert!(mine[0]["expiresAt"].is_string());
        let (_, found) = call(&app, "GET", "/v1/policies/search?did=did:abc", Some("cityhosp"), None).await;
        assert_eq!(found.as_array().unwrap().len(), 1);
        let (_, me) = call(&app, "GET", "/v1/identities/me", Some("ALICE"), None).await;
        assert_eq!(me["did"], "did:abc");
        let (_, identity) = call(&app, "GET", "/v1/identities/did:abc", None, None).await;
        assert_eq!(identity["verified"], true);
        let (_, user) = call(&app, "GET", "/v1/users/by-username/acme", None, None).await;
        assert_eq!(user["role"], "insurance");
        let (s, analytics) = call(&app, "GET", "/v1/analytics", Some("acme"), None).await;
        assert_eq!(s, StatusCode::OK);
        assert_eq!(analytics["activePolicies"], 1);
    }

    #[tokio::test]
    async fn test_training_rounds_over_http() {
        let app = seeded_app().await;
        let round = json!({ "globalAccuracy": 88, "nodesParticipated": 4, "totalSamples": 1200 });
        let (s, body) = call(&app, "POST", "/v1/training-rounds", Some("acme"), Some(round)).await;
        assert_eq!(s, StatusCode::CREATED);
        assert_eq!(body["roundNumber"], 1);
        let (_, fetched) = call(&app, "GET", "/v1/training-rounds/1", None, None).await;
        assert_eq!(fetched["globalAccuracy"], 88);
        let (_, block) = call(&app, "GET", "/v1/chain/blocks/6", None, None).await;
        assert_eq!(block["type"], "FL_TRAINING_ROUND");

        let (s, history) = call(&app, "GET", "/v1/training-rounds", Some("acme"), None).await;
        assert_eq!(s, StatusCode::OK);
        assert_eq!(history["total"], 1);
        assert_eq!(history["rounds"][0]["roundNumber"], 1);
        let (s, body) = call(&app, "GET", "/v1/training-rounds", Some("cityhosp"), None).await;
        assert_eq!(s, StatusCode::FORBIDDEN);
        assert_eq!(body["kind"], "UNAUTHORIZED");
        let (s, _) = call(&app, "GET", "/v1/training-rounds", None, None).await;
        assert_eq!(s, StatusCode::UNAUTHORIZED);
    }
}
