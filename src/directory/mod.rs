//! Remote directory service boundary.
//!
//! The directory holds both internal parties and the shared external
//! company register. Everything the rest of the crate needs from it goes
//! through the `DirectoryService` trait so tests can substitute in-memory
//! doubles; `HttpDirectoryService` is the production implementation.
//!
//! Modules:
//! - http: reqwest client with retry
//! - normalize: tolerant raw records -> `Candidate`

pub mod http;
pub mod normalize;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{Candidate, LinkageRecord, PartyRole};

// ============================================================================
// Request types
// ============================================================================

/// Which slice of the directory a search runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    /// Only the caller's own parties.
    Internal,
    /// Only external directory companies.
    External,
    /// Only externally verified companies.
    Verified,
    /// Everything.
    All,
}

impl SearchScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchScope::Internal => "internal",
            SearchScope::External => "external",
            SearchScope::Verified => "verified",
            SearchScope::All => "all",
        }
    }
}

/// Business entity type filter within a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Customer,
    Supplier,
    Company,
    Any,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Customer => "customer",
            EntityKind::Supplier => "supplier",
            EntityKind::Company => "company",
            EntityKind::Any => "any",
        }
    }
}

/// How the directory matches the query against records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Match against display/company names.
    Name,
    /// Match against contact fields (phone, email, tax id).
    Contact,
}

impl SearchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchStrategy::Name => "name",
            SearchStrategy::Contact => "contact",
        }
    }
}

/// Options for one `search_candidates` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub scope: SearchScope,
    pub entity_kind: EntityKind,
    pub strategy: SearchStrategy,
    pub limit: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            scope: SearchScope::All,
            entity_kind: EntityKind::Any,
            strategy: SearchStrategy::Name,
            limit: 20,
        }
    }
}

// ============================================================================
// Response types
// ============================================================================

/// Result of a scoped phone existence check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCheck {
    #[serde(default)]
    pub exists: bool,
    /// The party already holding the number, when the directory knows it.
    #[serde(default)]
    pub party_id: Option<String>,
    #[serde(default)]
    pub party_name: Option<String>,
}

/// The create/update wire payload, merged from a draft and its linkage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityPayload {
    pub display_name: String,
    pub company_name: String,
    pub tax_registered: bool,
    pub tax_id: String,
    pub email: String,
    pub phone_numbers: Vec<String>,
    pub home_address: String,
    pub delivery_address: String,
    pub locality: String,
    pub opening_balance: f64,
    pub credit_limit: f64,
    pub role: PartyRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkage: Option<LinkageRecord>,
}

/// Server response to a create/update call.
///
/// `success` without an `entity` body is a real case (the original
/// backend acknowledged writes it had not finished materializing); the
/// form maps it to a pending confirmation rather than inventing an id.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedEntity {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub entity: Option<SavedEntityBody>,
    #[serde(default)]
    pub linking_info: Option<LinkingInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedEntityBody {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Server-side view of an entity's external link after a save.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkingInfo {
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub external_company_id: Option<String>,
}

// ============================================================================
// Error type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Rejected: {0}")]
    Rejected(String),
}

impl DirectoryError {
    /// True for failures worth escalating through the fallback cascade
    /// or retrying, as opposed to a definitive server rejection.
    pub fn is_transient(&self) -> bool {
        match self {
            DirectoryError::Http(_) => true,
            DirectoryError::Api { status, .. } => *status == 429 || *status >= 500,
            DirectoryError::InvalidResponse(_) => true,
            DirectoryError::InvalidBaseUrl(_) | DirectoryError::Rejected(_) => false,
        }
    }
}

// ============================================================================
// Retry
// ============================================================================

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 250,
            max_backoff_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetryDecision {
    Retryable,
    NonRetryable,
}

fn retry_decision_for_status(status: reqwest::StatusCode) -> RetryDecision {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        RetryDecision::Retryable
    } else {
        RetryDecision::NonRetryable
    }
}

fn retry_delay(
    attempt: u32,
    policy: &RetryPolicy,
    retry_after: Option<&reqwest::header::HeaderValue>,
) -> Duration {
    if let Some(value) = retry_after.and_then(|v| v.to_str().ok()) {
        if let Ok(secs) = value.parse::<u64>() {
            return Duration::from_secs(secs.min(30));
        }
    }

    let exponent = 2u64.saturating_pow(attempt.saturating_sub(1));
    let base = policy
        .initial_backoff_ms
        .saturating_mul(exponent)
        .min(policy.max_backoff_ms);
    Duration::from_millis(base)
}

/// Send a request, retrying transient failures with exponential backoff.
///
/// Retry-After is honored when the server sends one. Non-cloneable
/// requests (streaming bodies) go out once without retry.
pub async fn send_with_retry(
    request: reqwest::RequestBuilder,
    policy: &RetryPolicy,
) -> Result<reqwest::Response, DirectoryError> {
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..=attempts {
        let Some(cloned) = request.try_clone() else {
            return request.send().await.map_err(DirectoryError::Http);
        };

        match cloned.send().await {
            Ok(response) => {
                let status = response.status();
                if retry_decision_for_status(status) == RetryDecision::Retryable
                    && attempt < attempts
                {
                    let delay = retry_delay(
                        attempt,
                        policy,
                        response.headers().get(reqwest::header::RETRY_AFTER),
                    );
                    log::warn!(
                        "directory retry {}/{} after status {} (sleep {:?})",
                        attempt,
                        attempts,
                        status,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Ok(response);
            }
            Err(err) => {
                let retryable_transport = err.is_timeout() || err.is_connect();
                if retryable_transport && attempt < attempts {
                    let delay = retry_delay(attempt, policy, None);
                    log::warn!(
                        "directory retry {}/{} after transport error: {} (sleep {:?})",
                        attempt,
                        attempts,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Err(DirectoryError::Http(err));
            }
        }
    }

    Err(DirectoryError::InvalidResponse(
        "request exhausted retries".to_string(),
    ))
}

// ============================================================================
// Service trait
// ============================================================================

/// The remote directory, seen from the client.
///
/// All methods are suspension points; nothing here blocks the interface.
#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// Search for candidates matching a free-text query.
    async fn search_candidates(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<Candidate>, DirectoryError>;

    /// Check whether any existing party already holds this phone number.
    async fn check_duplicate(&self, phone: &str) -> Result<DuplicateCheck, DirectoryError>;

    /// Create a new entity.
    async fn create_entity(&self, payload: &EntityPayload) -> Result<SavedEntity, DirectoryError>;

    /// Update an existing entity.
    async fn update_entity(
        &self,
        id: &str,
        payload: &EntityPayload,
    ) -> Result<SavedEntity, DirectoryError>;
}
