//! HTTP implementation of `DirectoryService`.
//!
//! Endpoints:
//! - `GET  /entities/search`            query, scope, entityType, strategy, limit
//! - `GET  /entities/duplicate-check`   phone
//! - `POST /entities`                   create
//! - `PUT  /entities/{id}`              update

use async_trait::async_trait;
use url::Url;

use super::normalize::{normalize_envelope, SearchEnvelope};
use super::{
    send_with_retry, DirectoryError, DirectoryService, DuplicateCheck, EntityPayload, RetryPolicy,
    SavedEntity, SearchOptions, SearchScope,
};
use crate::types::{Candidate, SourceKind};

pub struct HttpDirectoryService {
    client: reqwest::Client,
    base_url: Url,
    api_token: Option<String>,
    retry: RetryPolicy,
}

impl HttpDirectoryService {
    pub fn new(base_url: &str, api_token: Option<String>) -> Result<Self, DirectoryError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| DirectoryError::InvalidBaseUrl(format!("{}: {}", base_url, e)))?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            api_token,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url, DirectoryError> {
        self.base_url
            .join(path)
            .map_err(|e| DirectoryError::InvalidBaseUrl(format!("{}: {}", path, e)))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn read_body(response: reqwest::Response) -> Result<String, DirectoryError> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(DirectoryError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(body)
    }
}

/// What a record defaults to when it does not carry its own source tag.
fn default_kind_for_scope(scope: SearchScope) -> SourceKind {
    match scope {
        SearchScope::External | SearchScope::Verified => SourceKind::External,
        SearchScope::Internal | SearchScope::All => SourceKind::Internal,
    }
}

#[async_trait]
impl DirectoryService for HttpDirectoryService {
    async fn search_candidates(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<Candidate>, DirectoryError> {
        let url = self.endpoint("entities/search")?;
        let limit = options.limit.to_string();
        let request = self.authorize(self.client.get(url)).query(&[
            ("query", query),
            ("scope", options.scope.as_str()),
            ("entityType", options.entity_kind.as_str()),
            ("strategy", options.strategy.as_str()),
            ("limit", limit.as_str()),
        ]);

        let response = send_with_retry(request, &self.retry).await?;
        let body = Self::read_body(response).await?;

        let envelope: SearchEnvelope = serde_json::from_str(&body)
            .map_err(|e| DirectoryError::InvalidResponse(format!("search: {}", e)))?;
        if !envelope.success {
            let message = envelope
                .message
                .clone()
                .unwrap_or_else(|| "search reported failure".to_string());
            return Err(DirectoryError::Rejected(message));
        }

        Ok(normalize_envelope(
            envelope,
            default_kind_for_scope(options.scope),
        ))
    }

    async fn check_duplicate(&self, phone: &str) -> Result<DuplicateCheck, DirectoryError> {
        let url = self.endpoint("entities/duplicate-check")?;
        let request = self
            .authorize(self.client.get(url))
            .query(&[("phone", phone)]);

        let response = send_with_retry(request, &self.retry).await?;
        let body = Self::read_body(response).await?;

        serde_json::from_str(&body)
            .map_err(|e| DirectoryError::InvalidResponse(format!("duplicate-check: {}", e)))
    }

    async fn create_entity(&self, payload: &EntityPayload) -> Result<SavedEntity, DirectoryError> {
        let url = self.endpoint("entities")?;
        let request = self.authorize(self.client.post(url)).json(payload);

        let response = send_with_retry(request, &self.retry).await?;
        let body = Self::read_body(response).await?;

        serde_json::from_str(&body)
            .map_err(|e| DirectoryError::InvalidResponse(format!("create: {}", e)))
    }

    async fn update_entity(
        &self,
        id: &str,
        payload: &EntityPayload,
    ) -> Result<SavedEntity, DirectoryError> {
        let url = self.endpoint(&format!("entities/{}", id))?;
        let request = self.authorize(self.client.put(url)).json(payload);

        let response = send_with_retry(request, &self.retry).await?;
        let body = Self::read_body(response).await?;

        serde_json::from_str(&body)
            .map_err(|e| DirectoryError::InvalidResponse(format!("update: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_malformed_base_url() {
        assert!(HttpDirectoryService::new("not a url", None).is_err());
        assert!(HttpDirectoryService::new("https://directory.example/api/", None).is_ok());
    }

    #[test]
    fn test_endpoint_join() {
        let service =
            HttpDirectoryService::new("https://directory.example/api/", None).unwrap();
        let url = service.endpoint("entities/search").unwrap();
        assert_eq!(url.as_str(), "https://directory.example/api/entities/search");
    }

    #[test]
    fn test_default_kind_follows_scope() {
        assert_eq!(
            default_kind_for_scope(SearchScope::External),
            SourceKind::External
        );
        assert_eq!(
            default_kind_for_scope(SearchScope::Verified),
            SourceKind::External
        );
        assert_eq!(
            default_kind_for_scope(SearchScope::Internal),
            SourceKind::Internal
        );
        assert_eq!(default_kind_for_scope(SearchScope::All), SourceKind::Internal);
    }
}
