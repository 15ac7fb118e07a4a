//! Fallback cascade for candidate lookups.
//!
//! One lookup is an ordered list of interchangeable strategies sharing a
//! single result contract. Each strategy runs only when the previous one
//! returned successful-but-empty or failed:
//!
//! 1. Scoped: the caller's scope/entity-type filter
//! 2. Broad: all scopes, all entity types
//! 3. Contact: alternate server strategy matching phone/email/tax id
//! 4. CachedFilter: client-side substring filter over the last
//!    successfully fetched full list (no network)
//!
//! Per-step failures are logged and absorbed; a `LookupError` surfaces
//! only when every strategy is exhausted and at least one failed.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::directory::{
    DirectoryError, DirectoryService, EntityKind, SearchOptions, SearchScope, SearchStrategy,
};
use crate::search::suggest::normalize_match_key;
use crate::types::Candidate;

/// The last successfully fetched full candidate list, shared between the
/// session and the cascade. Overwritten wholesale, never partially
/// merged.
pub type SharedCandidateCache = Arc<Mutex<Vec<Candidate>>>;

/// One interchangeable lookup step.
#[async_trait]
pub trait LookupStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether results come from the local cache rather than the
    /// network. Cache hits must not overwrite the cache they came from.
    fn is_cached(&self) -> bool {
        false
    }

    async fn run(&self, query: &str) -> Result<Vec<Candidate>, DirectoryError>;
}

/// Step 1: the caller's own scope and entity-type filter.
pub struct ScopedLookup {
    pub directory: Arc<dyn DirectoryService>,
    pub options: SearchOptions,
}

#[async_trait]
impl LookupStrategy for ScopedLookup {
    fn name(&self) -> &'static str {
        "scoped"
    }

    async fn run(&self, query: &str) -> Result<Vec<Candidate>, DirectoryError> {
        self.directory.search_candidates(query, &self.options).await
    }
}

/// Step 2: widen to every scope and entity type.
pub struct BroadLookup {
    pub directory: Arc<dyn DirectoryService>,
    pub limit: usize,
}

#[async_trait]
impl LookupStrategy for BroadLookup {
    fn name(&self) -> &'static str {
        "broad"
    }

    async fn run(&self, query: &str) -> Result<Vec<Candidate>, DirectoryError> {
        let options = SearchOptions {
            scope: SearchScope::All,
            entity_kind: EntityKind::Any,
            strategy: SearchStrategy::Name,
            limit: self.limit,
        };
        self.directory.search_candidates(query, &options).await
    }
}

/// Step 3: alternate server strategy over contact fields.
pub struct ContactLookup {
    pub directory: Arc<dyn DirectoryService>,
    pub limit: usize,
}

#[async_trait]
impl LookupStrategy for ContactLookup {
    fn name(&self) -> &'static str {
        "contact"
    }

    async fn run(&self, query: &str) -> Result<Vec<Candidate>, DirectoryError> {
        let options = SearchOptions {
            scope: SearchScope::All,
            entity_kind: EntityKind::Any,
            strategy: SearchStrategy::Contact,
            limit: self.limit,
        };
        self.directory.search_candidates(query, &options).await
    }
}

/// Step 4: no network left to try; filter the cached full list.
pub struct CachedFilter {
    pub cache: SharedCandidateCache,
}

#[async_trait]
impl LookupStrategy for CachedFilter {
    fn name(&self) -> &'static str {
        "cached-filter"
    }

    fn is_cached(&self) -> bool {
        true
    }

    async fn run(&self, query: &str) -> Result<Vec<Candidate>, DirectoryError> {
        let key = normalize_match_key(query);
        let cached = self.cache.lock();
        Ok(cached
            .iter()
            .filter(|c| {
                key.is_empty()
                    || normalize_match_key(&c.display_name).contains(&key)
                    || normalize_match_key(&c.company_name).contains(&key)
            })
            .cloned()
            .collect())
    }
}

/// Result of a full cascade run.
#[derive(Debug)]
pub struct CascadeOutcome {
    pub candidates: Vec<Candidate>,
    /// Name of the strategy that produced the candidates.
    pub strategy: &'static str,
    /// True when the candidates came from the local cache.
    pub from_cache: bool,
}

pub struct FallbackCascade {
    strategies: Vec<Box<dyn LookupStrategy>>,
}

impl FallbackCascade {
    pub fn new(strategies: Vec<Box<dyn LookupStrategy>>) -> Self {
        Self { strategies }
    }

    /// The standard four-step cascade.
    pub fn standard(
        directory: Arc<dyn DirectoryService>,
        options: SearchOptions,
        cache: SharedCandidateCache,
    ) -> Self {
        Self::new(vec![
            Box::new(ScopedLookup {
                directory: Arc::clone(&directory),
                options,
            }),
            Box::new(BroadLookup {
                directory: Arc::clone(&directory),
                limit: options.limit,
            }),
            Box::new(ContactLookup {
                directory,
                limit: options.limit,
            }),
            Box::new(CachedFilter { cache }),
        ])
    }

    /// Run strategies in order until one yields candidates.
    ///
    /// Empty success everywhere is a legitimate "no results" (Ok with an
    /// empty list); an error is returned only when every strategy came
    /// up empty and at least one failed.
    pub async fn run(&self, query: &str) -> Result<CascadeOutcome, DirectoryError> {
        let mut last_error: Option<DirectoryError> = None;

        for strategy in &self.strategies {
            match strategy.run(query).await {
                Ok(candidates) if !candidates.is_empty() => {
                    log::debug!(
                        "Cascade: {} produced {} candidate(s) for {:?}",
                        strategy.name(),
                        candidates.len(),
                        query
                    );
                    return Ok(CascadeOutcome {
                        candidates,
                        strategy: strategy.name(),
                        from_cache: strategy.is_cached(),
                    });
                }
                Ok(_) => {
                    log::debug!("Cascade: {} empty for {:?}, escalating", strategy.name(), query);
                }
                Err(e) => {
                    log::warn!("Cascade: {} failed for {:?}: {}", strategy.name(), query, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Ok(CascadeOutcome {
                candidates: Vec::new(),
                strategy: "exhausted",
                from_cache: false,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{DuplicateCheck, EntityPayload, SavedEntity};
    use crate::types::SourceKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn candidate(id: &str, name: &str) -> Candidate {
        Candidate {
            id: id.to_string(),
            display_name: name.to_string(),
            phone: String::new(),
            email: String::new(),
            company_name: String::new(),
            tax_id: String::new(),
            locality: String::new(),
            address: String::new(),
            balance: 0.0,
            credit_limit: 0.0,
            source_kind: SourceKind::Internal,
            auto_link_rules: None,
            raw: serde_json::Value::Null,
        }
    }

    /// Directory double scripted per (scope, strategy) slot.
    struct ScriptedDirectory {
        scoped: Result<Vec<Candidate>, u16>,
        broad: Result<Vec<Candidate>, u16>,
        contact: Result<Vec<Candidate>, u16>,
        calls: AtomicUsize,
    }

    impl ScriptedDirectory {
        fn new(
            scoped: Result<Vec<Candidate>, u16>,
            broad: Result<Vec<Candidate>, u16>,
            contact: Result<Vec<Candidate>, u16>,
        ) -> Self {
            Self {
                scoped,
                broad,
                contact,
                calls: AtomicUsize::new(0),
            }
        }

        fn slot(&self, options: &SearchOptions) -> &Result<Vec<Candidate>, u16> {
            if options.strategy == SearchStrategy::Contact {
                &self.contact
            } else if options.scope == SearchScope::All {
                &self.broad
            } else {
                &self.scoped
            }
        }
    }

    #[async_trait]
    impl DirectoryService for ScriptedDirectory {
        async fn search_candidates(
            &self,
            _query: &str,
            options: &SearchOptions,
        ) -> Result<Vec<Candidate>, DirectoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.slot(options) {
                Ok(v) => Ok(v.clone()),
                Err(status) => Err(DirectoryError::Api {
                    status: *status,
                    message: "scripted failure".to_string(),
                }),
            }
        }

        async fn check_duplicate(&self, _phone: &str) -> Result<DuplicateCheck, DirectoryError> {
            Ok(DuplicateCheck::default())
        }

        async fn create_entity(
            &self,
            _payload: &EntityPayload,
        ) -> Result<SavedEntity, DirectoryError> {
            Ok(SavedEntity::default())
        }

        async fn update_entity(
            &self,
            _id: &str,
            _payload: &EntityPayload,
        ) -> Result<SavedEntity, DirectoryError> {
            Ok(SavedEntity::default())
        }
    }

    fn supplier_options() -> SearchOptions {
        SearchOptions {
            scope: SearchScope::Internal,
            entity_kind: EntityKind::Supplier,
            strategy: SearchStrategy::Name,
            limit: 20,
        }
    }

    fn cache_with(candidates: Vec<Candidate>) -> SharedCandidateCache {
        Arc::new(Mutex::new(candidates))
    }

    #[tokio::test]
    async fn test_scoped_hit_stops_the_cascade() {
        let directory = Arc::new(ScriptedDirectory::new(
            Ok(vec![candidate("1", "Gupta Stores")]),
            Ok(vec![candidate("2", "should not be reached")]),
            Ok(Vec::new()),
        ));
        let cascade = FallbackCascade::standard(
            directory.clone(),
            supplier_options(),
            cache_with(Vec::new()),
        );

        let outcome = cascade.run("gupta").await.unwrap();
        assert_eq!(outcome.strategy, "scoped");
        assert_eq!(outcome.candidates.len(), 1);
        assert_eq!(directory.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_scoped_escalates_to_broad() {
        let directory = Arc::new(ScriptedDirectory::new(
            Ok(Vec::new()),
            Ok(vec![candidate("2", "Mehta Textiles")]),
            Ok(Vec::new()),
        ));
        let cascade = FallbackCascade::standard(
            directory.clone(),
            supplier_options(),
            cache_with(Vec::new()),
        );

        let outcome = cascade.run("mehta").await.unwrap();
        assert_eq!(outcome.strategy, "broad");
        assert_eq!(directory.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_scoped_escalates_like_empty() {
        let directory = Arc::new(ScriptedDirectory::new(
            Err(503),
            Ok(vec![candidate("2", "Mehta Textiles")]),
            Ok(Vec::new()),
        ));
        let cascade = FallbackCascade::standard(
            directory.clone(),
            supplier_options(),
            cache_with(Vec::new()),
        );

        let outcome = cascade.run("mehta").await.unwrap();
        assert_eq!(outcome.strategy, "broad");
    }

    #[tokio::test]
    async fn test_contact_strategy_is_third() {
        let directory = Arc::new(ScriptedDirectory::new(
            Ok(Vec::new()),
            Ok(Vec::new()),
            Ok(vec![candidate("3", "By Phone Match")]),
        ));
        let cascade = FallbackCascade::standard(
            directory.clone(),
            supplier_options(),
            cache_with(Vec::new()),
        );

        let outcome = cascade.run("98123").await.unwrap();
        assert_eq!(outcome.strategy, "contact");
        assert_eq!(directory.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cached_filter_is_last_resort() {
        let directory = Arc::new(ScriptedDirectory::new(Err(500), Err(500), Err(500)));
        let cache = cache_with(vec![
            candidate("1", "Gupta Stores"),
            candidate("2", "Mehta Textiles"),
        ]);
        let cascade =
            FallbackCascade::standard(directory.clone(), supplier_options(), cache);

        let outcome = cascade.run("gupta").await.unwrap();
        assert_eq!(outcome.strategy, "cached-filter");
        assert!(outcome.from_cache);
        assert_eq!(outcome.candidates.len(), 1);
        assert_eq!(outcome.candidates[0].id, "1");
    }

    #[tokio::test]
    async fn test_exhausted_with_error_surfaces_error() {
        let directory = Arc::new(ScriptedDirectory::new(Err(500), Err(502), Err(503)));
        let cascade = FallbackCascade::standard(
            directory.clone(),
            supplier_options(),
            cache_with(Vec::new()),
        );

        // Cache is empty too, so the whole cascade came up dry with
        // failures along the way.
        let result = cascade.run("gupta").await;
        assert!(matches!(result, Err(DirectoryError::Api { .. })));
    }

    #[tokio::test]
    async fn test_all_empty_without_errors_is_ok_empty() {
        let directory = Arc::new(ScriptedDirectory::new(
            Ok(Vec::new()),
            Ok(Vec::new()),
            Ok(Vec::new()),
        ));
        let cascade = FallbackCascade::standard(
            directory.clone(),
            supplier_options(),
            cache_with(Vec::new()),
        );

        let outcome = cascade.run("zzz").await.unwrap();
        assert!(outcome.candidates.is_empty());
        assert_eq!(outcome.strategy, "exhausted");
    }
}
