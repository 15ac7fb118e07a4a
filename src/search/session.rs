//! Search session: wires the debounce gate, the fallback cascade, and
//! the suggestion list behind one handle the hosting UI talks to.
//!
//! Single logical thread of execution: every remote call is an await
//! point inside a spawned lookup task; nothing blocks the interface.
//! The last-issued query always wins, enforced by ticket checks at wake
//! time and again at application time.
//!
//! Applying a selection programmatically rewrites the search field.
//! That write must not re-trigger the reactive lookup path, so it
//! happens inside an explicit guard state (`SelectionGuard`, RAII)
//! entered atomically around the write. `input_changed` observes the
//! guard and returns without scheduling.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::Config;
use crate::directory::{DirectoryService, EntityKind, SearchOptions, SearchScope, SearchStrategy};
use crate::error::PartyFlowError;
use crate::events::EventSink;
use crate::search::cascade::{FallbackCascade, SharedCandidateCache};
use crate::search::debounce::{DebounceGate, LookupTicket};
use crate::search::suggest::{Commit, SuggestionEntry, SuggestionList};
use crate::types::Candidate;

/// Tunables for one session.
#[derive(Debug, Clone, Copy)]
pub struct SearchSettings {
    pub debounce: Duration,
    pub min_query_len: usize,
    pub limit: usize,
    pub scope: SearchScope,
    pub entity_kind: EntityKind,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(350),
            min_query_len: 2,
            limit: 20,
            scope: SearchScope::All,
            entity_kind: EntityKind::Any,
        }
    }
}

impl SearchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            debounce: Duration::from_millis(config.debounce_ms),
            min_query_len: config.min_query_len,
            limit: config.search_limit,
            ..Default::default()
        }
    }

    pub fn scoped(mut self, scope: SearchScope, entity_kind: EntityKind) -> Self {
        self.scope = scope;
        self.entity_kind = entity_kind;
        self
    }
}

/// RAII guard for the applying-selection state. While any guard is
/// alive, reactive input changes are ignored. The counter (rather than
/// a bool) keeps nested applications safe.
pub struct SelectionGuard {
    depth: Arc<AtomicUsize>,
}

impl SelectionGuard {
    fn enter(depth: &Arc<AtomicUsize>) -> Self {
        depth.fetch_add(1, Ordering::SeqCst);
        Self {
            depth: Arc::clone(depth),
        }
    }
}

impl Drop for SelectionGuard {
    fn drop(&mut self) {
        self.depth.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct SearchSession {
    directory: Arc<dyn DirectoryService>,
    sink: Arc<dyn EventSink>,
    settings: SearchSettings,
    gate: DebounceGate,
    cache: SharedCandidateCache,
    list: Mutex<SuggestionList>,
    selection_depth: Arc<AtomicUsize>,
}

impl SearchSession {
    pub fn new(
        directory: Arc<dyn DirectoryService>,
        sink: Arc<dyn EventSink>,
        settings: SearchSettings,
    ) -> Arc<Self> {
        Arc::new(Self {
            directory,
            sink,
            settings,
            gate: DebounceGate::new(settings.debounce),
            cache: Arc::new(Mutex::new(Vec::new())),
            list: Mutex::new(SuggestionList::new()),
            selection_depth: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Reactive entry point for every keystroke.
    ///
    /// Must run inside a tokio runtime: a qualifying input spawns the
    /// debounced lookup task.
    pub fn input_changed(self: &Arc<Self>, text: &str) {
        if self.is_applying_selection() {
            log::debug!("SearchSession: input change during selection apply, ignoring");
            return;
        }

        let ticket = self.gate.note_input(text);

        if text.trim().chars().count() < self.settings.min_query_len {
            self.list.lock().clear();
            return;
        }

        let session = Arc::clone(self);
        tokio::spawn(async move {
            session.run_lookup(ticket).await;
        });
    }

    async fn run_lookup(self: Arc<Self>, ticket: LookupTicket) {
        // Quiet window. A stale wake means a newer keystroke landed.
        if !self.gate.wait(&ticket).await {
            return;
        }

        let options = SearchOptions {
            scope: self.settings.scope,
            entity_kind: self.settings.entity_kind,
            strategy: SearchStrategy::Name,
            limit: self.settings.limit,
        };
        let cascade = FallbackCascade::standard(
            Arc::clone(&self.directory),
            options,
            Arc::clone(&self.cache),
        );

        let outcome = cascade.run(&ticket.query).await;

        // Resolution-time check: a superseded lookup's result is
        // dropped, not applied.
        if !self.gate.is_current(&ticket) {
            log::debug!(
                "SearchSession: dropping superseded result for {:?}",
                ticket.query
            );
            return;
        }

        match outcome {
            Ok(outcome) => {
                if !outcome.from_cache && !outcome.candidates.is_empty() {
                    *self.cache.lock() = outcome.candidates.clone();
                }
                self.list.lock().rebuild(
                    outcome.candidates,
                    &ticket.query,
                    self.settings.min_query_len,
                );
            }
            Err(e) => {
                log::warn!("SearchSession: lookup exhausted all fallbacks: {}", e);
                let err = PartyFlowError::Lookup(e);
                self.sink.error(&err.to_string(), err.severity());
            }
        }
    }

    // -----------------------------------------------------------------------
    // Keyboard and focus
    // -----------------------------------------------------------------------

    pub fn move_down(&self) {
        self.list.lock().move_down();
    }

    pub fn move_up(&self) {
        self.list.lock().move_up();
    }

    /// Enter. Committing a candidate rewrites the search field under the
    /// selection guard and notifies the host; committing the synthetic
    /// entry hands the create-new request back to the caller.
    pub fn commit(self: &Arc<Self>) -> Option<Commit> {
        let commit = self.list.lock().commit()?;
        if let Commit::Selected(candidate) = &commit {
            let _guard = self.begin_apply_selection();
            self.gate.overwrite_query(&candidate.display_name);
            self.sink.entity_selected(candidate);
        }
        Some(commit)
    }

    pub fn escape(&self) {
        self.list.lock().on_escape();
    }

    pub fn blur(&self, landed_on_surface: bool) {
        self.list.lock().on_blur(landed_on_surface);
    }

    // -----------------------------------------------------------------------
    // Selection guard
    // -----------------------------------------------------------------------

    /// Enter the applying-selection state. Hold the returned guard for
    /// the full extent of the programmatic field write and any reactive
    /// echo it produces.
    pub fn begin_apply_selection(&self) -> SelectionGuard {
        SelectionGuard::enter(&self.selection_depth)
    }

    pub fn is_applying_selection(&self) -> bool {
        self.selection_depth.load(Ordering::SeqCst) > 0
    }

    // -----------------------------------------------------------------------
    // Lifecycle and state access
    // -----------------------------------------------------------------------

    /// Invalidate in-flight lookups and clear the list. Called on
    /// teardown and on form-mode switch so the quick-add and full-add
    /// surfaces never cross-contaminate.
    pub fn reset(&self) {
        self.gate.reset();
        self.list.lock().clear();
    }

    pub fn suggestions(&self) -> Vec<SuggestionEntry> {
        self.list.lock().entries().to_vec()
    }

    pub fn cursor(&self) -> isize {
        self.list.lock().cursor()
    }

    pub fn live_query(&self) -> String {
        self.gate.live_query()
    }

    /// Snapshot of the cached full candidate list.
    pub fn cached_candidates(&self) -> Vec<Candidate> {
        self.cache.lock().clone()
    }

    /// Prime the cached list (e.g. from a bulk fetch the host already
    /// did). Replaces wholesale, like any completed lookup.
    pub fn seed_cache(&self, candidates: Vec<Candidate>) {
        *self.cache.lock() = candidates;
    }
}
