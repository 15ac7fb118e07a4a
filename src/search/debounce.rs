//! Debounce gate for the query scheduler.
//!
//! Every input change takes a `LookupTicket` capturing the generation
//! counter and the query text at that instant. A lookup task sleeps for
//! the quiet window, then checks its ticket: if any newer input (or a
//! reset) bumped the generation, the ticket is stale and the task exits
//! without side effects. The same check runs again when the lookup
//! resolves, so a superseded response is filtered at application time
//! rather than relying on network cancellation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

/// A captured (generation, query) token for one scheduled lookup.
#[derive(Debug, Clone)]
pub struct LookupTicket {
    pub generation: u64,
    pub query: String,
}

pub struct DebounceGate {
    window: Duration,
    generation: AtomicU64,
    live_query: Mutex<String>,
}

impl DebounceGate {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            generation: AtomicU64::new(0),
            live_query: Mutex::new(String::new()),
        }
    }

    /// Record a keystroke: store the live query, bump the generation,
    /// and hand back the ticket the lookup task will carry.
    pub fn note_input(&self, query: &str) -> LookupTicket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.live_query.lock() = query.to_string();
        LookupTicket {
            generation,
            query: query.to_string(),
        }
    }

    /// Programmatic rewrite of the query (applying a selection). Bumps
    /// the generation so in-flight lookups for older text are dropped,
    /// but issues no ticket: no lookup is scheduled for this write.
    pub fn overwrite_query(&self, query: &str) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.live_query.lock() = query.to_string();
    }

    /// Invalidate everything in flight and clear the query. Called on
    /// teardown and on form-mode switch.
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.live_query.lock().clear();
    }

    /// Sleep out the quiet window, then report whether the ticket is
    /// still the latest. A stale ticket means a newer keystroke landed
    /// during the sleep.
    pub async fn wait(&self, ticket: &LookupTicket) -> bool {
        tokio::time::sleep(self.window).await;
        self.is_current(ticket)
    }

    /// Whether a ticket still matches both the live generation and the
    /// live query text.
    pub fn is_current(&self, ticket: &LookupTicket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.generation
            && *self.live_query.lock() == ticket.query
    }

    pub fn live_query(&self) -> String {
        self.live_query.lock().clone()
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}
