//! Host-facing events.
//!
//! The hosting UI owns rendering; this crate only reports what happened.
//! `EventSink` is the seam: the host implements it (or takes the
//! channel-backed sink) and receives selection, save, and error
//! notifications as they occur.

use serde::Serialize;
use tokio::sync::mpsc;

use crate::error::Severity;
use crate::types::{Candidate, Party};

/// Receiver interface implemented by the hosting UI.
pub trait EventSink: Send + Sync {
    /// A candidate was committed from the suggestion list.
    fn entity_selected(&self, candidate: &Candidate);

    /// A draft was saved. `is_new` distinguishes create from update.
    fn draft_saved(&self, party: &Party, is_new: bool);

    /// A user-visible error. Severity tells the host how loudly to render.
    fn error(&self, message: &str, severity: Severity);
}

/// Sink that drops everything. Useful for headless flows and tests that
/// assert through state instead of events.
pub struct NullSink;

impl EventSink for NullSink {
    fn entity_selected(&self, _candidate: &Candidate) {}
    fn draft_saved(&self, _party: &Party, _is_new: bool) {}
    fn error(&self, _message: &str, _severity: Severity) {}
}

/// One emitted event, as carried by `ChannelSink`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum SessionEvent {
    EntitySelected {
        candidate: Candidate,
    },
    DraftSaved {
        party: Party,
        is_new: bool,
    },
    Error {
        message: String,
        severity: Severity,
    },
}

/// Sink that forwards events over an unbounded channel. The receiving
/// half lives with the host's event loop.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn entity_selected(&self, candidate: &Candidate) {
        let _ = self.tx.send(SessionEvent::EntitySelected {
            candidate: candidate.clone(),
        });
    }

    fn draft_saved(&self, party: &Party, is_new: bool) {
        let _ = self.tx.send(SessionEvent::DraftSaved {
            party: party.clone(),
            is_new,
        });
    }

    fn error(&self, message: &str, severity: Severity) {
        let _ = self.tx.send(SessionEvent::Error {
            message: message.to_string(),
            severity,
        });
    }
}
