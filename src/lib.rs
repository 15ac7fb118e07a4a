//! PartyBook client core: party directory search, duplicate guarding,
//! and supplier linking for a business-management app (invoicing,
//! purchasing, party bookkeeping).
//!
//! The hosting UI owns rendering and layout. This crate owns the
//! interesting invariants behind the party picker and the add/edit
//! form:
//!
//! - `search`: debounced directory lookups with last-query-wins
//!   ordering, a scoped-to-cached fallback cascade, and the ranked,
//!   deduplicated suggestion list with its keyboard cursor
//! - `guard`: local pattern validation plus the fail-open remote
//!   duplicate check that runs before any create/update
//! - `linkage`: adopting an external company as a counterparty,
//!   bidirectional-order eligibility, snapshot precedence
//! - `form`: the quick-add/full-add state machine and the submission
//!   pipeline
//! - `directory`: the remote service boundary (trait, HTTP client,
//!   tolerant normalizer)
//!
//! Hosts construct a `SearchSession` and a `PartyForm` over a
//! `DirectoryService` and receive results through an `EventSink`.

pub mod config;
pub mod directory;
pub mod error;
pub mod events;
pub mod form;
pub mod guard;
pub mod linkage;
pub mod search;
pub mod types;

pub use config::{load_config, Config};
pub use directory::{DirectoryService, SearchOptions, SearchScope};
pub use error::{DraftField, PartyFlowError, Severity, SubmissionKind};
pub use events::{ChannelSink, EventSink, NullSink, SessionEvent};
pub use form::{FormError, FormSettings, FormState, PartyForm};
pub use search::session::{SearchSession, SearchSettings, SelectionGuard};
pub use search::suggest::{Commit, SuggestionEntry};
pub use types::{
    Candidate, FormMode, LinkState, LinkageRecord, Party, PartyDraft, PartyRole, SaveConfirmation,
    SourceKind,
};
