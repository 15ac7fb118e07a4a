//! Party form state machine.
//!
//! States: Closed -> Editing(Quick|Full) -> Submitting -> Success ->
//! Closed, with failures landing back in Editing carrying a
//! field-scoped error. Mode toggling is disabled mid-submit. Opening
//! for an existing party forces Full mode; opening fresh resets every
//! field.
//!
//! The submission path runs: local validation -> remote duplicate check
//! (only when the primary phone is new or changed) -> merge draft and
//! linkage into the wire payload -> create or update -> finalize. On
//! success the finalized `Party` goes to the caller and the form closes
//! itself after a short fixed delay; on failure the error is classified
//! and the form stays open and editable.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::Config;
use crate::directory::{DirectoryError, DirectoryService, EntityPayload, SavedEntity};
use crate::error::{DraftField, PartyFlowError};
use crate::events::EventSink;
use crate::guard;
use crate::linkage;
use crate::search::session::SearchSession;
use crate::types::{
    Candidate, FormMode, Party, PartyDraft, PartyRole, SaveConfirmation,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    Closed,
    Editing(FormMode),
    Submitting,
    /// Submitted successfully; auto-closes after the configured delay.
    Success,
}

/// A submit failure, kept on the form for field-scoped rendering.
#[derive(Debug, Clone)]
pub struct FormError {
    pub field: Option<DraftField>,
    pub message: String,
}

#[derive(Debug, Clone, Copy)]
pub struct FormSettings {
    pub auto_close: Duration,
    pub default_mode: FormMode,
}

impl Default for FormSettings {
    fn default() -> Self {
        Self {
            auto_close: Duration::from_millis(900),
            default_mode: FormMode::Quick,
        }
    }
}

impl FormSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            auto_close: Duration::from_millis(config.auto_close_ms),
            ..Default::default()
        }
    }
}

struct FormInner {
    state: FormState,
    draft: Option<PartyDraft>,
    /// Primary phone at open time; an unchanged phone on edit skips the
    /// remote duplicate check.
    original_phone: Option<String>,
    last_error: Option<FormError>,
    /// Bumped on every open/cancel so a stale auto-close task from a
    /// previous submission cannot close a reopened form.
    epoch: u64,
}

pub struct PartyForm {
    directory: Arc<dyn DirectoryService>,
    sink: Arc<dyn EventSink>,
    settings: FormSettings,
    session: Mutex<Option<Arc<SearchSession>>>,
    inner: Mutex<FormInner>,
}

impl PartyForm {
    pub fn new(
        directory: Arc<dyn DirectoryService>,
        sink: Arc<dyn EventSink>,
        settings: FormSettings,
    ) -> Arc<Self> {
        Arc::new(Self {
            directory,
            sink,
            settings,
            session: Mutex::new(None),
            inner: Mutex::new(FormInner {
                state: FormState::Closed,
                draft: None,
                original_phone: None,
                last_error: None,
                epoch: 0,
            }),
        })
    }

    /// Attach the search session whose suggestion surface feeds this
    /// form. The form resets it on open, mode switch, and close.
    pub fn attach_session(&self, session: Arc<SearchSession>) {
        *self.session.lock() = Some(session);
    }

    fn reset_session(&self) {
        if let Some(session) = self.session.lock().as_ref() {
            session.reset();
        }
    }

    // -----------------------------------------------------------------------
    // Opening, closing, mode
    // -----------------------------------------------------------------------

    /// Open fresh with every field reset. Returns false while a
    /// submission is in flight.
    pub fn open_new(&self, role: PartyRole) -> bool {
        {
            let mut inner = self.inner.lock();
            if inner.state == FormState::Submitting {
                log::warn!("PartyForm: open requested mid-submit, ignoring");
                return false;
            }
            inner.epoch += 1;
            inner.state = FormState::Editing(self.settings.default_mode);
            inner.draft = Some(PartyDraft::new(role, self.settings.default_mode));
            inner.original_phone = None;
            inner.last_error = None;
        }
        self.reset_session();
        true
    }

    /// Open an existing party for editing. Always Full mode, whatever
    /// the default; linkage rides along verbatim.
    pub fn open_for_edit(&self, party: &Party) -> bool {
        {
            let mut inner = self.inner.lock();
            if inner.state == FormState::Submitting {
                log::warn!("PartyForm: open requested mid-submit, ignoring");
                return false;
            }
            inner.epoch += 1;
            inner.state = FormState::Editing(FormMode::Full);
            inner.original_phone = Some(party.primary_phone().to_string());
            inner.draft = Some(PartyDraft::from_party(party));
            inner.last_error = None;
        }
        self.reset_session();
        true
    }

    /// Toggle quick/full. Disabled mid-submit (returns None). The
    /// attached session resets so the two modes never share a
    /// suggestion list.
    pub fn toggle_mode(&self) -> Option<FormMode> {
        let next = {
            let mut inner = self.inner.lock();
            let FormState::Editing(mode) = inner.state else {
                log::debug!("PartyForm: mode toggle rejected in {:?}", inner.state);
                return None;
            };
            let next = match mode {
                FormMode::Quick => FormMode::Full,
                FormMode::Full => FormMode::Quick,
            };
            inner.state = FormState::Editing(next);
            if let Some(draft) = inner.draft.as_mut() {
                draft.mode = next;
            }
            next
        };
        self.reset_session();
        Some(next)
    }

    /// Discard the draft and close.
    pub fn cancel(&self) {
        {
            let mut inner = self.inner.lock();
            inner.epoch += 1;
            inner.state = FormState::Closed;
            inner.draft = None;
            inner.original_phone = None;
            inner.last_error = None;
        }
        self.reset_session();
    }

    // -----------------------------------------------------------------------
    // Draft access
    // -----------------------------------------------------------------------

    /// Apply a user edit to the draft. Returns false when no draft is
    /// editable (closed or mid-submit).
    pub fn update_draft(&self, edit: impl FnOnce(&mut PartyDraft)) -> bool {
        let mut inner = self.inner.lock();
        if !matches!(inner.state, FormState::Editing(_)) {
            return false;
        }
        match inner.draft.as_mut() {
            Some(draft) => {
                edit(draft);
                true
            }
            None => false,
        }
    }

    /// Adopt a committed candidate into the draft (linkage + snapshot
    /// for external companies).
    pub fn adopt_candidate(&self, candidate: &Candidate) -> bool {
        self.update_draft(|draft| linkage::adopt_candidate(draft, candidate))
    }

    /// Explicitly clear the draft's external link.
    pub fn clear_link(&self) -> bool {
        self.update_draft(linkage::clear_link)
    }

    pub fn state(&self) -> FormState {
        self.inner.lock().state
    }

    pub fn draft(&self) -> Option<PartyDraft> {
        self.inner.lock().draft.clone()
    }

    pub fn last_error(&self) -> Option<FormError> {
        self.inner.lock().last_error.clone()
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    /// Validate, duplicate-check, and send the draft. On success the
    /// finalized party is returned (and emitted) and the form closes
    /// itself after the configured delay. On failure the form stays in
    /// Editing with a field-scoped error.
    pub async fn submit(self: &Arc<Self>) -> Result<Party, PartyFlowError> {
        let (draft, phone_changed, epoch) = {
            let mut inner = self.inner.lock();
            let FormState::Editing(_) = inner.state else {
                log::warn!("PartyForm: submit rejected in {:?}", inner.state);
                return Err(PartyFlowError::submission("form is not open for editing"));
            };
            let Some(draft) = inner.draft.clone() else {
                return Err(PartyFlowError::submission("no draft to submit"));
            };
            let phone_changed =
                inner.original_phone.as_deref() != Some(draft.primary_phone());
            inner.state = FormState::Submitting;
            inner.last_error = None;
            (draft, phone_changed, inner.epoch)
        };

        let is_new = draft.is_new();
        match self.run_submission(&draft, phone_changed).await {
            Ok(party) => {
                {
                    let mut inner = self.inner.lock();
                    inner.state = FormState::Success;
                    inner.draft = None;
                    inner.original_phone = None;
                }
                log::info!(
                    "PartyForm: saved party {:?} ({})",
                    party.id,
                    if is_new { "created" } else { "updated" }
                );
                self.sink.draft_saved(&party, is_new);
                self.schedule_auto_close(epoch);
                Ok(party)
            }
            Err(err) => {
                {
                    let mut inner = self.inner.lock();
                    inner.state = FormState::Editing(draft.mode);
                    inner.last_error = Some(FormError {
                        field: err.field(),
                        message: err.to_string(),
                    });
                }
                self.sink.error(&err.to_string(), err.severity());
                Err(err)
            }
        }
    }

    async fn run_submission(
        &self,
        draft: &PartyDraft,
        phone_changed: bool,
    ) -> Result<Party, PartyFlowError> {
        guard::validate_draft(draft)?;

        if draft.is_new() || phone_changed {
            guard::check_remote_duplicate(self.directory.as_ref(), draft.primary_phone()).await?;
        } else {
            log::debug!("PartyForm: phone unchanged, skipping duplicate check");
        }

        let payload = build_payload(draft);
        let sent = match &draft.party_id {
            Some(id) => self.directory.update_entity(id, &payload).await,
            None => self.directory.create_entity(&payload).await,
        };

        let saved = sent.map_err(|e| match e {
            DirectoryError::Rejected(message) => PartyFlowError::submission(message),
            DirectoryError::Api { message, .. } => PartyFlowError::submission(message),
            other => PartyFlowError::submission(other.to_string()),
        })?;

        if !saved.success {
            let message = saved
                .message
                .unwrap_or_else(|| "create/update reported failure".to_string());
            return Err(PartyFlowError::submission(message));
        }

        Ok(finalize_party(draft, saved))
    }

    fn schedule_auto_close(self: &Arc<Self>, epoch: u64) {
        let form = Arc::clone(self);
        let delay = self.settings.auto_close;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut inner = form.inner.lock();
                if inner.epoch != epoch || inner.state != FormState::Success {
                    return;
                }
                inner.state = FormState::Closed;
            }
            form.reset_session();
        });
    }
}

/// Merge a draft and its linkage into the wire payload.
fn build_payload(draft: &PartyDraft) -> EntityPayload {
    EntityPayload {
        display_name: draft.display_name.clone(),
        company_name: draft.company_name.clone(),
        tax_registered: draft.tax_registered,
        tax_id: draft.tax_id.clone(),
        email: draft.email.clone(),
        phone_numbers: draft.phone_numbers.clone(),
        home_address: draft.home_address.clone(),
        delivery_address: draft.delivery_address.clone(),
        locality: draft.locality.clone(),
        opening_balance: draft.opening_balance,
        credit_limit: draft.credit_limit,
        role: draft.role,
        linkage: draft.linkage.clone(),
    }
}

/// Merge server-assigned identifiers, timestamps, and linking info into
/// the finalized party.
///
/// A success without an entity body becomes a Pending confirmation; no
/// identifier is manufactured for it.
fn finalize_party(draft: &PartyDraft, saved: SavedEntity) -> Party {
    let mut linkage = draft.linkage.clone();
    let entity = saved.entity.filter(|body| !body.id.is_empty());

    if let Some(link) = linkage.as_mut() {
        if let Some(info) = saved.linking_info.as_ref() {
            // Server-owned: whatever came back is the truth.
            link.verified = info.verified;
        }
        if link.local_party_id.is_none() {
            link.local_party_id = entity
                .as_ref()
                .map(|body| body.id.clone())
                .or_else(|| draft.party_id.clone());
        }
    }

    let (id, confirmation, created_at, updated_at) = match entity {
        Some(body) => (
            Some(body.id),
            SaveConfirmation::Confirmed,
            body.created_at,
            body.updated_at,
        ),
        None => (draft.party_id.clone(), SaveConfirmation::Pending, None, None),
    };

    Party {
        id,
        confirmation,
        display_name: draft.display_name.clone(),
        company_name: draft.company_name.clone(),
        tax_registered: draft.tax_registered,
        tax_id: draft.tax_id.clone(),
        email: draft.email.clone(),
        phone_numbers: draft.phone_numbers.clone(),
        home_address: draft.home_address.clone(),
        delivery_address: draft.delivery_address.clone(),
        locality: draft.locality.clone(),
        opening_balance: draft.opening_balance,
        credit_limit: draft.credit_limit,
        role: draft.role,
        linkage,
        created_at,
        updated_at,
    }
}
