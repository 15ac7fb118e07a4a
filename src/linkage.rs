//! Linkage resolver.
//!
//! Adopting an external company as a counterparty produces two things:
//! a `LinkageRecord` (the durable association that downstream mirrored
//! order generation keys off) and a `LinkageSnapshot` (denormalized
//! business fields kept on the draft for offline display).
//!
//! Precedence on the draft is strict: explicit user edits beat the
//! snapshot, the snapshot beats defaults. The snapshot never overwrites
//! a value the user has already typed.
//!
//! Link states move Unlinked -> Linked(pending) -> Linked(verified).
//! Verification is assigned by the server; re-resolving the same company
//! locally never downgrades it.

use crate::types::{
    Candidate, LinkState, LinkageRecord, LinkageSnapshot, PartyDraft, PartyRole, SourceKind,
};

/// Build the linkage record for an adopted external candidate.
///
/// Bidirectional order generation is only ever enabled for suppliers;
/// a customer-role draft linking a company keeps it off.
pub fn resolve(candidate: &Candidate, role: PartyRole) -> LinkageRecord {
    LinkageRecord {
        local_party_id: None,
        external_company_id: candidate.id.clone(),
        auto_link_rules: candidate.auto_link_rules.unwrap_or_default(),
        bidirectional_orders_enabled: role == PartyRole::Supplier,
        verified: false,
    }
}

/// Like `resolve`, but carries server-owned fields over from an existing
/// record for the same company so re-edits round-trip them unchanged.
pub fn resolve_preserving(
    candidate: &Candidate,
    role: PartyRole,
    existing: Option<&LinkageRecord>,
) -> LinkageRecord {
    let mut record = resolve(candidate, role);
    if let Some(prev) = existing {
        if prev.external_company_id == record.external_company_id {
            record.verified = prev.verified;
            record.local_party_id = prev.local_party_id.clone();
        }
    }
    record
}

/// Snapshot the candidate's business fields for offline display.
pub fn snapshot(candidate: &Candidate) -> LinkageSnapshot {
    LinkageSnapshot {
        external_company_id: candidate.id.clone(),
        display_name: candidate.display_name.clone(),
        company_name: candidate.company_name.clone(),
        tax_id: candidate.tax_id.clone(),
        phone: candidate.phone.clone(),
        email: candidate.email.clone(),
        locality: candidate.locality.clone(),
        address: candidate.address.clone(),
        fetched_at: chrono::Utc::now().to_rfc3339(),
    }
}

fn fill_if_empty(slot: &mut String, value: &str) {
    if slot.trim().is_empty() && !value.is_empty() {
        *slot = value.to_string();
    }
}

/// Apply a snapshot to a draft, filling only fields the user has not
/// already typed into.
pub fn apply_snapshot(draft: &mut PartyDraft, snap: &LinkageSnapshot) {
    fill_if_empty(&mut draft.display_name, &snap.display_name);
    fill_if_empty(&mut draft.company_name, &snap.company_name);
    fill_if_empty(&mut draft.email, &snap.email);
    fill_if_empty(&mut draft.locality, &snap.locality);
    fill_if_empty(&mut draft.home_address, &snap.address);

    if draft.tax_id.trim().is_empty() && !snap.tax_id.is_empty() {
        draft.tax_id = snap.tax_id.clone();
        draft.tax_registered = true;
    }

    if draft.primary_phone().trim().is_empty() && !snap.phone.is_empty() {
        match draft.phone_numbers.first_mut() {
            Some(primary) => *primary = snap.phone.clone(),
            None => draft.phone_numbers.push(snap.phone.clone()),
        }
    }
}

/// Adopt an external candidate into a draft: build the linkage
/// (preserving server-owned fields if the same company was already
/// linked) and apply the display snapshot.
///
/// Internal candidates are not linkable; adopting one is a no-op here
/// and the form instead reopens it for editing.
pub fn adopt_candidate(draft: &mut PartyDraft, candidate: &Candidate) {
    if candidate.source_kind != SourceKind::External {
        log::debug!(
            "LinkageResolver: candidate {} is internal, nothing to link",
            candidate.id
        );
        return;
    }

    let record = resolve_preserving(candidate, draft.role, draft.linkage.as_ref());
    log::info!(
        "LinkageResolver: linked draft {} to company {} (bidirectional={})",
        draft.draft_id,
        record.external_company_id,
        record.bidirectional_orders_enabled
    );
    draft.linkage = Some(record);

    let snap = snapshot(candidate);
    apply_snapshot(draft, &snap);
    draft.snapshot = Some(snap);
}

/// Remove the link and its externally-sourced snapshot. User-typed
/// values stay on the draft.
pub fn clear_link(draft: &mut PartyDraft) {
    if draft.linkage.take().is_some() {
        log::info!("LinkageResolver: cleared link on draft {}", draft.draft_id);
    }
    draft.snapshot = None;
}

/// Observable link state for a record (or its absence).
pub fn link_state(linkage: Option<&LinkageRecord>) -> LinkState {
    match linkage {
        None => LinkState::Unlinked,
        Some(record) if record.verified => LinkState::Verified,
        Some(_) => LinkState::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AutoLinkRules, FormMode};

    fn external_candidate() -> Candidate {
        Candidate {
            id: "ext-40".to_string(),
            display_name: "Sharma Wholesale".to_string(),
            phone: "9876012345".to_string(),
            email: "sales@sharma.example".to_string(),
            company_name: "Sharma Wholesale Pvt Ltd".to_string(),
            tax_id: "23AABCS7654C1Z1".to_string(),
            locality: "Jaipur".to_string(),
            address: "14 Johari Bazar, Jaipur".to_string(),
            balance: 0.0,
            credit_limit: 0.0,
            source_kind: SourceKind::External,
            auto_link_rules: None,
            raw: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_supplier_role_enables_bidirectional_orders() {
        let record = resolve(&external_candidate(), PartyRole::Supplier);
        assert!(record.bidirectional_orders_enabled);
        assert_eq!(record.external_company_id, "ext-40");
        assert!(!record.verified, "new links start pending");
    }

    #[test]
    fn test_customer_role_never_enables_bidirectional_orders() {
        let record = resolve(&external_candidate(), PartyRole::Customer);
        assert!(!record.bidirectional_orders_enabled);
    }

    #[test]
    fn test_candidate_rules_override_defaults() {
        let mut candidate = external_candidate();
        candidate.auto_link_rules = Some(AutoLinkRules {
            by_tax_id: true,
            by_phone: false,
            by_email: false,
        });
        let record = resolve(&candidate, PartyRole::Supplier);
        assert!(record.auto_link_rules.by_tax_id);
        assert!(!record.auto_link_rules.by_phone);

        let record = resolve(&external_candidate(), PartyRole::Supplier);
        assert_eq!(record.auto_link_rules, AutoLinkRules::default());
    }

    #[test]
    fn test_reresolve_preserves_verified_for_same_company() {
        let existing = LinkageRecord {
            local_party_id: Some("p-7".to_string()),
            external_company_id: "ext-40".to_string(),
            auto_link_rules: AutoLinkRules::default(),
            bidirectional_orders_enabled: true,
            verified: true,
        };
        let record =
            resolve_preserving(&external_candidate(), PartyRole::Supplier, Some(&existing));
        assert!(record.verified, "verification must not be downgraded");
        assert_eq!(record.local_party_id.as_deref(), Some("p-7"));
    }

    #[test]
    fn test_reresolve_different_company_starts_pending() {
        let existing = LinkageRecord {
            local_party_id: Some("p-7".to_string()),
            external_company_id: "ext-OTHER".to_string(),
            auto_link_rules: AutoLinkRules::default(),
            bidirectional_orders_enabled: true,
            verified: true,
        };
        let record =
            resolve_preserving(&external_candidate(), PartyRole::Supplier, Some(&existing));
        assert!(!record.verified);
        assert!(record.local_party_id.is_none());
    }

    #[test]
    fn test_snapshot_fills_only_untouched_fields() {
        let mut draft = PartyDraft::new(PartyRole::Supplier, FormMode::Full);
        draft.display_name = "My Own Name For Them".to_string();

        adopt_candidate(&mut draft, &external_candidate());

        assert_eq!(
            draft.display_name, "My Own Name For Them",
            "user-typed name survives"
        );
        assert_eq!(draft.company_name, "Sharma Wholesale Pvt Ltd");
        assert_eq!(draft.primary_phone(), "9876012345");
        assert_eq!(draft.tax_id, "23AABCS7654C1Z1");
        assert!(draft.tax_registered, "snapshot with tax id marks registration");
        assert_eq!(draft.locality, "Jaipur");
        assert_eq!(draft.home_address, "14 Johari Bazar, Jaipur");
        assert!(draft.snapshot.is_some());
    }

    #[test]
    fn test_adopting_internal_candidate_is_a_noop() {
        let mut candidate = external_candidate();
        candidate.source_kind = SourceKind::Internal;
        let mut draft = PartyDraft::new(PartyRole::Supplier, FormMode::Full);

        adopt_candidate(&mut draft, &candidate);
        assert!(draft.linkage.is_none());
        assert!(draft.snapshot.is_none());
    }

    #[test]
    fn test_clear_link_keeps_user_values() {
        let mut draft = PartyDraft::new(PartyRole::Supplier, FormMode::Full);
        adopt_candidate(&mut draft, &external_candidate());
        draft.display_name = "Edited After Link".to_string();

        clear_link(&mut draft);
        assert!(draft.linkage.is_none());
        assert!(draft.snapshot.is_none());
        assert_eq!(draft.display_name, "Edited After Link");
        assert_eq!(draft.primary_phone(), "9876012345", "typed values stay");
    }

    #[test]
    fn test_link_state_progression() {
        assert_eq!(link_state(None), LinkState::Unlinked);

        let mut record = resolve(&external_candidate(), PartyRole::Supplier);
        assert_eq!(link_state(Some(&record)), LinkState::Pending);

        record.verified = true;
        assert_eq!(link_state(Some(&record)), LinkState::Verified);
    }
}
