//! Core data model for the party directory and linking subsystem.
//!
//! Three records carry the whole flow: `Candidate` (a normalized search
//! result), `PartyDraft` (the form's working copy), and `Party` (the
//! finalized record returned after a successful save). `LinkageRecord`
//! rides on drafts and parties when an external company has been adopted
//! as a counterparty.

use serde::{Deserialize, Serialize};

/// Where a candidate record came from.
///
/// Fixed at creation by the normalizer; a candidate never changes sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// A party already present in the caller's own books.
    Internal,
    /// A company from the shared external directory.
    External,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Internal => "internal",
            SourceKind::External => "external",
        }
    }

    pub fn from_str_lossy(s: &str) -> Option<Self> {
        match s {
            "internal" | "party" => Some(SourceKind::Internal),
            "external" | "company" => Some(SourceKind::External),
            _ => None,
        }
    }
}

/// Which attributes may be used to auto-link mirrored records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoLinkRules {
    pub by_tax_id: bool,
    pub by_phone: bool,
    pub by_email: bool,
}

impl Default for AutoLinkRules {
    fn default() -> Self {
        Self {
            by_tax_id: true,
            by_phone: true,
            by_email: true,
        }
    }
}

/// A normalized search result: either an internal party or an external
/// company. Immutable once produced by the normalizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: String,
    pub display_name: String,
    pub phone: String,
    pub email: String,
    pub company_name: String,
    pub tax_id: String,
    /// City/locality used by the (name, locality) dedup rule.
    pub locality: String,
    pub address: String,
    pub balance: f64,
    pub credit_limit: f64,
    pub source_kind: SourceKind,
    /// Remote override of the linking defaults, when the directory
    /// publishes one for this company.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_link_rules: Option<AutoLinkRules>,
    /// The upstream record as received, for display and debugging.
    #[serde(default)]
    pub raw: serde_json::Value,
}

/// Durable association between a local party and an external company.
///
/// `verified` is owned by the server: local edits must round-trip it
/// unchanged, and it is never downgraded client-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkageRecord {
    pub local_party_id: Option<String>,
    pub external_company_id: String,
    pub auto_link_rules: AutoLinkRules,
    pub bidirectional_orders_enabled: bool,
    pub verified: bool,
}

/// Observable state of a party's link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Unlinked,
    Pending,
    Verified,
}

/// Denormalized business fields snapshotted from an adopted external
/// candidate, kept for offline display and tagged as externally sourced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkageSnapshot {
    pub external_company_id: String,
    pub display_name: String,
    pub company_name: String,
    pub tax_id: String,
    pub phone: String,
    pub email: String,
    pub locality: String,
    pub address: String,
    pub fetched_at: String,
}

/// The business relationship a party is being created under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    Customer,
    Supplier,
}

impl PartyRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartyRole::Customer => "customer",
            PartyRole::Supplier => "supplier",
        }
    }
}

/// Which variant of the party form is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormMode {
    /// Name + phone only.
    Quick,
    /// Full identity, addressing, and balance fields.
    Full,
}

impl FormMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormMode::Quick => "quick",
            FormMode::Full => "full",
        }
    }
}

/// The form's working copy of a party. Created on form open, mutated by
/// user input and candidate adoption, destroyed on submit-success or
/// cancel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyDraft {
    /// Local handle for this editing session only; never sent upstream.
    pub draft_id: String,
    /// Present when editing an existing party.
    pub party_id: Option<String>,
    pub display_name: String,
    pub company_name: String,
    pub tax_registered: bool,
    pub tax_id: String,
    pub email: String,
    /// Always holds at least one entry; the first is the primary number.
    pub phone_numbers: Vec<String>,
    pub home_address: String,
    pub delivery_address: String,
    pub locality: String,
    pub opening_balance: f64,
    pub credit_limit: f64,
    pub linkage: Option<LinkageRecord>,
    pub snapshot: Option<LinkageSnapshot>,
    pub mode: FormMode,
    pub role: PartyRole,
}

impl PartyDraft {
    /// Fresh draft with all fields reset and one empty phone slot.
    pub fn new(role: PartyRole, mode: FormMode) -> Self {
        Self {
            draft_id: uuid::Uuid::new_v4().to_string(),
            party_id: None,
            display_name: String::new(),
            company_name: String::new(),
            tax_registered: false,
            tax_id: String::new(),
            email: String::new(),
            phone_numbers: vec![String::new()],
            home_address: String::new(),
            delivery_address: String::new(),
            locality: String::new(),
            opening_balance: 0.0,
            credit_limit: 0.0,
            linkage: None,
            snapshot: None,
            mode,
            role,
        }
    }

    /// Seed a draft from an existing party for editing. Linkage is
    /// carried over verbatim so `verified` round-trips unchanged.
    pub fn from_party(party: &Party) -> Self {
        Self {
            draft_id: uuid::Uuid::new_v4().to_string(),
            party_id: party.id.clone(),
            display_name: party.display_name.clone(),
            company_name: party.company_name.clone(),
            tax_registered: party.tax_registered,
            tax_id: party.tax_id.clone(),
            email: party.email.clone(),
            phone_numbers: if party.phone_numbers.is_empty() {
                vec![String::new()]
            } else {
                party.phone_numbers.clone()
            },
            home_address: party.home_address.clone(),
            delivery_address: party.delivery_address.clone(),
            locality: party.locality.clone(),
            opening_balance: party.opening_balance,
            credit_limit: party.credit_limit,
            linkage: party.linkage.clone(),
            snapshot: None,
            mode: FormMode::Full,
            role: party.role,
        }
    }

    pub fn primary_phone(&self) -> &str {
        self.phone_numbers.first().map(String::as_str).unwrap_or("")
    }

    pub fn is_new(&self) -> bool {
        self.party_id.is_none()
    }
}

/// Whether the server confirmed the save with a concrete entity, or
/// reported success without one. No identifiers are manufactured locally
/// for the pending case; the host refreshes from the directory instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveConfirmation {
    Confirmed,
    Pending,
}

/// A finalized party, handed to the caller after a successful save.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    /// Server-assigned. None only when `confirmation` is `Pending`.
    pub id: Option<String>,
    pub confirmation: SaveConfirmation,
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
    pub linkage: Option<LinkageRecord>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Party {
    pub fn primary_phone(&self) -> &str {
        self.phone_numbers.first().map(String::as_str).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_link_rules_default_all_true() {
        let rules = AutoLinkRules::default();
        assert!(rules.by_tax_id && rules.by_phone && rules.by_email);
    }

    #[test]
    fn test_source_kind_roundtrip() {
        assert_eq!(SourceKind::from_str_lossy("internal"), Some(SourceKind::Internal));
        assert_eq!(SourceKind::from_str_lossy("external"), Some(SourceKind::External));
        assert_eq!(SourceKind::from_str_lossy("company"), Some(SourceKind::External));
        assert_eq!(SourceKind::from_str_lossy("???"), None);
        assert_eq!(SourceKind::Internal.as_str(), "internal");
    }

    #[test]
    fn test_new_draft_has_one_phone_slot() {
        let draft = PartyDraft::new(PartyRole::Customer, FormMode::Quick);
        assert_eq!(draft.phone_numbers.len(), 1);
        assert_eq!(draft.primary_phone(), "");
        assert!(draft.is_new());
    }

    #[test]
    fn test_draft_from_party_preserves_linkage() {
        let party = Party {
            id: Some("p-77".to_string()),
            confirmation: SaveConfirmation::Confirmed,
            display_name: "Shakti Traders".to_string(),
            company_name: "Shakti Trading Co".to_string(),
            tax_registered: true,
            tax_id: "27AACCS1234A1Z5".to_string(),
            email: "office@shakti.example".to_string(),
            phone_numbers: vec!["9898989898".to_string()],
            home_address: String::new(),
            delivery_address: String::new(),
            locality: "Pune".to_string(),
            opening_balance: 1500.0,
            credit_limit: 50000.0,
            role: PartyRole::Supplier,
            linkage: Some(LinkageRecord {
                local_party_id: Some("p-77".to_string()),
                external_company_id: "ext-12".to_string(),
                auto_link_rules: AutoLinkRules::default(),
                bidirectional_orders_enabled: true,
                verified: true,
            }),
            created_at: Some("2026-01-10T09:00:00Z".to_string()),
            updated_at: None,
        };

        let draft = PartyDraft::from_party(&party);
        assert_eq!(draft.party_id.as_deref(), Some("p-77"));
        assert_eq!(draft.mode, FormMode::Full);
        let linkage = draft.linkage.expect("linkage carried over");
        assert!(linkage.verified);
        assert_eq!(linkage.external_company_id, "ext-12");
    }

    #[test]
    fn test_candidate_wire_names_are_camel_case() {
        let candidate = Candidate {
            id: "c-1".to_string(),
            display_name: "Ravi Kirana".to_string(),
            phone: "9812345670".to_string(),
            email: String::new(),
            company_name: String::new(),
            tax_id: String::new(),
            locality: "Nashik".to_string(),
            address: String::new(),
            balance: 0.0,
            credit_limit: 0.0,
            source_kind: SourceKind::Internal,
            auto_link_rules: None,
            raw: serde_json::Value::Null,
        };
        let json = serde_json::to_string(&candidate).unwrap();
        assert!(json.contains("\"displayName\""));
        assert!(json.contains("\"sourceKind\":\"internal\""));
    }
}
