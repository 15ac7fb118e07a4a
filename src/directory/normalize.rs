//! Candidate normalization.
//!
//! The directory's JSON has drifted across deployments: the entity list
//! has been seen under `data.items`, `data.parties`, `data.companies`,
//! and `data.results`, and older gateways return `items` at the top
//! level. Rather than sniffing shapes ad hoc at every call site, one
//! tolerant envelope lives here at the service boundary: every field is
//! defaulted, and extraction takes the first populated list in a fixed
//! order.
//!
//! Records without an id cannot be linked or selected; they are dropped
//! here (debug-logged) and never surfaced.

use serde::{Deserialize, Serialize};

use crate::types::{AutoLinkRules, Candidate, SourceKind};

/// Search response envelope, all fields tolerant.
///
/// Legacy gateways omit `success` entirely, so absence reads as true;
/// only an explicit `"success": false` marks a rejected search.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchEnvelope {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: EnvelopeData,
    /// Legacy gateways return the list at the top level.
    #[serde(default)]
    pub items: Vec<RawDirectoryRecord>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeData {
    #[serde(default)]
    pub items: Vec<RawDirectoryRecord>,
    #[serde(default)]
    pub parties: Vec<RawDirectoryRecord>,
    #[serde(default)]
    pub companies: Vec<RawDirectoryRecord>,
    #[serde(default)]
    pub results: Vec<RawDirectoryRecord>,
}

/// One record as the directory sends it. Field names vary by record age;
/// aliases cover the forms seen in production.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDirectoryRecord {
    #[serde(default, alias = "partyId", alias = "companyId")]
    pub id: Option<String>,
    #[serde(default, alias = "name")]
    pub display_name: Option<String>,
    #[serde(default, alias = "mobile")]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "businessName")]
    pub company_name: Option<String>,
    #[serde(default, alias = "taxNumber")]
    pub tax_id: Option<String>,
    #[serde(default, alias = "city")]
    pub locality: Option<String>,
    #[serde(default, alias = "billingAddress")]
    pub address: Option<String>,
    #[serde(default)]
    pub balance: Option<f64>,
    #[serde(default)]
    pub credit_limit: Option<f64>,
    #[serde(default, alias = "source")]
    pub source_kind: Option<String>,
    #[serde(default)]
    pub auto_link_rules: Option<AutoLinkRules>,
}

/// Take the entity list from the first populated field among the known
/// shapes.
pub fn extract_records(envelope: SearchEnvelope) -> Vec<RawDirectoryRecord> {
    let SearchEnvelope { data, items, .. } = envelope;
    for list in [data.items, data.parties, data.companies, data.results, items] {
        if !list.is_empty() {
            return list;
        }
    }
    Vec::new()
}

/// Normalize one raw record into a `Candidate`.
///
/// Missing text fields become empty strings, missing numerics become 0.
/// Returns None for records without an id.
pub fn normalize_record(raw: RawDirectoryRecord, default_kind: SourceKind) -> Option<Candidate> {
    let id = match raw.id.as_deref() {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            log::debug!(
                "Normalizer: dropping record without id (name={:?})",
                raw.display_name
            );
            return None;
        }
    };

    let source_kind = raw
        .source_kind
        .as_deref()
        .and_then(SourceKind::from_str_lossy)
        .unwrap_or(default_kind);

    let raw_value = serde_json::to_value(&raw).unwrap_or(serde_json::Value::Null);

    Some(Candidate {
        id,
        display_name: raw.display_name.unwrap_or_default(),
        phone: raw.phone.unwrap_or_default(),
        email: raw.email.unwrap_or_default(),
        company_name: raw.company_name.unwrap_or_default(),
        tax_id: raw.tax_id.unwrap_or_default(),
        locality: raw.locality.unwrap_or_default(),
        address: raw.address.unwrap_or_default(),
        balance: raw.balance.unwrap_or(0.0),
        credit_limit: raw.credit_limit.unwrap_or(0.0),
        source_kind,
        auto_link_rules: raw.auto_link_rules,
        raw: raw_value,
    })
}

/// Normalize a whole envelope: extract, then convert, dropping id-less
/// records.
pub fn normalize_envelope(envelope: SearchEnvelope, default_kind: SourceKind) -> Vec<Candidate> {
    extract_records(envelope)
        .into_iter()
        .filter_map(|raw| normalize_record(raw, default_kind))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, name: &str) -> RawDirectoryRecord {
        RawDirectoryRecord {
            id: Some(id.to_string()),
            display_name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_extract_prefers_data_items() {
        let envelope = SearchEnvelope {
            success: true,
            message: None,
            data: EnvelopeData {
                items: vec![record("1", "a")],
                parties: vec![record("2", "b")],
                ..Default::default()
            },
            items: vec![record("3", "c")],
        };
        let records = extract_records(envelope);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id.as_deref(), Some("1"));
    }

    #[test]
    fn test_extract_falls_through_in_order() {
        let envelope = SearchEnvelope {
            data: EnvelopeData {
                companies: vec![record("9", "co")],
                ..Default::default()
            },
            ..Default::default()
        };
        let records = extract_records(envelope);
        assert_eq!(records[0].id.as_deref(), Some("9"));

        let envelope = SearchEnvelope {
            items: vec![record("top", "legacy")],
            ..Default::default()
        };
        assert_eq!(extract_records(envelope)[0].id.as_deref(), Some("top"));
    }

    #[test]
    fn test_extract_empty_envelope() {
        assert!(extract_records(SearchEnvelope::default()).is_empty());
    }

    #[test]
    fn test_normalize_defaults_missing_fields() {
        let raw = record("c-5", "Mehta Textiles");
        let candidate = normalize_record(raw, SourceKind::External).unwrap();
        assert_eq!(candidate.id, "c-5");
        assert_eq!(candidate.display_name, "Mehta Textiles");
        assert_eq!(candidate.phone, "");
        assert_eq!(candidate.tax_id, "");
        assert_eq!(candidate.balance, 0.0);
        assert_eq!(candidate.credit_limit, 0.0);
        assert_eq!(candidate.source_kind, SourceKind::External);
    }

    #[test]
    fn test_normalize_drops_record_without_id() {
        let mut raw = record("", "No Id Traders");
        assert!(normalize_record(raw.clone(), SourceKind::External).is_none());
        raw.id = None;
        assert!(normalize_record(raw, SourceKind::External).is_none());
    }

    #[test]
    fn test_normalize_record_source_field_wins_over_default() {
        let mut raw = record("c-1", "Own Party");
        raw.source_kind = Some("internal".to_string());
        let candidate = normalize_record(raw, SourceKind::External).unwrap();
        assert_eq!(candidate.source_kind, SourceKind::Internal);
    }

    #[test]
    fn test_field_aliases() {
        let json = r#"{
            "partyId": "p-3",
            "name": "Joshi & Sons",
            "mobile": "9876501234",
            "businessName": "Joshi and Sons Pvt Ltd",
            "taxNumber": "27AAAPJ1234B1Z2",
            "city": "Mumbai",
            "source": "internal"
        }"#;
        let raw: RawDirectoryRecord = serde_json::from_str(json).unwrap();
        let candidate = normalize_record(raw, SourceKind::External).unwrap();
        assert_eq!(candidate.id, "p-3");
        assert_eq!(candidate.display_name, "Joshi & Sons");
        assert_eq!(candidate.phone, "9876501234");
        assert_eq!(candidate.tax_id, "27AAAPJ1234B1Z2");
        assert_eq!(candidate.locality, "Mumbai");
        assert_eq!(candidate.source_kind, SourceKind::Internal);
    }

    #[test]
    fn test_normalize_envelope_end_to_end() {
        let json = r#"{
            "success": true,
            "data": {
                "parties": [
                    {"id": "p-1", "name": "Agarwal Traders", "city": "Delhi"},
                    {"name": "Ghost Record Without Id"}
                ]
            }
        }"#;
        let envelope: SearchEnvelope = serde_json::from_str(json).unwrap();
        let candidates = normalize_envelope(envelope, SourceKind::Internal);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].display_name, "Agarwal Traders");
    }

    #[test]
    fn test_normalize_keeps_raw_payload() {
        let raw = record("c-2", "Kumar Hardware");
        let candidate = normalize_record(raw, SourceKind::External).unwrap();
        assert_eq!(candidate.raw["displayName"], "Kumar Hardware");
    }
}
