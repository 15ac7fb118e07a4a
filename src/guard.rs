//! Duplicate guard: local pattern validation plus the remote phone
//! existence check that runs before any create/update call.
//!
//! The remote check fails open. An unreachable check service must not
//! lock the user out of saving a party, so the gap is logged and
//! treated as "no duplicate"; the server still enforces uniqueness on
//! submit.

use std::sync::OnceLock;

use regex::Regex;

use crate::directory::DirectoryService;
use crate::error::{DraftField, PartyFlowError};
use crate::types::PartyDraft;

// Compile-once validation patterns via OnceLock.
fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[6-9][0-9]{9}$").unwrap())
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").unwrap())
}

fn tax_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9A-Z]{15}$").unwrap())
}

/// Mobile number: exactly 10 digits, first digit 6 to 9.
pub fn is_valid_phone(phone: &str) -> bool {
    phone_regex().is_match(phone)
}

pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

/// Tax registration number: 15 uppercase alphanumerics.
pub fn is_valid_tax_id(tax_id: &str) -> bool {
    tax_id_regex().is_match(tax_id)
}

/// Run every local check against a draft. No network access; the first
/// violation comes back field-scoped so the form can render it in place.
pub fn validate_draft(draft: &PartyDraft) -> Result<(), PartyFlowError> {
    if draft.display_name.trim().is_empty() {
        return Err(PartyFlowError::Validation {
            field: DraftField::DisplayName,
            message: "Name is required".to_string(),
        });
    }

    let phone = draft.primary_phone();
    if !is_valid_phone(phone) {
        return Err(PartyFlowError::Validation {
            field: DraftField::Phone,
            message: "Phone must be 10 digits starting with 6-9".to_string(),
        });
    }

    if !draft.email.is_empty() && !is_valid_email(&draft.email) {
        return Err(PartyFlowError::Validation {
            field: DraftField::Email,
            message: "Email address is not valid".to_string(),
        });
    }

    if draft.tax_registered && !is_valid_tax_id(&draft.tax_id) {
        return Err(PartyFlowError::Validation {
            field: DraftField::TaxId,
            message: "Tax id must be 15 characters (digits and capital letters)".to_string(),
        });
    }

    if draft.opening_balance < 0.0 {
        return Err(PartyFlowError::Validation {
            field: DraftField::OpeningBalance,
            message: "Opening balance cannot be negative".to_string(),
        });
    }

    if draft.credit_limit < 0.0 {
        return Err(PartyFlowError::Validation {
            field: DraftField::CreditLimit,
            message: "Credit limit cannot be negative".to_string(),
        });
    }

    Ok(())
}

/// Ask the directory whether another party already holds this phone
/// number. Unreachable service fails open.
pub async fn check_remote_duplicate(
    directory: &dyn DirectoryService,
    phone: &str,
) -> Result<(), PartyFlowError> {
    let check = match directory.check_duplicate(phone).await {
        Ok(check) => check,
        Err(e) => {
            log::warn!(
                "DuplicateGuard: check service unreachable, failing open: {}",
                e
            );
            return Ok(());
        }
    };

    if check.exists {
        return Err(PartyFlowError::Duplicate {
            field: DraftField::Phone,
            existing_party_id: check.party_id.unwrap_or_default(),
            existing_party_name: check
                .party_name
                .unwrap_or_else(|| "another party".to_string()),
        });
    }

    Ok(())
}
