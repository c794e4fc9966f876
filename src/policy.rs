//! Pure decision table for document upload, not-applicable marking and the
//! mandatory-document guard.
//!
//! Nothing in here touches the database: callers load the document type and
//! the live slot counts, then ask these functions whether a mutation may
//! proceed.

use serde::{Deserialize, Serialize};

use crate::error::{ComplianceError, ComplianceResult};
use crate::models::DocumentType;

/// How many active, non-NA documents a type may hold per employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardinalityPolicy {
    /// Neither flag set: the type accepts no file uploads.
    None,
    /// At most one active document.
    Single,
    /// Any number of active documents.
    Multiple,
    /// Both flags set; behaves like `Multiple`.
    SingleOrMultiple,
}

impl CardinalityPolicy {
    pub fn from_flags(allow_single: bool, allow_multiple: bool) -> Self {
        match (allow_single, allow_multiple) {
            (false, false) => CardinalityPolicy::None,
            (true, false) => CardinalityPolicy::Single,
            (false, true) => CardinalityPolicy::Multiple,
            (true, true) => CardinalityPolicy::SingleOrMultiple,
        }
    }

    /// Whether one more active document may be added when `active_count`
    /// already occupy the type's slots.
    pub fn admit(self, active_count: i64) -> ComplianceResult<()> {
        match self {
            CardinalityPolicy::None => Err(ComplianceError::UploadsNotAllowed),
            CardinalityPolicy::Single if active_count > 0 => {
                Err(ComplianceError::SingleDocumentLimitExceeded)
            }
            CardinalityPolicy::Single
            | CardinalityPolicy::Multiple
            | CardinalityPolicy::SingleOrMultiple => Ok(()),
        }
    }
}

/// Behavior of the guard protecting the last document of a mandatory type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MandatoryGuard {
    /// The last active document may only go when another active document or
    /// an active NA entry remains.
    #[default]
    Strict,
    /// Legacy rule: the guard only applies to types that allow NA entries, so
    /// a mandatory type without an NA escape may lose its last document.
    NaCapableOnly,
}

impl MandatoryGuard {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(MandatoryGuard::Strict),
            "na-capable-only" | "na_capable_only" | "legacy" => {
                Some(MandatoryGuard::NaCapableOnly)
            }
            _ => None,
        }
    }
}

/// Policy view of a document type, detached from the database row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypePolicy {
    pub cardinality: CardinalityPolicy,
    pub is_mandatory: bool,
    pub allow_not_applicable: bool,
    pub require_expiry_date: bool,
}

impl From<&DocumentType> for TypePolicy {
    fn from(value: &DocumentType) -> Self {
        Self {
            cardinality: CardinalityPolicy::from_flags(value.allow_single, value.allow_multiple),
            is_mandatory: value.is_mandatory,
            allow_not_applicable: value.allow_not_applicable,
            require_expiry_date: value.require_expiry_date,
        }
    }
}

/// Active documents of one (employee, type) pair, split by NA flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotCounts {
    pub active: i64,
    pub not_applicable: i64,
}

/// Checks a not-applicable request and returns the trimmed reason.
pub fn check_not_applicable(policy: &TypePolicy, reason: Option<&str>) -> ComplianceResult<String> {
    if !policy.allow_not_applicable {
        return Err(ComplianceError::NaNotAllowed);
    }

    match reason.map(str::trim) {
        Some(reason) if !reason.is_empty() => Ok(reason.to_string()),
        _ => Err(ComplianceError::ReasonRequired),
    }
}

/// Checks whether a new active, non-NA document may take a slot.
pub fn check_upload_slot(policy: &TypePolicy, active_count: i64) -> ComplianceResult<()> {
    policy.cardinality.admit(active_count)
}

/// Checks whether an active document may be deleted or deactivated.
///
/// `remaining` must exclude the document being released.
pub fn check_release(
    policy: &TypePolicy,
    remaining: SlotCounts,
    guard: MandatoryGuard,
) -> ComplianceResult<()> {
    if !policy.is_mandatory || policy.cardinality != CardinalityPolicy::Single {
        return Ok(());
    }

    if remaining.active > 0 || remaining.not_applicable > 0 {
        return Ok(());
    }

    match guard {
        MandatoryGuard::NaCapableOnly if !policy.allow_not_applicable => Ok(()),
        MandatoryGuard::Strict | MandatoryGuard::NaCapableOnly => {
            Err(ComplianceError::MandatoryDocumentRequired)
        }
    }
}
