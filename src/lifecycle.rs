//! Lifecycle engine for employee documents.
//!
//! Every mutation runs in one transaction: load the document type, take the
//! (employee, type) advisory lock, count the live slots, consult
//! [`crate::policy`], then write the document row, its field values and the
//! audit event. Any failure rolls the whole unit back.

use std::path::Path;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use diesel::{pg::PgConnection, prelude::*, sql_types::Text};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::audit::{AuditEvent, AuditEventType, AuditSink, TableAuditSink};
use crate::error::{ComplianceError, ComplianceResult};
use crate::field_values::{
    load_values, replace_values, validate_values, FieldValueInput, StoredFieldValue,
};
use crate::models::{DocumentField, DocumentType, EmployeeDocument, NewEmployeeDocument};
use crate::policy::{
    check_not_applicable, check_release, check_upload_slot, MandatoryGuard, SlotCounts,
    TypePolicy,
};
use crate::registry::{list_fields, load_type};
use crate::schema::employee_documents;
use crate::utils::json::double_option;

/// Tenant and user a mutation is performed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub company_id: Uuid,
    pub user_id: Uuid,
}

/// Object-store reference of an already uploaded file.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct FileReference {
    #[validate(length(max = 255, message = "file_name must not exceed 255 characters"))]
    pub file_name: Option<String>,
    pub file_path: Option<String>,
    pub file_size_bytes: Option<i64>,
    #[validate(length(max = 128, message = "mime_type must not exceed 128 characters"))]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewDocumentRequest {
    pub employee_id: Uuid,
    pub document_type_id: Uuid,
    #[validate(length(max = 128, message = "document_number must not exceed 128 characters"))]
    pub document_number: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub file: FileReference,
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_not_applicable: bool,
    pub not_applicable_reason: Option<String>,
    #[serde(default)]
    pub field_values: Vec<FieldValueInput>,
}

/// Partial update of an employee document.
///
/// `field_values`, when present, replaces the complete stored set. A document
/// that is not applicable after the patch takes no new file and no field
/// values, as on creation: `file` and `field_values` are then ignored, while
/// the file and values it already holds are kept for when the flag is lifted.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct DocumentPatch {
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 128, message = "document_number must not exceed 128 characters"))]
    pub document_number: Option<Option<String>>,
    #[validate(nested)]
    pub file: Option<FileReference>,
    #[serde(default, deserialize_with = "double_option")]
    pub issue_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub expiry_date: Option<Option<NaiveDate>>,
    pub is_not_applicable: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub not_applicable_reason: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub field_values: Option<Vec<FieldValueInput>>,
}

#[derive(Debug, Clone)]
pub struct DocumentDetail {
    pub document: EmployeeDocument,
    pub document_type: DocumentType,
    pub fields: Vec<DocumentField>,
    pub field_values: Vec<StoredFieldValue>,
}

#[derive(AsChangeset)]
#[diesel(table_name = employee_documents)]
struct DocumentChangeset {
    document_number: Option<Option<String>>,
    file_name: Option<Option<String>>,
    file_path: Option<Option<String>>,
    file_size_bytes: Option<Option<i64>>,
    mime_type: Option<Option<String>>,
    issue_date: Option<Option<NaiveDate>>,
    expiry_date: Option<Option<NaiveDate>>,
    is_not_applicable: Option<bool>,
    not_applicable_reason: Option<Option<String>>,
    is_active: Option<bool>,
    updated_by: Uuid,
    updated_at: NaiveDateTime,
}

/// A file reference that passed the type's file rules.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CheckedFile {
    name: String,
    path: String,
    size_bytes: Option<i64>,
    mime_type: Option<String>,
}

#[derive(Clone)]
pub struct DocumentEngine {
    guard: MandatoryGuard,
    audit: Arc<dyn AuditSink>,
}

impl DocumentEngine {
    pub fn new(guard: MandatoryGuard, audit: Arc<dyn AuditSink>) -> Self {
        Self { guard, audit }
    }

    pub fn with_table_audit(guard: MandatoryGuard) -> Self {
        Self::new(guard, Arc::new(TableAuditSink))
    }

    /// Uploads a document, or records a not-applicable entry when the request
    /// asks for one. NA entries do not take an upload slot.
    pub fn create_document(
        &self,
        conn: &mut PgConnection,
        actor: Actor,
        request: NewDocumentRequest,
    ) -> ComplianceResult<DocumentDetail> {
        request.validate()?;
        let document_id = conn.transaction::<_, ComplianceError, _>(|conn| {
            let document_type = load_type(conn, actor.company_id, request.document_type_id)?;
            if !document_type.is_active {
                return Err(ComplianceError::TypeInactive);
            }
            let policy = TypePolicy::from(&document_type);
            lock_slot(conn, request.employee_id, document_type.id)?;

            let (file, reason) = if request.is_not_applicable {
                let reason =
                    check_not_applicable(&policy, request.not_applicable_reason.as_deref())?;
                (None, Some(reason))
            } else {
                let file = check_file(&document_type, &request.file)?;
                check_dates(&policy, request.issue_date, request.expiry_date, true)?;
                let counts = slot_counts(
                    conn,
                    actor.company_id,
                    request.employee_id,
                    document_type.id,
                    None,
                )?;
                check_upload_slot(&policy, counts.active)?;
                (Some(file), None)
            };
            if request.is_not_applicable {
                check_dates(&policy, request.issue_date, request.expiry_date, false)?;
            }

            let fields = list_fields(conn, document_type.id)?;
            let values: &[FieldValueInput] = if request.is_not_applicable {
                &[]
            } else {
                &request.field_values
            };
            validate_values(&fields, values, !request.is_not_applicable)?;

            let new_document = NewEmployeeDocument {
                id: Uuid::new_v4(),
                company_id: actor.company_id,
                employee_id: request.employee_id,
                document_type_id: document_type.id,
                folder_id: document_type.folder_id,
                document_number: clean(request.document_number.clone()),
                file_name: file.as_ref().map(|f| f.name.clone()),
                file_path: file.as_ref().map(|f| f.path.clone()),
                file_size_bytes: file.as_ref().and_then(|f| f.size_bytes),
                mime_type: file.as_ref().and_then(|f| f.mime_type.clone()),
                issue_date: request.issue_date,
                expiry_date: request.expiry_date,
                is_not_applicable: request.is_not_applicable,
                not_applicable_reason: reason,
                is_active: true,
                created_by: actor.user_id,
                updated_by: actor.user_id,
            };

            diesel::insert_into(employee_documents::table)
                .values(&new_document)
                .execute(conn)?;
            let document: EmployeeDocument =
                employee_documents::table.find(new_document.id).first(conn)?;

            let stored = replace_values(conn, &document, &fields, values)?;

            let event_type = if document.is_not_applicable {
                AuditEventType::DocumentMarkedNa
            } else {
                AuditEventType::DocumentUploaded
            };
            self.audit.emit(
                conn,
                &audit_event(
                    event_type,
                    actor,
                    &document,
                    json!({
                        "file_name": document.file_name,
                        "is_not_applicable": document.is_not_applicable,
                        "field_value_count": stored,
                    }),
                ),
            )?;

            Ok(document.id)
        })?;

        info!(
            document_id = %document_id,
            employee_id = %request.employee_id,
            document_type_id = %request.document_type_id,
            not_applicable = request.is_not_applicable,
            "employee document created"
        );
        get_document(conn, actor.company_id, document_id)
    }

    pub fn update_document(
        &self,
        conn: &mut PgConnection,
        actor: Actor,
        document_id: Uuid,
        patch: DocumentPatch,
    ) -> ComplianceResult<DocumentDetail> {
        patch.validate()?;
        conn.transaction::<_, ComplianceError, _>(|conn| {
            let current = lock_document(conn, actor.company_id, document_id)?;
            let document_type = load_type(conn, actor.company_id, current.document_type_id)?;
            let policy = TypePolicy::from(&document_type);
            lock_slot(conn, current.employee_id, current.document_type_id)?;

            let is_active = patch.is_active.unwrap_or(current.is_active);
            let is_not_applicable = patch
                .is_not_applicable
                .unwrap_or(current.is_not_applicable);
            let turning_na_on = is_not_applicable && !current.is_not_applicable;

            let reason = if is_not_applicable {
                let supplied = match &patch.not_applicable_reason {
                    Some(reason) => reason.clone(),
                    None => current.not_applicable_reason.clone(),
                };
                if turning_na_on || patch.not_applicable_reason.is_some() {
                    Some(check_not_applicable(&policy, supplied.as_deref())?)
                } else {
                    supplied
                }
            } else {
                None
            };

            let file = match &patch.file {
                Some(file) if !is_not_applicable => Some(check_file(&document_type, file)?),
                _ => None,
            };

            let issue_date = patch.issue_date.unwrap_or(current.issue_date);
            let expiry_date = patch.expiry_date.unwrap_or(current.expiry_date);
            let was_slot = current.occupies_slot();
            let now_slot = is_active && !is_not_applicable;
            let gains_slot = now_slot && !was_slot;

            if patch.issue_date.is_some() || patch.expiry_date.is_some() || gains_slot {
                let expiry_required = now_slot && (patch.expiry_date.is_some() || gains_slot);
                check_dates(&policy, issue_date, expiry_date, expiry_required)?;
            }

            if gains_slot {
                if file.is_none() && (current.file_name.is_none() || current.file_path.is_none()) {
                    return Err(ComplianceError::FileRequired);
                }
                let counts = slot_counts(
                    conn,
                    actor.company_id,
                    current.employee_id,
                    current.document_type_id,
                    Some(current.id),
                )?;
                check_upload_slot(&policy, counts.active)?;
            }

            if current.is_active && !is_active {
                let remaining = slot_counts(
                    conn,
                    actor.company_id,
                    current.employee_id,
                    current.document_type_id,
                    Some(current.id),
                )?;
                check_release(&policy, remaining, self.guard)?;
            }

            let fields = list_fields(conn, document_type.id)?;
            let values = patch
                .field_values
                .as_deref()
                .filter(|_| !is_not_applicable);
            if let Some(values) = values {
                validate_values(&fields, values, now_slot)?;
            }

            let changeset = DocumentChangeset {
                document_number: patch.document_number.clone().map(clean),
                file_name: file.as_ref().map(|f| Some(f.name.clone())),
                file_path: file.as_ref().map(|f| Some(f.path.clone())),
                file_size_bytes: file.as_ref().map(|f| f.size_bytes),
                mime_type: file.as_ref().map(|f| f.mime_type.clone()),
                issue_date: patch.issue_date,
                expiry_date: patch.expiry_date,
                is_not_applicable: patch.is_not_applicable,
                not_applicable_reason: Some(reason),
                is_active: patch.is_active,
                updated_by: actor.user_id,
                updated_at: Utc::now().naive_utc(),
            };

            diesel::update(employee_documents::table.find(document_id))
                .set(&changeset)
                .execute(conn)?;
            let updated: EmployeeDocument =
                employee_documents::table.find(document_id).first(conn)?;

            if let Some(values) = values {
                let stored = replace_values(conn, &updated, &fields, values)?;
                debug!(document_id = %document_id, stored, "field values replaced");
            }

            let event_type = if turning_na_on {
                AuditEventType::DocumentMarkedNa
            } else {
                AuditEventType::DocumentUpdated
            };
            self.audit.emit(
                conn,
                &audit_event(
                    event_type,
                    actor,
                    &updated,
                    json!({ "changes": changed_keys(&patch, is_not_applicable) }),
                ),
            )?;

            info!(
                document_id = %document_id,
                employee_id = %updated.employee_id,
                active = updated.is_active,
                not_applicable = updated.is_not_applicable,
                "employee document updated"
            );
            Ok(())
        })?;

        get_document(conn, actor.company_id, document_id)
    }

    /// Hard-deletes a document after the mandatory-document guard. The audit
    /// event is written before the row goes.
    pub fn delete_document(
        &self,
        conn: &mut PgConnection,
        actor: Actor,
        document_id: Uuid,
    ) -> ComplianceResult<()> {
        conn.transaction::<_, ComplianceError, _>(|conn| {
            let current = lock_document(conn, actor.company_id, document_id)?;
            let document_type = load_type(conn, actor.company_id, current.document_type_id)?;
            let policy = TypePolicy::from(&document_type);
            lock_slot(conn, current.employee_id, current.document_type_id)?;

            if current.is_active {
                let remaining = slot_counts(
                    conn,
                    actor.company_id,
                    current.employee_id,
                    current.document_type_id,
                    Some(current.id),
                )?;
                check_release(&policy, remaining, self.guard)?;
            }

            self.audit.emit(
                conn,
                &audit_event(
                    AuditEventType::DocumentDeleted,
                    actor,
                    &current,
                    json!({
                        "file_name": current.file_name,
                        "file_path": current.file_path,
                        "was_active": current.is_active,
                        "was_not_applicable": current.is_not_applicable,
                    }),
                ),
            )?;

            diesel::delete(employee_documents::table.find(document_id)).execute(conn)?;

            info!(
                document_id = %document_id,
                employee_id = %current.employee_id,
                document_type_id = %current.document_type_id,
                "employee document deleted"
            );
            Ok(())
        })
    }

    /// Flags an existing document as not applicable. Other documents of the
    /// same employee and type are left alone.
    pub fn mark_not_applicable(
        &self,
        conn: &mut PgConnection,
        actor: Actor,
        document_id: Uuid,
        reason: Option<&str>,
    ) -> ComplianceResult<DocumentDetail> {
        conn.transaction::<_, ComplianceError, _>(|conn| {
            let current = lock_document(conn, actor.company_id, document_id)?;
            let document_type = load_type(conn, actor.company_id, current.document_type_id)?;
            let policy = TypePolicy::from(&document_type);
            let reason = check_not_applicable(&policy, reason)?;
            lock_slot(conn, current.employee_id, current.document_type_id)?;

            diesel::update(employee_documents::table.find(document_id))
                .set((
                    employee_documents::is_not_applicable.eq(true),
                    employee_documents::not_applicable_reason.eq(Some(reason.clone())),
                    employee_documents::updated_by.eq(actor.user_id),
                    employee_documents::updated_at.eq(Utc::now().naive_utc()),
                ))
                .execute(conn)?;
            let updated: EmployeeDocument =
                employee_documents::table.find(document_id).first(conn)?;

            self.audit.emit(
                conn,
                &audit_event(
                    AuditEventType::DocumentMarkedNa,
                    actor,
                    &updated,
                    json!({ "reason": reason }),
                ),
            )?;

            info!(
                document_id = %document_id,
                employee_id = %updated.employee_id,
                "employee document marked not applicable"
            );
            Ok(())
        })?;

        get_document(conn, actor.company_id, document_id)
    }
}

/// Loads a document with its type, the type's fields and the stored values.
pub fn get_document(
    conn: &mut PgConnection,
    company_id: Uuid,
    document_id: Uuid,
) -> ComplianceResult<DocumentDetail> {
    let document = employee_documents::table
        .find(document_id)
        .filter(employee_documents::company_id.eq(company_id))
        .first::<EmployeeDocument>(conn)
        .optional()?
        .ok_or(ComplianceError::DocumentNotFound(document_id))?;
    let document_type = load_type(conn, company_id, document.document_type_id)?;
    let fields = list_fields(conn, document_type.id)?;
    let field_values = load_values(conn, &document)?;

    Ok(DocumentDetail {
        document,
        document_type,
        fields,
        field_values,
    })
}

pub fn list_employee_documents(
    conn: &mut PgConnection,
    company_id: Uuid,
    employee_id: Uuid,
    document_type_id: Option<Uuid>,
    include_inactive: bool,
) -> ComplianceResult<Vec<EmployeeDocument>> {
    let mut query = employee_documents::table
        .filter(employee_documents::company_id.eq(company_id))
        .filter(employee_documents::employee_id.eq(employee_id))
        .into_boxed();
    if let Some(type_id) = document_type_id {
        query = query.filter(employee_documents::document_type_id.eq(type_id));
    }
    if !include_inactive {
        query = query.filter(employee_documents::is_active.eq(true));
    }
    Ok(query
        .order(employee_documents::created_at.desc())
        .load(conn)?)
}

/// Live slot counts for (employee, type), optionally leaving one document out.
pub fn slot_counts(
    conn: &mut PgConnection,
    company_id: Uuid,
    employee_id: Uuid,
    document_type_id: Uuid,
    exclude: Option<Uuid>,
) -> ComplianceResult<SlotCounts> {
    let rows: Vec<(Uuid, bool)> = employee_documents::table
        .filter(employee_documents::company_id.eq(company_id))
        .filter(employee_documents::employee_id.eq(employee_id))
        .filter(employee_documents::document_type_id.eq(document_type_id))
        .filter(employee_documents::is_active.eq(true))
        .select((employee_documents::id, employee_documents::is_not_applicable))
        .load(conn)?;

    Ok(rows
        .into_iter()
        .filter(|(id, _)| Some(*id) != exclude)
        .fold(SlotCounts::default(), |mut counts, (_, not_applicable)| {
            if not_applicable {
                counts.not_applicable += 1;
            } else {
                counts.active += 1;
            }
            counts
        }))
}

/// Serializes check-then-write per (employee, type) until the transaction ends.
fn lock_slot(conn: &mut PgConnection, employee_id: Uuid, document_type_id: Uuid) -> QueryResult<()> {
    diesel::sql_query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind::<Text, _>(format!("employee-document:{employee_id}:{document_type_id}"))
        .execute(conn)?;
    Ok(())
}

fn lock_document(
    conn: &mut PgConnection,
    company_id: Uuid,
    document_id: Uuid,
) -> ComplianceResult<EmployeeDocument> {
    employee_documents::table
        .find(document_id)
        .filter(employee_documents::company_id.eq(company_id))
        .for_update()
        .first::<EmployeeDocument>(conn)
        .optional()?
        .ok_or(ComplianceError::DocumentNotFound(document_id))
}

fn check_file(document_type: &DocumentType, file: &FileReference) -> ComplianceResult<CheckedFile> {
    let name = clean(file.file_name.clone()).ok_or(ComplianceError::FileRequired)?;
    let path = clean(file.file_path.clone()).ok_or(ComplianceError::FileRequired)?;

    if !document_type.allowed_extensions.is_empty() {
        let extension = Path::new(&name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !document_type
            .allowed_extensions
            .iter()
            .any(|allowed| *allowed == extension)
        {
            return Err(ComplianceError::FileExtensionNotAllowed(extension));
        }
    }

    if let Some(size) = file.file_size_bytes {
        if size < 0 {
            return Err(ComplianceError::InvalidInput(
                "file_size_bytes must not be negative".to_string(),
            ));
        }
        if let Some(limit) = document_type.max_file_size_bytes {
            if size > limit {
                return Err(ComplianceError::FileTooLarge { size, limit });
            }
        }
    }

    let mime_type = clean(file.mime_type.clone()).or_else(|| {
        mime_guess::from_path(&name)
            .first_raw()
            .map(str::to_string)
    });

    Ok(CheckedFile {
        name,
        path,
        size_bytes: file.file_size_bytes,
        mime_type,
    })
}

fn check_dates(
    policy: &TypePolicy,
    issue_date: Option<NaiveDate>,
    expiry_date: Option<NaiveDate>,
    expiry_required: bool,
) -> ComplianceResult<()> {
    if expiry_required && policy.require_expiry_date && expiry_date.is_none() {
        return Err(ComplianceError::ExpiryDateRequired);
    }
    if let (Some(issued), Some(expires)) = (issue_date, expiry_date) {
        if expires < issued {
            return Err(ComplianceError::InvalidDateRange);
        }
    }
    Ok(())
}

fn audit_event(
    event_type: AuditEventType,
    actor: Actor,
    document: &EmployeeDocument,
    details: Value,
) -> AuditEvent {
    AuditEvent {
        event_type,
        company_id: actor.company_id,
        document_id: document.id,
        document_type_id: document.document_type_id,
        folder_id: Some(document.folder_id),
        actor_id: actor.user_id,
        on_behalf_of: (actor.user_id != document.employee_id).then_some(document.employee_id),
        details,
    }
}

fn changed_keys(patch: &DocumentPatch, not_applicable: bool) -> Vec<&'static str> {
    [
        ("document_number", patch.document_number.is_some()),
        ("file", patch.file.is_some() && !not_applicable),
        ("issue_date", patch.issue_date.is_some()),
        ("expiry_date", patch.expiry_date.is_some()),
        ("is_not_applicable", patch.is_not_applicable.is_some()),
        ("not_applicable_reason", patch.not_applicable_reason.is_some()),
        ("is_active", patch.is_active.is_some()),
        ("field_values", patch.field_values.is_some() && !not_applicable),
    ]
    .into_iter()
    .filter_map(|(key, present)| present.then_some(key))
    .collect()
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::CardinalityPolicy;
    use serde_json::json;

    fn passport_type() -> DocumentType {
        let now = Utc::now().naive_utc();
        DocumentType {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            code: "PASSPORT".to_string(),
            name: "Passport".to_string(),
            description: None,
            folder_id: Uuid::new_v4(),
            allow_single: true,
            allow_multiple: false,
            is_mandatory: true,
            allow_not_applicable: true,
            require_expiry_date: true,
            allowed_extensions: vec!["pdf".to_string(), "jpg".to_string()],
            max_file_size_bytes: Some(1_000),
            is_active: true,
            is_system: false,
            created_by: None,
            updated_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn file(name: &str, size: i64) -> FileReference {
        FileReference {
            file_name: Some(name.to_string()),
            file_path: Some(format!("employees/e1/{name}")),
            file_size_bytes: Some(size),
            mime_type: None,
        }
    }

    #[test]
    fn file_requires_name_and_path() {
        let document_type = passport_type();
        let missing_path = FileReference {
            file_name: Some("scan.pdf".to_string()),
            file_path: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            check_file(&document_type, &missing_path),
            Err(ComplianceError::FileRequired)
        ));
        assert!(matches!(
            check_file(&document_type, &FileReference::default()),
            Err(ComplianceError::FileRequired)
        ));
    }

    #[test]
    fn file_rules_follow_the_type() {
        let document_type = passport_type();

        let checked = check_file(&document_type, &file("Scan.PDF", 512)).unwrap();
        assert_eq!(checked.mime_type.as_deref(), Some("application/pdf"));

        assert!(matches!(
            check_file(&document_type, &file("scan.docx", 10)),
            Err(ComplianceError::FileExtensionNotAllowed(ext)) if ext == "docx"
        ));
        assert!(matches!(
            check_file(&document_type, &file("scan.pdf", 2_000)),
            Err(ComplianceError::FileTooLarge { size: 2_000, limit: 1_000 })
        ));

        let mut open = passport_type();
        open.allowed_extensions.clear();
        open.max_file_size_bytes = None;
        assert!(check_file(&open, &file("scan.docx", 2_000)).is_ok());
    }

    #[test]
    fn dates_respect_expiry_rules() {
        let policy = TypePolicy::from(&passport_type());
        let issued = NaiveDate::from_ymd_opt(2020, 1, 1);
        let expires = NaiveDate::from_ymd_opt(2030, 1, 1);

        assert!(check_dates(&policy, issued, expires, true).is_ok());
        assert!(matches!(
            check_dates(&policy, issued, None, true),
            Err(ComplianceError::ExpiryDateRequired)
        ));
        assert!(check_dates(&policy, issued, None, false).is_ok());
        assert!(matches!(
            check_dates(&policy, expires, issued, false),
            Err(ComplianceError::InvalidDateRange)
        ));
    }

    #[test]
    fn type_policy_reads_flags() {
        let policy = TypePolicy::from(&passport_type());
        assert_eq!(policy.cardinality, CardinalityPolicy::Single);
        assert!(policy.is_mandatory);
        assert!(policy.allow_not_applicable);
    }

    #[test]
    fn patch_reports_changed_keys() {
        let patch: DocumentPatch = serde_json::from_value(json!({
            "document_number": null,
            "is_active": false,
            "field_values": [],
        }))
        .unwrap();
        assert_eq!(patch.document_number, Some(None));
        assert_eq!(
            changed_keys(&patch, false),
            vec!["document_number", "is_active", "field_values"]
        );
        assert_eq!(changed_keys(&patch, true), vec!["document_number", "is_active"]);
    }

    #[test]
    fn oversized_inputs_fail_validation() {
        let request: NewDocumentRequest = serde_json::from_value(json!({
            "employee_id": Uuid::new_v4(),
            "document_type_id": Uuid::new_v4(),
            "document_number": "P".repeat(128),
            "file": { "file_name": "scan.pdf", "file_path": "s3://docs/scan.pdf" },
        }))
        .unwrap();
        assert!(request.validate().is_ok());

        let mut long_number = request.clone();
        long_number.document_number = Some("P".repeat(129));
        assert!(matches!(
            ComplianceError::from(long_number.validate().unwrap_err()),
            ComplianceError::InvalidInput(_)
        ));

        let mut long_name = request.clone();
        long_name.file.file_name = Some(format!("{}.pdf", "a".repeat(252)));
        assert!(long_name.validate().is_err());

        let patch = DocumentPatch {
            document_number: Some(Some("N".repeat(200))),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
        let patch = DocumentPatch {
            file: Some(FileReference {
                mime_type: Some("x".repeat(129)),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn audit_events_record_who_acted_for_whom() {
        let document_type = passport_type();
        let employee_id = Uuid::new_v4();
        let now = Utc::now().naive_utc();
        let document = EmployeeDocument {
            id: Uuid::new_v4(),
            company_id: document_type.company_id,
            employee_id,
            document_type_id: document_type.id,
            folder_id: document_type.folder_id,
            document_number: None,
            file_name: None,
            file_path: None,
            file_size_bytes: None,
            mime_type: None,
            issue_date: None,
            expiry_date: None,
            is_not_applicable: false,
            not_applicable_reason: None,
            is_active: true,
            created_by: employee_id,
            updated_by: employee_id,
            created_at: now,
            updated_at: now,
        };

        let by_self = Actor {
            company_id: document_type.company_id,
            user_id: employee_id,
        };
        let by_admin = Actor {
            company_id: document_type.company_id,
            user_id: Uuid::new_v4(),
        };

        let own = audit_event(AuditEventType::DocumentUpdated, by_self, &document, json!({}));
        assert_eq!(own.on_behalf_of, None);
        let delegated = audit_event(AuditEventType::DocumentUpdated, by_admin, &document, json!({}));
        assert_eq!(delegated.on_behalf_of, Some(employee_id));
        assert_eq!(delegated.folder_id, Some(document_type.folder_id));
    }
}
