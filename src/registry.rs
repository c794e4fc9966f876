//! Document type registry: type configuration and its field schema.

use std::collections::HashSet;

use chrono::{NaiveDateTime, Utc};
use diesel::{
    dsl::exists,
    pg::PgConnection,
    prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ComplianceError, ComplianceResult};
use crate::field_schema::{check_options, FieldDefinition, FieldType, FieldValidation};
use crate::folders::ensure_folder_exists;
use crate::models::{DocumentField, DocumentType, NewDocumentField, NewDocumentType};
use crate::schema::{
    document_fields, document_types, employee_document_field_values, employee_documents,
};
use crate::utils::json::double_option;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DocumentTypeConfig {
    #[validate(length(max = 64, message = "code must not exceed 64 characters"))]
    pub code: String,
    #[validate(length(max = 255, message = "name must not exceed 255 characters"))]
    pub name: String,
    pub description: Option<String>,
    pub folder_id: Uuid,
    #[serde(default = "default_true")]
    pub allow_single: bool,
    #[serde(default)]
    pub allow_multiple: bool,
    #[serde(default)]
    pub is_mandatory: bool,
    #[serde(default)]
    pub allow_not_applicable: bool,
    #[serde(default)]
    pub require_expiry_date: bool,
    #[serde(default)]
    pub allowed_extensions: Vec<String>,
    pub max_file_size_bytes: Option<i64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_system: bool,
}

fn default_true() -> bool {
    true
}

/// Partial update of a document type. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct DocumentTypePatch {
    #[validate(length(max = 64, message = "code must not exceed 64 characters"))]
    pub code: Option<String>,
    #[validate(length(max = 255, message = "name must not exceed 255 characters"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub folder_id: Option<Uuid>,
    pub allow_single: Option<bool>,
    pub allow_multiple: Option<bool>,
    pub is_mandatory: Option<bool>,
    pub allow_not_applicable: Option<bool>,
    pub require_expiry_date: Option<bool>,
    pub allowed_extensions: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub max_file_size_bytes: Option<Option<i64>>,
    pub is_active: Option<bool>,
}

/// Partial update of a field. The name is fixed once the field exists.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct FieldPatch {
    #[validate(length(max = 255, message = "label must not exceed 255 characters"))]
    pub label: Option<String>,
    pub field_type: Option<FieldType>,
    pub options: Option<Vec<String>>,
    pub validation: Option<FieldValidation>,
    #[serde(default, deserialize_with = "double_option")]
    pub placeholder: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub help_text: Option<Option<String>>,
    pub is_required: Option<bool>,
    pub is_readonly: Option<bool>,
    pub is_visible: Option<bool>,
    pub display_order: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct DocumentTypeWithFields {
    pub document_type: DocumentType,
    pub fields: Vec<DocumentField>,
}

#[derive(AsChangeset)]
#[diesel(table_name = document_types)]
struct DocumentTypeChangeset {
    code: Option<String>,
    name: Option<String>,
    description: Option<Option<String>>,
    folder_id: Option<Uuid>,
    allow_single: Option<bool>,
    allow_multiple: Option<bool>,
    is_mandatory: Option<bool>,
    allow_not_applicable: Option<bool>,
    require_expiry_date: Option<bool>,
    allowed_extensions: Option<Vec<String>>,
    max_file_size_bytes: Option<Option<i64>>,
    is_active: Option<bool>,
    updated_by: Option<Uuid>,
    updated_at: NaiveDateTime,
}

#[derive(AsChangeset)]
#[diesel(table_name = document_fields)]
struct FieldChangeset {
    label: Option<String>,
    field_type: Option<String>,
    options: Option<Value>,
    validation: Option<Value>,
    placeholder: Option<Option<String>>,
    help_text: Option<Option<String>>,
    is_required: Option<bool>,
    is_readonly: Option<bool>,
    is_visible: Option<bool>,
    display_order: Option<i32>,
    updated_at: NaiveDateTime,
}

/// Creates a document type together with its fields in one transaction.
pub fn create_type(
    conn: &mut PgConnection,
    company_id: Uuid,
    actor_id: Uuid,
    config: DocumentTypeConfig,
    fields: Vec<FieldDefinition>,
) -> ComplianceResult<DocumentTypeWithFields> {
    config.validate()?;
    let code = normalize_code(&config.code)?;
    let name = required_text(&config.name, "name")?;
    check_file_size_limit(config.max_file_size_bytes)?;
    let fields = fields
        .into_iter()
        .map(FieldDefinition::normalized)
        .collect::<ComplianceResult<Vec<_>>>()?;

    let mut seen = HashSet::new();
    for field in &fields {
        if !seen.insert(field.name.as_str()) {
            return Err(ComplianceError::DuplicateFieldName(field.name.clone()));
        }
    }

    let created = conn.transaction::<_, ComplianceError, _>(|conn| {
        ensure_folder_exists(conn, company_id, config.folder_id)?;
        ensure_code_available(conn, company_id, &code, None)?;

        let new_type = NewDocumentType {
            id: Uuid::new_v4(),
            company_id,
            code: code.clone(),
            name,
            description: optional_text(config.description),
            folder_id: config.folder_id,
            allow_single: config.allow_single,
            allow_multiple: config.allow_multiple,
            is_mandatory: config.is_mandatory,
            allow_not_applicable: config.allow_not_applicable,
            require_expiry_date: config.require_expiry_date,
            allowed_extensions: normalize_extensions(&config.allowed_extensions),
            max_file_size_bytes: config.max_file_size_bytes,
            is_active: config.is_active,
            is_system: config.is_system,
            created_by: Some(actor_id),
            updated_by: Some(actor_id),
        };

        diesel::insert_into(document_types::table)
            .values(&new_type)
            .execute(conn)
            .map_err(|err| on_unique(err, || ComplianceError::DuplicateTypeCode(code.clone())))?;

        for field in fields {
            insert_field(conn, new_type.id, field)?;
        }

        get_type_in(conn, company_id, new_type.id)
    })?;

    info!(
        document_type_id = %created.document_type.id,
        code = %created.document_type.code,
        field_count = created.fields.len(),
        "document type created"
    );
    Ok(created)
}

/// Applies a patch to a document type. Existing employee documents are not
/// re-validated against the new policy.
pub fn update_type(
    conn: &mut PgConnection,
    company_id: Uuid,
    actor_id: Uuid,
    type_id: Uuid,
    patch: DocumentTypePatch,
) -> ComplianceResult<DocumentType> {
    patch.validate()?;
    conn.transaction::<_, ComplianceError, _>(|conn| {
        let existing = load_type(conn, company_id, type_id)?;

        let code = match patch.code.as_deref() {
            Some(raw) => {
                let code = normalize_code(raw)?;
                if code == existing.code {
                    None
                } else if existing.is_system {
                    return Err(ComplianceError::ProtectedType);
                } else {
                    ensure_code_available(conn, company_id, &code, Some(type_id))?;
                    Some(code)
                }
            }
            None => None,
        };

        if let Some(folder_id) = patch.folder_id {
            ensure_folder_exists(conn, company_id, folder_id)?;
        }

        let name = patch
            .name
            .as_deref()
            .map(|name| required_text(name, "name"))
            .transpose()?;

        if let Some(limit) = patch.max_file_size_bytes {
            check_file_size_limit(limit)?;
        }

        let changeset = DocumentTypeChangeset {
            code: code.clone(),
            name,
            description: patch.description.map(optional_text),
            folder_id: patch.folder_id,
            allow_single: patch.allow_single,
            allow_multiple: patch.allow_multiple,
            is_mandatory: patch.is_mandatory,
            allow_not_applicable: patch.allow_not_applicable,
            require_expiry_date: patch.require_expiry_date,
            allowed_extensions: patch
                .allowed_extensions
                .as_deref()
                .map(normalize_extensions),
            max_file_size_bytes: patch.max_file_size_bytes,
            is_active: patch.is_active,
            updated_by: Some(actor_id),
            updated_at: Utc::now().naive_utc(),
        };

        diesel::update(document_types::table.find(type_id))
            .set(&changeset)
            .execute(conn)
            .map_err(|err| {
                on_unique(err, || {
                    ComplianceError::DuplicateTypeCode(code.clone().unwrap_or_default())
                })
            })?;

        let updated = load_type(conn, company_id, type_id)?;
        info!(document_type_id = %type_id, code = %updated.code, "document type updated");
        Ok(updated)
    })
}

/// Deletes a document type and its fields. Refused for system types and for
/// types any employee document still references, active or not.
pub fn delete_type(conn: &mut PgConnection, company_id: Uuid, type_id: Uuid) -> ComplianceResult<()> {
    conn.transaction::<_, ComplianceError, _>(|conn| {
        let existing = load_type(conn, company_id, type_id)?;
        if existing.is_system {
            return Err(ComplianceError::ProtectedType);
        }

        let in_use: bool = diesel::select(exists(
            employee_documents::table.filter(employee_documents::document_type_id.eq(type_id)),
        ))
        .get_result(conn)?;
        if in_use {
            return Err(ComplianceError::TypeInUse);
        }

        diesel::delete(document_fields::table.filter(document_fields::document_type_id.eq(type_id)))
            .execute(conn)?;
        diesel::delete(document_types::table.find(type_id)).execute(conn)?;

        info!(document_type_id = %type_id, code = %existing.code, "document type deleted");
        Ok(())
    })
}

pub fn get_type(
    conn: &mut PgConnection,
    company_id: Uuid,
    type_id: Uuid,
) -> ComplianceResult<DocumentTypeWithFields> {
    get_type_in(conn, company_id, type_id)
}

pub fn list_types(
    conn: &mut PgConnection,
    company_id: Uuid,
    active_only: bool,
) -> ComplianceResult<Vec<DocumentType>> {
    let mut query = document_types::table
        .filter(document_types::company_id.eq(company_id))
        .into_boxed();
    if active_only {
        query = query.filter(document_types::is_active.eq(true));
    }
    Ok(query.order(document_types::name.asc()).load(conn)?)
}

pub fn list_fields(conn: &mut PgConnection, type_id: Uuid) -> ComplianceResult<Vec<DocumentField>> {
    Ok(document_fields::table
        .filter(document_fields::document_type_id.eq(type_id))
        .order((
            document_fields::display_order.asc(),
            document_fields::name.asc(),
        ))
        .load(conn)?)
}

pub fn add_field(
    conn: &mut PgConnection,
    company_id: Uuid,
    type_id: Uuid,
    definition: FieldDefinition,
) -> ComplianceResult<DocumentField> {
    let definition = definition.normalized()?;

    conn.transaction::<_, ComplianceError, _>(|conn| {
        load_type(conn, company_id, type_id)?;

        let taken: bool = diesel::select(exists(
            document_fields::table
                .filter(document_fields::document_type_id.eq(type_id))
                .filter(document_fields::name.eq(&definition.name)),
        ))
        .get_result(conn)?;
        if taken {
            return Err(ComplianceError::DuplicateFieldName(definition.name));
        }

        let field = insert_field(conn, type_id, definition)?;
        info!(document_type_id = %type_id, field_id = %field.id, name = %field.name, "field added");
        Ok(field)
    })
}

pub fn update_field(
    conn: &mut PgConnection,
    company_id: Uuid,
    type_id: Uuid,
    field_id: Uuid,
    patch: FieldPatch,
) -> ComplianceResult<DocumentField> {
    patch.validate()?;
    conn.transaction::<_, ComplianceError, _>(|conn| {
        load_type(conn, company_id, type_id)?;
        let existing = load_field(conn, type_id, field_id)?;

        let field_type = match patch.field_type {
            Some(field_type) => field_type,
            None => existing.field_type.parse()?,
        };
        let options = match &patch.options {
            Some(options) => options.clone(),
            None => serde_json::from_value(existing.options.clone()).unwrap_or_default(),
        };
        check_options(field_type, &options)?;
        if let Some(validation) = &patch.validation {
            validation.check()?;
        }

        let label = patch
            .label
            .as_deref()
            .map(|label| required_text(label, "label"))
            .transpose()?;

        let changeset = FieldChangeset {
            label,
            field_type: patch.field_type.map(|t| t.as_str().to_string()),
            options: patch.options.map(Value::from),
            validation: patch.validation.as_ref().map(to_json).transpose()?,
            placeholder: patch.placeholder.map(optional_text),
            help_text: patch.help_text.map(optional_text),
            is_required: patch.is_required,
            is_readonly: patch.is_readonly,
            is_visible: patch.is_visible,
            display_order: patch.display_order,
            updated_at: Utc::now().naive_utc(),
        };

        diesel::update(document_fields::table.find(field_id))
            .set(&changeset)
            .execute(conn)?;

        load_field(conn, type_id, field_id)
    })
}

/// Removes a field. Stored values for it stay behind as inert rows unless
/// `cascade_values` is set.
pub fn delete_field(
    conn: &mut PgConnection,
    company_id: Uuid,
    type_id: Uuid,
    field_id: Uuid,
    cascade_values: bool,
) -> ComplianceResult<()> {
    conn.transaction::<_, ComplianceError, _>(|conn| {
        load_type(conn, company_id, type_id)?;
        load_field(conn, type_id, field_id)?;

        if cascade_values {
            let purged = diesel::delete(
                employee_document_field_values::table
                    .filter(employee_document_field_values::field_id.eq(field_id)),
            )
            .execute(conn)?;
            info!(field_id = %field_id, purged, "field values purged");
        }

        diesel::delete(document_fields::table.find(field_id)).execute(conn)?;
        info!(document_type_id = %type_id, field_id = %field_id, "field deleted");
        Ok(())
    })
}

pub(crate) fn load_type(
    conn: &mut PgConnection,
    company_id: Uuid,
    type_id: Uuid,
) -> ComplianceResult<DocumentType> {
    document_types::table
        .find(type_id)
        .filter(document_types::company_id.eq(company_id))
        .first::<DocumentType>(conn)
        .optional()?
        .ok_or(ComplianceError::TypeNotFound(type_id))
}

fn load_field(
    conn: &mut PgConnection,
    type_id: Uuid,
    field_id: Uuid,
) -> ComplianceResult<DocumentField> {
    document_fields::table
        .find(field_id)
        .filter(document_fields::document_type_id.eq(type_id))
        .first::<DocumentField>(conn)
        .optional()?
        .ok_or(ComplianceError::FieldNotFound(field_id))
}

fn get_type_in(
    conn: &mut PgConnection,
    company_id: Uuid,
    type_id: Uuid,
) -> ComplianceResult<DocumentTypeWithFields> {
    let document_type = load_type(conn, company_id, type_id)?;
    let fields = list_fields(conn, type_id)?;
    Ok(DocumentTypeWithFields {
        document_type,
        fields,
    })
}

fn insert_field(
    conn: &mut PgConnection,
    type_id: Uuid,
    definition: FieldDefinition,
) -> ComplianceResult<DocumentField> {
    let new_field = NewDocumentField {
        id: Uuid::new_v4(),
        document_type_id: type_id,
        name: definition.name.clone(),
        label: definition.label,
        field_type: definition.field_type.as_str().to_string(),
        options: Value::from(definition.options),
        validation: to_json(&definition.validation)?,
        placeholder: optional_text(definition.placeholder),
        help_text: optional_text(definition.help_text),
        is_required: definition.is_required,
        is_readonly: definition.is_readonly,
        is_visible: definition.is_visible,
        display_order: definition.display_order,
    };

    diesel::insert_into(document_fields::table)
        .values(&new_field)
        .execute(conn)
        .map_err(|err| on_unique(err, || ComplianceError::DuplicateFieldName(definition.name)))?;

    Ok(document_fields::table.find(new_field.id).first(conn)?)
}

fn ensure_code_available(
    conn: &mut PgConnection,
    company_id: Uuid,
    code: &str,
    except: Option<Uuid>,
) -> ComplianceResult<()> {
    let clash: Option<Uuid> = document_types::table
        .filter(document_types::company_id.eq(company_id))
        .filter(document_types::code.eq(code))
        .select(document_types::id)
        .first(conn)
        .optional()?;

    match clash {
        Some(id) if Some(id) != except => Err(ComplianceError::DuplicateTypeCode(code.to_string())),
        _ => Ok(()),
    }
}

fn on_unique(err: DieselError, conflict: impl FnOnce() -> ComplianceError) -> ComplianceError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => conflict(),
        other => ComplianceError::from(other),
    }
}

fn to_json<T: Serialize>(value: &T) -> ComplianceResult<Value> {
    serde_json::to_value(value).map_err(|err| ComplianceError::InvalidInput(err.to_string()))
}

fn normalize_code(raw: &str) -> ComplianceResult<String> {
    let code = raw.trim();
    if code.is_empty() {
        return Err(ComplianceError::InvalidInput(
            "code must not be empty".to_string(),
        ));
    }
    if code.chars().any(char::is_whitespace) {
        return Err(ComplianceError::InvalidInput(
            "code must not contain whitespace".to_string(),
        ));
    }
    Ok(code.to_string())
}

fn required_text(raw: &str, what: &str) -> ComplianceResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ComplianceError::InvalidInput(format!(
            "{what} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

fn optional_text(raw: Option<String>) -> Option<String> {
    raw.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn check_file_size_limit(limit: Option<i64>) -> ComplianceResult<()> {
    match limit {
        Some(bytes) if bytes <= 0 => Err(ComplianceError::InvalidInput(
            "max_file_size_bytes must be positive".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Lowercases extensions, strips leading dots and drops blanks and repeats.
pub(crate) fn normalize_extensions(raw: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.iter()
        .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .filter(|ext| seen.insert(ext.clone()))
        .collect()
}
