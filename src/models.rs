use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = folders)]
pub struct Folder {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = folders)]
pub struct NewFolder {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = document_types)]
#[diesel(belongs_to(Folder, foreign_key = folder_id))]
pub struct DocumentType {
    pub id: Uuid,
    pub company_id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub folder_id: Uuid,
    pub allow_single: bool,
    pub allow_multiple: bool,
    pub is_mandatory: bool,
    pub allow_not_applicable: bool,
    pub require_expiry_date: bool,
    pub allowed_extensions: Vec<String>,
    pub max_file_size_bytes: Option<i64>,
    pub is_active: bool,
    pub is_system: bool,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = document_types)]
pub struct NewDocumentType {
    pub id: Uuid,
    pub company_id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub folder_id: Uuid,
    pub allow_single: bool,
    pub allow_multiple: bool,
    pub is_mandatory: bool,
    pub allow_not_applicable: bool,
    pub require_expiry_date: bool,
    pub allowed_extensions: Vec<String>,
    pub max_file_size_bytes: Option<i64>,
    pub is_active: bool,
    pub is_system: bool,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = document_fields)]
#[diesel(belongs_to(DocumentType))]
pub struct DocumentField {
    pub id: Uuid,
    pub document_type_id: Uuid,
    pub name: String,
    pub label: String,
    pub field_type: String,
    pub options: serde_json::Value,
    pub validation: serde_json::Value,
    pub placeholder: Option<String>,
    pub help_text: Option<String>,
    pub is_required: bool,
    pub is_readonly: bool,
    pub is_visible: bool,
    pub display_order: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = document_fields)]
pub struct NewDocumentField {
    pub id: Uuid,
    pub document_type_id: Uuid,
    pub name: String,
    pub label: String,
    pub field_type: String,
    pub options: serde_json::Value,
    pub validation: serde_json::Value,
    pub placeholder: Option<String>,
    pub help_text: Option<String>,
    pub is_required: bool,
    pub is_readonly: bool,
    pub is_visible: bool,
    pub display_order: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = employee_documents)]
#[diesel(belongs_to(DocumentType))]
pub struct EmployeeDocument {
    pub id: Uuid,
    pub company_id: Uuid,
    pub employee_id: Uuid,
    pub document_type_id: Uuid,
    pub folder_id: Uuid,
    pub document_number: Option<String>,
    pub file_name: Option<String>,
    pub file_path: Option<String>,
    pub file_size_bytes: Option<i64>,
    pub mime_type: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub is_not_applicable: bool,
    pub not_applicable_reason: Option<String>,
    pub is_active: bool,
    pub created_by: Uuid,
    pub updated_by: Uuid,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl EmployeeDocument {
    /// Whether this row occupies an upload slot of its document type.
    pub fn occupies_slot(&self) -> bool {
        self.is_active && !self.is_not_applicable
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = employee_documents)]
pub struct NewEmployeeDocument {
    pub id: Uuid,
    pub company_id: Uuid,
    pub employee_id: Uuid,
    pub document_type_id: Uuid,
    pub folder_id: Uuid,
    pub document_number: Option<String>,
    pub file_name: Option<String>,
    pub file_path: Option<String>,
    pub file_size_bytes: Option<i64>,
    pub mime_type: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub is_not_applicable: bool,
    pub not_applicable_reason: Option<String>,
    pub is_active: bool,
    pub created_by: Uuid,
    pub updated_by: Uuid,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = employee_document_field_values)]
pub struct NewEmployeeDocumentFieldValue {
    pub id: Uuid,
    pub employee_document_id: Uuid,
    pub field_id: Uuid,
    pub field_value: serde_json::Value,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = document_audit_events)]
pub struct AuditEventRecord {
    pub id: Uuid,
    pub company_id: Uuid,
    pub event_type: String,
    pub document_id: Uuid,
    pub document_type_id: Uuid,
    pub folder_id: Option<Uuid>,
    pub actor_id: Uuid,
    pub on_behalf_of: Option<Uuid>,
    pub details: serde_json::Value,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = document_audit_events)]
pub struct NewAuditEventRecord {
    pub id: Uuid,
    pub company_id: Uuid,
    pub event_type: String,
    pub document_id: Uuid,
    pub document_type_id: Uuid,
    pub folder_id: Option<Uuid>,
    pub actor_id: Uuid,
    pub on_behalf_of: Option<Uuid>,
    pub details: serde_json::Value,
}
