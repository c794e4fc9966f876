use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::{AppResult, ComplianceError};
use crate::field_values::StoredFieldValue;
use crate::lifecycle::{self, DocumentDetail, DocumentPatch, NewDocumentRequest};
use crate::models::EmployeeDocument;
use crate::schema::employee_documents;
use crate::state::AppState;

use super::document_types::{to_document_type_response, DocumentTypeResponse};

#[derive(Deserialize)]
pub struct MarkNotApplicableRequest {
    pub reason: Option<String>,
}

#[derive(Serialize)]
pub struct DocumentResponse {
    pub id: Uuid,
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
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Serialize)]
pub struct FieldValueResponse {
    pub field_id: Uuid,
    pub field_name: String,
    pub field_label: String,
    pub field_type: String,
    pub value: Value,
}

#[derive(Serialize)]
pub struct DocumentDetailResponse {
    pub document: DocumentResponse,
    pub document_type: DocumentTypeResponse,
    pub field_values: Vec<FieldValueResponse>,
}

pub async fn create_document(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<NewDocumentRequest>,
) -> AppResult<impl IntoResponse> {
    user.require_employee_access(payload.employee_id)?;
    let mut conn = state.db()?;

    let detail = state
        .engine
        .create_document(&mut conn, user.actor(), payload)?;
    Ok((StatusCode::CREATED, Json(to_detail_response(detail))))
}

pub async fn get_document(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(document_id): Path<Uuid>,
) -> AppResult<Json<DocumentDetailResponse>> {
    let mut conn = state.db()?;
    let detail = lifecycle::get_document(&mut conn, user.company_id, document_id)?;
    user.require_employee_access(detail.document.employee_id)?;
    Ok(Json(to_detail_response(detail)))
}

pub async fn update_document(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(document_id): Path<Uuid>,
    Json(payload): Json<DocumentPatch>,
) -> AppResult<Json<DocumentDetailResponse>> {
    let mut conn = state.db()?;
    let owner = document_owner(&mut conn, user.company_id, document_id)?;
    user.require_employee_access(owner)?;

    let detail = state
        .engine
        .update_document(&mut conn, user.actor(), document_id, payload)?;
    Ok(Json(to_detail_response(detail)))
}

pub async fn delete_document(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(document_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;
    let owner = document_owner(&mut conn, user.company_id, document_id)?;
    user.require_employee_access(owner)?;

    state
        .engine
        .delete_document(&mut conn, user.actor(), document_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_not_applicable(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(document_id): Path<Uuid>,
    Json(payload): Json<MarkNotApplicableRequest>,
) -> AppResult<Json<DocumentDetailResponse>> {
    let mut conn = state.db()?;
    let owner = document_owner(&mut conn, user.company_id, document_id)?;
    user.require_employee_access(owner)?;

    let detail = state.engine.mark_not_applicable(
        &mut conn,
        user.actor(),
        document_id,
        payload.reason.as_deref(),
    )?;
    Ok(Json(to_detail_response(detail)))
}

fn document_owner(
    conn: &mut PgConnection,
    company_id: Uuid,
    document_id: Uuid,
) -> Result<Uuid, ComplianceError> {
    employee_documents::table
        .find(document_id)
        .filter(employee_documents::company_id.eq(company_id))
        .select(employee_documents::employee_id)
        .first::<Uuid>(conn)
        .optional()?
        .ok_or(ComplianceError::DocumentNotFound(document_id))
}

pub(crate) fn to_document_response(document: EmployeeDocument) -> DocumentResponse {
    DocumentResponse {
        id: document.id,
        employee_id: document.employee_id,
        document_type_id: document.document_type_id,
        folder_id: document.folder_id,
        document_number: document.document_number,
        file_name: document.file_name,
        file_path: document.file_path,
        file_size_bytes: document.file_size_bytes,
        mime_type: document.mime_type,
        issue_date: document.issue_date,
        expiry_date: document.expiry_date,
        is_not_applicable: document.is_not_applicable,
        not_applicable_reason: document.not_applicable_reason,
        is_active: document.is_active,
        created_by: document.created_by,
        updated_by: document.updated_by,
        created_at: to_iso(document.created_at),
        updated_at: to_iso(document.updated_at),
    }
}

fn to_field_value_response(value: StoredFieldValue) -> FieldValueResponse {
    FieldValueResponse {
        field_id: value.field_id,
        field_name: value.field_name,
        field_label: value.field_label,
        field_type: value.field_type,
        value: value.value,
    }
}

fn to_detail_response(detail: DocumentDetail) -> DocumentDetailResponse {
    DocumentDetailResponse {
        document: to_document_response(detail.document),
        document_type: to_document_type_response(detail.document_type, Some(detail.fields)),
        field_values: detail
            .field_values
            .into_iter()
            .map(to_field_value_response)
            .collect(),
    }
}

pub(crate) fn to_iso(dt: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).to_rfc3339()
}
