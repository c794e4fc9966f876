use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::AppResult;
use crate::field_schema::FieldDefinition;
use crate::models::{DocumentField, DocumentType};
use crate::policy::CardinalityPolicy;
use crate::registry::{self, DocumentTypeConfig, DocumentTypePatch, FieldPatch};
use crate::state::AppState;

use super::documents::to_iso;

#[derive(Deserialize)]
pub struct CreateDocumentTypeRequest {
    #[serde(flatten)]
    pub config: DocumentTypeConfig,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

#[derive(Deserialize, Default)]
pub struct ListDocumentTypesQuery {
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Deserialize, Default)]
pub struct DeleteFieldQuery {
    #[serde(default)]
    pub cascade_values: bool,
}

#[derive(Serialize)]
pub struct DocumentTypeResponse {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub folder_id: Uuid,
    pub allow_single: bool,
    pub allow_multiple: bool,
    pub cardinality: CardinalityPolicy,
    pub is_mandatory: bool,
    pub allow_not_applicable: bool,
    pub require_expiry_date: bool,
    pub allowed_extensions: Vec<String>,
    pub max_file_size_bytes: Option<i64>,
    pub is_active: bool,
    pub is_system: bool,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldResponse>>,
}

#[derive(Serialize)]
pub struct FieldResponse {
    pub id: Uuid,
    pub name: String,
    pub label: String,
    pub field_type: String,
    pub options: Value,
    pub validation: Value,
    pub placeholder: Option<String>,
    pub help_text: Option<String>,
    pub is_required: bool,
    pub is_readonly: bool,
    pub is_visible: bool,
    pub display_order: i32,
}

#[derive(Serialize)]
pub struct DocumentTypeEnvelope {
    pub document_type: DocumentTypeResponse,
}

#[derive(Serialize)]
pub struct DocumentTypeListResponse {
    pub document_types: Vec<DocumentTypeResponse>,
}

#[derive(Serialize)]
pub struct FieldEnvelope {
    pub field: FieldResponse,
}

pub async fn list_document_types(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ListDocumentTypesQuery>,
) -> AppResult<Json<DocumentTypeListResponse>> {
    let mut conn = state.db()?;
    let types = registry::list_types(&mut conn, user.company_id, query.active_only)?;
    Ok(Json(DocumentTypeListResponse {
        document_types: types
            .into_iter()
            .map(|document_type| to_document_type_response(document_type, None))
            .collect(),
    }))
}

pub async fn create_document_type(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateDocumentTypeRequest>,
) -> AppResult<impl IntoResponse> {
    user.require_admin()?;
    let mut conn = state.db()?;

    let created = registry::create_type(
        &mut conn,
        user.company_id,
        user.user_id,
        payload.config,
        payload.fields,
    )?;
    Ok((
        StatusCode::CREATED,
        Json(DocumentTypeEnvelope {
            document_type: to_document_type_response(created.document_type, Some(created.fields)),
        }),
    ))
}

pub async fn get_document_type(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(type_id): Path<Uuid>,
) -> AppResult<Json<DocumentTypeEnvelope>> {
    let mut conn = state.db()?;
    let found = registry::get_type(&mut conn, user.company_id, type_id)?;
    Ok(Json(DocumentTypeEnvelope {
        document_type: to_document_type_response(found.document_type, Some(found.fields)),
    }))
}

pub async fn update_document_type(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(type_id): Path<Uuid>,
    Json(payload): Json<DocumentTypePatch>,
) -> AppResult<Json<DocumentTypeEnvelope>> {
    user.require_admin()?;
    let mut conn = state.db()?;

    let updated = registry::update_type(&mut conn, user.company_id, user.user_id, type_id, payload)?;
    let fields = registry::list_fields(&mut conn, updated.id)?;
    Ok(Json(DocumentTypeEnvelope {
        document_type: to_document_type_response(updated, Some(fields)),
    }))
}

pub async fn delete_document_type(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(type_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    user.require_admin()?;
    let mut conn = state.db()?;
    registry::delete_type(&mut conn, user.company_id, type_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_field(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(type_id): Path<Uuid>,
    Json(payload): Json<FieldDefinition>,
) -> AppResult<impl IntoResponse> {
    user.require_admin()?;
    let mut conn = state.db()?;

    let field = registry::add_field(&mut conn, user.company_id, type_id, payload)?;
    Ok((
        StatusCode::CREATED,
        Json(FieldEnvelope {
            field: to_field_response(field),
        }),
    ))
}

pub async fn update_field(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((type_id, field_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<FieldPatch>,
) -> AppResult<Json<FieldEnvelope>> {
    user.require_admin()?;
    let mut conn = state.db()?;

    let field = registry::update_field(&mut conn, user.company_id, type_id, field_id, payload)?;
    Ok(Json(FieldEnvelope {
        field: to_field_response(field),
    }))
}

pub async fn delete_field(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((type_id, field_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<DeleteFieldQuery>,
) -> AppResult<StatusCode> {
    user.require_admin()?;
    let mut conn = state.db()?;
    registry::delete_field(
        &mut conn,
        user.company_id,
        type_id,
        field_id,
        query.cascade_values,
    )?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn to_document_type_response(
    document_type: DocumentType,
    fields: Option<Vec<DocumentField>>,
) -> DocumentTypeResponse {
    DocumentTypeResponse {
        id: document_type.id,
        cardinality: CardinalityPolicy::from_flags(
            document_type.allow_single,
            document_type.allow_multiple,
        ),
        code: document_type.code,
        name: document_type.name,
        description: document_type.description,
        folder_id: document_type.folder_id,
        allow_single: document_type.allow_single,
        allow_multiple: document_type.allow_multiple,
        is_mandatory: document_type.is_mandatory,
        allow_not_applicable: document_type.allow_not_applicable,
        require_expiry_date: document_type.require_expiry_date,
        allowed_extensions: document_type.allowed_extensions,
        max_file_size_bytes: document_type.max_file_size_bytes,
        is_active: document_type.is_active,
        is_system: document_type.is_system,
        created_at: to_iso(document_type.created_at),
        updated_at: to_iso(document_type.updated_at),
        fields: fields.map(|fields| fields.into_iter().map(to_field_response).collect()),
    }
}

fn to_field_response(field: DocumentField) -> FieldResponse {
    FieldResponse {
        id: field.id,
        name: field.name,
        label: field.label,
        field_type: field.field_type,
        options: field.options,
        validation: field.validation,
        placeholder: field.placeholder,
        help_text: field.help_text,
        is_required: field.is_required,
        is_readonly: field.is_readonly,
        is_visible: field.is_visible,
        display_order: field.display_order,
    }
}
