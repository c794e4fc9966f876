use axum::extract::{Json, Path, Query, State};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::compliance::{self, ComplianceStatus, TypeCompliance};
use crate::error::AppResult;
use crate::lifecycle;
use crate::state::AppState;

use super::documents::{to_document_response, DocumentResponse};

#[derive(Deserialize, Default)]
pub struct EmployeeDocumentsQuery {
    pub document_type_id: Option<Uuid>,
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Deserialize, Default)]
pub struct ComplianceQuery {
    pub as_of: Option<NaiveDate>,
}

#[derive(Serialize)]
pub struct EmployeeDocumentsResponse {
    pub employee_id: Uuid,
    pub documents: Vec<DocumentResponse>,
}

#[derive(Serialize)]
pub struct ComplianceItemResponse {
    pub document_type_id: Uuid,
    pub code: String,
    pub name: String,
    pub status: ComplianceStatus,
    pub active_documents: usize,
    pub latest_expiry: Option<NaiveDate>,
}

#[derive(Serialize)]
pub struct ComplianceResponse {
    pub employee_id: Uuid,
    pub as_of: NaiveDate,
    pub compliant: bool,
    pub items: Vec<ComplianceItemResponse>,
}

pub async fn list_employee_documents(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(employee_id): Path<Uuid>,
    Query(query): Query<EmployeeDocumentsQuery>,
) -> AppResult<Json<EmployeeDocumentsResponse>> {
    user.require_employee_access(employee_id)?;
    let mut conn = state.db()?;

    let documents = lifecycle::list_employee_documents(
        &mut conn,
        user.company_id,
        employee_id,
        query.document_type_id,
        query.include_inactive,
    )?;
    Ok(Json(EmployeeDocumentsResponse {
        employee_id,
        documents: documents.into_iter().map(to_document_response).collect(),
    }))
}

pub async fn employee_compliance(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(employee_id): Path<Uuid>,
    Query(query): Query<ComplianceQuery>,
) -> AppResult<Json<ComplianceResponse>> {
    user.require_employee_access(employee_id)?;
    let mut conn = state.db()?;

    let as_of = query.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let summary = compliance::employee_summary(&mut conn, user.company_id, employee_id, as_of)?;
    Ok(Json(ComplianceResponse {
        employee_id: summary.employee_id,
        as_of: summary.as_of,
        compliant: summary.is_compliant(),
        items: summary.items.into_iter().map(to_item_response).collect(),
    }))
}

fn to_item_response(item: TypeCompliance) -> ComplianceItemResponse {
    ComplianceItemResponse {
        document_type_id: item.document_type.id,
        code: item.document_type.code,
        name: item.document_type.name,
        status: item.status,
        active_documents: item.active_documents,
        latest_expiry: item.latest_expiry,
    }
}
