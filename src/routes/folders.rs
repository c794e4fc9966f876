use axum::extract::{Json, Path, Query, State};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::AppResult;
use crate::folders::{self, FolderDocumentFilter, FolderTypeSummary};
use crate::state::AppState;

use super::document_types::{to_document_type_response, DocumentTypeResponse};
use super::documents::{to_document_response, DocumentResponse};

#[derive(Serialize)]
pub struct FolderTypeResponse {
    pub document_type: DocumentTypeResponse,
    pub file_count: i64,
}

#[derive(Serialize)]
pub struct FolderDocumentTypesResponse {
    pub folder_id: Uuid,
    pub document_types: Vec<FolderTypeResponse>,
}

#[derive(Serialize)]
pub struct FolderDocumentsResponse {
    pub folder_id: Uuid,
    pub documents: Vec<DocumentResponse>,
}

pub async fn list_folder_document_types(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(folder_id): Path<Uuid>,
) -> AppResult<Json<FolderDocumentTypesResponse>> {
    user.require_admin()?;
    let mut conn = state.db()?;

    let summaries = folders::types_in_folder(&mut conn, user.company_id, folder_id)?;
    Ok(Json(FolderDocumentTypesResponse {
        folder_id,
        document_types: summaries
            .into_iter()
            .map(|FolderTypeSummary { document_type, file_count }| FolderTypeResponse {
                document_type: to_document_type_response(document_type, None),
                file_count,
            })
            .collect(),
    }))
}

pub async fn list_folder_documents(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(folder_id): Path<Uuid>,
    Query(filter): Query<FolderDocumentFilter>,
) -> AppResult<Json<FolderDocumentsResponse>> {
    user.require_admin()?;
    let mut conn = state.db()?;

    let documents = folders::documents_in_folder(&mut conn, user.company_id, folder_id, &filter)?;
    Ok(Json(FolderDocumentsResponse {
        folder_id,
        documents: documents.into_iter().map(to_document_response).collect(),
    }))
}
