//! Folder lookups used by the registry, plus the read-only folder projections
//! behind the reporting screens.

use std::collections::HashMap;

use chrono::NaiveDate;
use diesel::{dsl::count_star, dsl::exists, pg::PgConnection, prelude::*};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ComplianceError, ComplianceResult};
use crate::models::{DocumentType, EmployeeDocument};
use crate::schema::{document_types, employee_documents, folders};

pub fn ensure_folder_exists(
    conn: &mut PgConnection,
    company_id: Uuid,
    folder_id: Uuid,
) -> ComplianceResult<()> {
    let exists: bool = diesel::select(exists(
        folders::table
            .filter(folders::id.eq(folder_id))
            .filter(folders::company_id.eq(company_id)),
    ))
    .get_result(conn)?;

    if !exists {
        return Err(ComplianceError::FolderNotFound(folder_id));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct FolderTypeSummary {
    pub document_type: DocumentType,
    pub file_count: i64,
}

/// Document types filed under a folder, each with the number of active
/// documents that carry a file.
pub fn types_in_folder(
    conn: &mut PgConnection,
    company_id: Uuid,
    folder_id: Uuid,
) -> ComplianceResult<Vec<FolderTypeSummary>> {
    ensure_folder_exists(conn, company_id, folder_id)?;

    let types: Vec<DocumentType> = document_types::table
        .filter(document_types::company_id.eq(company_id))
        .filter(document_types::folder_id.eq(folder_id))
        .order(document_types::name.asc())
        .load(conn)?;

    let type_ids: Vec<Uuid> = types.iter().map(|t| t.id).collect();
    let counts: Vec<(Uuid, i64)> = employee_documents::table
        .filter(employee_documents::company_id.eq(company_id))
        .filter(employee_documents::document_type_id.eq_any(&type_ids))
        .filter(employee_documents::is_active.eq(true))
        .filter(employee_documents::file_path.is_not_null())
        .group_by(employee_documents::document_type_id)
        .select((employee_documents::document_type_id, count_star()))
        .load(conn)?;
    let counts: HashMap<Uuid, i64> = counts.into_iter().collect();

    Ok(types
        .into_iter()
        .map(|document_type| FolderTypeSummary {
            file_count: counts.get(&document_type.id).copied().unwrap_or(0),
            document_type,
        })
        .collect())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FolderDocumentFilter {
    pub employee_id: Option<Uuid>,
    pub document_type_id: Option<Uuid>,
    pub not_applicable: Option<bool>,
    #[serde(default)]
    pub include_inactive: bool,
    pub expiring_before: Option<NaiveDate>,
}

pub fn documents_in_folder(
    conn: &mut PgConnection,
    company_id: Uuid,
    folder_id: Uuid,
    filter: &FolderDocumentFilter,
) -> ComplianceResult<Vec<EmployeeDocument>> {
    ensure_folder_exists(conn, company_id, folder_id)?;

    let mut query = employee_documents::table
        .filter(employee_documents::company_id.eq(company_id))
        .filter(employee_documents::folder_id.eq(folder_id))
        .into_boxed();

    if let Some(employee_id) = filter.employee_id {
        query = query.filter(employee_documents::employee_id.eq(employee_id));
    }
    if let Some(type_id) = filter.document_type_id {
        query = query.filter(employee_documents::document_type_id.eq(type_id));
    }
    if let Some(not_applicable) = filter.not_applicable {
        query = query.filter(employee_documents::is_not_applicable.eq(not_applicable));
    }
    if !filter.include_inactive {
        query = query.filter(employee_documents::is_active.eq(true));
    }
    if let Some(cutoff) = filter.expiring_before {
        query = query.filter(employee_documents::expiry_date.lt(cutoff));
    }

    let documents = query
        .order((
            employee_documents::employee_id.asc(),
            employee_documents::created_at.desc(),
        ))
        .load(conn)?;
    Ok(documents)
}
