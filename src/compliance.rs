use std::collections::HashMap;

use chrono::NaiveDate;
use diesel::{pg::PgConnection, prelude::*};
use serde::Serialize;
use uuid::Uuid;

use crate::error::ComplianceResult;
use crate::models::{DocumentType, EmployeeDocument};
use crate::schema::{document_types, employee_documents};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Satisfied,
    NotApplicable,
    Missing,
    Expired,
}

impl ComplianceStatus {
    pub fn is_compliant(self) -> bool {
        matches!(self, ComplianceStatus::Satisfied | ComplianceStatus::NotApplicable)
    }
}

#[derive(Debug, Clone)]
pub struct TypeCompliance {
    pub document_type: DocumentType,
    pub status: ComplianceStatus,
    pub active_documents: usize,
    pub latest_expiry: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct EmployeeCompliance {
    pub employee_id: Uuid,
    pub as_of: NaiveDate,
    pub items: Vec<TypeCompliance>,
}

impl EmployeeCompliance {
    pub fn is_compliant(&self) -> bool {
        self.items.iter().all(|item| item.status.is_compliant())
    }
}

/// Status of every active mandatory type of the company for one employee.
pub fn employee_summary(
    conn: &mut PgConnection,
    company_id: Uuid,
    employee_id: Uuid,
    as_of: NaiveDate,
) -> ComplianceResult<EmployeeCompliance> {
    let types: Vec<DocumentType> = document_types::table
        .filter(document_types::company_id.eq(company_id))
        .filter(document_types::is_mandatory.eq(true))
        .filter(document_types::is_active.eq(true))
        .order(document_types::name.asc())
        .load(conn)?;

    let type_ids: Vec<Uuid> = types.iter().map(|t| t.id).collect();
    let documents: Vec<EmployeeDocument> = employee_documents::table
        .filter(employee_documents::company_id.eq(company_id))
        .filter(employee_documents::employee_id.eq(employee_id))
        .filter(employee_documents::document_type_id.eq_any(&type_ids))
        .filter(employee_documents::is_active.eq(true))
        .load(conn)?;

    let mut by_type: HashMap<Uuid, Vec<EmployeeDocument>> = HashMap::new();
    for document in documents {
        by_type
            .entry(document.document_type_id)
            .or_default()
            .push(document);
    }

    let items = types
        .into_iter()
        .map(|document_type| {
            let documents = by_type.remove(&document_type.id).unwrap_or_default();
            let uploads: Vec<&EmployeeDocument> =
                documents.iter().filter(|d| d.occupies_slot()).collect();
            TypeCompliance {
                status: status_for(&documents, as_of),
                active_documents: uploads.len(),
                latest_expiry: uploads.iter().filter_map(|d| d.expiry_date).max(),
                document_type,
            }
        })
        .collect();

    Ok(EmployeeCompliance {
        employee_id,
        as_of,
        items,
    })
}

/// Status derived from the active documents of one (employee, type) pair.
///
/// A document without an expiry date never expires.
pub fn status_for(documents: &[EmployeeDocument], as_of: NaiveDate) -> ComplianceStatus {
    let mut uploads = documents.iter().filter(|d| d.occupies_slot()).peekable();
    if uploads.peek().is_some() {
        let all_expired = uploads.all(|d| d.expiry_date.is_some_and(|expiry| expiry < as_of));
        return if all_expired {
            ComplianceStatus::Expired
        } else {
            ComplianceStatus::Satisfied
        };
    }

    if documents
        .iter()
        .any(|d| d.is_active && d.is_not_applicable)
    {
        ComplianceStatus::NotApplicable
    } else {
        ComplianceStatus::Missing
    }
}
