use diesel::{pg::PgConnection, prelude::*};
use serde::Serialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::models::{AuditEventRecord, NewAuditEventRecord};
use crate::schema::document_audit_events;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    DocumentUploaded,
    DocumentUpdated,
    DocumentDeleted,
    DocumentMarkedNa,
}

impl AuditEventType {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditEventType::DocumentUploaded => "document_uploaded",
            AuditEventType::DocumentUpdated => "document_updated",
            AuditEventType::DocumentDeleted => "document_deleted",
            AuditEventType::DocumentMarkedNa => "document_marked_na",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub event_type: AuditEventType,
    pub company_id: Uuid,
    pub document_id: Uuid,
    pub document_type_id: Uuid,
    pub folder_id: Option<Uuid>,
    pub actor_id: Uuid,
    pub on_behalf_of: Option<Uuid>,
    pub details: Value,
}

/// Append-only destination for audit events.
///
/// Implementations write through the connection they are handed so the event
/// commits or rolls back together with the mutation it documents.
pub trait AuditSink: Send + Sync {
    fn emit(&self, conn: &mut PgConnection, event: &AuditEvent) -> QueryResult<()>;
}

/// Default sink backed by the `document_audit_events` table.
#[derive(Debug, Default, Clone, Copy)]
pub struct TableAuditSink;

impl AuditSink for TableAuditSink {
    fn emit(&self, conn: &mut PgConnection, event: &AuditEvent) -> QueryResult<()> {
        let record = NewAuditEventRecord {
            id: Uuid::new_v4(),
            company_id: event.company_id,
            event_type: event.event_type.as_str().to_string(),
            document_id: event.document_id,
            document_type_id: event.document_type_id,
            folder_id: event.folder_id,
            actor_id: event.actor_id,
            on_behalf_of: event.on_behalf_of,
            details: event.details.clone(),
        };

        diesel::insert_into(document_audit_events::table)
            .values(&record)
            .execute(conn)?;

        info!(
            audit_event_id = %record.id,
            event_type = event.event_type.as_str(),
            document_id = %event.document_id,
            document_type_id = %event.document_type_id,
            actor_id = %event.actor_id,
            "audit event recorded"
        );
        Ok(())
    }
}

pub fn events_for_document(
    conn: &mut PgConnection,
    company_id: Uuid,
    document_id: Uuid,
) -> QueryResult<Vec<AuditEventRecord>> {
    document_audit_events::table
        .filter(document_audit_events::company_id.eq(company_id))
        .filter(document_audit_events::document_id.eq(document_id))
        .order(document_audit_events::created_at.asc())
        .load(conn)
}

#[cfg(test)]
mod tests {
    use super::AuditEventType;

    #[test]
    fn event_names_match_wire_format() {
        let names: Vec<&str> = [
            AuditEventType::DocumentUploaded,
            AuditEventType::DocumentUpdated,
            AuditEventType::DocumentDeleted,
            AuditEventType::DocumentMarkedNa,
        ]
        .into_iter()
        .map(AuditEventType::as_str)
        .collect();
        assert_eq!(
            names,
            [
                "document_uploaded",
                "document_updated",
                "document_deleted",
                "document_marked_na"
            ]
        );

        let json = serde_json::to_value(AuditEventType::DocumentMarkedNa).unwrap();
        assert_eq!(json, "document_marked_na");
    }
}
