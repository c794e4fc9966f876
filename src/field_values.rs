//! Field value store.
//!
//! Values are always written as a complete set: `replace_values` deletes every
//! stored value of the document before inserting the submitted list, so any
//! field missing from the list is dropped. Callers must submit all fields they
//! want to keep.

use std::collections::{HashMap, HashSet};

use diesel::{pg::PgConnection, prelude::*};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{ComplianceError, ComplianceResult};
use crate::field_schema::FieldSchema;
use crate::models::{DocumentField, EmployeeDocument, NewEmployeeDocumentFieldValue};
use crate::schema::{document_fields, employee_document_field_values};

#[derive(Debug, Clone, Deserialize)]
pub struct FieldValueInput {
    pub field_id: Uuid,
    pub field_value: Value,
}

#[derive(Debug, Clone)]
pub struct StoredFieldValue {
    pub field_id: Uuid,
    pub field_name: String,
    pub field_label: String,
    pub field_type: String,
    pub value: Value,
}

/// Checks a submitted value set against the fields of the document's type.
///
/// `enforce_required` is off for not-applicable documents, which carry no
/// values.
pub fn validate_values(
    fields: &[DocumentField],
    values: &[FieldValueInput],
    enforce_required: bool,
) -> ComplianceResult<()> {
    let by_id: HashMap<Uuid, &DocumentField> = fields.iter().map(|f| (f.id, f)).collect();
    let mut seen = HashSet::new();

    for input in values {
        if !seen.insert(input.field_id) {
            return Err(ComplianceError::DuplicateFieldValue(input.field_id));
        }
        let field = by_id
            .get(&input.field_id)
            .ok_or(ComplianceError::FieldNotInType(input.field_id))?;
        let schema = FieldSchema::from_field(field)?;
        schema.validate(&input.field_value)?;
    }

    if enforce_required {
        for field in fields.iter().filter(|f| f.is_required) {
            if !seen.contains(&field.id) {
                return Err(ComplianceError::RequiredFieldMissing(field.name.clone()));
            }
        }
    }

    Ok(())
}

/// Replaces the stored values of `document` with `values`.
///
/// Must run inside the caller's transaction; validation happens first so a
/// rejected set leaves the previous values in place.
pub fn replace_values(
    conn: &mut PgConnection,
    document: &EmployeeDocument,
    fields: &[DocumentField],
    values: &[FieldValueInput],
) -> ComplianceResult<usize> {
    validate_values(fields, values, document.occupies_slot())?;

    diesel::delete(
        employee_document_field_values::table
            .filter(employee_document_field_values::employee_document_id.eq(document.id)),
    )
    .execute(conn)?;

    let rows: Vec<NewEmployeeDocumentFieldValue> = values
        .iter()
        .filter(|input| !input.field_value.is_null())
        .map(|input| NewEmployeeDocumentFieldValue {
            id: Uuid::new_v4(),
            employee_document_id: document.id,
            field_id: input.field_id,
            field_value: input.field_value.clone(),
        })
        .collect();

    if rows.is_empty() {
        return Ok(0);
    }

    let inserted = diesel::insert_into(employee_document_field_values::table)
        .values(&rows)
        .execute(conn)?;
    Ok(inserted)
}

/// Values of a document joined to the live fields of its type. Values whose
/// field was deleted are not returned.
pub fn load_values(
    conn: &mut PgConnection,
    document: &EmployeeDocument,
) -> ComplianceResult<Vec<StoredFieldValue>> {
    let rows: Vec<(Uuid, String, String, String, Value)> = employee_document_field_values::table
        .inner_join(
            document_fields::table
                .on(document_fields::id.eq(employee_document_field_values::field_id)),
        )
        .filter(employee_document_field_values::employee_document_id.eq(document.id))
        .filter(document_fields::document_type_id.eq(document.document_type_id))
        .order((
            document_fields::display_order.asc(),
            document_fields::name.asc(),
        ))
        .select((
            document_fields::id,
            document_fields::name,
            document_fields::label,
            document_fields::field_type,
            employee_document_field_values::field_value,
        ))
        .load(conn)?;

    Ok(rows
        .into_iter()
        .map(
            |(field_id, field_name, field_label, field_type, value)| StoredFieldValue {
                field_id,
                field_name,
                field_label,
                field_type,
                value,
            },
        )
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn field(name: &str, field_type: &str, is_required: bool) -> DocumentField {
        let now = Utc::now().naive_utc();
        DocumentField {
            id: Uuid::new_v4(),
            document_type_id: Uuid::nil(),
            name: name.to_string(),
            label: name.to_uppercase(),
            field_type: field_type.to_string(),
            options: json!([]),
            validation: json!({}),
            placeholder: None,
            help_text: None,
            is_required,
            is_readonly: false,
            is_visible: true,
            display_order: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn value(field: &DocumentField, value: Value) -> FieldValueInput {
        FieldValueInput {
            field_id: field.id,
            field_value: value,
        }
    }

    #[test]
    fn accepts_values_of_own_fields() {
        let number = field("passport_number", "text", true);
        let issued = field("place_of_issue", "text", false);
        let fields = vec![number.clone(), issued];

        assert!(validate_values(&fields, &[value(&number, json!("K1234567"))], true).is_ok());
    }

    #[test]
    fn rejects_fields_of_other_types() {
        let own = field("number", "text", false);
        let foreign = field("number", "text", false);

        let err = validate_values(&[own], &[value(&foreign, json!("x"))], true).unwrap_err();
        assert!(matches!(err, ComplianceError::FieldNotInType(id) if id == foreign.id));
    }

    #[test]
    fn rejects_repeated_fields() {
        let number = field("number", "text", false);
        let values = [value(&number, json!("a")), value(&number, json!("b"))];
        assert!(matches!(
            validate_values(&[number.clone()], &values, true),
            Err(ComplianceError::DuplicateFieldValue(_))
        ));
    }

    #[test]
    fn required_fields_only_enforced_on_request() {
        let number = field("number", "text", true);
        assert!(matches!(
            validate_values(&[number.clone()], &[], true),
            Err(ComplianceError::RequiredFieldMissing(name)) if name == "number"
        ));
        assert!(validate_values(&[number], &[], false).is_ok());
    }

    #[test]
    fn values_are_checked_against_schema() {
        let issued_on = field("issued_on", "date", false);
        let err = validate_values(&[issued_on.clone()], &[value(&issued_on, json!("soon"))], true)
            .unwrap_err();
        assert!(matches!(err, ComplianceError::InvalidFieldValue { .. }));
    }
}
