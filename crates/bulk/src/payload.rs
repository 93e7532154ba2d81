//! Wire payload construction for one batch.
//!
//! The payload follows the sObject Collections request body:
//!
//! ```json
//! {
//!   "allOrNone": false,
//!   "records": [
//!     { "attributes": { "type": "Account" }, "Name": "Acme" }
//!   ]
//! }
//! ```
//!
//! Record `i` of the payload always corresponds to record `i` of the batch
//! it was built from; reconciliation depends on that ordering.

use crm_core::{BulkError, Operation, Record};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Per-record metadata.
///
/// Only `type` goes on the wire. The operation and external-id field stay
/// on the typed value so the dispatcher can route without re-parsing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attributes {
    #[serde(rename = "type")]
    pub object_type: String,

    #[serde(skip)]
    pub operation: Operation,

    #[serde(skip)]
    pub external_id_field: Option<String>,
}

/// One record as sent to the remote store.
#[derive(Debug, Clone, PartialEq)]
pub struct WireRecord {
    pub attributes: Attributes,
    pub fields: Record,
}

impl Serialize for WireRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("attributes", &self.attributes)?;
        for (field, value) in self.fields.iter() {
            // A source column named "attributes" would clobber the metadata
            if field != "attributes" {
                map.serialize_entry(field, value)?;
            }
        }
        map.end()
    }
}

/// Request body for one batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    /// Always false: records in a batch succeed or fail independently
    pub all_or_none: bool,

    pub records: Vec<WireRecord>,

    #[serde(skip)]
    pub object_name: String,

    /// Set for upsert payloads only
    #[serde(skip)]
    pub external_id_field: Option<String>,
}

impl Payload {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// `Id` values of every record, in payload order.
    ///
    /// Records without an `Id` are skipped; delete payloads never contain
    /// such records.
    pub fn ids(&self) -> Vec<String> {
        self.records
            .iter()
            .filter_map(|r| r.fields.get(Operation::ID_FIELD))
            .map(|v| v.to_text())
            .collect()
    }
}

/// Build the payload for one batch.
///
/// # Errors
/// - [`BulkError::Configuration`] for an upsert without an external-id field
/// - [`BulkError::MissingIdentifier`] when a record lacks the field its
///   operation requires (`Id` for update/delete, the external-id field for
///   upsert)
pub fn build_payload(
    batch: &[Record],
    object_name: &str,
    operation: Operation,
    external_id_field: Option<&str>,
) -> Result<Payload, BulkError> {
    let external_id_field = match operation {
        Operation::Upsert => Some(
            external_id_field
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .ok_or_else(|| {
                    BulkError::configuration("An external ID field must be specified for upsert")
                })?,
        ),
        _ => None,
    };
    let required = operation.required_field(external_id_field);

    let mut records = Vec::with_capacity(batch.len());
    for (position, record) in batch.iter().enumerate() {
        if let Some(field) = required {
            if !record.contains(field) {
                return Err(BulkError::MissingIdentifier {
                    operation,
                    field: field.to_string(),
                    position,
                });
            }
        }

        let fields = match operation {
            Operation::Delete => record
                .iter()
                .filter(|(field, _)| *field == Operation::ID_FIELD)
                .map(|(field, value)| (field, value.clone()))
                .collect(),
            _ => record.clone(),
        };

        records.push(WireRecord {
            attributes: Attributes {
                object_type: object_name.to_string(),
                operation,
                external_id_field: external_id_field.map(str::to_string),
            },
            fields,
        });
    }

    Ok(Payload {
        all_or_none: false,
        records,
        object_name: object_name.to_string(),
        external_id_field: external_id_field.map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_core::FieldValue;
    use serde_json::json;

    fn record(fields: &[(&str, &str)]) -> Record {
        fields.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn test_insert_passes_fields_through() {
        let batch = vec![record(&[("Name", "Acme"), ("Phone", "555")])];
        let payload = build_payload(&batch, "Account", Operation::Insert, None).unwrap();

        assert!(!payload.all_or_none);
        assert_eq!(payload.len(), 1);
        assert_eq!(payload.records[0].fields, batch[0]);
        assert_eq!(payload.records[0].attributes.operation, Operation::Insert);
        assert_eq!(payload.external_id_field, None);
    }

    #[test]
    fn test_insert_wire_shape() {
        let batch = vec![record(&[("Name", "Acme"), ("Phone", "555")])];
        let payload = build_payload(&batch, "Account", Operation::Insert, None).unwrap();

        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(
            json,
            r#"{"allOrNone":false,"records":[{"attributes":{"type":"Account"},"Name":"Acme","Phone":"555"}]}"#
        );
    }

    #[test]
    fn test_update_requires_id() {
        let batch = vec![
            record(&[("Id", "001"), ("Name", "A")]),
            record(&[("Name", "B")]),
        ];
        let err = build_payload(&batch, "Account", Operation::Update, None).unwrap_err();
        assert_eq!(
            err,
            BulkError::MissingIdentifier {
                operation: Operation::Update,
                field: "Id".to_string(),
                position: 1,
            }
        );
    }

    #[test]
    fn test_update_passes_all_fields() {
        let batch = vec![record(&[("Id", "001"), ("Name", "A")])];
        let payload = build_payload(&batch, "Account", Operation::Update, None).unwrap();
        assert_eq!(payload.records[0].fields, batch[0]);
    }

    #[test]
    fn test_delete_requires_id() {
        let batch = vec![record(&[("Name", "B")])];
        let err = build_payload(&batch, "Account", Operation::Delete, None).unwrap_err();
        assert!(matches!(
            err,
            BulkError::MissingIdentifier {
                operation: Operation::Delete,
                position: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_delete_keeps_only_id() {
        let batch = vec![
            record(&[("Name", "A"), ("Id", "001"), ("Phone", "1")]),
            record(&[("Id", "002")]),
        ];
        let payload = build_payload(&batch, "Contact", Operation::Delete, None).unwrap();

        assert_eq!(payload.records[0].fields, record(&[("Id", "001")]));
        assert_eq!(payload.records[1].fields, record(&[("Id", "002")]));
        assert_eq!(payload.ids(), vec!["001", "002"]);
    }

    #[test]
    fn test_upsert_without_external_id_is_configuration_error() {
        let batch = vec![record(&[("Ext__c", "X1")])];
        for missing in [None, Some(""), Some("  ")] {
            let err = build_payload(&batch, "Account", Operation::Upsert, missing).unwrap_err();
            assert!(matches!(err, BulkError::Configuration(_)), "{missing:?}");
        }
    }

    #[test]
    fn test_upsert_requires_external_id_field_on_records() {
        let batch = vec![record(&[("Ext__c", "X1")]), record(&[("Name", "no key")])];
        let err = build_payload(&batch, "Account", Operation::Upsert, Some("Ext__c")).unwrap_err();
        assert_eq!(
            err,
            BulkError::MissingIdentifier {
                operation: Operation::Upsert,
                field: "Ext__c".to_string(),
                position: 1,
            }
        );
    }

    #[test]
    fn test_upsert_records_external_id_metadata() {
        let batch = vec![record(&[("Ext__c", "X1"), ("Name", "A")])];
        let payload = build_payload(&batch, "Account", Operation::Upsert, Some("Ext__c")).unwrap();

        assert_eq!(payload.external_id_field.as_deref(), Some("Ext__c"));
        assert_eq!(
            payload.records[0].attributes.external_id_field.as_deref(),
            Some("Ext__c")
        );
        assert_eq!(payload.records[0].fields, batch[0]);
    }

    #[test]
    fn test_external_id_ignored_for_other_operations() {
        let batch = vec![record(&[("Name", "A")])];
        let payload = build_payload(&batch, "Account", Operation::Insert, Some("Ext__c")).unwrap();
        assert_eq!(payload.external_id_field, None);
        assert_eq!(payload.records[0].attributes.external_id_field, None);
    }

    #[test]
    fn test_preserves_positions_and_mixed_shapes() {
        let mut numeric = Record::new();
        numeric.insert("Employees", 10_i64);
        numeric.insert("Active", FieldValue::Bool(true));
        let batch = vec![record(&[("Name", "A")]), numeric.clone(), record(&[])];

        let payload = build_payload(&batch, "Account", Operation::Insert, None).unwrap();
        let fields: Vec<&Record> = payload.records.iter().map(|r| &r.fields).collect();
        assert_eq!(fields, batch.iter().collect::<Vec<_>>());

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value["records"][1],
            json!({"attributes": {"type": "Account"}, "Employees": 10, "Active": true})
        );
    }

    #[test]
    fn test_attributes_column_does_not_override_metadata() {
        let batch = vec![record(&[("attributes", "oops"), ("Name", "A")])];
        let payload = build_payload(&batch, "Lead", Operation::Insert, None).unwrap();
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value["records"][0],
            json!({"attributes": {"type": "Lead"}, "Name": "A"})
        );
    }
}
