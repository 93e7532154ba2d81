//! Record representation shared by the CSV, bulk and client crates.
//!
//! A [`Record`] is one row destined for, or retrieved from, the remote
//! store. Field order is preserved from the source (CSV header order, or
//! the order fields were inserted) and is kept on the wire.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Scalar value of a single record field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Explicit null
    Null,

    /// Boolean value
    Bool(bool),

    /// Integer or floating point number
    Number(serde_json::Number),

    /// Text value (every CSV cell starts as text)
    Text(String),
}

impl FieldValue {
    /// Convert an arbitrary JSON value into a field value.
    ///
    /// Arrays and objects are not scalars; they are kept as their JSON text.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::Text(s),
            other => Self::Text(other.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Text form used for CSV cells and URL parameters. Null is empty.
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        // NaN and infinities have no JSON representation
        serde_json::Number::from_f64(value)
            .map(Self::Number)
            .unwrap_or(Self::Null)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

/// Insertion-ordered mapping from field name to [`FieldValue`].
///
/// Inserting an existing field replaces its value in place, so the field
/// keeps its original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Set a field, returning the previous value if the field existed.
    pub fn insert(
        &mut self,
        field: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Option<FieldValue> {
        let field = field.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.fields.push((field, value));
                None
            }
        }
    }

    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        let index = self.fields.iter().position(|(name, _)| name == field)?;
        Some(self.fields.remove(index).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (field, value) in iter {
            record.insert(field, value);
        }
        record
    }
}

impl IntoIterator for Record {
    type Item = (String, FieldValue);
    type IntoIter = std::vec::IntoIter<(String, FieldValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, value) in &self.fields {
            map.serialize_entry(field, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = Record;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of field names to scalar values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Record, A::Error> {
                let mut record = Record::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((field, value)) =
                    access.next_entry::<String, serde_json::Value>()?
                {
                    record.insert(field, FieldValue::from_json(value));
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_preserves_order() {
        let mut record = Record::new();
        record.insert("Name", "Acme");
        record.insert("Id", "001");
        record.insert("Phone", "555");

        let keys: Vec<&str> = record.keys().collect();
        assert_eq!(keys, vec!["Name", "Id", "Phone"]);
    }

    #[test]
    fn test_insert_existing_replaces_in_place() {
        let mut record: Record = [("A", "1"), ("B", "2")].into_iter().collect();
        let previous = record.insert("A", "3");

        assert_eq!(previous, Some(FieldValue::Text("1".to_string())));
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(record.get("A").and_then(|v| v.as_str()), Some("3"));
    }

    #[test]
    fn test_remove() {
        let mut record: Record = [("A", "1"), ("B", "2"), ("C", "3")].into_iter().collect();
        assert_eq!(record.remove("B"), Some(FieldValue::from("2")));
        assert_eq!(record.remove("B"), None);
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["A", "C"]);
    }

    #[test]
    fn test_serialize_keeps_field_order() {
        let mut record = Record::new();
        record.insert("Zeta", "z");
        record.insert("Alpha", 1_i64);
        record.insert("Empty", FieldValue::Null);
        record.insert("Flag", true);

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"Zeta":"z","Alpha":1,"Empty":null,"Flag":true}"#);
    }

    #[test]
    fn test_deserialize_scalars_and_nested() {
        let record: Record = serde_json::from_value(json!({
            "Name": "Acme",
            "Employees": 12,
            "Active": false,
            "Parent": null,
            "Tags": ["a", "b"]
        }))
        .unwrap();

        assert_eq!(record.get("Name"), Some(&FieldValue::from("Acme")));
        assert_eq!(record.get("Employees"), Some(&FieldValue::from(12_i64)));
        assert_eq!(record.get("Active"), Some(&FieldValue::Bool(false)));
        assert!(record.get("Parent").unwrap().is_null());
        assert_eq!(record.get("Tags").unwrap().to_text(), r#"["a","b"]"#);
    }

    #[test]
    fn test_to_text() {
        assert_eq!(FieldValue::Null.to_text(), "");
        assert_eq!(FieldValue::from(2.5).to_text(), "2.5");
        assert_eq!(FieldValue::from(f64::NAN), FieldValue::Null);
        assert_eq!(FieldValue::from(None::<&str>), FieldValue::Null);
    }
}
