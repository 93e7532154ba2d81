//! Write operation enumeration.
//!
//! Provides the `Operation` enum that selects the shape of each record in a
//! payload and the route used to send it.

use crate::error::BulkError;

/// Write operation applied to every record in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Operation {
    /// Create new records. No identifier required.
    #[default]
    Insert,
    /// Modify existing records addressed by `Id`.
    Update,
    /// Remove existing records addressed by `Id`.
    Delete,
    /// Insert or update keyed by a caller-chosen external-id field.
    Upsert,
}

impl Operation {
    /// Native identifier field of the remote store.
    pub const ID_FIELD: &'static str = "Id";

    pub const ALL: [Operation; 4] = [
        Operation::Insert,
        Operation::Update,
        Operation::Delete,
        Operation::Upsert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Upsert => "upsert",
        }
    }

    /// Field every record must carry for this operation, if any.
    ///
    /// Upsert returns `None` when no external-id field is configured; the
    /// caller reports that as a configuration error.
    pub fn required_field<'a>(&self, external_id_field: Option<&'a str>) -> Option<&'a str> {
        match self {
            Self::Insert => None,
            Self::Update | Self::Delete => Some(Self::ID_FIELD),
            Self::Upsert => external_id_field,
        }
    }
}

/// Whether `name` is usable as an object or field API name.
///
/// API names are non-empty and contain only ASCII letters, digits and `_`
/// (custom names end in `__c`), so they are safe as URL path segments.
pub fn is_api_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Operation {
    type Err = BulkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "insert" => Ok(Self::Insert),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "upsert" => Ok(Self::Upsert),
            _ => Err(BulkError::invalid_argument(format!(
                "Unknown operation: '{s}'. Expected one of insert, update, delete, upsert"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_api_name() {
        assert!(is_api_name("Account"));
        assert!(is_api_name("External_Id__c"));
        assert!(!is_api_name(""));
        assert!(!is_api_name("Account/Id"));
        assert!(!is_api_name("Ext__c?x=1"));
        assert!(!is_api_name("Name "));
    }

    #[test]
    fn test_default_is_insert() {
        assert_eq!(Operation::default(), Operation::Insert);
    }

    #[test]
    fn test_display() {
        assert_eq!(Operation::Insert.to_string(), "insert");
        assert_eq!(Operation::Upsert.to_string(), "upsert");
    }

    #[test]
    fn test_from_str() {
        for op in Operation::ALL {
            assert_eq!(op.as_str().parse::<Operation>().unwrap(), op);
        }
        assert_eq!("DELETE".parse::<Operation>().unwrap(), Operation::Delete);
        assert_eq!(" Update ".parse::<Operation>().unwrap(), Operation::Update);
    }

    #[test]
    fn test_from_str_invalid() {
        let err = "merge".parse::<Operation>().unwrap_err();
        assert!(matches!(err, BulkError::InvalidArgument(_)));
        assert!(err.to_string().contains("merge"));
    }

    #[test]
    fn test_required_field() {
        assert_eq!(Operation::Insert.required_field(Some("Ext__c")), None);
        assert_eq!(Operation::Update.required_field(None), Some("Id"));
        assert_eq!(Operation::Delete.required_field(Some("Ext__c")), Some("Id"));
        assert_eq!(Operation::Upsert.required_field(Some("Ext__c")), Some("Ext__c"));
        assert_eq!(Operation::Upsert.required_field(None), None);
    }
}
