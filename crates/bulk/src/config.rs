//! Orchestrator configuration.
//!
//! Provides `BulkConfig`, passed explicitly into the orchestrator, and the
//! `MismatchPolicy` used when a response list does not line up with its
//! batch.

/// Largest batch the sObject Collections endpoint accepts per call.
pub const MAX_COLLECTION_SIZE: usize = 200;

/// What to do with batch records that received no response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MismatchPolicy {
    /// Reconcile the overlapping prefix only; trailing records are left
    /// unaccounted for.
    #[default]
    Truncate,
    /// Record every trailing record without a response as a failure.
    FailUnmatched,
}

impl std::fmt::Display for MismatchPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Truncate => write!(f, "truncate"),
            Self::FailUnmatched => write!(f, "fail_unmatched"),
        }
    }
}

impl std::str::FromStr for MismatchPolicy {
    type Err = crm_core::BulkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "truncate" => Ok(Self::Truncate),
            "fail_unmatched" | "fail" => Ok(Self::FailUnmatched),
            _ => Err(crm_core::BulkError::invalid_argument(format!(
                "Invalid mismatch policy: '{s}'. Expected 'truncate' or 'fail_unmatched'"
            ))),
        }
    }
}

/// Configuration for a [`crate::BulkOrchestrator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkConfig {
    /// Batch size used when a request does not specify one
    pub batch_size: usize,

    /// Upper bound accepted for any request's batch size
    pub max_batch_size: usize,

    /// Handling of response/request count mismatches
    pub mismatch_policy: MismatchPolicy,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            batch_size: MAX_COLLECTION_SIZE,
            max_batch_size: MAX_COLLECTION_SIZE,
            mismatch_policy: MismatchPolicy::Truncate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BulkConfig::default();
        assert_eq!(config.batch_size, 200);
        assert_eq!(config.max_batch_size, 200);
        assert_eq!(config.mismatch_policy, MismatchPolicy::Truncate);
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!(
            "truncate".parse::<MismatchPolicy>().unwrap(),
            MismatchPolicy::Truncate
        );
        assert_eq!(
            "fail-unmatched".parse::<MismatchPolicy>().unwrap(),
            MismatchPolicy::FailUnmatched
        );
        assert_eq!(
            "FAIL_UNMATCHED".parse::<MismatchPolicy>().unwrap(),
            MismatchPolicy::FailUnmatched
        );
        assert!("drop".parse::<MismatchPolicy>().is_err());
    }

    #[test]
    fn test_policy_display_round_trips() {
        for policy in [MismatchPolicy::Truncate, MismatchPolicy::FailUnmatched] {
            assert_eq!(policy.to_string().parse::<MismatchPolicy>().unwrap(), policy);
        }
    }
}
