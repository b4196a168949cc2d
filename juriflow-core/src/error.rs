use std::time::Duration;

use thiserror::Error;

/// Coarse classification used by callers to decide whether a failure is loud
/// (surfaced as-is) or quiet (folded into a soft error payload).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing caller input.
    Validation,
    /// Model, backend, configuration or concurrency failure.
    Domain,
    /// A single backend call failed; retry and fallback policy applies.
    TransientModel,
}

#[derive(Debug, Error)]
pub enum JuriError {
    #[error("query context is empty")]
    EmptyContext,
    #[error("claim_value '{value}' is not numeric")]
    InvalidClaimValue { value: String },
    #[error("validation failed: missing {missing:?}")]
    Validation { missing: Vec<String> },
    #[error("missing credential: {0}")]
    MissingCredential(String),
    #[error("model '{0}' returned an empty response")]
    EmptyResponse(String),
    #[error("case '{case_id}' is already processing")]
    AlreadyProcessing { case_id: String },
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("max retries ({max}) exceeded")]
    MaxRetriesExceeded { max: usize },
    #[error("none of {attempted} partial analyses succeeded")]
    NoPartialResults { attempted: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("collaborator '{name}' failed: {reason}")]
    Collaborator { name: String, reason: String },
    #[error("model backend failed: {0}")]
    Backend(String),
    #[error("serialization/deserialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl JuriError {
    pub fn collaborator(name: impl Into<String>, reason: impl ToString) -> Self {
        JuriError::Collaborator {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            JuriError::InvalidClaimValue { .. } | JuriError::Validation { .. } => {
                ErrorKind::Validation
            }
            JuriError::Backend(_) => ErrorKind::TransientModel,
            JuriError::EmptyContext
            | JuriError::MissingCredential(_)
            | JuriError::EmptyResponse(_)
            | JuriError::AlreadyProcessing { .. }
            | JuriError::Timeout(_)
            | JuriError::MaxRetriesExceeded { .. }
            | JuriError::NoPartialResults { .. }
            | JuriError::InvalidConfig(_)
            | JuriError::Collaborator { .. }
            | JuriError::Serde(_) => ErrorKind::Domain,
        }
    }

    /// Stable label written into soft error results.
    pub fn error_type(&self) -> &'static str {
        match self {
            JuriError::EmptyContext => "empty_context",
            JuriError::InvalidClaimValue { .. } => "invalid_claim_value",
            JuriError::Validation { .. } => "validation",
            JuriError::MissingCredential(_) => "missing_credential",
            JuriError::EmptyResponse(_) => "empty_response",
            JuriError::AlreadyProcessing { .. } => "already_processing",
            JuriError::Timeout(_) => "timeout",
            JuriError::MaxRetriesExceeded { .. } => "max_retries_exceeded",
            JuriError::NoPartialResults { .. } => "no_partial_results",
            JuriError::InvalidConfig(_) => "invalid_config",
            JuriError::Collaborator { .. } => "collaborator",
            JuriError::Backend(_) => "model_error",
            JuriError::Serde(_) => "serialization",
        }
    }

    /// The orchestrator's loud set, narrower than [`ErrorKind::Validation`]:
    /// only claim-value coercion escapes as a hard error. Other validation
    /// failures are folded into soft results like any domain failure.
    pub fn is_hard_failure(&self) -> bool {
        matches!(self, JuriError::InvalidClaimValue { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(
            JuriError::InvalidClaimValue {
                value: "x".to_string()
            }
            .kind(),
            ErrorKind::Validation
        );
        assert_eq!(JuriError::Backend("boom".into()).kind(), ErrorKind::TransientModel);
        assert_eq!(
            JuriError::AlreadyProcessing {
                case_id: "c1".into()
            }
            .kind(),
            ErrorKind::Domain
        );
        assert_eq!(JuriError::EmptyContext.kind(), ErrorKind::Domain);
    }

    #[test]
    fn only_claim_value_is_hard() {
        assert!(JuriError::InvalidClaimValue {
            value: "abc".into()
        }
        .is_hard_failure());
        assert!(!JuriError::EmptyContext.is_hard_failure());
        assert!(!JuriError::Timeout(Duration::from_secs(1)).is_hard_failure());
    }

    #[test]
    fn error_type_labels_are_snake_case() {
        assert_eq!(
            JuriError::AlreadyProcessing {
                case_id: "c1".into()
            }
            .error_type(),
            "already_processing"
        );
        assert_eq!(JuriError::Timeout(Duration::from_millis(5)).error_type(), "timeout");
    }
}
