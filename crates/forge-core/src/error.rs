//! Error taxonomy for session generation and the operations around it.

use uuid::Uuid;

/// Errors returned by the engine.
///
/// Every variant except [`GenerateError::Store`] is raised before any write,
/// so a failed call never leaves a partial generated session behind. A
/// MANUAL plan with no usable schedule entry is not an error: the snapshot
/// is stored with `manualError` set instead.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// A plan, program version, template, or generated session is missing.
    #[error("{0} not found")]
    NotFound(String),

    #[error("plan {plan_id} does not belong to user {user_id}")]
    Forbidden { plan_id: Uuid, user_id: Uuid },

    /// A COMPOSITE module points at a version or template that does not
    /// exist.
    #[error("data integrity violation: {0}")]
    DataIntegrity(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl GenerateError {
    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Whether retrying the same call could succeed. Only store failures
    /// qualify; every other variant is a property of the stored data.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message() {
        let err = GenerateError::not_found("plan 42");
        assert_eq!(err.to_string(), "plan 42 not found");
    }

    #[test]
    fn only_store_errors_are_transient() {
        assert!(GenerateError::Store(anyhow::anyhow!("connection reset")).is_transient());
        assert!(!GenerateError::DataIntegrity("x".into()).is_transient());
        assert!(
            !GenerateError::Forbidden {
                plan_id: Uuid::nil(),
                user_id: Uuid::nil(),
            }
            .is_transient()
        );
    }
}
