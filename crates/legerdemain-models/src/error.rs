//! Error types for the `legerdemain-models` crate.

/// Errors produced when constructing or validating model types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// A token that must carry a value was empty.
    #[error("{kind} must not be empty")]
    EmptyToken {
        /// Which kind of token was rejected.
        kind: &'static str,
    },

    /// A lookup in the Plaid configuration did not match anything.
    #[error("no {what} named \"{value}\" in configuration")]
    NotConfigured {
        /// What was being looked up (user, institution, environment).
        what: &'static str,
        /// The name that failed to match.
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_empty_token() {
        let err = ModelError::EmptyToken { kind: "public token" };
        assert_eq!(err.to_string(), "public token must not be empty");
    }

    #[test]
    fn error_display_not_configured() {
        let err = ModelError::NotConfigured {
            what: "institution",
            value: "Chase".into(),
        };
        assert_eq!(
            err.to_string(),
            "no institution named \"Chase\" in configuration"
        );
    }
}
