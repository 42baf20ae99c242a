use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Unknown attribute '{name}' on {entity}")]
    UnknownAttribute { entity: String, name: String },

    #[error("Attribute '{name}' on {entity} is read-only")]
    ReadOnlyAttribute { entity: String, name: String },

    #[error("Attribute '{name}' is declared twice on {entity}")]
    DuplicateAttribute { entity: String, name: String },

    #[error("Validation failed for {entity}: {}", errors.join("; "))]
    ValidationFailed { entity: String, errors: Vec<String> },

    #[error("Command '{command}' failed (args: {args:?}): {message}")]
    CommandFailed {
        command: String,
        args: Vec<String>,
        message: String,
    },

    #[error("{entity} has already been destroyed")]
    AlreadyDestroyed { entity: String },

    #[error("{entity} does not support {operation}")]
    UnsupportedOperation { entity: String, operation: String },

    #[error("{entity} is not attached to a live parent")]
    DetachedRelationship { entity: String },

    #[error("Handle field error: {0}")]
    HandleField(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl ModelError {
    pub fn command_failed(
        command: impl Into<String>,
        args: &[String],
        message: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            command: command.into(),
            args: args.to_vec(),
            message: message.into(),
        }
    }

    /// Whether a `raise_on_error = false` call may turn this error into a sentinel.
    ///
    /// Misuse errors (unknown/read-only attributes, destroyed records, detached
    /// relationships, unsupported operations) always propagate.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ValidationFailed { .. } | Self::CommandFailed { .. })
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;

impl From<std::io::Error> for ModelError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

/// Translates an internal outcome into the public `raise_on_error` policy.
pub trait OutcomeExt<T> {
    /// Returns `sentinel` instead of a recoverable error unless `raise_on_error` is set.
    fn or_sentinel(self, raise_on_error: bool, sentinel: T) -> Result<T>;
}

impl<T> OutcomeExt<T> for Result<T> {
    fn or_sentinel(self, raise_on_error: bool, sentinel: T) -> Result<T> {
        match self {
            Ok(value) => Ok(value),
            Err(err) if !raise_on_error && err.is_recoverable() => {
                log::debug!("swallowing recoverable failure: {}", err);
                Ok(sentinel)
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command_failure() -> ModelError {
        ModelError::command_failed("showhdinfo", &["foo".to_string()], "not found")
    }

    #[test]
    fn test_quiet_policy_returns_sentinel_for_command_failure() {
        let outcome: Result<Option<u8>> = Err(command_failure());
        assert_eq!(outcome.or_sentinel(false, None).unwrap(), None);
    }

    #[test]
    fn test_loud_policy_keeps_original_error() {
        let outcome: Result<bool> = Err(command_failure());
        assert_eq!(outcome.or_sentinel(true, false).unwrap_err(), command_failure());
    }

    #[test]
    fn test_misuse_errors_ignore_quiet_policy() {
        let outcome: Result<bool> = Err(ModelError::AlreadyDestroyed {
            entity: "HardDrive".to_string(),
        });
        assert!(matches!(
            outcome.or_sentinel(false, false),
            Err(ModelError::AlreadyDestroyed { .. })
        ));
    }
}
