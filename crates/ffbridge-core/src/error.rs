//! Error types for ffbridge-core.

/// Result type alias for argument marshalling.
pub type Result<T> = std::result::Result<T, MarshalError>;

/// Errors raised while turning a command string into an argument vector.
///
/// A marshalling failure means the embedded tool never starts; the bridge
/// reports it to the host as [`crate::MARSHAL_FAILURE_CODE`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarshalError {
    /// The command string was empty.
    #[error("empty command")]
    EmptyCommand,

    /// The command string contained only separators.
    #[error("invalid argument: {command:?} contains no tokens")]
    NoArguments { command: String },

    /// A token cannot be passed through a C `argv` slot.
    #[error("argument {index} contains an interior NUL byte")]
    InteriorNul { index: usize },
}

impl MarshalError {
    /// Create a no-arguments error for the given command.
    pub fn no_arguments(command: impl Into<String>) -> Self {
        Self::NoArguments {
            command: command.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(MarshalError::EmptyCommand.to_string(), "empty command");
        assert_eq!(
            MarshalError::no_arguments("   ").to_string(),
            "invalid argument: \"   \" contains no tokens"
        );
        assert_eq!(
            MarshalError::InteriorNul { index: 2 }.to_string(),
            "argument 2 contains an interior NUL byte"
        );
    }
}
