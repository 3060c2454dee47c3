//! Generation-time errors.
//!
//! Errors are reported per statement. None of them is ever embedded in the
//! generated output.

/// Error raised while lowering a scoped-resource statement.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LowerError {
    /// Binding pattern is structurally invalid or cannot match the entry value.
    #[error("malformed binding: {reason}")]
    MalformedBinding { reason: String },

    /// The target has neither a native construct nor a usable expansion for this shape.
    #[error("{target} cannot express {construct}")]
    UnsupportedTargetConstruct {
        target: &'static str,
        construct: String,
    },

    #[error("scoped statement has no resource items")]
    EmptyStatement,
}

impl LowerError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        LowerError::MalformedBinding {
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(target: &'static str, construct: impl Into<String>) -> Self {
        LowerError::UnsupportedTargetConstruct {
            target,
            construct: construct.into(),
        }
    }
}

/// Error raised while loading a [`LoweringConfig`](crate::config::LoweringConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("no writer registered for target '{0}'")]
    UnknownTarget(String),

    #[error("invalid temp_prefix '{0}': must be a non-empty identifier prefix")]
    InvalidTempPrefix(String),
}
