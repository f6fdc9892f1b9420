use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfoLmError {
    #[error("I/O error while {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON parse error while {context}: {source}")]
    Json {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{context}: {message}")]
    Runtime {
        context: &'static str,
        message: String,
    },
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("unrecognized information measure '{name}'; expected one of: {expected}")]
    UnrecognizedMeasure { name: String, expected: String },
    #[error("invalid parameter `{parameter}` for {measure}: {reason}")]
    InvalidParameter {
        measure: &'static str,
        parameter: &'static str,
        reason: &'static str,
    },
    #[error("dimension mismatch in {what}: preds={preds}, target={target}")]
    DimensionMismatch {
        what: &'static str,
        preds: usize,
        target: usize,
    },
}

impl InfoLmError {
    pub(crate) fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    pub(crate) fn json(context: &'static str, source: serde_json::Error) -> Self {
        Self::Json { context, source }
    }

    pub(crate) fn runtime(context: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Runtime {
            context,
            message: err.to_string(),
        }
    }

    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_parameter(
        measure: &'static str,
        parameter: &'static str,
        reason: &'static str,
    ) -> Self {
        Self::InvalidParameter {
            measure,
            parameter,
            reason,
        }
    }

    pub(crate) fn dimension_mismatch(what: &'static str, preds: usize, target: usize) -> Self {
        Self::DimensionMismatch {
            what,
            preds,
            target,
        }
    }

    /// True for errors raised while validating a measure name or its parameters.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::UnrecognizedMeasure { .. } | Self::InvalidParameter { .. }
        )
    }
}
