use thiserror::Error;

use crate::model::handle::{DatasetHandle, OperationKind};

/// Failure to turn bytes back into a typed value.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("bincode decode failed: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("nested frame truncated: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },
    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),
    #[error("{0}")]
    Other(String),
}

/// Failure to turn a typed value into bytes.
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("bincode encode failed: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("JSON encode failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("value of {0} bytes does not fit a nested frame")]
    FrameTooLarge(usize),
}

/// Error taxonomy of a pipeline run.
///
/// - [`RunnerError::UnsupportedOperation`] is user-facing: the pipeline uses a transform
///   this runner has no evaluator for.
/// - [`RunnerError::UnresolvedHandle`] and [`RunnerError::Rebind`] are defects in the
///   traversal or in an evaluator.
/// - [`RunnerError::Transform`] wraps any of the above with the failing operation and
///   its position in the traversal.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("unsupported operation: no evaluator registered for `{kind}`")]
    UnsupportedOperation { kind: OperationKind },
    #[error("dataset {handle} read before it was bound{context}")]
    UnresolvedHandle { handle: DatasetHandle, context: String },
    #[error("dataset {handle} is already bound")]
    Rebind { handle: DatasetHandle },
    #[error("dataset {handle} is not a {expected}")]
    TypeMismatch {
        handle: DatasetHandle,
        expected: &'static str,
    },
    #[error("broadcast decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("transform `{name}` ({kind}) at position {position} failed: {source}")]
    Transform {
        name: String,
        kind: OperationKind,
        position: usize,
        #[source]
        source: Box<RunnerError>,
    },
    #[error("malformed pipeline: {0}")]
    Pipeline(String),
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    #[error("transform `{transform}`: invalid property `{property}`: {reason}")]
    InvalidProperty {
        transform: String,
        property: String,
        reason: String,
    },
    #[error("execution error: {0}")]
    Execution(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RunnerError {
    pub fn backend(message: impl Into<String>) -> Self {
        RunnerError::Backend(message.into())
    }

    pub fn pipeline(message: impl Into<String>) -> Self {
        RunnerError::Pipeline(message.into())
    }

    pub fn execution(message: impl Into<String>) -> Self {
        RunnerError::Execution(message.into())
    }

    pub fn invalid_property(
        transform: &str,
        property: &str,
        reason: impl Into<String>,
    ) -> Self {
        RunnerError::InvalidProperty {
            transform: transform.to_string(),
            property: property.to_string(),
            reason: reason.into(),
        }
    }

    /// The error underneath any [`RunnerError::Transform`] wrappers.
    pub fn root_cause(&self) -> &RunnerError {
        match self {
            RunnerError::Transform { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, RunnerError>;
