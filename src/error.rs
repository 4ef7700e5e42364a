//! Error types for annotation compilation, loading and configuration.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::SourcePosition;

/// A malformed or misplaced annotation.
///
/// Always returned wrapped in an [`AnnotationError`] that names the annotation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("{message} (by {position})")]
    MalformedAnnotation {
        message: String,
        position: SourcePosition,
    },

    #[error("expected {subject} to be {expected}, but was {actual} (at {position})")]
    TypeMismatch {
        subject: String,
        expected: String,
        actual: String,
        position: SourcePosition,
    },

    #[error("unknown keyword argument \"{name}\" (at {position})")]
    UnknownOption {
        name: String,
        position: SourcePosition,
    },

    #[error("not supported on {node_kind} at {position}")]
    UnsupportedTarget {
        node_kind: String,
        position: SourcePosition,
    },

    #[error("{message} (at {position})")]
    InvalidConstraint {
        message: String,
        position: SourcePosition,
    },

    #[error("{message} (at {position})")]
    UnsupportedValue {
        message: String,
        position: SourcePosition,
    },
}

impl CompileError {
    pub fn position(&self) -> &SourcePosition {
        match self {
            Self::MalformedAnnotation { position, .. }
            | Self::TypeMismatch { position, .. }
            | Self::UnknownOption { position, .. }
            | Self::UnsupportedTarget { position, .. }
            | Self::InvalidConstraint { position, .. }
            | Self::UnsupportedValue { position, .. } => position,
        }
    }

    pub(crate) fn type_mismatch(
        subject: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
        position: &SourcePosition,
    ) -> Self {
        Self::TypeMismatch {
            subject: subject.into(),
            expected: expected.into(),
            actual: actual.into(),
            position: position.clone(),
        }
    }
}

/// A compile error in the context of the annotation that caused it.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid @{annotation} annotation - {source}")]
pub struct AnnotationError {
    pub annotation: String,
    pub position: SourcePosition,
    #[source]
    pub source: CompileError,
}

impl AnnotationError {
    pub fn new(annotation: impl Into<String>, position: SourcePosition, source: CompileError) -> Self {
        Self {
            annotation: annotation.into(),
            position,
            source,
        }
    }

    pub fn kind(&self) -> &CompileError {
        &self.source
    }

    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Errors during schema inference.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error(transparent)]
    Annotation(#[from] AnnotationError),

    #[error("Invalid schema - {source}")]
    Invalid { source: CompileError },
}

impl SchemaError {
    pub fn kind(&self) -> &CompileError {
        match self {
            SchemaError::Annotation(e) => e.kind(),
            SchemaError::Invalid { source } => source,
        }
    }

    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Errors while reading the values document or the annotation sidecar.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid YAML in {name}: {source}")]
    InvalidYaml {
        name: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid annotations at {position}: {message}")]
    InvalidAnnotations {
        position: SourcePosition,
        message: String,
    },

    #[error("{name} must contain exactly one document, found {found}")]
    DocumentCount { name: String, found: usize },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// Invalid combination of inspection flags.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Data values schema export only supported in OpenAPI v3 format; specify format with --output=openapi-v3 flag")]
    SchemaExportFormat,

    #[error("Output type currently only supported for data values schema (i.e. include --data-values-schema-inspect)")]
    OutputRequiresInspect,

    #[error("unknown output type \"{value}\": expected openapi-v3")]
    UnknownOutputType { value: String },
}

impl ConfigError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}
