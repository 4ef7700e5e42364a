//! Core types shared by the compiler passes: positions, annotation names, options.

use std::fmt;

use serde_json::Value as Literal;

use crate::error::ConfigError;

/// Assertion annotation compiled into a `NodeValidation`.
pub const ANNOTATION_ASSERT_VALIDATE: &str = "assert/validate";

pub const ANNOTATION_SCHEMA_TYPE: &str = "schema/type";
pub const ANNOTATION_SCHEMA_NULLABLE: &str = "schema/nullable";
pub const ANNOTATION_SCHEMA_DEFAULT: &str = "schema/default";
pub const ANNOTATION_SCHEMA_TITLE: &str = "schema/title";
pub const ANNOTATION_SCHEMA_DESC: &str = "schema/desc";
pub const ANNOTATION_SCHEMA_EXAMPLES: &str = "schema/examples";
pub const ANNOTATION_SCHEMA_DEPRECATED: &str = "schema/deprecated";

/// Annotations read by schema inference.
pub const SCHEMA_ANNOTATIONS: &[&str] = &[
    ANNOTATION_SCHEMA_TYPE,
    ANNOTATION_SCHEMA_NULLABLE,
    ANNOTATION_SCHEMA_DEFAULT,
    ANNOTATION_SCHEMA_TITLE,
    ANNOTATION_SCHEMA_DESC,
    ANNOTATION_SCHEMA_EXAMPLES,
    ANNOTATION_SCHEMA_DEPRECATED,
];

/// The only output type accepted together with schema inspection.
pub const OUTPUT_OPENAPI_V3: &str = "openapi-v3";

/// Title placed under `info.title` when the caller does not provide one.
pub const DEFAULT_DOCUMENT_TITLE: &str = "Schema for data values, generated by values-schema";

/// Returns the type name of a literal data value for error messages.
pub fn literal_type_name(value: &Literal) -> &'static str {
    match value {
        Literal::Null => "null",
        Literal::Bool(_) => "boolean",
        Literal::Number(n) if n.is_f64() => "float",
        Literal::Number(_) => "integer",
        Literal::String(_) => "string",
        Literal::Array(_) => "array",
        Literal::Object(_) => "map",
    }
}

/// Where a node or annotation came from.
///
/// Loaders that know line numbers set `line`; the sidecar loader only knows
/// the JSON Pointer of the annotated node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SourcePosition {
    pub file: Option<String>,
    pub line: Option<usize>,
    pub pointer: Option<String>,
}

impl SourcePosition {
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn new(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: Some(file.into()),
            line: Some(line),
            pointer: None,
        }
    }

    pub fn at_pointer(file: impl Into<String>, pointer: impl Into<String>) -> Self {
        Self {
            file: Some(file.into()),
            line: None,
            pointer: Some(pointer.into()),
        }
    }

    pub fn is_known(&self) -> bool {
        self.file.is_some() || self.line.is_some() || self.pointer.is_some()
    }

    /// Short `file:line` form used inside diagnostics.
    pub fn as_compact_string(&self) -> String {
        match (&self.file, self.line, &self.pointer) {
            (Some(file), Some(line), _) => format!("{}:{}", file, line),
            (Some(file), None, Some(pointer)) => format!("{}#{}", file, pointer),
            (Some(file), None, None) => file.clone(),
            (None, Some(line), _) => format!("line {}", line),
            (None, None, Some(pointer)) => format!("#{}", pointer),
            (None, None, None) => "(unknown)".to_string(),
        }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_compact_string())
    }
}

/// Output document format for schema inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputType {
    OpenApiV3,
}

impl OutputType {
    /// Returns `None` for anything but `openapi-v3` (caller should error).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            OUTPUT_OPENAPI_V3 => Some(OutputType::OpenApiV3),
            _ => None,
        }
    }
}

/// Options controlling whether and how the inferred schema is exported.
#[derive(Debug, Clone)]
pub struct InspectOptions {
    /// Export the inferred schema instead of only compiling it.
    pub inspect_schema: bool,
    /// Raw output type selector as given by the user.
    pub output: Option<String>,
    /// `info.title` of the emitted document.
    pub title: String,
}

impl Default for InspectOptions {
    fn default() -> Self {
        Self::new(false)
    }
}

impl InspectOptions {
    pub fn new(inspect_schema: bool) -> Self {
        Self {
            inspect_schema,
            output: None,
            title: DEFAULT_DOCUMENT_TITLE.to_string(),
        }
    }

    pub fn output(mut self, output: Option<String>) -> Self {
        self.output = output;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Check the flag combination.
    ///
    /// Returns the selected output type when the schema is to be exported,
    /// `None` when only compilation was requested.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when inspection is requested in anything but
    /// OpenAPI v3, or an output type is given without inspection.
    pub fn validate(&self) -> Result<Option<OutputType>, ConfigError> {
        let parsed = self.output.as_deref().map(|s| (s, OutputType::parse(s)));
        match (self.inspect_schema, parsed) {
            (true, Some((_, Some(output)))) => Ok(Some(output)),
            (true, _) => Err(ConfigError::SchemaExportFormat),
            (false, None) => Ok(None),
            (false, Some((_, Some(_)))) => Err(ConfigError::OutputRequiresInspect),
            (false, Some((value, None))) => Err(ConfigError::UnknownOutputType {
                value: value.to_string(),
            }),
        }
    }
}
