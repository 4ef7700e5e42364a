//! Loading values documents and annotation sidecars.
//!
//! A values document is a single YAML (or JSON) document, read from a file,
//! a string, or an HTTP URL. Annotations come from a sidecar mapping each
//! node's JSON Pointer to its annotations:
//!
//! ```yaml
//! /db/port:
//!   schema/nullable: {}
//!   schema/default: {args: [5432]}
//! /db/hosts:
//!   schema/examples: {args: [!tuple ["local", ["localhost"]]]}
//! ```
//!
//! Sequences tagged `!tuple` become tuples; `null` becomes `None`.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value as Literal;
use serde_yaml::Value as Yaml;
use tracing::debug;

use crate::error::LoadError;
use crate::tree::{AnnotationRecord, NodeId, Tree};
use crate::types::SourcePosition;
use crate::value::Value;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

const TUPLE_TAG: &str = "tuple";

/// Load a values document from a file path.
///
/// Returns the tree and the id of its document node.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// `LoadError::InvalidYaml` if it doesn't parse, or
/// `LoadError::DocumentCount` unless it holds exactly one document.
pub fn load_values(path: &Path) -> Result<(Tree, NodeId), LoadError> {
    let content = read_file(path)?;
    load_values_str(&content, &path.display().to_string())
}

/// Load a values document from a YAML or JSON string.
///
/// `name` identifies the source in positions and error messages.
///
/// # Errors
///
/// Returns `LoadError::InvalidYaml` or `LoadError::DocumentCount`.
pub fn load_values_str(content: &str, name: &str) -> Result<(Tree, NodeId), LoadError> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        let literal = Literal::deserialize(document).map_err(|source| LoadError::InvalidYaml {
            name: name.to_string(),
            source,
        })?;
        documents.push(literal);
    }
    if documents.len() != 1 {
        return Err(LoadError::DocumentCount {
            name: name.to_string(),
            found: documents.len(),
        });
    }
    debug!(source = name, "loaded values document");
    Ok(Tree::document_from_literal(&documents[0], Some(name)))
}

/// Load a values document from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails, otherwise the
/// same errors as [`load_values_str`].
#[cfg(feature = "remote")]
pub fn load_values_url(url: &str) -> Result<(Tree, NodeId), LoadError> {
    let network = |source: reqwest::Error| LoadError::NetworkError {
        url: url.to_string(),
        source,
    };
    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network)?;

    // Check for HTTP errors before parsing
    let body = client
        .get(url)
        .send()
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.text())
        .map_err(network)?;

    load_values_str(&body, url)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load values from a URL or a file path.
///
/// URL loading requires the `remote` feature.
///
/// # Errors
///
/// Returns appropriate errors based on the source type.
pub fn load_values_auto(source: &str) -> Result<(Tree, NodeId), LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_values_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::FileNotFound {
                path: std::path::PathBuf::from(source),
            })
        }
    } else {
        load_values(Path::new(source))
    }
}

/// Attach annotations from a sidecar file to the nodes of `document`.
///
/// Returns the number of annotations attached.
///
/// # Errors
///
/// Returns `LoadError::InvalidAnnotations` when a pointer addresses no
/// node or an entry is malformed.
pub fn load_annotations(tree: &mut Tree, document: NodeId, path: &Path) -> Result<usize, LoadError> {
    let content = read_file(path)?;
    load_annotations_str(tree, document, &content, &path.display().to_string())
}

/// Attach annotations from sidecar content to the nodes of `document`.
///
/// # Errors
///
/// Same as [`load_annotations`].
pub fn load_annotations_str(
    tree: &mut Tree,
    document: NodeId,
    content: &str,
    name: &str,
) -> Result<usize, LoadError> {
    let sidecar: Yaml = serde_yaml::from_str(content).map_err(|source| LoadError::InvalidYaml {
        name: name.to_string(),
        source,
    })?;
    let entries = match sidecar {
        Yaml::Null => return Ok(0),
        Yaml::Mapping(entries) => entries,
        _ => {
            return Err(LoadError::InvalidAnnotations {
                position: SourcePosition::at_pointer(name, ""),
                message: "expected a mapping of JSON Pointers to annotations".to_string(),
            })
        }
    };

    let mut attached = 0;
    for (pointer, annotations) in entries {
        let pointer = key_string(&pointer, &SourcePosition::at_pointer(name, ""))?;
        let position = SourcePosition::at_pointer(name, pointer.clone());
        let node = tree.find(document, &pointer).ok_or_else(|| LoadError::InvalidAnnotations {
            position: position.clone(),
            message: format!("no node at \"{}\"", pointer),
        })?;
        let annotations = match annotations {
            Yaml::Mapping(annotations) => annotations,
            _ => return Err(invalid(&position, "expected a mapping of annotation names")),
        };
        for (annotation, entry) in annotations {
            let annotation = key_string(&annotation, &position)?;
            let record = parse_record(entry, &position)?;
            debug!(pointer = %pointer, annotation = %annotation, "attached annotation");
            tree.annotate(node, annotation, record);
            attached += 1;
        }
    }
    Ok(attached)
}

fn read_file(path: &Path) -> Result<String, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })
}

fn invalid(position: &SourcePosition, message: impl Into<String>) -> LoadError {
    LoadError::InvalidAnnotations {
        position: position.clone(),
        message: message.into(),
    }
}

fn key_string(key: &Yaml, position: &SourcePosition) -> Result<String, LoadError> {
    key.as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid(position, "expected string keys"))
}

/// `{args: [...], kwargs: {...}}`, either part optional; `null` means no arguments.
fn parse_record(entry: Yaml, position: &SourcePosition) -> Result<AnnotationRecord, LoadError> {
    let mut record = AnnotationRecord::new(position.clone());
    let fields = match entry {
        Yaml::Null => return Ok(record),
        Yaml::Mapping(fields) => fields,
        _ => return Err(invalid(position, "expected {args: [...], kwargs: {...}}")),
    };
    for (field, value) in fields {
        match (key_string(&field, position)?.as_str(), value) {
            ("args", Yaml::Sequence(args)) => {
                for arg in &args {
                    record.args.push(to_value(arg, position)?);
                }
            }
            ("kwargs", Yaml::Mapping(kwargs)) => {
                for (name, value) in &kwargs {
                    record.kwargs.push((key_string(name, position)?, to_value(value, position)?));
                }
            }
            ("args", _) => return Err(invalid(position, "args must be a sequence")),
            ("kwargs", _) => return Err(invalid(position, "kwargs must be a mapping")),
            (other, _) => return Err(invalid(position, format!("unknown field \"{}\"", other))),
        }
    }
    Ok(record)
}

fn to_value(yaml: &Yaml, position: &SourcePosition) -> Result<Value, LoadError> {
    match yaml {
        Yaml::Null => Ok(Value::None),
        Yaml::Bool(b) => Ok(Value::Bool(*b)),
        Yaml::Number(n) => match n.as_i64() {
            Some(i) => Ok(Value::Int(i)),
            None => n
                .as_f64()
                .map(Value::Float)
                .ok_or_else(|| invalid(position, format!("unsupported number {}", n))),
        },
        Yaml::String(s) => Ok(Value::String(s.clone())),
        Yaml::Sequence(items) => items
            .iter()
            .map(|item| to_value(item, position))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Sequence),
        Yaml::Mapping(entries) => entries
            .iter()
            .map(|(k, v)| Ok((key_string(k, position)?, to_value(v, position)?)))
            .collect::<Result<Vec<_>, LoadError>>()
            .map(Value::Mapping),
        Yaml::Tagged(tagged) if tagged.tag == TUPLE_TAG => match &tagged.value {
            Yaml::Sequence(items) => items
                .iter()
                .map(|item| to_value(item, position))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Tuple),
            _ => Err(invalid(position, "!tuple must tag a sequence")),
        },
        Yaml::Tagged(tagged) => Err(invalid(position, format!("unsupported tag {}", tagged.tag))),
    }
}
