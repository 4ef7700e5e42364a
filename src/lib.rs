//! Values Schema
//!
//! Compiles annotations on a data-values document into validation metadata
//! and an inferred schema, and renders that schema as an OpenAPI v3 document.
//!
//! Two passes run over the same annotated [`Tree`]:
//!
//! - [`process_assert_annotations`] turns each `@assert/validate` into a
//!   [`NodeValidation`] and records it in a [`ValidationStore`]
//! - [`infer`] derives a [`SchemaNode`] from the literal values, refined by
//!   `@schema/...` annotations; [`emit`] renders it
//!
//! # Example
//!
//! ```
//! use values_schema::{
//!     emit, infer, process_assert_annotations, AnnotationRecord, Callable, SourcePosition,
//!     Tree, ValidationStore, Value,
//! };
//! use serde_json::json;
//!
//! let (mut tree, doc) = Tree::document_from_literal(&json!({"port": 8080}), Some("values.yml"));
//! let port = tree.find(doc, "/port").unwrap();
//!
//! let positive = Callable::new("positive", |v| v.as_i64().map_or(false, |n| n > 0));
//! tree.annotate(
//!     port,
//!     "assert/validate",
//!     AnnotationRecord::new(SourcePosition::new("values.yml", 2))
//!         .arg(Value::tuple("a positive port", positive))
//!         .kwarg("max", 65535i64),
//! );
//! tree.annotate(
//!     port,
//!     "schema/desc",
//!     AnnotationRecord::new(SourcePosition::new("values.yml", 1)).arg("Listen port"),
//! );
//!
//! let mut store = ValidationStore::new();
//! assert_eq!(process_assert_annotations(&tree, doc, &mut store).unwrap(), 1);
//! assert_eq!(store.get(port)[0].rules.len(), 2);
//!
//! let schema = infer(&tree, doc).unwrap();
//! let document = emit(&schema, "Ports");
//! let port_schema = &document["components"]["schemas"]["dataValues"]["properties"]["port"];
//! assert_eq!(port_schema["description"], "Listen port");
//! ```
//!
//! # Schema Annotations
//!
//! | Annotation | Arguments | Effect |
//! |------------|-----------|--------|
//! | `schema/type` | `any=True` | Stop inference, accept any value |
//! | `schema/nullable` | none | Allow null, default to null |
//! | `schema/default` | one value | Replace the inferred default |
//! | `schema/title` | one string | `title` |
//! | `schema/desc` | one string | `description` |
//! | `schema/examples` | `(description, value)` tuples | `x-example-description`, `example` |
//! | `schema/deprecated` | one string | `deprecated: true` |

mod error;
mod loader;
mod openapi;
mod schema;
mod tree;
mod types;
mod validation;
mod value;

pub use error::{AnnotationError, CompileError, ConfigError, LoadError, SchemaError};
pub use loader::{
    is_url, load_annotations, load_annotations_str, load_values, load_values_auto,
    load_values_str,
};
pub use openapi::{emit, schema_to_openapi, to_json, to_yaml};
pub use schema::{infer, infer_with, ScalarKind, SchemaKind, SchemaNode, SchemaOverrides};
pub use tree::{AnnotationRecord, Annotations, Node, NodeData, NodeId, NodeKind, Tree};
pub use types::{
    literal_type_name, InspectOptions, OutputType, SourcePosition, ANNOTATION_ASSERT_VALIDATE,
    ANNOTATION_SCHEMA_DEFAULT, ANNOTATION_SCHEMA_DEPRECATED, ANNOTATION_SCHEMA_DESC,
    ANNOTATION_SCHEMA_EXAMPLES, ANNOTATION_SCHEMA_NULLABLE, ANNOTATION_SCHEMA_TITLE,
    ANNOTATION_SCHEMA_TYPE, DEFAULT_DOCUMENT_TITLE, OUTPUT_OPENAPI_V3, SCHEMA_ANNOTATIONS,
};
pub use validation::{
    compile, compile_node, process_assert_annotations, NodeValidation, OneNotNull,
    Rule, RuleSource, ValidationKeyword, ValidationKwargs, ValidationStore,
};
pub use value::{AttrStruct, Callable, HasAttrs, PredicateFn, Value};

#[cfg(feature = "remote")]
pub use loader::load_values_url;
