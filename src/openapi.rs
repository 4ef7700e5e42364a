//! OpenAPI v3 rendering of an inferred schema.

use serde_json::{json, Map, Value as Literal};

use crate::schema::{SchemaKind, SchemaNode};

const OPENAPI_VERSION: &str = "3.0.0";
const DOCUMENT_VERSION: &str = "0.1.0";
const SCHEMA_NAME: &str = "dataValues";

/// Wrap the root schema in an OpenAPI v3 document.
///
/// ```
/// use values_schema::{emit, infer, Tree};
/// use serde_json::json;
///
/// let (tree, doc) = Tree::document_from_literal(&json!({"port": 8080}), None);
/// let schema = infer(&tree, doc).unwrap();
/// let document = emit(&schema, "Example");
///
/// assert_eq!(document["info"]["title"], "Example");
/// let port = &document["components"]["schemas"]["dataValues"]["properties"]["port"];
/// assert_eq!(port["type"], "integer");
/// assert_eq!(port["default"], 8080);
/// ```
pub fn emit(root: &SchemaNode, title: &str) -> Literal {
    json!({
        "openapi": OPENAPI_VERSION,
        "info": {
            "version": DOCUMENT_VERSION,
            "title": title,
        },
        "paths": {},
        "components": {
            "schemas": {
                SCHEMA_NAME: schema_to_openapi(root),
            }
        }
    })
}

/// Render one schema node and its descendants.
///
/// Keys follow a fixed order: title, type, additionalProperties, format,
/// nullable, deprecated, description, x-example-description, example,
/// properties, items, default.
pub fn schema_to_openapi(node: &SchemaNode) -> Literal {
    let mut out = Map::new();

    if let Some(title) = &node.title {
        out.insert("title".to_string(), Literal::String(title.clone()));
    }
    match &node.kind {
        SchemaKind::Object {
            additional_properties,
            ..
        } => {
            out.insert("type".to_string(), "object".into());
            out.insert(
                "additionalProperties".to_string(),
                Literal::Bool(*additional_properties),
            );
        }
        SchemaKind::Array { .. } => {
            out.insert("type".to_string(), "array".into());
        }
        SchemaKind::Scalar(kind) => {
            out.insert("type".to_string(), kind.type_name().into());
            if let Some(format) = kind.format() {
                out.insert("format".to_string(), format.into());
            }
        }
        SchemaKind::Any => {}
    }
    if node.nullable || node.is_any() {
        out.insert("nullable".to_string(), Literal::Bool(true));
    }
    if node.deprecated {
        out.insert("deprecated".to_string(), Literal::Bool(true));
    }
    if let Some(description) = &node.description {
        out.insert("description".to_string(), Literal::String(description.clone()));
    }
    if let Some(example) = &node.example {
        out.insert(
            "x-example-description".to_string(),
            Literal::String(node.example_description.clone().unwrap_or_default()),
        );
        out.insert("example".to_string(), example.clone());
    }
    match &node.kind {
        SchemaKind::Object { properties, .. } => {
            let properties: Map<String, Literal> = properties
                .iter()
                .map(|(name, prop)| (name.clone(), schema_to_openapi(prop)))
                .collect();
            out.insert("properties".to_string(), Literal::Object(properties));
        }
        SchemaKind::Array { items } => {
            out.insert("items".to_string(), schema_to_openapi(items));
        }
        SchemaKind::Scalar(_) | SchemaKind::Any => {}
    }
    // Objects only carry a default when one was given or it is null.
    if let Some(default) = &node.default {
        out.insert("default".to_string(), default.clone());
    }

    Literal::Object(out)
}

/// Serialize a document as YAML.
pub fn to_yaml(document: &Literal) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(document)
}

/// Serialize a document as JSON.
pub fn to_json(document: &Literal, pretty: bool) -> Result<String, serde_json::Error> {
    if pretty {
        serde_json::to_string_pretty(document)
    } else {
        serde_json::to_string(document)
    }
}
