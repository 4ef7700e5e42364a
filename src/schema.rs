//! Schema inference from literal values refined by `@schema/...` annotations.
//!
//! Inference walks a document bottom-up. Each item-level node (document,
//! map item, array item) contributes its override annotations to the schema
//! of the value it holds:
//!
//! - `schema/type any=True` stops inference; the subtree becomes `Any`
//! - `schema/nullable` keeps the inferred type but defaults to null
//! - `schema/default` replaces the inferred default
//! - `schema/title`, `schema/desc`, `schema/examples`, `schema/deprecated`
//!   only attach documentation

use serde_json::{Map, Value as Literal};
use tracing::{debug, trace};

use crate::error::{AnnotationError, CompileError, SchemaError};
use crate::tree::{AnnotationRecord, Annotations, NodeData, NodeId, NodeKind, Tree};
use crate::types::{
    literal_type_name, SourcePosition, ANNOTATION_SCHEMA_DEFAULT, ANNOTATION_SCHEMA_DEPRECATED,
    ANNOTATION_SCHEMA_DESC, ANNOTATION_SCHEMA_EXAMPLES, ANNOTATION_SCHEMA_NULLABLE,
    ANNOTATION_SCHEMA_TITLE, ANNOTATION_SCHEMA_TYPE, SCHEMA_ANNOTATIONS,
};
use crate::value::Value;

/// Scalar types a literal can infer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Integer,
    Boolean,
    String,
    Float,
}

impl ScalarKind {
    /// `None` for null and containers.
    pub fn of(literal: &Literal) -> Option<Self> {
        match literal {
            Literal::Bool(_) => Some(ScalarKind::Boolean),
            Literal::Number(n) if n.is_f64() => Some(ScalarKind::Float),
            Literal::Number(_) => Some(ScalarKind::Integer),
            Literal::String(_) => Some(ScalarKind::String),
            Literal::Null | Literal::Array(_) | Literal::Object(_) => None,
        }
    }

    /// OpenAPI `type` value.
    pub fn type_name(&self) -> &'static str {
        match self {
            ScalarKind::Integer => "integer",
            ScalarKind::Boolean => "boolean",
            ScalarKind::String => "string",
            ScalarKind::Float => "number",
        }
    }

    /// OpenAPI `format` value, if any.
    pub fn format(&self) -> Option<&'static str> {
        match self {
            ScalarKind::Float => Some("float"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    Object {
        /// In document declaration order.
        properties: Vec<(String, SchemaNode)>,
        additional_properties: bool,
    },
    Array {
        items: Box<SchemaNode>,
    },
    Scalar(ScalarKind),
    Any,
}

/// Inferred type description of a subtree.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    pub kind: SchemaKind,
    pub nullable: bool,
    /// Rendered default. `None` for objects without an explicit or null
    /// default; their default is assembled from their properties.
    pub default: Option<Literal>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub deprecated: bool,
    pub example: Option<Literal>,
    pub example_description: Option<String>,
}

impl SchemaNode {
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            nullable: false,
            default: None,
            title: None,
            description: None,
            deprecated: false,
            example: None,
            example_description: None,
        }
    }

    fn any(default: Literal) -> Self {
        Self {
            nullable: true,
            default: Some(default),
            ..Self::new(SchemaKind::Any)
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self.kind, SchemaKind::Any)
    }

    /// The value this node takes when the user provides none.
    pub fn default_value(&self) -> Literal {
        if let Some(default) = &self.default {
            return default.clone();
        }
        match &self.kind {
            SchemaKind::Object { properties, .. } => Literal::Object(
                properties
                    .iter()
                    .map(|(name, prop)| (name.clone(), prop.default_value()))
                    .collect(),
            ),
            _ => Literal::Null,
        }
    }

    /// Number of schema nodes in this subtree, including itself.
    pub fn node_count(&self) -> usize {
        1 + match &self.kind {
            SchemaKind::Object { properties, .. } => {
                properties.iter().map(|(_, p)| p.node_count()).sum()
            }
            SchemaKind::Array { items } => items.node_count(),
            SchemaKind::Scalar(_) | SchemaKind::Any => 0,
        }
    }
}

/// Schema annotations found on one item-level node.
///
/// Collected into fields before use, so declaration order never matters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaOverrides {
    pub any: bool,
    pub nullable: bool,
    pub default: Option<Literal>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub deprecated: Option<String>,
    /// `(description, example)` pairs in declaration order.
    pub examples: Vec<(String, Literal)>,
}

impl SchemaOverrides {
    /// Collect the `@schema/...` annotations of a node. Other annotations
    /// are ignored.
    ///
    /// # Errors
    ///
    /// Returns `AnnotationError` for the first malformed schema annotation.
    pub fn from_annotations(annotations: &Annotations) -> Result<Self, AnnotationError> {
        let mut overrides = Self::default();
        let schema_annotations = annotations
            .iter()
            .filter(|(name, _)| SCHEMA_ANNOTATIONS.contains(&name.as_str()));
        for (name, record) in schema_annotations {
            let wrap = |source: CompileError| {
                AnnotationError::new(name.clone(), record.position.clone(), source)
            };
            match name.as_str() {
                ANNOTATION_SCHEMA_TYPE => overrides.any = parse_type(record).map_err(wrap)?,
                ANNOTATION_SCHEMA_NULLABLE => {
                    expect_no_arguments(record).map_err(wrap)?;
                    overrides.nullable = true;
                }
                ANNOTATION_SCHEMA_DEFAULT => {
                    let value = single_argument(record).map_err(wrap)?;
                    overrides.default = Some(to_literal(value, "default value", record).map_err(wrap)?);
                }
                ANNOTATION_SCHEMA_TITLE => {
                    overrides.title = Some(single_string(record, "title").map_err(wrap)?);
                }
                ANNOTATION_SCHEMA_DESC => {
                    overrides.description = Some(single_string(record, "description").map_err(wrap)?);
                }
                ANNOTATION_SCHEMA_DEPRECATED => {
                    overrides.deprecated = Some(single_string(record, "deprecation notice").map_err(wrap)?);
                }
                ANNOTATION_SCHEMA_EXAMPLES => {
                    overrides.examples = parse_examples(record).map_err(wrap)?;
                }
                _ => {}
            }
        }
        Ok(overrides)
    }
}

fn parse_type(record: &AnnotationRecord) -> Result<bool, CompileError> {
    if !record.args.is_empty() || record.kwargs.is_empty() {
        return Err(CompileError::MalformedAnnotation {
            message: "expected keyword argument any=True or any=False".to_string(),
            position: record.position.clone(),
        });
    }
    let mut any = false;
    for (name, value) in &record.kwargs {
        if name != "any" {
            return Err(CompileError::UnknownOption {
                name: name.clone(),
                position: record.position.clone(),
            });
        }
        any = value.as_bool().ok_or_else(|| {
            CompileError::type_mismatch(
                "keyword argument \"any\"",
                "a boolean",
                value.type_name(),
                &record.position,
            )
        })?;
    }
    Ok(any)
}

fn expect_no_arguments(record: &AnnotationRecord) -> Result<(), CompileError> {
    if record.args.is_empty() && record.kwargs.is_empty() {
        Ok(())
    } else {
        Err(CompileError::MalformedAnnotation {
            message: format!(
                "expected no arguments, but found {}",
                record.args.len() + record.kwargs.len()
            ),
            position: record.position.clone(),
        })
    }
}

fn single_argument(record: &AnnotationRecord) -> Result<&Value, CompileError> {
    match (record.args.as_slice(), record.kwargs.as_slice()) {
        ([value], []) => Ok(value),
        _ => Err(CompileError::MalformedAnnotation {
            message: format!(
                "expected exactly one argument, but found {}",
                record.args.len() + record.kwargs.len()
            ),
            position: record.position.clone(),
        }),
    }
}

fn single_string(record: &AnnotationRecord, subject: &str) -> Result<String, CompileError> {
    let value = single_argument(record)?;
    value.as_str().map(str::to_string).ok_or_else(|| {
        CompileError::type_mismatch(subject, "a string", value.type_name(), &record.position)
    })
}

fn to_literal(value: &Value, subject: &str, record: &AnnotationRecord) -> Result<Literal, CompileError> {
    value.to_literal().map_err(|actual| {
        CompileError::type_mismatch(subject, "a data value", actual, &record.position)
    })
}

fn parse_examples(record: &AnnotationRecord) -> Result<Vec<(String, Literal)>, CompileError> {
    if record.args.is_empty() || !record.kwargs.is_empty() {
        return Err(CompileError::MalformedAnnotation {
            message: "expected one or more 2-tuples (description, example)".to_string(),
            position: record.position.clone(),
        });
    }
    record
        .args
        .iter()
        .map(|arg| match arg {
            Value::Tuple(items) if items.len() == 2 => {
                let description = items[0].as_str().ok_or_else(|| {
                    CompileError::type_mismatch(
                        "example description",
                        "a string",
                        items[0].type_name(),
                        &record.position,
                    )
                })?;
                Ok((description.to_string(), to_literal(&items[1], "example", record)?))
            }
            other => Err(CompileError::MalformedAnnotation {
                message: format!("expected 2-tuple (description, example), but found: {}", other),
                position: record.position.clone(),
            }),
        })
        .collect()
}

/// Infer the schema rooted at `node`.
///
/// Item-level nodes (document, map item, array item) contribute their
/// annotations; value nodes (map, array, scalar) are inferred without
/// overrides.
///
/// # Errors
///
/// Returns the first malformed schema annotation, or `Invalid` for values
/// with nothing to infer from (an un-annotated null, a document set).
pub fn infer(tree: &Tree, node: NodeId) -> Result<SchemaNode, SchemaError> {
    debug!(nodes = tree.len(), "inferring schema");
    let mut inference = Inference { tree, inferred: 0 };
    let schema = match tree.kind(node) {
        NodeKind::Document | NodeKind::MapItem | NodeKind::ArrayItem => inference.infer_item(node)?,
        NodeKind::Map | NodeKind::Array | NodeKind::Scalar => {
            let position = tree.node(node).position.clone();
            inference.infer_value(Some(node), &SchemaOverrides::default(), &position)?
        }
        NodeKind::DocumentSet => {
            return Err(SchemaError::Invalid {
                source: CompileError::UnsupportedTarget {
                    node_kind: NodeKind::DocumentSet.name().to_string(),
                    position: tree.node(node).position.clone(),
                },
            })
        }
    };
    debug!(inferred = inference.inferred, "schema inferred");
    Ok(schema)
}

/// Infer the schema of a value node with the given overrides.
///
/// # Errors
///
/// Same as [`infer`].
pub fn infer_with(
    tree: &Tree,
    value: NodeId,
    overrides: &SchemaOverrides,
) -> Result<SchemaNode, SchemaError> {
    let position = tree.node(value).position.clone();
    Inference { tree, inferred: 0 }.infer_value(Some(value), overrides, &position)
}

struct Inference<'a> {
    tree: &'a Tree,
    inferred: usize,
}

impl Inference<'_> {
    fn infer_item(&mut self, item: NodeId) -> Result<SchemaNode, SchemaError> {
        let overrides = self.item_overrides(item)?;
        let node = self.tree.node(item);
        let value = node.children().first().copied();
        self.infer_value(value, &overrides, &node.position)
    }

    /// Overrides declared on an item-level node.
    ///
    /// A default on an array item is rejected; the array's own default
    /// describes its elements.
    fn item_overrides(&self, item: NodeId) -> Result<SchemaOverrides, SchemaError> {
        let node = self.tree.node(item);
        let overrides = SchemaOverrides::from_annotations(&node.annotations)?;
        if node.kind() == NodeKind::ArrayItem && overrides.default.is_some() {
            let position = node
                .annotations
                .get(ANNOTATION_SCHEMA_DEFAULT)
                .map_or_else(|| node.position.clone(), |record| record.position.clone());
            return Err(AnnotationError::new(
                ANNOTATION_SCHEMA_DEFAULT,
                position,
                CompileError::UnsupportedTarget {
                    node_kind: NodeKind::ArrayItem.name().to_string(),
                    position: node.position.clone(),
                },
            )
            .into());
        }
        Ok(overrides)
    }

    /// Parse every schema annotation under `root` without inferring it.
    fn check_annotations(&self, root: NodeId) -> Result<(), SchemaError> {
        self.tree.walk(root, |id, node| match node.kind() {
            NodeKind::Document | NodeKind::MapItem | NodeKind::ArrayItem => {
                self.item_overrides(id).map(|_| ())
            }
            _ => Ok(()),
        })
    }

    fn infer_value(
        &mut self,
        value: Option<NodeId>,
        overrides: &SchemaOverrides,
        position: &SourcePosition,
    ) -> Result<SchemaNode, SchemaError> {
        self.inferred += 1;

        let mut schema = if overrides.any {
            let default = match value {
                Some(v) => self.literal_with_defaults(v)?,
                None => Literal::Null,
            };
            SchemaNode::any(default)
        } else {
            self.infer_structure(value, overrides, position)?
        };

        if let Some(default) = &overrides.default {
            if let (SchemaKind::Scalar(kind), Some(given)) = (&mut schema.kind, ScalarKind::of(default)) {
                // An integer default still fits a float.
                if !(*kind == ScalarKind::Float && given == ScalarKind::Integer) {
                    *kind = given;
                }
            }
            schema.default = Some(complete_default(&schema, default));
        }
        if overrides.nullable {
            schema.nullable = true;
            if overrides.default.is_none() {
                schema.default = Some(Literal::Null);
            }
        }

        schema.title = overrides.title.clone();
        schema.description = overrides.description.clone();
        schema.deprecated = overrides.deprecated.is_some();
        if let Some((description, example)) = overrides.examples.first() {
            schema.example_description = Some(description.clone());
            schema.example = Some(example.clone());
        }

        trace!(kind = schema.kind_name(), nullable = schema.nullable, "inferred schema node");
        Ok(schema)
    }

    fn infer_structure(
        &mut self,
        value: Option<NodeId>,
        overrides: &SchemaOverrides,
        position: &SourcePosition,
    ) -> Result<SchemaNode, SchemaError> {
        let Some(value) = value else {
            return Ok(SchemaNode::any(Literal::Null));
        };
        let node = self.tree.node(value);
        match &node.data {
            NodeData::Map { items } => {
                let mut properties = Vec::with_capacity(items.len());
                for item in items {
                    if let NodeData::MapItem { key, .. } = &self.tree.node(*item).data {
                        properties.push((key.clone(), self.infer_item(*item)?));
                    }
                }
                Ok(SchemaNode::new(SchemaKind::Object {
                    properties,
                    additional_properties: false,
                }))
            }
            NodeData::Array { items } => {
                // Only the first item describes the element type.
                let item_schema = match items.first() {
                    Some(first) => self.infer_item(*first)?,
                    None => SchemaNode::any(Literal::Null),
                };
                for rest in items.iter().skip(1) {
                    self.check_annotations(*rest)?;
                }
                Ok(SchemaNode {
                    default: Some(Literal::Array(Vec::new())),
                    ..SchemaNode::new(SchemaKind::Array {
                        items: Box::new(item_schema),
                    })
                })
            }
            NodeData::Scalar(literal) => match ScalarKind::of(literal) {
                Some(kind) => Ok(SchemaNode {
                    default: Some(literal.clone()),
                    ..SchemaNode::new(SchemaKind::Scalar(kind))
                }),
                None if overrides.nullable => Ok(SchemaNode::any(Literal::Null)),
                None => Err(SchemaError::Invalid {
                    source: CompileError::UnsupportedValue {
                        message: format!(
                            "{} value is not allowed here; annotate with @schema/nullable or @schema/type any=True",
                            literal_type_name(literal)
                        ),
                        position: position.clone(),
                    },
                }),
            },
            _ => Err(SchemaError::Invalid {
                source: CompileError::UnsupportedTarget {
                    node_kind: node.kind().name().to_string(),
                    position: node.position.clone(),
                },
            }),
        }
    }

    /// Plain value of an `Any` subtree with nested explicit defaults applied.
    fn literal_with_defaults(&mut self, value: NodeId) -> Result<Literal, SchemaError> {
        let node = self.tree.node(value);
        match &node.data {
            NodeData::Map { items } => {
                let mut map = Map::new();
                for item in items {
                    if let NodeData::MapItem { key, value } = &self.tree.node(*item).data {
                        map.insert(key.clone(), self.item_literal(*item, *value)?);
                    }
                }
                Ok(Literal::Object(map))
            }
            NodeData::Array { items } => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    if let NodeData::ArrayItem { value } = &self.tree.node(*item).data {
                        values.push(self.item_literal(*item, *value)?);
                    }
                }
                Ok(Literal::Array(values))
            }
            _ => Ok(self.tree.to_literal(value)),
        }
    }

    fn item_literal(&mut self, item: NodeId, value: NodeId) -> Result<Literal, SchemaError> {
        let overrides = self.item_overrides(item)?;
        match overrides.default {
            Some(default) => Ok(default),
            None => self.literal_with_defaults(value),
        }
    }
}

impl SchemaNode {
    fn kind_name(&self) -> &'static str {
        match &self.kind {
            SchemaKind::Object { .. } => "object",
            SchemaKind::Array { .. } => "array",
            SchemaKind::Scalar(kind) => kind.type_name(),
            SchemaKind::Any => "any",
        }
    }
}

/// Fill an explicit default out to the shape of `schema`.
///
/// Map defaults take missing keys from the property defaults; array
/// defaults are completed element by element against the item schema.
fn complete_default(schema: &SchemaNode, value: &Literal) -> Literal {
    match (&schema.kind, value) {
        (SchemaKind::Object { properties, .. }, Literal::Object(given)) => {
            let mut completed = Map::new();
            for (name, prop) in properties {
                let value = match given.get(name) {
                    Some(v) => complete_default(prop, v),
                    None => prop.default_value(),
                };
                completed.insert(name.clone(), value);
            }
            // Keys the schema does not declare are kept as given.
            for (name, v) in given {
                if !completed.contains_key(name) {
                    completed.insert(name.clone(), v.clone());
                }
            }
            Literal::Object(completed)
        }
        (SchemaKind::Array { items }, Literal::Array(values)) => {
            Literal::Array(values.iter().map(|v| complete_default(items, v)).collect())
        }
        _ => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ann() -> AnnotationRecord {
        AnnotationRecord::new(SourcePosition::new("schema.yml", 1))
    }

    fn doc(literal: Literal) -> (Tree, NodeId) {
        Tree::document_from_literal(&literal, Some("schema.yml"))
    }

    fn property<'a>(schema: &'a SchemaNode, name: &str) -> &'a SchemaNode {
        match &schema.kind {
            SchemaKind::Object { properties, .. } => {
                &properties.iter().find(|(n, _)| n == name).unwrap().1
            }
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn scalar_kinds() {
        let (tree, d) = doc(json!({"i": 10, "b": true, "s": "text", "f": 9.1}));
        let schema = infer(&tree, d).unwrap();
        assert_eq!(property(&schema, "i").kind, SchemaKind::Scalar(ScalarKind::Integer));
        assert_eq!(property(&schema, "b").kind, SchemaKind::Scalar(ScalarKind::Boolean));
        assert_eq!(property(&schema, "s").kind, SchemaKind::Scalar(ScalarKind::String));
        assert_eq!(property(&schema, "f").kind, SchemaKind::Scalar(ScalarKind::Float));
        assert_eq!(property(&schema, "f").default, Some(json!(9.1)));
        assert_eq!(schema.default, None);
    }

    #[test]
    fn preserves_declaration_order() {
        let (tree, d) = doc(json!({"zeta": 1, "alpha": 2, "mid": 3}));
        let schema = infer(&tree, d).unwrap();
        let SchemaKind::Object { properties, .. } = schema.kind else {
            panic!("expected object");
        };
        let names: Vec<_> = properties.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn array_uses_first_item_and_empty_default() {
        let (tree, d) = doc(json!({"list": [1, "ignored"]}));
        let schema = infer(&tree, d).unwrap();
        let list = property(&schema, "list");
        assert_eq!(list.default, Some(json!([])));
        let SchemaKind::Array { items } = &list.kind else {
            panic!("expected array");
        };
        assert_eq!(items.kind, SchemaKind::Scalar(ScalarKind::Integer));
        assert_eq!(items.default, Some(json!(1)));
    }

    #[test]
    fn empty_array_items_are_any() {
        let (tree, d) = doc(json!({"list": []}));
        let schema = infer(&tree, d).unwrap();
        let SchemaKind::Array { items } = &property(&schema, "list").kind else {
            panic!("expected array");
        };
        assert!(items.is_any());
    }

    #[test]
    fn nullable_float_with_default() {
        let (mut tree, d) = doc(json!({"float_key": 0.0}));
        let item = tree.find(d, "/float_key").unwrap();
        tree.annotate(item, ANNOTATION_SCHEMA_NULLABLE, ann());
        tree.annotate(item, ANNOTATION_SCHEMA_DEFAULT, ann().arg(9.1));

        let schema = infer(&tree, item).unwrap();
        assert_eq!(schema.kind, SchemaKind::Scalar(ScalarKind::Float));
        assert!(schema.nullable);
        assert_eq!(schema.default, Some(json!(9.1)));
    }

    #[test]
    fn nullable_without_default_is_null() {
        let (mut tree, d) = doc(json!({"s": ""}));
        let item = tree.find(d, "/s").unwrap();
        tree.annotate(item, ANNOTATION_SCHEMA_NULLABLE, ann());
        let schema = infer(&tree, item).unwrap();
        assert_eq!(schema.kind, SchemaKind::Scalar(ScalarKind::String));
        assert_eq!(schema.default, Some(Literal::Null));
    }

    #[test]
    fn override_order_does_not_matter() {
        let records = vec![
            (ANNOTATION_SCHEMA_NULLABLE, ann()),
            (ANNOTATION_SCHEMA_DEFAULT, ann().arg(10i64)),
            (ANNOTATION_SCHEMA_TITLE, ann().arg("Title")),
            (ANNOTATION_SCHEMA_DESC, ann().arg("Description")),
            (ANNOTATION_SCHEMA_DEPRECATED, ann().arg("")),
            (ANNOTATION_SCHEMA_EXAMPLES, ann().arg(Value::tuple("ex", 5i64))),
        ];
        let mut results = Vec::new();
        for rotation in 0..records.len() {
            for reverse in [false, true] {
                let mut order: Vec<_> = records.clone();
                order.rotate_left(rotation);
                if reverse {
                    order.reverse();
                }
                let (mut tree, d) = doc(json!({"port": 0}));
                let item = tree.find(d, "/port").unwrap();
                for (name, record) in order {
                    tree.annotate(item, name, record);
                }
                results.push(infer(&tree, d).unwrap());
            }
        }
        assert!(results.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn any_stops_inference() {
        let (mut tree, d) = doc(json!({"foo": {"int_key": 0, "list": [""]}}));
        let item = tree.find(d, "/foo").unwrap();
        tree.annotate(item, ANNOTATION_SCHEMA_TYPE, ann().kwarg("any", true));
        let nested = tree.find(d, "/foo/int_key").unwrap();
        tree.annotate(nested, ANNOTATION_SCHEMA_DEFAULT, ann().arg(42i64));

        let schema = infer(&tree, item).unwrap();
        assert!(schema.is_any());
        assert!(schema.nullable);
        assert_eq!(schema.default, Some(json!({"int_key": 42, "list": [""]})));
        assert_eq!(schema.node_count(), 1);
    }

    #[test]
    fn any_false_is_no_override() {
        let (mut tree, d) = doc(json!({"foo": 1}));
        let item = tree.find(d, "/foo").unwrap();
        tree.annotate(item, ANNOTATION_SCHEMA_TYPE, ann().kwarg("any", false));
        let schema = infer(&tree, item).unwrap();
        assert_eq!(schema.kind, SchemaKind::Scalar(ScalarKind::Integer));
    }

    #[test]
    fn array_default_completed_against_items() {
        let (mut tree, d) = doc(json!({"maps": [{"bar": "", "ree": "default"}]}));
        let item = tree.find(d, "/maps").unwrap();
        let default = Value::Sequence(vec![
            Value::Mapping(vec![("bar".into(), "thing 1".into())]),
            Value::Mapping(vec![("bar".into(), "thing 2".into())]),
        ]);
        tree.annotate(item, ANNOTATION_SCHEMA_DEFAULT, ann().arg(default));

        let schema = infer(&tree, item).unwrap();
        assert_eq!(
            schema.default,
            Some(json!([
                {"bar": "thing 1", "ree": "default"},
                {"bar": "thing 2", "ree": "default"},
            ]))
        );
    }

    #[test]
    fn scalar_takes_kind_of_explicit_default() {
        let (mut tree, d) = doc(json!({"a": "", "b": 1.5}));
        let a = tree.find(d, "/a").unwrap();
        tree.annotate(a, ANNOTATION_SCHEMA_DEFAULT, ann().arg(10i64));
        let b = tree.find(d, "/b").unwrap();
        tree.annotate(b, ANNOTATION_SCHEMA_DEFAULT, ann().arg(2i64));

        let schema = infer(&tree, d).unwrap();
        assert_eq!(property(&schema, "a").kind, SchemaKind::Scalar(ScalarKind::Integer));
        assert_eq!(property(&schema, "a").default, Some(json!(10)));
        assert_eq!(property(&schema, "b").kind, SchemaKind::Scalar(ScalarKind::Float));
    }

    #[test]
    fn default_on_array_item_rejected() {
        let (mut tree, d) = doc(json!({"list": [0]}));
        let item = tree.find(d, "/list/0").unwrap();
        tree.annotate(item, ANNOTATION_SCHEMA_DEFAULT, ann().arg(1i64));
        let err = infer(&tree, d).unwrap_err();
        assert!(matches!(err.kind(), CompileError::UnsupportedTarget { node_kind, .. } if node_kind == "array item"));
    }

    #[test]
    fn later_array_items_are_checked() {
        let (mut tree, d) = doc(json!({"list": [1, 2]}));
        let second = tree.find(d, "/list/1").unwrap();
        tree.annotate(second, ANNOTATION_SCHEMA_TITLE, ann().arg(5i64));
        let SchemaError::Annotation(err) = infer(&tree, d).unwrap_err() else {
            panic!("expected annotation error");
        };
        assert_eq!(err.annotation, ANNOTATION_SCHEMA_TITLE);
        assert!(matches!(err.kind(), CompileError::TypeMismatch { .. }));
    }

    #[test]
    fn later_array_items_report_in_traversal_order() {
        let (mut tree, d) = doc(json!({"list": [{"a": 1}, {"a": 2, "b": 3}, 4]}));
        let nested = tree.find(d, "/list/1/b").unwrap();
        tree.annotate(nested, ANNOTATION_SCHEMA_NULLABLE, ann().arg(true));
        let last = tree.find(d, "/list/2").unwrap();
        tree.annotate(last, ANNOTATION_SCHEMA_DEFAULT, ann().arg(0i64));

        let SchemaError::Annotation(err) = infer(&tree, d).unwrap_err() else {
            panic!("expected annotation error");
        };
        assert_eq!(err.annotation, ANNOTATION_SCHEMA_NULLABLE);
    }

    #[test]
    fn later_array_items_do_not_change_items() {
        let (mut tree, d) = doc(json!({"list": [1, 2]}));
        let second = tree.find(d, "/list/1").unwrap();
        tree.annotate(second, ANNOTATION_SCHEMA_TITLE, ann().arg("Second"));
        let schema = infer(&tree, d).unwrap();
        let SchemaKind::Array { items } = &property(&schema, "list").kind else {
            panic!("expected array");
        };
        assert_eq!(items.title, None);
    }

    #[test]
    fn default_on_array_item_rejected_under_any() {
        let (mut tree, d) = doc(json!({"foo": {"list": [0]}}));
        let foo = tree.find(d, "/foo").unwrap();
        tree.annotate(foo, ANNOTATION_SCHEMA_TYPE, ann().kwarg("any", true));
        let item = tree.find(d, "/foo/list/0").unwrap();
        tree.annotate(item, ANNOTATION_SCHEMA_DEFAULT, ann().arg(9i64));

        let err = infer(&tree, d).unwrap_err();
        assert!(matches!(
            err.kind(),
            CompileError::UnsupportedTarget { node_kind, .. } if node_kind == "array item"
        ));
    }

    #[test]
    fn null_literal_requires_annotation() {
        let (mut tree, d) = doc(json!({"n": null}));
        let err = infer(&tree, d).unwrap_err();
        assert!(matches!(err, SchemaError::Invalid { source: CompileError::UnsupportedValue { .. } }));

        let item = tree.find(d, "/n").unwrap();
        tree.annotate(item, ANNOTATION_SCHEMA_NULLABLE, ann());
        let schema = infer(&tree, item).unwrap();
        assert!(schema.is_any());
        assert_eq!(schema.default, Some(Literal::Null));
    }

    #[test]
    fn first_example_wins() {
        let (mut tree, d) = doc(json!({"timeout": 1.0}));
        let item = tree.find(d, "/timeout").unwrap();
        tree.annotate(
            item,
            ANNOTATION_SCHEMA_EXAMPLES,
            ann()
                .arg(Value::tuple("timeout example", 4.2))
                .arg(Value::tuple("another", 5i64)),
        );
        let schema = infer(&tree, item).unwrap();
        assert_eq!(schema.example_description.as_deref(), Some("timeout example"));
        assert_eq!(schema.example, Some(json!(4.2)));
    }

    #[test]
    fn malformed_schema_annotations() {
        let cases: Vec<(&str, AnnotationRecord)> = vec![
            (ANNOTATION_SCHEMA_TYPE, ann()),
            (ANNOTATION_SCHEMA_TYPE, ann().kwarg("all", true)),
            (ANNOTATION_SCHEMA_TYPE, ann().kwarg("any", "yes")),
            (ANNOTATION_SCHEMA_NULLABLE, ann().arg(true)),
            (ANNOTATION_SCHEMA_DEFAULT, ann()),
            (ANNOTATION_SCHEMA_TITLE, ann().arg(1i64)),
            (ANNOTATION_SCHEMA_DESC, ann().arg("a").arg("b")),
            (ANNOTATION_SCHEMA_EXAMPLES, ann().arg("no tuple")),
            (ANNOTATION_SCHEMA_EXAMPLES, ann().arg(Value::tuple(1i64, 2i64))),
            (ANNOTATION_SCHEMA_DEPRECATED, ann()),
        ];
        for (name, record) in cases {
            let mut annotations = Annotations::new();
            annotations.insert(name.to_string(), record);
            let err = SchemaOverrides::from_annotations(&annotations).unwrap_err();
            assert_eq!(err.annotation, name);
        }
    }

    #[test]
    fn document_set_is_not_inferable() {
        let (mut tree, d) = doc(json!({"a": 1}));
        let set = tree.add_document_set(vec![d], SourcePosition::unknown());
        let err = infer(&tree, set).unwrap_err();
        assert!(matches!(err.kind(), CompileError::UnsupportedTarget { .. }));
    }

    #[test]
    fn infer_with_explicit_overrides() {
        let (tree, d) = doc(json!(5));
        let value = tree.node(d).children()[0];
        let overrides = SchemaOverrides {
            title: Some("Five".into()),
            ..SchemaOverrides::default()
        };
        let schema = infer_with(&tree, value, &overrides).unwrap();
        assert_eq!(schema.title.as_deref(), Some("Five"));
        assert_eq!(schema.default, Some(json!(5)));
    }
}
