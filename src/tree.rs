//! Arena-backed document tree with per-node annotation bundles.
//!
//! Nodes are addressed by [`NodeId`]; derived metadata (validations, schema)
//! is kept in side tables keyed by the same ids, so the tree itself is never
//! mutated by the compiler passes.

use indexmap::IndexMap;
use serde_json::{Map, Value as Literal};

use crate::types::SourcePosition;
use crate::value::Value;

/// Stable handle to a node in a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Node kinds of a parsed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    DocumentSet,
    Document,
    Map,
    MapItem,
    Array,
    ArrayItem,
    Scalar,
}

impl NodeKind {
    /// Human-readable name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::DocumentSet => "document set",
            NodeKind::Document => "document",
            NodeKind::Map => "map",
            NodeKind::MapItem => "map item",
            NodeKind::Array => "array",
            NodeKind::ArrayItem => "array item",
            NodeKind::Scalar => "scalar",
        }
    }

    /// Composite nodes as a whole, as opposed to leaves and item wrappers.
    pub fn is_container(&self) -> bool {
        matches!(self, NodeKind::DocumentSet | NodeKind::Map | NodeKind::Array)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    DocumentSet { documents: Vec<NodeId> },
    Document { value: Option<NodeId> },
    Map { items: Vec<NodeId> },
    MapItem { key: String, value: NodeId },
    Array { items: Vec<NodeId> },
    ArrayItem { value: NodeId },
    Scalar(Literal),
}

/// One parsed annotation occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRecord {
    pub args: Vec<Value>,
    pub kwargs: Vec<(String, Value)>,
    pub position: SourcePosition,
}

impl AnnotationRecord {
    pub fn new(position: SourcePosition) -> Self {
        Self {
            args: Vec::new(),
            kwargs: Vec::new(),
            position,
        }
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.push((name.into(), value.into()));
        self
    }
}

/// Annotations on one node, by name, in declaration order.
pub type Annotations = IndexMap<String, AnnotationRecord>;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub data: NodeData,
    pub position: SourcePosition,
    pub annotations: Annotations,
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self.data {
            NodeData::DocumentSet { .. } => NodeKind::DocumentSet,
            NodeData::Document { .. } => NodeKind::Document,
            NodeData::Map { .. } => NodeKind::Map,
            NodeData::MapItem { .. } => NodeKind::MapItem,
            NodeData::Array { .. } => NodeKind::Array,
            NodeData::ArrayItem { .. } => NodeKind::ArrayItem,
            NodeData::Scalar(_) => NodeKind::Scalar,
        }
    }

    /// Child ids in document order.
    pub fn children(&self) -> &[NodeId] {
        match &self.data {
            NodeData::DocumentSet { documents } => documents,
            NodeData::Document { value: Some(value) } => std::slice::from_ref(value),
            NodeData::Document { value: None } | NodeData::Scalar(_) => &[],
            NodeData::Map { items } | NodeData::Array { items } => items,
            NodeData::MapItem { value, .. } | NodeData::ArrayItem { value } => {
                std::slice::from_ref(value)
            }
        }
    }
}

/// Document tree arena.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Panics if `id` was not issued by this tree.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind()
    }

    pub fn annotations(&self, id: NodeId) -> &Annotations {
        &self.node(id).annotations
    }

    /// Attach an annotation, replacing an earlier one of the same name.
    pub fn annotate(&mut self, id: NodeId, name: impl Into<String>, record: AnnotationRecord) {
        self.nodes[id.0].annotations.insert(name.into(), record);
    }

    fn push(&mut self, data: NodeData, position: SourcePosition) -> NodeId {
        self.nodes.push(Node {
            data,
            position,
            annotations: Annotations::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    pub fn add_scalar(&mut self, literal: Literal, position: SourcePosition) -> NodeId {
        self.push(NodeData::Scalar(literal), position)
    }

    pub fn add_map(&mut self, items: Vec<NodeId>, position: SourcePosition) -> NodeId {
        self.push(NodeData::Map { items }, position)
    }

    pub fn add_map_item(
        &mut self,
        key: impl Into<String>,
        value: NodeId,
        position: SourcePosition,
    ) -> NodeId {
        self.push(
            NodeData::MapItem {
                key: key.into(),
                value,
            },
            position,
        )
    }

    pub fn add_array(&mut self, items: Vec<NodeId>, position: SourcePosition) -> NodeId {
        self.push(NodeData::Array { items }, position)
    }

    pub fn add_array_item(&mut self, value: NodeId, position: SourcePosition) -> NodeId {
        self.push(NodeData::ArrayItem { value }, position)
    }

    pub fn add_document(&mut self, value: Option<NodeId>, position: SourcePosition) -> NodeId {
        self.push(NodeData::Document { value }, position)
    }

    pub fn add_document_set(&mut self, documents: Vec<NodeId>, position: SourcePosition) -> NodeId {
        self.push(NodeData::DocumentSet { documents }, position)
    }

    /// Add a subtree mirroring a plain data value.
    ///
    /// `file` names the source for positions; each node is positioned at its
    /// JSON Pointer within the document.
    pub fn add_value(&mut self, literal: &Literal, file: Option<&str>) -> NodeId {
        self.add_value_at(literal, file, "")
    }

    fn add_value_at(&mut self, literal: &Literal, file: Option<&str>, pointer: &str) -> NodeId {
        let position = pointer_position(file, pointer);
        match literal {
            Literal::Object(map) => {
                let mut items = Vec::with_capacity(map.len());
                for (key, value) in map {
                    let child_pointer = format!("{}/{}", pointer, escape_pointer(key));
                    let value_id = self.add_value_at(value, file, &child_pointer);
                    items.push(self.add_map_item(
                        key.clone(),
                        value_id,
                        pointer_position(file, &child_pointer),
                    ));
                }
                self.add_map(items, position)
            }
            Literal::Array(values) => {
                let mut items = Vec::with_capacity(values.len());
                for (i, value) in values.iter().enumerate() {
                    let child_pointer = format!("{}/{}", pointer, i);
                    let value_id = self.add_value_at(value, file, &child_pointer);
                    items.push(self.add_array_item(value_id, pointer_position(file, &child_pointer)));
                }
                self.add_array(items, position)
            }
            scalar => self.add_scalar(scalar.clone(), position),
        }
    }

    /// Build a single-document tree from a plain data value.
    ///
    /// Returns the tree and the id of its document node.
    pub fn document_from_literal(literal: &Literal, file: Option<&str>) -> (Tree, NodeId) {
        let mut tree = Tree::new();
        let value = tree.add_value(literal, file);
        let doc = tree.add_document(Some(value), pointer_position(file, ""));
        (tree, doc)
    }

    /// Plain data value of a subtree, ignoring annotations.
    pub fn to_literal(&self, id: NodeId) -> Literal {
        match &self.node(id).data {
            NodeData::Scalar(literal) => literal.clone(),
            NodeData::Map { items } => {
                let mut map = Map::new();
                for item in items {
                    if let NodeData::MapItem { key, value } = &self.node(*item).data {
                        map.insert(key.clone(), self.to_literal(*value));
                    }
                }
                Literal::Object(map)
            }
            NodeData::Array { items } => {
                Literal::Array(items.iter().map(|item| self.to_literal(*item)).collect())
            }
            NodeData::MapItem { value, .. } | NodeData::ArrayItem { value } => {
                self.to_literal(*value)
            }
            NodeData::Document { value } => {
                value.map(|v| self.to_literal(v)).unwrap_or(Literal::Null)
            }
            NodeData::DocumentSet { documents } => {
                Literal::Array(documents.iter().map(|d| self.to_literal(*d)).collect())
            }
        }
    }

    /// Find the node a JSON Pointer addresses, starting from a document.
    ///
    /// `""` is the document itself; `/key` a map item; `/key/0` an array item.
    pub fn find(&self, document: NodeId, pointer: &str) -> Option<NodeId> {
        if pointer.is_empty() {
            return Some(document);
        }
        let mut target = document;
        // Remove the leading / and split
        for part in pointer.strip_prefix('/')?.split('/') {
            // Unescape JSON Pointer encoding (~1 = /, ~0 = ~)
            let key = part.replace("~1", "/").replace("~0", "~");
            let value = *self.node(target).children().first()?;
            target = match &self.node(value).data {
                NodeData::Map { items } => items.iter().copied().find(|item| {
                    matches!(&self.node(*item).data, NodeData::MapItem { key: k, .. } if *k == key)
                })?,
                NodeData::Array { items } => *items.get(key.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(target)
    }

    /// Depth-first, pre-order traversal from `root`.
    ///
    /// Stops at the first error the visitor returns.
    pub fn walk<E, F>(&self, root: NodeId, mut visit: F) -> Result<(), E>
    where
        F: FnMut(NodeId, &Node) -> Result<(), E>,
    {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            visit(id, node)?;
            stack.extend(node.children().iter().rev().copied());
        }
        Ok(())
    }
}

fn escape_pointer(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

fn pointer_position(file: Option<&str>, pointer: &str) -> SourcePosition {
    match file {
        Some(file) => SourcePosition::at_pointer(file, pointer),
        None => SourcePosition::unknown(),
    }
}
