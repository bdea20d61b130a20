use std::collections::HashSet;

use serde_json::Value;

use crate::error::{NormalizeError, Result};

/// Handle to a node in a [`Document`] arena.
///
/// Equality of handles is object identity: the same subtree reached through
/// two paths compares equal, two structurally identical subtrees allocated
/// separately do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

/// A single document node: a mapping, a sequence, or a scalar leaf.
///
/// Mapping entries preserve insertion order. Scalars reuse
/// [`serde_json::Value`] but never hold objects or arrays.
#[derive(Debug, Clone)]
pub enum Node {
    Map(Vec<(String, NodeId)>),
    Seq(Vec<NodeId>),
    Scalar(Value),
}

/// An in-memory document tree with stable node identity.
///
/// The upstream resolver produces a graph, not a tree: subtrees may be
/// shared between positions and cycles are possible. Nodes therefore live in
/// an arena and parents hold [`NodeId`] handles, so the same node can sit in
/// any number of slots and passes can rewrite a slot without touching the
/// node behind it.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Document {
    /// Build a document from a parsed JSON value. The result is a pure tree;
    /// shared nodes and cycles can only be introduced through the arena API
    /// or by the on-demand file loader.
    pub fn from_json(value: &Value) -> Self {
        let mut doc = Document {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        let root = doc.add_json(value);
        doc.root = root;
        doc
    }

    /// Parse YAML or JSON text into a document. YAML is a superset of JSON,
    /// so a single parse path covers both.
    pub fn parse_str(text: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(text)?;
        Ok(Self::from_json(&value))
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    /// Allocate a new node and return its handle.
    pub fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn alloc_map(&mut self) -> NodeId {
        self.alloc(Node::Map(Vec::new()))
    }

    pub fn add_string(&mut self, s: &str) -> NodeId {
        self.alloc(Node::Scalar(Value::String(s.to_string())))
    }

    /// Recursively copy a JSON value into the arena.
    pub fn add_json(&mut self, value: &Value) -> NodeId {
        match value {
            Value::Object(map) => {
                let entries: Vec<(String, NodeId)> = map
                    .iter()
                    .map(|(k, v)| (k.clone(), self.add_json(v)))
                    .collect();
                self.alloc(Node::Map(entries))
            }
            Value::Array(arr) => {
                let items: Vec<NodeId> = arr.iter().map(|v| self.add_json(v)).collect();
                self.alloc(Node::Seq(items))
            }
            scalar => self.alloc(Node::Scalar(scalar.clone())),
        }
    }

    /// Render a subtree back to a JSON value.
    ///
    /// The emitter replaces cycles with component references before this is
    /// ever called on pipeline output, so a remaining cycle means the input
    /// graph was not normalizable and serialization fails.
    pub fn to_json(&self, id: NodeId) -> Result<Value> {
        let mut on_stack = HashSet::new();
        self.to_json_inner(id, &mut on_stack)
    }

    fn to_json_inner(&self, id: NodeId, on_stack: &mut HashSet<NodeId>) -> Result<Value> {
        match self.node(id) {
            Node::Scalar(v) => Ok(v.clone()),
            Node::Map(entries) => {
                if !on_stack.insert(id) {
                    return Err(NormalizeError::CyclicDocument);
                }
                let mut out = serde_json::Map::new();
                for (key, child) in entries {
                    out.insert(key.clone(), self.to_json_inner(*child, on_stack)?);
                }
                on_stack.remove(&id);
                Ok(Value::Object(out))
            }
            Node::Seq(items) => {
                if !on_stack.insert(id) {
                    return Err(NormalizeError::CyclicDocument);
                }
                let mut out = Vec::new();
                for child in items {
                    out.push(self.to_json_inner(*child, on_stack)?);
                }
                on_stack.remove(&id);
                Ok(Value::Array(out))
            }
        }
    }

    pub fn is_map(&self, id: NodeId) -> bool {
        matches!(self.node(id), Node::Map(_))
    }

    pub fn map_entries(&self, id: NodeId) -> Option<&[(String, NodeId)]> {
        match self.node(id) {
            Node::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn map_get(&self, id: NodeId, key: &str) -> Option<NodeId> {
        self.map_entries(id)?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| *v)
    }

    /// Set a mapping entry, replacing an existing key in place or appending
    /// a new one at the end.
    pub fn map_set(&mut self, id: NodeId, key: &str, child: NodeId) {
        if let Node::Map(entries) = self.node_mut(id) {
            if let Some(entry) = entries.iter_mut().find(|(k, _)| k == key) {
                entry.1 = child;
            } else {
                entries.push((key.to_string(), child));
            }
        }
    }

    pub fn map_remove(&mut self, id: NodeId, key: &str) -> Option<NodeId> {
        if let Node::Map(entries) = self.node_mut(id) {
            if let Some(pos) = entries.iter().position(|(k, _)| k == key) {
                return Some(entries.remove(pos).1);
            }
        }
        None
    }

    pub fn seq_items(&self, id: NodeId) -> Option<&[NodeId]> {
        match self.node(id) {
            Node::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn seq_set(&mut self, id: NodeId, index: usize, child: NodeId) {
        if let Node::Seq(items) = self.node_mut(id) {
            if index < items.len() {
                items[index] = child;
            }
        }
    }

    pub fn str_value(&self, id: NodeId) -> Option<&str> {
        match self.node(id) {
            Node::Scalar(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Overwrite a scalar node with a string value in place.
    pub fn set_string(&mut self, id: NodeId, s: &str) {
        *self.node_mut(id) = Node::Scalar(Value::String(s.to_string()));
    }

    /// The target of a `$ref` key, when present and a string.
    pub fn ref_str(&self, id: NodeId) -> Option<&str> {
        let target = self.map_get(id, "$ref")?;
        self.str_value(target)
    }

    /// The `x-origin` annotation of a node, when present and a string.
    pub fn x_origin(&self, id: NodeId) -> Option<&str> {
        let origin = self.map_get(id, "x-origin")?;
        self.str_value(origin)
    }

    /// The `x-origin` annotation when it denotes an external file.
    pub fn external_origin(&self, id: NodeId) -> Option<&str> {
        self.x_origin(id).filter(|o| is_external(o))
    }
}

/// An origin or reference string is external iff it does not start with `#`.
pub fn is_external(target: &str) -> bool {
    !target.starts_with('#')
}

/// Escape a channel name for use as a JSON pointer segment (RFC 6901).
pub fn escape_pointer_token(name: &str) -> String {
    name.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_round_trip_preserves_order() {
        let value = json!({"b": 1, "a": {"z": [1, 2, {"y": null}], "x": true}});
        let doc = Document::from_json(&value);
        assert_eq!(doc.to_json(doc.root()).unwrap(), value);
    }

    #[test]
    fn cyclic_document_fails_to_serialize() {
        let mut doc = Document::from_json(&json!({}));
        let root = doc.root();
        doc.map_set(root, "self", root);
        assert!(matches!(
            doc.to_json(root),
            Err(NormalizeError::CyclicDocument)
        ));
    }

    #[test]
    fn pointer_token_escaping() {
        assert_eq!(escape_pointer_token("a/b~c"), "a~1b~0c");
        assert_eq!(escape_pointer_token("plain"), "plain");
    }
}
