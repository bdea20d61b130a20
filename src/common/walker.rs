use std::collections::HashSet;

use crate::document::{Document, Node, NodeId};

/// Keywords whose value is itself a schema.
pub const DIRECT_SCHEMA_KEYWORDS: [&str; 14] = [
    "schema",
    "payload",
    "headers",
    "items",
    "additionalItems",
    "contains",
    "additionalProperties",
    "propertyNames",
    "if",
    "then",
    "else",
    "not",
    "unevaluatedItems",
    "unevaluatedProperties",
];

/// Keywords whose value is a sequence of schemas.
pub const ARRAY_SCHEMA_KEYWORDS: [&str; 4] = ["allOf", "anyOf", "oneOf", "prefixItems"];

/// Keywords whose value is a mapping from names to schemas.
pub const MAP_SCHEMA_KEYWORDS: [&str; 5] = [
    "properties",
    "patternProperties",
    "definitions",
    "$defs",
    "dependentSchemas",
];

/// One step of a document path: a mapping key or a sequence index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSeg {
    Key(String),
    Index(usize),
}

impl PathSeg {
    pub fn key(s: &str) -> Self {
        PathSeg::Key(s.to_string())
    }
}

/// The parent slot a visited node sits in, so visitors can replace it.
#[derive(Debug, Clone)]
pub enum Slot {
    /// A mapping entry of `parent` under `key`.
    Entry { parent: NodeId, key: String },
    /// A sequence item of `parent` at `index`.
    Item { parent: NodeId, index: usize },
    /// No live slot: the node is held by the registry, not the tree.
    Detached,
}

impl Slot {
    /// Point the slot at a different node. No-op for detached roots.
    pub fn replace(&self, doc: &mut Document, child: NodeId) {
        match self {
            Slot::Entry { parent, key } => doc.map_set(*parent, key, child),
            Slot::Item { parent, index } => doc.seq_set(*parent, *index, child),
            Slot::Detached => {}
        }
    }
}

/// Visitor for schema nodes. Returning `true` skips descent into the node,
/// which a visitor does after replacing its slot.
pub trait SchemaVisitor {
    fn visit(&mut self, doc: &mut Document, id: NodeId, slot: &Slot, path: &[PathSeg]) -> bool;
}

impl<F> SchemaVisitor for F
where
    F: FnMut(&mut Document, NodeId, &Slot, &[PathSeg]) -> bool,
{
    fn visit(&mut self, doc: &mut Document, id: NodeId, slot: &Slot, path: &[PathSeg]) -> bool {
        self(doc, id, slot, path)
    }
}

/// Walk a schema subtree, visiting every schema-position mapping.
///
/// Descent follows the schema keyword tables; any other key's value is
/// opaque. An ancestor set of node identities guards against cycles.
pub fn walk_schema<V: SchemaVisitor>(doc: &mut Document, id: NodeId, slot: &Slot, visitor: &mut V) {
    let mut path = Vec::new();
    let mut ancestors = HashSet::new();
    walk_schema_at(doc, id, slot, &mut path, &mut ancestors, visitor);
}

/// Like [`walk_schema`] but with an explicit starting path, used when the
/// schema root sits at a known document position.
pub fn walk_schema_from<V: SchemaVisitor>(
    doc: &mut Document,
    id: NodeId,
    slot: &Slot,
    path: &mut Vec<PathSeg>,
    visitor: &mut V,
) {
    let mut ancestors = HashSet::new();
    walk_schema_at(doc, id, slot, path, &mut ancestors, visitor);
}

fn walk_schema_at<V: SchemaVisitor>(
    doc: &mut Document,
    id: NodeId,
    slot: &Slot,
    path: &mut Vec<PathSeg>,
    ancestors: &mut HashSet<NodeId>,
    visitor: &mut V,
) {
    if !doc.is_map(id) {
        return;
    }
    if !ancestors.insert(id) {
        return;
    }

    let skip = visitor.visit(doc, id, slot, path);
    if !skip {
        let entries: Vec<(String, NodeId)> =
            doc.map_entries(id).map(|e| e.to_vec()).unwrap_or_default();
        for (key, child) in entries {
            if DIRECT_SCHEMA_KEYWORDS.contains(&key.as_str()) {
                path.push(PathSeg::key(&key));
                let child_slot = Slot::Entry {
                    parent: id,
                    key: key.clone(),
                };
                walk_schema_at(doc, child, &child_slot, path, ancestors, visitor);
                path.pop();
            } else if ARRAY_SCHEMA_KEYWORDS.contains(&key.as_str()) {
                if let Some(items) = doc.seq_items(child).map(|s| s.to_vec()) {
                    path.push(PathSeg::key(&key));
                    for (index, item) in items.into_iter().enumerate() {
                        path.push(PathSeg::Index(index));
                        let child_slot = Slot::Item {
                            parent: child,
                            index,
                        };
                        walk_schema_at(doc, item, &child_slot, path, ancestors, visitor);
                        path.pop();
                    }
                    path.pop();
                }
            } else if MAP_SCHEMA_KEYWORDS.contains(&key.as_str()) || key == "dependencies" {
                if let Some(subentries) = doc.map_entries(child).map(|e| e.to_vec()) {
                    path.push(PathSeg::key(&key));
                    for (name, sub) in subentries {
                        path.push(PathSeg::key(&name));
                        let child_slot = Slot::Entry {
                            parent: child,
                            key: name.clone(),
                        };
                        walk_schema_at(doc, sub, &child_slot, path, ancestors, visitor);
                        path.pop();
                    }
                    path.pop();
                }
            }
        }
    }

    ancestors.remove(&id);
}

/// Walk the whole document, handing each schema entry point to the schema
/// walk. The document walk itself does not descend into schema contents.
pub fn walk_document<V: SchemaVisitor>(doc: &mut Document, visitor: &mut V) {
    let root = doc.root();
    let mut path = Vec::new();
    let mut ancestors = HashSet::new();
    walk_document_at(doc, root, &mut path, &mut ancestors, visitor);
}

fn walk_document_at<V: SchemaVisitor>(
    doc: &mut Document,
    id: NodeId,
    path: &mut Vec<PathSeg>,
    ancestors: &mut HashSet<NodeId>,
    visitor: &mut V,
) {
    if !ancestors.insert(id) {
        return;
    }

    match doc.node(id) {
        Node::Map(entries) => {
            let entries: Vec<(String, NodeId)> = entries.clone();
            for (key, child) in entries {
                let component_schemas =
                    key == "schemas" && path.len() == 1 && path[0] == PathSeg::key("components");
                if component_schemas {
                    // Each entry of components.schemas is a separate schema root.
                    let roots: Vec<(String, NodeId)> =
                        doc.map_entries(child).map(|e| e.to_vec()).unwrap_or_default();
                    path.push(PathSeg::key(&key));
                    for (name, sub) in roots {
                        path.push(PathSeg::key(&name));
                        let slot = Slot::Entry {
                            parent: child,
                            key: name.clone(),
                        };
                        walk_schema_from(doc, sub, &slot, path, visitor);
                        path.pop();
                    }
                    path.pop();
                } else if is_schema_entry_point(&key, path) {
                    path.push(PathSeg::key(&key));
                    let slot = Slot::Entry {
                        parent: id,
                        key: key.clone(),
                    };
                    walk_schema_from(doc, child, &slot, path, visitor);
                    path.pop();
                } else {
                    path.push(PathSeg::key(&key));
                    walk_document_at(doc, child, path, ancestors, visitor);
                    path.pop();
                }
            }
        }
        Node::Seq(items) => {
            let items: Vec<NodeId> = items.clone();
            for (index, item) in items.into_iter().enumerate() {
                path.push(PathSeg::Index(index));
                walk_document_at(doc, item, path, ancestors, visitor);
                path.pop();
            }
        }
        Node::Scalar(_) => {}
    }

    ancestors.remove(&id);
}

fn is_schema_entry_point(key: &str, path: &[PathSeg]) -> bool {
    if key == "schema" {
        return true;
    }
    if key == "payload" || key == "headers" {
        return !path
            .iter()
            .any(|seg| matches!(seg, PathSeg::Key(k) if k == "examples"));
    }
    false
}

/// Visit every reachable node exactly once, from several roots. The
/// traversal is structure-blind (no schema keyword rules) and cycle-safe;
/// used by whole-tree rewrites such as the `x-origin` strip.
pub fn for_each_node<F>(doc: &mut Document, roots: &[NodeId], mut f: F)
where
    F: FnMut(&mut Document, NodeId),
{
    let mut seen = HashSet::new();
    let mut stack: Vec<NodeId> = roots.to_vec();

    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        f(doc, id);
        match doc.node(id) {
            Node::Map(entries) => stack.extend(entries.iter().map(|(_, v)| *v)),
            Node::Seq(items) => stack.extend(items.iter().copied()),
            Node::Scalar(_) => {}
        }
    }
}
