use std::collections::{HashMap, HashSet};

use crate::common::walker::{
    for_each_node, ARRAY_SCHEMA_KEYWORDS, DIRECT_SCHEMA_KEYWORDS, MAP_SCHEMA_KEYWORDS,
};
use crate::common::component_schema_ref;
use crate::document::{is_external, Document, Node, NodeId};

use super::registry::ComponentRegistry;
use super::rewriter::local_ref;

/// Pass 6: rebuild `components.schemas`.
///
/// Pre-existing entries come first in their input order (entries whose name
/// was consolidated away are dropped; reference objects are kept as-is with
/// a resolvable external `$ref` rewritten), then newly registered names
/// follow in registration order. Each registered schema is materialized by
/// a root clone with references re-inserted for every nested registered
/// schema.
pub fn emit_components(doc: &mut Document, registry: &ComponentRegistry) {
    let root = doc.root();
    let pre_existing: Vec<(String, NodeId)> = doc
        .map_get(root, "components")
        .and_then(|c| doc.map_get(c, "schemas"))
        .and_then(|s| doc.map_entries(s).map(|e| e.to_vec()))
        .unwrap_or_default();

    let mut out: Vec<(String, NodeId)> = Vec::new();
    let mut included: HashSet<String> = HashSet::new();

    for (key, node) in pre_existing {
        if let Some(source) = registry.schema_of(&key) {
            out.push((key.clone(), clone_schema_root(doc, registry, source)));
            included.insert(key);
        } else if registry.name_of(node).is_some() {
            // Consolidated away: its canonical name owns the content now.
        } else {
            rewrite_external_ref(doc, registry, node);
            included.insert(key.clone());
            out.push((key, node));
        }
    }

    for (name, source) in registry.entries() {
        if included.contains(&name) {
            continue;
        }
        out.push((name, clone_schema_root(doc, registry, source)));
    }

    if out.is_empty() {
        return;
    }

    let components = match doc.map_get(root, "components") {
        Some(c) if doc.is_map(c) => c,
        _ => {
            let c = doc.alloc_map();
            doc.map_set(root, "components", c);
            c
        }
    };
    let schemas = doc.alloc_map();
    for (name, node) in out {
        doc.map_set(schemas, &name, node);
    }
    doc.map_set(components, "schemas", schemas);
}

fn rewrite_external_ref(doc: &mut Document, registry: &ComponentRegistry, node: NodeId) {
    let name = {
        let Some(target) = doc.ref_str(node) else {
            return;
        };
        if !is_external(target) {
            return;
        }
        match registry.resolve_name(target) {
            Some(name) => name.to_string(),
            None => return,
        }
    };
    if let Some(value_id) = doc.map_get(node, "$ref") {
        doc.set_string(value_id, &component_schema_ref(&name));
    }
}

/// Clone a registered schema for emission.
///
/// The top-level object is materialized in full; every nested
/// schema-position mapping whose identity is registered becomes a local
/// reference (lifting `description`/`summary`). Descent follows the schema
/// keyword rules; any other value is deep-copied verbatim. Identity-keyed
/// memoization keeps shared subtrees shared and closes cycles through the
/// in-progress placeholder.
pub fn clone_schema_root(doc: &mut Document, registry: &ComponentRegistry, root: NodeId) -> NodeId {
    let mut cloner = Cloner {
        registry,
        ref_memo: HashMap::new(),
        copy_memo: HashMap::new(),
    };
    cloner.materialize(doc, root, true)
}

struct Cloner<'a> {
    registry: &'a ComponentRegistry,
    /// Registered nested schema to its replacement reference.
    ref_memo: HashMap<NodeId, NodeId>,
    /// Source node to its materialized clone.
    copy_memo: HashMap<NodeId, NodeId>,
}

impl Cloner<'_> {
    /// Clone a nested schema-position value: registered mappings become
    /// references, everything else materializes.
    fn clone_schema(&mut self, doc: &mut Document, id: NodeId) -> NodeId {
        if doc.is_map(id) && doc.ref_str(id).is_none() {
            if let Some(name) = self.registry.name_of(id).map(str::to_string) {
                if let Some(reference) = self.ref_memo.get(&id) {
                    return *reference;
                }
                let reference = local_ref(doc, &name, id);
                self.ref_memo.insert(id, reference);
                return reference;
            }
        }
        self.materialize(doc, id, true)
    }

    fn materialize(&mut self, doc: &mut Document, id: NodeId, schema_mode: bool) -> NodeId {
        if let Some(clone) = self.copy_memo.get(&id) {
            return *clone;
        }

        match doc.node(id).clone() {
            Node::Scalar(value) => {
                let clone = doc.alloc(Node::Scalar(value));
                self.copy_memo.insert(id, clone);
                clone
            }
            Node::Seq(items) => {
                let clone = doc.alloc(Node::Seq(Vec::new()));
                self.copy_memo.insert(id, clone);
                let cloned: Vec<NodeId> = items
                    .into_iter()
                    .map(|item| self.materialize(doc, item, false))
                    .collect();
                *doc.node_mut(clone) = Node::Seq(cloned);
                clone
            }
            Node::Map(entries) => {
                let clone = doc.alloc_map();
                self.copy_memo.insert(id, clone);
                let mut cloned: Vec<(String, NodeId)> = Vec::with_capacity(entries.len());
                for (key, child) in entries {
                    let value = if schema_mode {
                        self.clone_child(doc, &key, child)
                    } else {
                        self.materialize(doc, child, false)
                    };
                    cloned.push((key, value));
                }
                *doc.node_mut(clone) = Node::Map(cloned);
                clone
            }
        }
    }

    /// Clone one entry of a schema mapping according to its keyword.
    fn clone_child(&mut self, doc: &mut Document, key: &str, child: NodeId) -> NodeId {
        if DIRECT_SCHEMA_KEYWORDS.contains(&key) {
            return self.clone_schema(doc, child);
        }

        if ARRAY_SCHEMA_KEYWORDS.contains(&key) {
            if let Some(items) = doc.seq_items(child).map(|s| s.to_vec()) {
                if let Some(clone) = self.copy_memo.get(&child) {
                    return *clone;
                }
                let clone = doc.alloc(Node::Seq(Vec::new()));
                self.copy_memo.insert(child, clone);
                let cloned: Vec<NodeId> = items
                    .into_iter()
                    .map(|item| self.clone_schema(doc, item))
                    .collect();
                *doc.node_mut(clone) = Node::Seq(cloned);
                return clone;
            }
            return self.materialize(doc, child, false);
        }

        if MAP_SCHEMA_KEYWORDS.contains(&key) || key == "dependencies" {
            if let Some(entries) = doc.map_entries(child).map(|e| e.to_vec()) {
                if let Some(clone) = self.copy_memo.get(&child) {
                    return *clone;
                }
                let clone = doc.alloc_map();
                self.copy_memo.insert(child, clone);
                let mut cloned: Vec<(String, NodeId)> = Vec::with_capacity(entries.len());
                for (name, value) in entries {
                    let value = self.clone_schema(doc, value);
                    cloned.push((name, value));
                }
                *doc.node_mut(clone) = Node::Map(cloned);
                return clone;
            }
            return self.materialize(doc, child, false);
        }

        self.materialize(doc, child, false)
    }
}

/// Remove `x-origin` bookkeeping from the whole document.
pub fn strip_origin(doc: &mut Document) {
    let root = doc.root();
    for_each_node(doc, &[root], |doc, id| {
        if doc.is_map(id) {
            doc.map_remove(id, "x-origin");
        }
    });
}
