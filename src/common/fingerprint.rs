use serde_json::Value;
use xxhash_rust::xxh64::xxh64;

use crate::document::{Document, Node, NodeId};

/// Keys that carry bookkeeping or prose, not schema semantics.
const EXCLUDED_KEYS: [&str; 3] = ["x-origin", "description", "summary"];

const CYCLE_SENTINEL: &str = "{\"$cycle\":true}";

/// Structural fingerprint of a schema subtree.
///
/// Two schemas are equivalent iff their fingerprints are equal; this is the
/// equivalence predicate behind deduplication and alias consolidation.
pub fn fingerprint(doc: &Document, id: NodeId) -> u64 {
    xxh64(canonical_serialization(doc, id).as_bytes(), 0)
}

/// Deterministic, cycle-safe, key-order-independent serialization of a
/// subtree. Mapping entries are sorted by key (codepoint order) and the
/// `x-origin`, `description` and `summary` keys are skipped; re-entering a
/// node already on the serialization stack emits a cycle sentinel.
pub fn canonical_serialization(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    let mut on_stack: Vec<NodeId> = Vec::new();
    write_canonical(doc, id, &mut on_stack, &mut out);
    out
}

fn write_canonical(doc: &Document, id: NodeId, on_stack: &mut Vec<NodeId>, out: &mut String) {
    match doc.node(id) {
        Node::Scalar(value) => out.push_str(&value.to_string()),
        Node::Seq(items) => {
            if on_stack.contains(&id) {
                out.push_str(CYCLE_SENTINEL);
                return;
            }
            on_stack.push(id);
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(doc, *item, on_stack, out);
            }
            out.push(']');
            on_stack.pop();
        }
        Node::Map(entries) => {
            if on_stack.contains(&id) {
                out.push_str(CYCLE_SENTINEL);
                return;
            }
            on_stack.push(id);

            let mut sorted: Vec<&(String, NodeId)> = entries
                .iter()
                .filter(|(k, _)| !EXCLUDED_KEYS.contains(&k.as_str()))
                .collect();
            sorted.sort_by(|a, b| a.0.cmp(&b.0));

            out.push('{');
            for (i, (key, child)) in sorted.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(doc, *child, on_stack, out);
            }
            out.push('}');
            on_stack.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_order_is_irrelevant() {
        let a = Document::from_json(&json!({"type": "object", "properties": {"x": {"type": "string"}}}));
        let b = Document::from_json(&json!({"properties": {"x": {"type": "string"}}, "type": "object"}));
        assert_eq!(fingerprint(&a, a.root()), fingerprint(&b, b.root()));
    }

    #[test]
    fn bookkeeping_keys_are_ignored() {
        let a = Document::from_json(&json!({"type": "string", "x-origin": "./Pet.yaml", "description": "a pet"}));
        let b = Document::from_json(&json!({"type": "string", "summary": "different prose"}));
        assert_eq!(fingerprint(&a, a.root()), fingerprint(&b, b.root()));
    }

    #[test]
    fn sequence_order_is_significant() {
        let a = Document::from_json(&json!({"enum": ["a", "b"]}));
        let b = Document::from_json(&json!({"enum": ["b", "a"]}));
        assert_ne!(fingerprint(&a, a.root()), fingerprint(&b, b.root()));
    }

    #[test]
    fn cycles_terminate_with_a_sentinel() {
        let mut doc = Document::from_json(&json!({"type": "object", "properties": {"next": {}}}));
        let root = doc.root();
        let props = doc.map_get(root, "properties").unwrap();
        doc.map_set(props, "next", root);

        let rendered = canonical_serialization(&doc, root);
        assert!(rendered.contains("{\"$cycle\":true}"));
        // Stable across repeated runs.
        assert_eq!(fingerprint(&doc, root), fingerprint(&doc, root));
    }
}
