use crate::common::walker::{walk_document, PathSeg, Slot};
use crate::common::{component_schema_ref, COMPONENT_SCHEMA_PREFIX};
use crate::document::{is_external, Document, NodeId};

use super::is_component_schema_path;
use super::registry::ComponentRegistry;

/// Pass 2: replace every non-root occurrence of a registered schema with a
/// local component reference, and rewrite still-external `$ref` strings
/// whose target is registered.
pub fn rewrite_refs(doc: &mut Document, registry: &ComponentRegistry) {
    walk_document(
        doc,
        &mut |doc: &mut Document, id: NodeId, slot: &Slot, path: &[PathSeg]| {
            rewrite_node(doc, registry, id, slot, path)
        },
    );
}

fn rewrite_node(
    doc: &mut Document,
    registry: &ComponentRegistry,
    id: NodeId,
    slot: &Slot,
    path: &[PathSeg],
) -> bool {
    if let Some(target) = doc.ref_str(id).map(str::to_string) {
        if target.starts_with(COMPONENT_SCHEMA_PREFIX) {
            return true;
        }
        if is_external(&target) {
            if let Some(name) = registry.resolve_name(&target).map(str::to_string) {
                let replacement = local_ref(doc, &name, id);
                slot.replace(doc, replacement);
                return true;
            }
        }
        // Unresolved or internal non-component reference: leave verbatim.
        return false;
    }

    if let Some(name) = registry.name_of(id).map(str::to_string) {
        if !is_component_schema_path(path) {
            let replacement = local_ref(doc, &name, id);
            slot.replace(doc, replacement);
            return true;
        }
    }

    false
}

/// Build `{"$ref": "#/components/schemas/<name>"}`, lifting `description`
/// and `summary` verbatim from the node being replaced.
pub(crate) fn local_ref(doc: &mut Document, name: &str, source: NodeId) -> NodeId {
    let target = doc.add_string(&component_schema_ref(name));
    let reference = doc.alloc_map();
    doc.map_set(reference, "$ref", target);
    for key in ["description", "summary"] {
        if let Some(value) = doc.map_get(source, key) {
            doc.map_set(reference, key, value);
        }
    }
    reference
}
