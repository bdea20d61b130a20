use crate::common::walker::{walk_document, walk_schema, PathSeg, Slot};
use crate::document::{Document, NodeId};

use super::is_component_schema_path;
use super::registry::ComponentRegistry;

/// Pass 1: register every schema the document already names or inlined from
/// an external file.
///
/// Pre-seeds from `components.schemas` (map keys as suggested names, any
/// external `x-origin` for cross-file aliasing), then walks the document
/// registering every inline schema annotated with an external origin.
pub fn collect(doc: &mut Document, registry: &mut ComponentRegistry) {
    seed_component_schemas(doc, registry);

    walk_document(
        doc,
        &mut |doc: &mut Document, id: NodeId, _slot: &Slot, path: &[PathSeg]| {
            register_discovered(doc, registry, id, path);
            false
        },
    );
}

/// Register every externally-originated schema inside a schema subtree.
/// Used after an on-demand file load to pick up nested inlined schemas.
pub(crate) fn register_schema_tree(doc: &mut Document, registry: &mut ComponentRegistry, root: NodeId) {
    walk_schema(
        doc,
        root,
        &Slot::Detached,
        &mut |doc: &mut Document, id: NodeId, _slot: &Slot, _path: &[PathSeg]| {
            if doc.ref_str(id).is_none() {
                if let Some(origin) = doc.external_origin(id).map(str::to_string) {
                    registry.register(doc, id, &origin, Some(&origin));
                }
            }
            false
        },
    );
}

fn seed_component_schemas(doc: &mut Document, registry: &mut ComponentRegistry) {
    let Some(components) = doc.map_get(doc.root(), "components") else {
        return;
    };
    let Some(schemas) = doc.map_get(components, "schemas") else {
        return;
    };
    let entries: Vec<(String, NodeId)> = match doc.map_entries(schemas) {
        Some(entries) => entries.to_vec(),
        None => return,
    };

    for (name, node) in entries {
        if !doc.is_map(node) || doc.ref_str(node).is_some() {
            continue;
        }
        let origin = doc.external_origin(node).map(str::to_string);
        registry.register(doc, node, &name, origin.as_deref());
    }
}

fn register_discovered(
    doc: &mut Document,
    registry: &mut ComponentRegistry,
    id: NodeId,
    path: &[PathSeg],
) {
    if doc.ref_str(id).is_some() {
        return;
    }

    if is_component_schema_path(path) {
        if let PathSeg::Key(name) = &path[2] {
            let name = name.clone();
            let origin = doc.external_origin(id).map(str::to_string);
            registry.register(doc, id, &name, origin.as_deref());
        }
        return;
    }

    if let Some(origin) = doc.external_origin(id).map(str::to_string) {
        registry.register(doc, id, &origin, Some(&origin));
    }
}
