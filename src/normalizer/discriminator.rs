use std::path::Path;

use crate::common::names::{basename, dirname, join_paths, normalize_path};
use crate::common::walker::{walk_document, walk_schema, PathSeg, Slot};
use crate::common::{
    component_schema_ref, looks_like_file_ref, COMPONENT_SCHEMA_PREFIX, DISCRIMINATOR_MAPPING_KEY,
};
use crate::document::{Document, NodeId};
use crate::error::Result;
use crate::loader::FileLoader;

use super::collector::register_schema_tree;
use super::registry::ComponentRegistry;

/// Pass 3: rewrite `discriminator.mapping` file values to local component
/// references, loading schema files on demand when the target is not yet
/// registered.
///
/// Runs full sweeps over the registered schemas until one changes nothing.
/// The registry only grows and every mapping value is rewritten at most
/// once into a fixed local form, so the loop terminates; the loader's
/// attempted-path set keeps each file from being loaded twice.
pub fn resolve_mappings(
    doc: &mut Document,
    registry: &mut ComponentRegistry,
    loader: &mut FileLoader,
) -> Result<()> {
    loop {
        let mut changed = false;
        for (_, schema) in registry.entries() {
            changed |= resolve_schema_mappings(doc, registry, loader, schema)?;
        }
        if !changed {
            return Ok(());
        }
    }
}

fn resolve_schema_mappings(
    doc: &mut Document,
    registry: &mut ComponentRegistry,
    loader: &mut FileLoader,
    schema: NodeId,
) -> Result<bool> {
    let mut mappings: Vec<NodeId> = Vec::new();
    if let Some(disc) = doc.map_get(schema, "discriminator") {
        if doc.is_map(disc) {
            if let Some(mapping) = doc.map_get(disc, "mapping") {
                if doc.is_map(mapping) {
                    mappings.push(mapping);
                }
            }
        }
    }
    if let Some(ext) = doc.map_get(schema, DISCRIMINATOR_MAPPING_KEY) {
        if doc.is_map(ext) {
            mappings.push(ext);
        }
    }

    let schema_origin = doc.external_origin(schema).map(str::to_string);
    let mut changed = false;

    for mapping in mappings {
        let entries: Vec<(String, NodeId)> =
            doc.map_entries(mapping).map(|e| e.to_vec()).unwrap_or_default();
        for (_, value_id) in entries {
            let Some(value) = doc.str_value(value_id).map(str::to_string) else {
                continue;
            };
            if value.starts_with(COMPONENT_SCHEMA_PREFIX) || !looks_like_file_ref(&value) {
                continue;
            }
            changed |= resolve_mapping_value(
                doc,
                registry,
                loader,
                schema_origin.as_deref(),
                value_id,
                &value,
            )?;
        }
    }
    Ok(changed)
}

fn resolve_mapping_value(
    doc: &mut Document,
    registry: &mut ComponentRegistry,
    loader: &mut FileLoader,
    schema_origin: Option<&str>,
    value_id: NodeId,
    value: &str,
) -> Result<bool> {
    if let Some(name) = registry.resolve_name(value).map(str::to_string) {
        doc.set_string(value_id, &component_schema_ref(&name));
        return Ok(true);
    }

    let Some(resolved) = locate_mapping_file(loader, schema_origin, value)? else {
        return Ok(false);
    };

    let mut changed = false;
    if loader.mark_attempted(&resolved) {
        if let Some(root) = loader.load_file(doc, &resolved)? {
            if doc.is_map(root) && doc.ref_str(root).is_none() {
                let origin = doc.add_string(&resolved);
                doc.map_set(root, "x-origin", origin);
                registry.register(doc, root, &resolved, Some(&resolved));
                register_schema_tree(doc, registry, root);
                changed = true;
            }
        }
    }

    if let Some(name) = registry.resolve_name(value).map(str::to_string) {
        doc.set_string(value_id, &component_schema_ref(&name));
        changed = true;
    }
    Ok(changed)
}

/// Resolve a mapping value to a loadable path: a join against the schema's
/// origin directory, the normalized value, or the bare basename, whichever
/// exists first; falling back to a cached recursive search of the working
/// directory.
fn locate_mapping_file(
    loader: &mut FileLoader,
    schema_origin: Option<&str>,
    value: &str,
) -> Result<Option<String>> {
    let mut candidates: Vec<String> = Vec::new();
    if let Some(origin) = schema_origin {
        candidates.push(join_paths(dirname(origin), value));
    }
    candidates.push(normalize_path(value));
    candidates.push(basename(value).to_string());

    for candidate in &candidates {
        if Path::new(candidate).is_file() {
            return Ok(Some(candidate.clone()));
        }
    }

    let matches: Vec<String> = loader.find_by_basename(basename(value))?.to_vec();
    if matches.len() == 1 {
        return Ok(Some(matches[0].clone()));
    }
    if let Some(origin) = schema_origin {
        let origin_dir = basename(dirname(origin));
        if !origin_dir.is_empty() {
            let mut near: Vec<&String> =
                matches.iter().filter(|p| p.contains(origin_dir)).collect();
            if near.len() == 1 {
                return Ok(Some(near.remove(0).clone()));
            }
        }
    }
    Ok(None)
}

/// Pass 4: normalize object-form discriminators everywhere.
///
/// Merges each object discriminator's `mapping` into the extension-key
/// mapping (object-mapping values overwrite existing extension keys), then
/// collapses the discriminator to its `propertyName` string, or deletes it
/// when no property name was provided.
pub fn normalize_discriminators(doc: &mut Document, registry: &ComponentRegistry) {
    walk_document(
        doc,
        &mut |doc: &mut Document, id: NodeId, _slot: &Slot, _path: &[PathSeg]| {
            normalize_node(doc, id);
            false
        },
    );
    // Registered schemas may no longer sit in the tree (pass 2 replaced
    // their occurrences with references), so walk them from the registry.
    for (_, schema) in registry.entries() {
        walk_schema(
            doc,
            schema,
            &Slot::Detached,
            &mut |doc: &mut Document, id: NodeId, _slot: &Slot, _path: &[PathSeg]| {
                normalize_node(doc, id);
                false
            },
        );
    }
}

fn normalize_node(doc: &mut Document, id: NodeId) {
    let Some(disc) = doc.map_get(id, "discriminator") else {
        return;
    };
    if !doc.is_map(disc) {
        return;
    }

    if let Some(mapping) = doc.map_get(disc, "mapping") {
        let entries: Vec<(String, NodeId)> =
            doc.map_entries(mapping).map(|e| e.to_vec()).unwrap_or_default();
        if !entries.is_empty() {
            let ext = match doc.map_get(id, DISCRIMINATOR_MAPPING_KEY) {
                Some(ext) if doc.is_map(ext) => ext,
                _ => {
                    let ext = doc.alloc_map();
                    doc.map_set(id, DISCRIMINATOR_MAPPING_KEY, ext);
                    ext
                }
            };
            for (key, value) in entries {
                doc.map_set(ext, &key, value);
            }
        }
    }

    let property_name = doc
        .map_get(disc, "propertyName")
        .and_then(|p| doc.str_value(p))
        .map(str::to_string);
    match property_name {
        Some(name) => {
            let collapsed = doc.add_string(&name);
            doc.map_set(id, "discriminator", collapsed);
        }
        None => {
            doc.map_remove(id, "discriminator");
        }
    }
}
