use std::collections::HashMap;

use crate::common::fingerprint::fingerprint;
use crate::common::names::{has_numeric_suffix, normalized_base};
use crate::common::walker::for_each_node;
use crate::common::{component_ref_name, component_schema_ref, DISCRIMINATOR_MAPPING_KEY};
use crate::document::{Document, NodeId};

use super::registry::ComponentRegistry;

/// Pass 5: merge registered schemas that became equivalent (separate
/// origins pulling in identical content, numeric-suffix duplicates) under
/// one canonical name each, and repoint every reference.
///
/// Applying aliases can itself create new equivalences, so the pass runs to
/// a fixpoint; every round removes at least one name, so it terminates.
pub fn consolidate(doc: &mut Document, registry: &mut ComponentRegistry) {
    loop {
        let aliases = compute_aliases(doc, registry);
        if aliases.is_empty() {
            return;
        }
        apply_to_document(doc, registry, &aliases);
        registry.apply_aliases(doc, &aliases);
    }
}

/// Group registered schemas by (normalized base name, fingerprint) and map
/// every non-canonical member of a group to the canonical one.
fn compute_aliases(doc: &Document, registry: &ComponentRegistry) -> HashMap<String, String> {
    let mut groups: HashMap<(String, u64), Vec<String>> = HashMap::new();
    for (name, id) in registry.entries() {
        let key = (normalized_base(&name).to_string(), fingerprint(doc, id));
        groups.entry(key).or_default().push(name);
    }

    let mut aliases = HashMap::new();
    for (_, mut members) in groups {
        if members.len() < 2 {
            continue;
        }
        // Unsuffixed beats suffixed, then shorter, then codepoint order.
        members.sort_by_key(|name| (has_numeric_suffix(name), name.len(), name.clone()));
        let canonical = members[0].clone();
        for alias in &members[1..] {
            aliases.insert(alias.clone(), canonical.clone());
        }
    }
    aliases
}

/// Rewrite aliased component references across the document tree and all
/// registered schema subtrees (which pass 2 may have detached from the
/// tree): `$ref` values and extension discriminator-mapping values.
fn apply_to_document(
    doc: &mut Document,
    registry: &ComponentRegistry,
    aliases: &HashMap<String, String>,
) {
    let mut roots: Vec<NodeId> = vec![doc.root()];
    roots.extend(registry.entries().into_iter().map(|(_, id)| id));

    for_each_node(doc, &roots, |doc, id| {
        if !doc.is_map(id) {
            return;
        }
        if let Some(value_id) = doc.map_get(id, "$ref") {
            rewrite_alias_ref(doc, value_id, aliases);
        }
        if let Some(ext) = doc.map_get(id, DISCRIMINATOR_MAPPING_KEY) {
            let values: Vec<NodeId> = doc
                .map_entries(ext)
                .map(|entries| entries.iter().map(|(_, v)| *v).collect())
                .unwrap_or_default();
            for value_id in values {
                rewrite_alias_ref(doc, value_id, aliases);
            }
        }
    });
}

fn rewrite_alias_ref(doc: &mut Document, value_id: NodeId, aliases: &HashMap<String, String>) {
    let canonical = {
        let Some(target) = doc.str_value(value_id) else {
            return;
        };
        let Some(name) = component_ref_name(target) else {
            return;
        };
        match aliases.get(name) {
            Some(canonical) => canonical.clone(),
            None => return,
        }
    };
    doc.set_string(value_id, &component_schema_ref(&canonical));
}
