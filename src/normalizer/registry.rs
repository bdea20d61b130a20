use std::collections::{HashMap, HashSet};

use crate::common::fingerprint::fingerprint;
use crate::common::names::{basename, derive_component_name, normalize_path, normalized_base};
use crate::document::{Document, NodeId};

/// State carried across the normalization passes: which schema objects have
/// been hoisted, under which names, and how their source paths map back to
/// those names.
///
/// The registry is keyed by object identity ([`NodeId`]), never by
/// structure: two equal-looking schemas inlined from different files
/// register separately and are merged later by alias consolidation, while
/// one schema shared at three positions registers once.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    /// Schema object to its chosen component name.
    object_names: HashMap<NodeId, String>,
    /// The authoritative set of hoisted schemas.
    schemas: HashMap<String, NodeId>,
    /// Names in registration order, for stable emission.
    order: Vec<String>,
    /// `normalizedBase::fingerprint` to chosen name, for exact-dup reuse.
    signatures: HashMap<String, String>,
    /// Origin path (raw and normalized) to chosen name.
    origins: HashMap<String, String>,
    /// File basename to chosen name.
    basenames: HashMap<String, String>,
    /// Basenames claimed by more than one distinct name.
    ambiguous_basenames: HashSet<String>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name_of(&self, schema: NodeId) -> Option<&str> {
        self.object_names.get(&schema).map(|s| s.as_str())
    }

    pub fn is_registered(&self, schema: NodeId) -> bool {
        self.object_names.contains_key(&schema)
    }

    pub fn schema_of(&self, name: &str) -> Option<NodeId> {
        self.schemas.get(name).copied()
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Hoisted schemas in registration order.
    pub fn entries(&self) -> Vec<(String, NodeId)> {
        self.order
            .iter()
            .map(|name| (name.clone(), self.schemas[name]))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Register a schema object, returning its component name.
    ///
    /// Reuses the stored name when the object is already known, aliases to
    /// an existing name on an origin or signature match, and otherwise mints
    /// a unique name from the suggestion (numeric suffixes on collision).
    pub fn register(
        &mut self,
        doc: &Document,
        schema: NodeId,
        suggested: &str,
        origin: Option<&str>,
    ) -> String {
        if let Some(name) = self.object_names.get(&schema) {
            return name.clone();
        }

        if let Some(origin) = origin {
            if let Some(name) = self.origins.get(origin).cloned() {
                self.object_names.insert(schema, name.clone());
                return name;
            }
        }

        let safe = derive_component_name(suggested);
        let sig = signature(doc, schema, &safe);

        if let Some(name) = self.signatures.get(&sig).cloned() {
            self.object_names.insert(schema, name.clone());
            if let Some(origin) = origin {
                self.record_origin(origin, &name);
            }
            return name;
        }

        let mut name = safe.clone();
        let mut k = 2;
        while let Some(existing) = self.schemas.get(&name) {
            if *existing == schema {
                break;
            }
            name = format!("{}_{}", safe, k);
            k += 1;
        }

        self.object_names.insert(schema, name.clone());
        if self.schemas.insert(name.clone(), schema).is_none() {
            self.order.push(name.clone());
        }
        self.signatures.insert(sig, name.clone());
        if let Some(origin) = origin {
            self.record_origin(origin, &name);
        }
        name
    }

    fn record_origin(&mut self, origin: &str, name: &str) {
        self.origins.insert(origin.to_string(), name.to_string());
        self.origins.insert(normalize_path(origin), name.to_string());

        let base = basename(origin).to_string();
        match self.basenames.get(&base) {
            Some(existing) if existing != name => {
                self.ambiguous_basenames.insert(base);
            }
            _ => {
                self.basenames.insert(base, name.to_string());
            }
        }
    }

    /// Resolve a file path or `$ref` target to a registered component name:
    /// exact origin match, then normalized path, then unambiguous basename.
    pub fn resolve_name(&self, path: &str) -> Option<&str> {
        if let Some(name) = self.origins.get(path) {
            return Some(name);
        }
        if let Some(name) = self.origins.get(&normalize_path(path)) {
            return Some(name);
        }
        let base = basename(path);
        if !self.ambiguous_basenames.contains(base) {
            if let Some(name) = self.basenames.get(base) {
                return Some(name);
            }
        }
        None
    }

    /// Rebind every map after alias consolidation: non-canonical names drop
    /// out of the schema set and all name-valued entries repoint to their
    /// canonical replacement. Signatures are rebuilt from scratch.
    pub fn apply_aliases(&mut self, doc: &Document, aliases: &HashMap<String, String>) {
        for name in self.object_names.values_mut() {
            if let Some(canonical) = aliases.get(name) {
                *name = canonical.clone();
            }
        }
        for name in self.origins.values_mut() {
            if let Some(canonical) = aliases.get(name) {
                *name = canonical.clone();
            }
        }
        for name in self.basenames.values_mut() {
            if let Some(canonical) = aliases.get(name) {
                *name = canonical.clone();
            }
        }

        for alias in aliases.keys() {
            self.schemas.remove(alias);
        }
        self.order.retain(|name| self.schemas.contains_key(name));

        self.signatures.clear();
        for name in &self.order {
            let sig = signature(doc, self.schemas[name], name);
            self.signatures.entry(sig).or_insert_with(|| name.clone());
        }
    }
}

fn signature(doc: &Document, schema: NodeId, name: &str) -> String {
    format!("{}::{:016x}", normalized_base(name), fingerprint(doc, schema))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identical_registration_is_idempotent() {
        let doc = Document::from_json(&json!({"type": "string"}));
        let mut reg = ComponentRegistry::new();
        let a = reg.register(&doc, doc.root(), "./Pet.yaml", Some("./Pet.yaml"));
        let b = reg.register(&doc, doc.root(), "./Pet.yaml", Some("./Pet.yaml"));
        assert_eq!(a, "Pet");
        assert_eq!(b, "Pet");
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn same_origin_aliases_distinct_objects() {
        let value = json!({"type": "object"});
        let mut doc = Document::from_json(&value);
        let second = doc.add_json(&value);

        let mut reg = ComponentRegistry::new();
        reg.register(&doc, doc.root(), "./Pet.yaml", Some("./Pet.yaml"));
        let name = reg.register(&doc, second, "./Pet.yaml", Some("./Pet.yaml"));
        assert_eq!(name, "Pet");
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn equal_fingerprints_share_a_name_across_paths() {
        let value = json!({"type": "object", "properties": {"id": {"type": "string"}}});
        let mut doc = Document::from_json(&value);
        let second = doc.add_json(&value);

        let mut reg = ComponentRegistry::new();
        reg.register(&doc, doc.root(), "./a/Pet.yaml", Some("./a/Pet.yaml"));
        let name = reg.register(&doc, second, "./b/Pet.yaml", Some("./b/Pet.yaml"));
        assert_eq!(name, "Pet");
        assert_eq!(reg.len(), 1);
        // Two distinct names never claimed the basename, so it stays usable.
        assert_eq!(reg.resolve_name("elsewhere/Pet.yaml"), Some("Pet"));
    }

    #[test]
    fn structurally_different_schemas_get_suffixes() {
        let mut doc = Document::from_json(&json!({"type": "object"}));
        let second = doc.add_json(&json!({"type": "string"}));

        let mut reg = ComponentRegistry::new();
        let a = reg.register(&doc, doc.root(), "./a/Pet.yaml", Some("./a/Pet.yaml"));
        let b = reg.register(&doc, second, "./b/Pet.yaml", Some("./b/Pet.yaml"));
        assert_eq!(a, "Pet");
        assert_eq!(b, "Pet_2");
        // Basename now ambiguous between Pet and Pet_2.
        assert_eq!(reg.resolve_name("other/Pet.yaml"), None);
    }
}
