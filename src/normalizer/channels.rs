use std::collections::{HashMap, HashSet};

use crate::common::names::basename;
use crate::document::{escape_pointer_token, is_external, Document, NodeId};

/// Pass 7, independent of the schema pipeline: rewrite operation
/// `channel.$ref` (and `reply.channel.$ref`) values that still point at
/// external files to local channel pointers.
///
/// Channel names are escaped as JSON pointer segments; resolution tries the
/// exact origin path, then the file basename when only one channel claims
/// it. Unresolvable references are left verbatim.
pub fn rewrite_channel_refs(doc: &mut Document) {
    let index = ChannelIndex::build(doc);
    if index.is_empty() {
        return;
    }

    let root = doc.root();
    let operation_sections = [
        doc.map_get(root, "operations"),
        doc.map_get(root, "components")
            .and_then(|c| doc.map_get(c, "operations")),
    ];

    for section in operation_sections.into_iter().flatten() {
        let operations: Vec<NodeId> = doc
            .map_entries(section)
            .map(|entries| entries.iter().map(|(_, op)| *op).collect())
            .unwrap_or_default();
        for operation in operations {
            if let Some(channel) = doc.map_get(operation, "channel") {
                index.rewrite(doc, channel);
            }
            if let Some(reply) = doc.map_get(operation, "reply") {
                if let Some(channel) = doc.map_get(reply, "channel") {
                    index.rewrite(doc, channel);
                }
            }
        }
    }
}

/// Origin-path and basename lookup tables for externally-originated
/// channels, built from `channels` and `components.channels`.
struct ChannelIndex {
    by_origin: HashMap<String, String>,
    by_basename: HashMap<String, String>,
    ambiguous_basenames: HashSet<String>,
}

impl ChannelIndex {
    fn build(doc: &Document) -> Self {
        let mut index = ChannelIndex {
            by_origin: HashMap::new(),
            by_basename: HashMap::new(),
            ambiguous_basenames: HashSet::new(),
        };

        let root = doc.root();
        let sections = [
            (doc.map_get(root, "channels"), "#/channels/"),
            (
                doc.map_get(root, "components")
                    .and_then(|c| doc.map_get(c, "channels")),
                "#/components/channels/",
            ),
        ];

        for (section, prefix) in sections {
            let Some(section) = section else {
                continue;
            };
            let Some(entries) = doc.map_entries(section) else {
                continue;
            };
            for (name, channel) in entries {
                let Some(origin) = doc.external_origin(*channel) else {
                    continue;
                };
                let pointer = format!("{}{}", prefix, escape_pointer_token(name));
                index.record(origin, pointer);
            }
        }
        index
    }

    fn record(&mut self, origin: &str, pointer: String) {
        self.by_origin.insert(origin.to_string(), pointer.clone());

        let base = basename(origin).to_string();
        match self.by_basename.get(&base) {
            Some(existing) if existing != &pointer => {
                self.ambiguous_basenames.insert(base);
            }
            _ => {
                self.by_basename.insert(base, pointer);
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.by_origin.is_empty()
    }

    fn resolve(&self, target: &str) -> Option<&str> {
        if let Some(pointer) = self.by_origin.get(target) {
            return Some(pointer);
        }
        let base = basename(target);
        if !self.ambiguous_basenames.contains(base) {
            if let Some(pointer) = self.by_basename.get(base) {
                return Some(pointer);
            }
        }
        None
    }

    /// Overwrite an external channel `$ref` with its local pointer.
    fn rewrite(&self, doc: &mut Document, channel: NodeId) {
        let pointer = {
            let Some(target) = doc.ref_str(channel) else {
                return;
            };
            if !is_external(target) {
                return;
            }
            match self.resolve(target) {
                Some(pointer) => pointer.to_string(),
                None => return,
            }
        };
        if let Some(value_id) = doc.map_get(channel, "$ref") {
            doc.set_string(value_id, &pointer);
        }
    }
}
