pub mod aliases;
pub mod channels;
pub mod collector;
pub mod discriminator;
pub mod emitter;
pub mod registry;
pub mod rewriter;

pub use channels::rewrite_channel_refs;
pub use registry::ComponentRegistry;

use std::fs;
use std::path::Path;

use crate::common::walker::PathSeg;
use crate::document::Document;
use crate::error::Result;
use crate::loader::FileLoader;

/// Whether a schema path is a root under `components.schemas` (the only
/// position where a registered schema stays inline).
pub(crate) fn is_component_schema_path(path: &[PathSeg]) -> bool {
    path.len() == 3 && path[0] == PathSeg::key("components") && path[1] == PathSeg::key("schemas")
}

/// Run the full normalization pipeline over a bundled document.
///
/// The document is mutated in place: inlined schemas are hoisted under
/// `components.schemas`, non-root occurrences become local references,
/// equivalent schemas share one canonical name, discriminators collapse to
/// their property-name form, operation channel references become local
/// pointers, and the `x-origin` bookkeeping is removed.
///
/// Relative paths in discriminator mappings resolve against the process
/// working directory; the working directory is temporarily moved while a
/// referenced file is dereferenced and restored afterwards.
pub fn normalize_document(doc: &mut Document) -> Result<()> {
    let mut registry = ComponentRegistry::new();
    let mut loader = FileLoader::new();

    collector::collect(doc, &mut registry);
    rewriter::rewrite_refs(doc, &registry);
    discriminator::resolve_mappings(doc, &mut registry, &mut loader)?;
    discriminator::normalize_discriminators(doc, &registry);
    aliases::consolidate(doc, &mut registry);
    emitter::emit_components(doc, &registry);
    channels::rewrite_channel_refs(doc);
    emitter::strip_origin(doc);
    Ok(())
}

/// Normalize a bundled document file and write the result.
///
/// The input may be YAML or JSON. Output is YAML unless `force_json` is set
/// or the output path ends in `.json`.
pub fn normalize_file(input_path: &str, output_path: &str, force_json: bool) -> Result<()> {
    let content = fs::read_to_string(input_path)?;
    let mut doc = Document::parse_str(&content)?;

    normalize_document(&mut doc)?;

    let value = doc.to_json(doc.root())?;
    let as_json = force_json
        || Path::new(output_path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

    let rendered = if as_json {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_yaml::to_string(&value)?
    };
    fs::write(output_path, rendered)?;
    Ok(())
}
