use std::path::Path;

pub mod fingerprint;
pub mod names;
pub mod walker;

pub use fingerprint::*;
pub use names::*;
pub use walker::*;

/// Prefix of a local component schema reference.
pub const COMPONENT_SCHEMA_PREFIX: &str = "#/components/schemas/";

/// Extension key that receives normalized discriminator mappings.
pub const DISCRIMINATOR_MAPPING_KEY: &str = "x-discriminator-mapping";

/// Build a local component reference for a schema name.
pub fn component_schema_ref(name: &str) -> String {
    format!("{}{}", COMPONENT_SCHEMA_PREFIX, name)
}

/// The schema name of a local component reference, if it is one.
pub fn component_ref_name(target: &str) -> Option<&str> {
    target.strip_prefix(COMPONENT_SCHEMA_PREFIX)
}

/// Whether a string value names a schema file (`.yaml`/`.yml`/`.json`,
/// case-insensitive), possibly with a trailing `#/...` fragment.
pub fn looks_like_file_ref(value: &str) -> bool {
    let path = value.split('#').next().unwrap_or(value);
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            ext.eq_ignore_ascii_case("yaml")
                || ext.eq_ignore_ascii_case("yml")
                || ext.eq_ignore_ascii_case("json")
        })
        .unwrap_or(false)
}
