use regex::Regex;

/// Derive a component name from a source string: an origin path, a `$ref`,
/// or a pre-existing component key.
///
/// Strips the directory and extension, replaces characters outside
/// `[A-Za-z0-9_.-]` with `_`, trims leading/trailing `_`, `-` and `.`,
/// falls back to `Schema` when nothing is left, and prefixes `Schema_` when
/// the result starts with a digit.
pub fn derive_component_name(source: &str) -> String {
    let base = source.rsplit(['/', '\\']).next().unwrap_or(source);
    let stem = match base.rfind('.') {
        Some(pos) if pos > 0 => &base[..pos],
        _ => base,
    };

    let mut val = Regex::new(r"[^A-Za-z0-9_.\-]")
        .unwrap()
        .replace_all(stem, "_")
        .to_string();
    val = val.trim_matches(|c| matches!(c, '_' | '-' | '.')).to_string();

    if val.is_empty() {
        return "Schema".to_string();
    }
    if val.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
        val = format!("Schema_{}", val);
    }
    val
}

/// The name with any trailing `_<digits>` suffix stripped; used to group
/// numeric-suffix duplicates (`Pet_2` groups with `Pet`).
pub fn normalized_base(name: &str) -> &str {
    if let Some(pos) = name.rfind('_') {
        let tail = &name[pos + 1..];
        if !tail.is_empty() && tail.chars().all(|c| c.is_ascii_digit()) {
            return &name[..pos];
        }
    }
    name
}

/// Whether the name carries a `_<digits>` suffix.
pub fn has_numeric_suffix(name: &str) -> bool {
    normalized_base(name).len() != name.len()
}

/// Normalize a path with POSIX semantics: backslashes become slashes,
/// `.` segments drop, `..` segments pop their parent where possible.
pub fn normalize_path(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let absolute = unified.starts_with('/');
    let mut stack: Vec<&str> = Vec::new();

    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if stack.last().map(|s| *s != "..").unwrap_or(false) {
                    stack.pop();
                } else if !absolute {
                    stack.push("..");
                }
            }
            seg => stack.push(seg),
        }
    }

    let joined = stack.join("/");
    if absolute {
        format!("/{}", joined)
    } else {
        joined
    }
}

/// The directory part of a path, without the trailing separator.
pub fn dirname(path: &str) -> &str {
    match path.rfind(['/', '\\']) {
        Some(pos) => &path[..pos],
        None => "",
    }
}

/// The file part of a path.
pub fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Join a relative path onto a directory and normalize the result.
pub fn join_paths(dir: &str, rel: &str) -> String {
    if rel.starts_with('/') || dir.is_empty() {
        normalize_path(rel)
    } else {
        normalize_path(&format!("{}/{}", dir, rel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("./schemas/Pet.yaml", "Pet")]
    #[case("Pet.yaml", "Pet")]
    #[case("deep/dir/user-profile.json", "user-profile")]
    #[case("Pet.schema.yaml", "Pet.schema")]
    #[case("weird name!.yaml", "weird_name")]
    #[case("___.yaml", "Schema")]
    #[case("1Pet.yaml", "Schema_1Pet")]
    #[case("Pet", "Pet")]
    fn component_name_derivation(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(derive_component_name(source), expected);
    }

    #[test]
    fn numeric_suffix_normalization() {
        assert_eq!(normalized_base("Pet_2"), "Pet");
        assert_eq!(normalized_base("Pet_2a"), "Pet_2a");
        assert_eq!(normalized_base("Pet"), "Pet");
        assert!(has_numeric_suffix("Owner_13"));
        assert!(!has_numeric_suffix("Owner"));
    }

    #[rstest]
    #[case("./a/b.yaml", "a/b.yaml")]
    #[case("a/./b/../c.yaml", "a/c.yaml")]
    #[case("..\\up\\x.json", "../up/x.json")]
    #[case("/abs/./p.yaml", "/abs/p.yaml")]
    fn path_normalization(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_path(input), expected);
    }

    #[test]
    fn join_resolves_relative_segments() {
        assert_eq!(
            join_paths("schemas/pets", "../common/Owner.yaml"),
            "schemas/common/Owner.yaml"
        );
        assert_eq!(join_paths("", "Pet.yaml"), "Pet.yaml");
    }
}
