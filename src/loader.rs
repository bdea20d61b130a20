use std::collections::{HashMap, HashSet};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use walkdir::WalkDir;

use crate::document::{is_external, Document, Node, NodeId};
use crate::common::names::{basename, normalize_path};
use crate::error::Result;

/// Directories the on-demand file search never descends into.
const SKIPPED_DIRS: [&str; 3] = [".git", "node_modules", "lib"];

/// Loads schema files on demand for the discriminator-mapping resolver.
///
/// Each file is parsed as YAML or JSON, dereferenced against its own
/// directory (with the process working directory scoped there for the
/// duration, as the reference-resolution semantics require), and inserted
/// into the document arena. Loading the same file twice yields the same
/// node, preserving identity the way the upstream resolver does.
pub struct FileLoader {
    /// Origin paths already attempted, loadable or not.
    attempted: HashSet<String>,
    /// Canonicalized path to loaded root node.
    loaded: HashMap<PathBuf, NodeId>,
    /// Files currently being dereferenced; re-entry means a cyclic file
    /// reference and the inner `$ref` is left unresolved.
    in_progress: HashSet<PathBuf>,
    /// Basename to sorted relative paths under the working directory.
    search_cache: HashMap<String, Vec<String>>,
    scanned: bool,
}

impl Default for FileLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl FileLoader {
    pub fn new() -> Self {
        Self {
            attempted: HashSet::new(),
            loaded: HashMap::new(),
            in_progress: HashSet::new(),
            search_cache: HashMap::new(),
            scanned: false,
        }
    }

    /// Record an attempt to load `path`. Returns false when the path was
    /// already attempted, loadable or not.
    pub fn mark_attempted(&mut self, path: &str) -> bool {
        self.attempted.insert(path.to_string())
    }

    /// Relative paths of files named `base` under the working directory,
    /// sorted; scans the tree once and serves later lookups from cache.
    pub fn find_by_basename(&mut self, base: &str) -> Result<&[String]> {
        self.ensure_scan()?;
        Ok(self
            .search_cache
            .get(base)
            .map(|paths| paths.as_slice())
            .unwrap_or(&[]))
    }

    fn ensure_scan(&mut self) -> Result<()> {
        if self.scanned {
            return Ok(());
        }
        for entry in WalkDir::new(".").into_iter().filter_entry(|e| !skip_dir(e)) {
            let entry = entry.map_err(io::Error::from)?;
            if entry.file_type().is_file() {
                let rel = normalize_path(&entry.path().to_string_lossy());
                let base = basename(&rel).to_string();
                self.search_cache.entry(base).or_default().push(rel);
            }
        }
        for paths in self.search_cache.values_mut() {
            paths.sort();
        }
        self.scanned = true;
        Ok(())
    }

    /// Load and dereference a schema file into the arena.
    ///
    /// Returns `Ok(None)` for the soft cases: a root that is neither a
    /// mapping nor a sequence, or a cyclic file reference. Read and parse
    /// failures are hard errors.
    pub fn load_file(&mut self, doc: &mut Document, path: &str) -> Result<Option<NodeId>> {
        let canonical = fs::canonicalize(path)?;
        if let Some(root) = self.loaded.get(&canonical) {
            return Ok(Some(*root));
        }
        if self.in_progress.contains(&canonical) {
            return Ok(None);
        }

        let content = fs::read_to_string(path)?;
        let value: Value = serde_yaml::from_str(&content)?;
        if !value.is_object() && !value.is_array() {
            return Ok(None);
        }
        let root = doc.add_json(&value);

        self.in_progress.insert(canonical.clone());
        let deref_result = {
            let dir = Path::new(path).parent().unwrap_or_else(|| Path::new(""));
            let _guard = WorkingDirGuard::enter(dir)?;
            self.deref_tree(doc, root)
        };
        self.in_progress.remove(&canonical);
        deref_result?;

        self.loaded.insert(canonical, root);
        Ok(Some(root))
    }

    /// Resolve external `$ref`s inside a freshly loaded subtree against the
    /// current working directory, tagging each dereferenced node's
    /// `x-origin` with the `$ref` string as written.
    fn deref_tree(&mut self, doc: &mut Document, id: NodeId) -> Result<()> {
        let mut seen = HashSet::new();
        self.deref_node(doc, id, &mut seen)
    }

    fn deref_node(&mut self, doc: &mut Document, id: NodeId, seen: &mut HashSet<NodeId>) -> Result<()> {
        if !seen.insert(id) {
            return Ok(());
        }

        match doc.node(id) {
            Node::Map(entries) => {
                let entries: Vec<(String, NodeId)> = entries.clone();
                for (key, child) in entries {
                    if let Some(replacement) = self.deref_candidate(doc, child)? {
                        doc.map_set(id, &key, replacement);
                    } else {
                        self.deref_node(doc, child, seen)?;
                    }
                }
            }
            Node::Seq(items) => {
                let items: Vec<NodeId> = items.clone();
                for (index, item) in items.into_iter().enumerate() {
                    if let Some(replacement) = self.deref_candidate(doc, item)? {
                        doc.seq_set(id, index, replacement);
                    } else {
                        self.deref_node(doc, item, seen)?;
                    }
                }
            }
            Node::Scalar(_) => {}
        }

        Ok(())
    }

    /// If the node is an external file reference that resolves, return the
    /// loaded node to put in its place.
    fn deref_candidate(&mut self, doc: &mut Document, id: NodeId) -> Result<Option<NodeId>> {
        let Some(target) = doc.ref_str(id).map(str::to_string) else {
            return Ok(None);
        };
        if !is_external(&target) {
            return Ok(None);
        }

        let (file_part, fragment) = match target.split_once('#') {
            Some((file, frag)) => (file, Some(frag)),
            None => (target.as_str(), None),
        };
        if file_part.is_empty() || !Path::new(file_part).exists() {
            return Ok(None);
        }

        let Some(root) = self.load_file(doc, file_part)? else {
            return Ok(None);
        };
        let resolved = match fragment {
            Some(frag) => match pointer_into(doc, root, frag) {
                Some(node) => node,
                None => return Ok(None),
            },
            None => root,
        };

        if doc.is_map(resolved) {
            let origin = doc.add_string(&target);
            doc.map_set(resolved, "x-origin", origin);
        }
        Ok(Some(resolved))
    }
}

/// Follow a JSON pointer fragment (`/a/b/0`, with RFC 6901 escapes) from a
/// node.
fn pointer_into(doc: &Document, root: NodeId, fragment: &str) -> Option<NodeId> {
    let pointer = fragment.strip_prefix('/').unwrap_or(fragment);
    if pointer.is_empty() {
        return Some(root);
    }

    let mut current = root;
    for token in pointer.split('/') {
        let token = token.replace("~1", "/").replace("~0", "~");
        current = match doc.node(current) {
            Node::Map(_) => doc.map_get(current, &token)?,
            Node::Seq(items) => {
                let index: usize = token.parse().ok()?;
                *items.get(index)?
            }
            Node::Scalar(_) => return None,
        };
    }
    Some(current)
}

/// Scoped acquisition of the process working directory: enters `dir` on
/// construction and restores the previous directory on drop, failure paths
/// included.
pub(crate) struct WorkingDirGuard {
    previous: PathBuf,
}

impl WorkingDirGuard {
    pub fn enter(dir: &Path) -> io::Result<Self> {
        let previous = env::current_dir()?;
        if !dir.as_os_str().is_empty() {
            env::set_current_dir(dir)?;
        }
        Ok(Self { previous })
    }
}

impl Drop for WorkingDirGuard {
    fn drop(&mut self) {
        let _ = env::set_current_dir(&self.previous);
    }
}

fn skip_dir(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| SKIPPED_DIRS.contains(&name))
            .unwrap_or(false)
}
