//! Path index of existing documents, keyed by full path, filename, and every path suffix.

use std::collections::HashMap;
use std::path::{Component, Path};

use walkdir::WalkDir;

/// Lookup key to candidate document paths. Candidate lists never hold
/// duplicates and keep discovery order, which is the resolver's tie-break order.
#[derive(Debug, Default)]
pub struct PathIndex {
    /// Number of distinct documents registered.
    documents: usize,
    /// Candidate document paths per lookup key.
    keys: HashMap<String, Vec<String>>,
}

impl PathIndex {
    /// Walk each `root/<dir>` and index every document with `extension`.
    ///
    /// Missing directories are skipped. Entries are visited sorted by file
    /// name so candidate order does not depend on the filesystem.
    pub fn build(root: &Path, scan_dirs: &[&str], extension: &str) -> Self {
        let mut index = Self::default();

        for dir in scan_dirs {
            let base = root.join(dir);
            if !base.is_dir() {
                tracing::debug!(dir = %base.display(), "scan directory missing, skipping");
                continue;
            }

            for entry in WalkDir::new(&base)
                .sort_by_file_name()
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| return e.file_type().is_file())
                .filter(|e| return e.path().extension().is_some_and(|ext| return ext == extension))
            {
                if let Some(path) = document_path(root, entry.path()) {
                    index.insert(&path);
                }
            }
        }

        return index;
    }

    /// Candidate document paths registered under `key`.
    pub fn candidates(&self, key: &str) -> Option<&[String]> {
        return self.keys.get(key).map(Vec::as_slice);
    }

    /// Number of distinct documents in the index.
    pub const fn document_count(&self) -> usize {
        return self.documents;
    }

    /// Register one extension-less, slash-separated document path under its
    /// full path, its filename, and each of its suffixes.
    pub fn insert(&mut self, path: &str) {
        let segments: Vec<&str> = path.split('/').filter(|s| return !s.is_empty()).collect();
        let Some(filename) = segments.last() else {
            return;
        };
        let full = segments.join("/");
        if self.keys.get(&full).is_some_and(|c| return c.contains(&full)) {
            return;
        }

        self.documents = self.documents.saturating_add(1);
        self.register(&full, &full);
        self.register(filename, &full);
        for start in 1..segments.len() {
            if let Some(tail) = segments.get(start..) {
                self.register(&tail.join("/"), &full);
            }
        }
    }

    /// Whether no document has been indexed.
    pub const fn is_empty(&self) -> bool {
        return self.documents == 0;
    }

    /// Number of distinct lookup keys.
    pub fn key_count(&self) -> usize {
        return self.keys.len();
    }

    /// Append `path` to the candidates for `key` unless already present.
    fn register(&mut self, key: &str, path: &str) {
        let candidates = self.keys.entry(key.to_string()).or_default();
        if !candidates.iter().any(|c| return c == path) {
            candidates.push(path.to_string());
        }
    }
}

/// Root-relative path of a document, extension stripped, joined with `/`.
fn document_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?.with_extension("");
    let segments: Vec<String> = relative
        .components()
        .filter_map(|c| {
            return match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            };
        })
        .collect();

    if segments.is_empty() {
        return None;
    }
    return Some(segments.join("/"));
}
