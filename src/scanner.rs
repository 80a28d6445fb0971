//! Sweep of every document for links that still use the legacy section layout.

use std::path::{Component, Path};

use regex::Regex;
use walkdir::WalkDir;

use crate::checker::BrokenLinks;
use crate::config::Config;
use crate::error::Error;

/// Sweep every document under `root` for markdown links whose target still
/// carries a legacy section prefix (`/engineers/...`, `docs/analysts/...`).
/// Catches links the checker did not report, such as links in documents it
/// skipped. Unreadable documents are logged and skipped.
///
/// # Errors
///
/// Returns `Error::Pattern` if the link pattern cannot be compiled.
pub fn scan_legacy_links(root: &Path, config: &Config) -> Result<BrokenLinks, Error> {
    let pattern = Regex::new(r"\[[^\]]+\]\(([^)#\s]+)")?;
    let mut found = BrokenLinks::default();

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| return e.depth() == 0 || !is_hidden(e.file_name()))
        .filter_map(Result::ok)
        .filter(|e| return e.file_type().is_file())
        .filter(|e| return e.path().extension().is_some_and(|ext| return ext == config.doc_extension.as_str()))
    {
        let md_path = entry.path();
        let Some(document) = relative_document(root, md_path) else {
            continue;
        };

        let content = match std::fs::read_to_string(md_path) {
            Err(e) => {
                tracing::warn!(document = %document, error = %e, "skipping unreadable document");
                continue;
            },
            Ok(c) => c,
        };
        extract_legacy_links(&content, &document, &pattern, config, &mut found);
    }

    return Ok(found);
}

/// Record every legacy-prefixed link target in one document.
fn extract_legacy_links(
    content: &str,
    document: &str,
    pattern: &Regex,
    config: &Config,
    found: &mut BrokenLinks,
) {
    for cap in pattern.captures_iter(content) {
        let Some(target) = cap.get(1).map(|m| return m.as_str()) else {
            continue;
        };
        let unrooted = target.strip_prefix('/').unwrap_or(target);
        let names_legacy_section =
            config.legacy_section_of(unrooted).is_some_and(|(_, rest)| return !rest.is_empty());
        if names_legacy_section {
            found.add(document, target);
        }
    }
}

/// Whether a directory entry is hidden (`.git`, `.cache`, ...).
fn is_hidden(name: &std::ffi::OsStr) -> bool {
    return name.to_string_lossy().starts_with('.');
}

/// Root-relative document path with `/` separators, extension kept.
fn relative_document(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| {
            return match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            };
        })
        .collect();
    if parts.is_empty() {
        return None;
    }
    return Some(parts.join("/"));
}
