//! Link-syntax-aware substitution of broken link targets in document text.

use std::collections::HashMap;
use std::io::Write as _;
use std::path::Path;

use regex::{Captures, Regex};

use crate::error::Error;
use crate::types::Replacement;

/// Result of rewriting one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutcome {
    /// Document text after substitution.
    pub content: String,
    /// Number of link occurrences rewritten.
    pub occurrences: usize,
    /// Unique `(old, new)` pairs applied, in first-seen order.
    pub replacements: Vec<Replacement>,
}

impl RewriteOutcome {
    /// Whether any occurrence was rewritten. Callers must not write the
    /// document back when this is false.
    pub const fn changed(&self) -> bool {
        return self.occurrences > 0;
    }

    /// Outcome for a document left as-is.
    fn unchanged(content: &str) -> Self {
        return Self {
            content: content.to_string(),
            occurrences: 0,
            replacements: Vec::new(),
        };
    }
}

/// Replace broken link targets inside `[text](target#fragment)` constructs.
///
/// Each `(old, new)` pair matches `old` literally as the whole target path;
/// any fragment that follows it in the document is kept. All pairs are
/// applied in one pass, so a new target never feeds another match. Pairs
/// whose replacement equals the original are ignored.
///
/// # Errors
///
/// Returns `Error::Pattern` if the combined pattern cannot be compiled.
pub fn rewrite(content: &str, pairs: &[(String, String)]) -> Result<RewriteOutcome, Error> {
    let targets: HashMap<&str, &str> = pairs
        .iter()
        .filter(|(old, new)| return !old.is_empty() && old != new)
        .map(|(old, new)| return (old.as_str(), new.as_str()))
        .collect();
    if targets.is_empty() {
        return Ok(RewriteOutcome::unchanged(content));
    }

    // Longest first, so a target never loses to one of its own prefixes.
    let mut literals: Vec<&str> = targets.keys().copied().collect();
    literals.sort_by(|a, b| return b.len().cmp(&a.len()).then_with(|| return a.cmp(b)));
    let alternation = literals.iter().map(|l| return regex::escape(l)).collect::<Vec<_>>().join("|");
    let pattern = Regex::new(&format!(r"(\[[^\]]+\]\()({alternation})(#[^)]*)?(\))"))?;

    let mut occurrences = 0_usize;
    let mut replacements: Vec<Replacement> = Vec::new();
    let rewritten = pattern.replace_all(content, |caps: &Captures<'_>| {
        let whole = caps.get(0).map_or("", |m| return m.as_str());
        let (Some(open), Some(old), Some(close)) = (caps.get(1), caps.get(2), caps.get(4)) else {
            return whole.to_string();
        };
        let Some(new) = targets.get(old.as_str()) else {
            return whole.to_string();
        };
        let fragment = caps.get(3).map_or("", |m| return m.as_str());

        occurrences = occurrences.saturating_add(1);
        if !replacements.iter().any(|r| return r.old == old.as_str()) {
            replacements.push(Replacement {
                new: (*new).to_string(),
                old: old.as_str().to_string(),
            });
        }
        return format!("{}{new}{fragment}{}", open.as_str(), close.as_str());
    });

    return Ok(RewriteOutcome {
        content: rewritten.into_owned(),
        occurrences,
        replacements,
    });
}

/// Replace a document's content in one step: write a temporary file next
/// to it, then rename over the original. The original permissions are kept.
///
/// # Errors
///
/// Returns `Error::Io` if the temporary file cannot be written or persisted.
pub fn write_document(path: &Path, content: &str) -> Result<(), Error> {
    let dir = path
        .parent()
        .filter(|p| return !p.as_os_str().is_empty())
        .unwrap_or_else(|| return Path::new("."));
    let permissions = std::fs::metadata(path).map(|m| return m.permissions()).ok();

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(content.as_bytes())?;
    temp.flush()?;
    if let Some(permissions) = permissions {
        std::fs::set_permissions(temp.path(), permissions)?;
    }
    temp.persist(path).map_err(|e| return Error::Io(e.error))?;
    return Ok(());
}
