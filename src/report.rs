//! Machine-readable summary of one repair batch.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::checker::BrokenLinks;
use crate::error::Error;

/// One `(old, new)` substitution in one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplacementRecord {
    /// Document path as reported by the checker.
    pub document: String,
    /// Replacement target.
    pub new: String,
    /// Broken target as it was written.
    pub old: String,
}

/// Full record of a batch: what was broken, what was rewritten, what is left.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    /// Broken links per document before any rewrite.
    pub broken_before: BrokenLinks,
    /// Every broken link that resolved, and its replacement in the first
    /// document that contained it. The same link may resolve differently in
    /// a document of another section; `replacements` records each target.
    pub mappings: BTreeMap<String, String>,
    /// Broken links per document after the rewrite.
    pub remaining_broken: BrokenLinks,
    /// Substitutions applied, one per document and link.
    pub replacements: Vec<ReplacementRecord>,
    /// Counters.
    pub summary: Summary,
    /// Broken links that could not be resolved, sorted.
    pub unmapped: Vec<String>,
}

/// Batch counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Documents whose content changed on disk (or would, in a dry run).
    pub documents_updated: usize,
    /// Distinct broken links that resolved.
    pub mappings_created: usize,
    /// Broken links still reported after the rewrite.
    pub remaining_broken: usize,
    /// `(document, old, new)` substitutions applied.
    pub total_replacements: usize,
    /// Distinct broken links with no resolution.
    pub unmapped: usize,
}

impl Report {
    /// Recompute the summary counters from the collected details.
    pub fn finalize(&mut self) {
        self.unmapped.sort_unstable();
        self.unmapped.dedup();
        self.summary.mappings_created = self.mappings.len();
        self.summary.remaining_broken = self.remaining_broken.link_count();
        self.summary.total_replacements = self.replacements.len();
        self.summary.unmapped = self.unmapped.len();
    }

    /// Print the counters to stderr.
    pub fn print_summary(&self) {
        let s = &self.summary;
        eprintln!("## Summary\n");
        eprintln!("- documents updated: {}", s.documents_updated);
        eprintln!("- replacements: {}", s.total_replacements);
        eprintln!("- mappings created: {}", s.mappings_created);
        eprintln!("- unmapped: {}", s.unmapped);
        eprintln!("- remaining broken: {}", s.remaining_broken);

        if !self.unmapped.is_empty() {
            eprintln!("\n## Unmapped\n");
            for link in &self.unmapped {
                eprintln!("- `{link}`");
            }
        }
        eprintln!();
        return;
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if serialization fails.
    pub fn to_json(&self) -> Result<String, Error> {
        return Ok(serde_json::to_string_pretty(self)?);
    }

    /// Write the report as pretty-printed JSON with a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if serialization fails, or `Error::Io` if the
    /// file cannot be written.
    pub fn write(&self, path: &Path) -> Result<(), Error> {
        let mut json = self.to_json()?;
        json.push('\n');
        std::fs::write(path, json)?;
        return Ok(());
    }
}
