//! External link checker: invocation and report parsing.
//!
//! The checker prints a human-readable report. Its grammar:
//!
//! - a *document line* ends with the file marker (`.mdx`) and does not start
//!   with the bullet glyph; it names the document the following links belong to;
//! - a *link line* contains the bullet glyph (`⎿`); the text after the glyph
//!   is one broken link target;
//! - every other line is noise.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;

use regex::Regex;
use serde::Serialize;

use crate::config::{CheckerConfig, Config};
use crate::error::Error;

/// Broken link targets per document, as reported by the checker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BrokenLinks {
    /// Document path to broken link targets, in report order.
    documents: BTreeMap<String, Vec<String>>,
}

/// One classified line of checker output.
enum ReportLine<'l> {
    /// Names the document subsequent links belong to.
    Document(&'l str),
    /// One broken link target.
    Link(&'l str),
    /// Anything else.
    Other,
}

impl BrokenLinks {
    /// Record a broken link for a document, ignoring duplicates.
    pub fn add(&mut self, document: &str, link: &str) {
        let links = self.documents.entry(document.to_string()).or_default();
        if !links.iter().any(|l| return l == link) {
            links.push(link.to_string());
        }
    }

    /// Number of documents with at least one broken link.
    pub fn document_count(&self) -> usize {
        return self.documents.len();
    }

    /// Iterate documents and their broken links, ordered by document path.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        return self.documents.iter().map(|(doc, links)| return (doc.as_str(), links.as_slice()));
    }

    /// Whether no broken link was reported.
    pub fn is_empty(&self) -> bool {
        return self.documents.is_empty();
    }

    /// Keep only links that still carry a legacy section prefix.
    pub fn legacy_only(&self, config: &Config) -> Self {
        let mut kept = Self::default();
        for (document, links) in self.iter() {
            for link in links {
                if has_legacy_prefix(link, config) {
                    kept.add(document, link);
                }
            }
        }
        return kept;
    }

    /// Total number of broken links across documents.
    pub fn link_count(&self) -> usize {
        return self.documents.values().map(Vec::len).sum();
    }

    /// Merge another report into this one.
    pub fn merge(&mut self, other: &Self) {
        for (document, links) in other.iter() {
            for link in links {
                self.add(document, link);
            }
        }
    }

    /// Distinct broken link targets across all documents, sorted.
    pub fn unique_links(&self) -> Vec<&str> {
        let mut links: Vec<&str> = self.documents.values().flatten().map(String::as_str).collect();
        links.sort_unstable();
        links.dedup();
        return links;
    }
}

/// Classify one line of checker output.
fn classify_line<'l>(line: &'l str, checker: &CheckerConfig) -> ReportLine<'l> {
    let trimmed = line.trim();
    let bullet = checker.bullet.as_str();

    if !checker.file_marker.is_empty()
        && trimmed.ends_with(checker.file_marker.as_str())
        && (bullet.is_empty() || !trimmed.starts_with(bullet))
    {
        return ReportLine::Document(trimmed);
    }

    if !bullet.is_empty()
        && let Some((_, rest)) = line.split_once(bullet)
    {
        let link = rest.trim();
        if !link.is_empty() {
            return ReportLine::Link(link);
        }
    }

    return ReportLine::Other;
}

/// Whether a link names a legacy section: `/engineers/...`, `docs/analysts/...`.
fn has_legacy_prefix(link: &str, config: &Config) -> bool {
    let unrooted = link.trim().trim_start_matches('/');
    let path = unrooted.split_once('#').map_or(unrooted, |(p, _)| return p);
    return config.legacy_section_of(path).is_some_and(|(_, rest)| return !rest.is_empty());
}

/// Parse checker output into broken links per document.
///
/// Link lines seen before any document line are dropped. ANSI escape
/// sequences are removed before classification.
///
/// # Errors
///
/// Returns `Error::Pattern` if the escape-sequence pattern cannot be compiled.
pub fn parse_report(output: &str, checker: &CheckerConfig) -> Result<BrokenLinks, Error> {
    let escape = Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]")?;
    let mut report = BrokenLinks::default();
    let mut current: Option<String> = None;

    for raw in output.lines() {
        let line = escape.replace_all(raw, "");
        match classify_line(&line, checker) {
            ReportLine::Document(document) => current = Some(document.to_string()),
            ReportLine::Link(link) => {
                if let Some(document) = &current {
                    report.add(document, link);
                }
            },
            ReportLine::Other => {},
        }
    }

    return Ok(report);
}

/// Run the checker in `root` and return its stdout followed by its stderr.
///
/// A non-zero exit status is expected when links are broken and is not an
/// error.
///
/// # Errors
///
/// Returns `Error::CheckerNotFound` if the program is not installed, or
/// `Error::CheckerFailed` if it cannot be started for another reason.
pub fn run_checker(root: &Path, checker: &CheckerConfig) -> Result<String, Error> {
    tracing::info!(program = %checker.program, args = ?checker.args, "running link checker");

    let output = Command::new(&checker.program)
        .args(&checker.args)
        .current_dir(root)
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Error::CheckerNotFound {
                    program: checker.program.clone(),
                };
            }
            return Error::CheckerFailed {
                program: checker.program.clone(),
                reason: e.to_string(),
            };
        })?;

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    tracing::debug!(status = %output.status, bytes = text.len(), "link checker finished");

    return Ok(text);
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Checking for broken links...

found 4 broken links in 2 files

data-analytics/guide.mdx
  ⎿ /engineers/csv.mdengineers
  ⎿ img/diagram.svg
  ⎿ /engineers/csv.mdengineers

data-engineering/gems/overview.mdx
  ⎿  /analysts/filter#options
";

    fn checker() -> CheckerConfig {
        Config::builtin().unwrap().checker
    }

    #[test]
    fn parses_documents_and_bulleted_links() {
        let report = parse_report(SAMPLE, &checker()).unwrap();

        let docs: Vec<(&str, &[String])> = report.iter().collect();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].0, "data-analytics/guide.mdx");
        assert_eq!(docs[0].1, ["/engineers/csv.mdengineers", "img/diagram.svg"]);
        assert_eq!(docs[1].0, "data-engineering/gems/overview.mdx");
        assert_eq!(docs[1].1, ["/analysts/filter#options"]);
        assert_eq!(report.link_count(), 3);
    }

    #[test]
    fn links_before_any_document_are_dropped() {
        let report = parse_report("  ⎿ /engineers/orphan\nnotes.mdx\n  ⎿ /engineers/kept\n", &checker()).unwrap();
        assert_eq!(report.unique_links(), vec!["/engineers/kept"]);
    }

    #[test]
    fn bullet_line_ending_in_marker_is_a_link() {
        let report = parse_report("a.mdx\n  ⎿ /engineers/b.mdx\n", &checker()).unwrap();
        let docs: Vec<(&str, &[String])> = report.iter().collect();
        assert_eq!(docs, vec![("a.mdx", &["/engineers/b.mdx".to_string()][..])]);
    }

    #[test]
    fn colour_codes_are_ignored() {
        let output = "\u{1b}[1mdata-analytics/a.mdx\u{1b}[0m\n  \u{1b}[31m⎿\u{1b}[0m /analysts/x\n";
        let report = parse_report(output, &checker()).unwrap();
        let docs: Vec<(&str, &[String])> = report.iter().collect();
        assert_eq!(docs, vec![("data-analytics/a.mdx", &["/analysts/x".to_string()][..])]);
    }

    #[test]
    fn extended_colour_and_cursor_codes_are_ignored() {
        let output = "\u{1b}[38;5;208mdata-analytics/b.mdx\u{1b}[0m\u{1b}[?25l\n  \u{1b}[1;31m⎿\u{1b}[0m /analysts/y\u{1b}[K\n";
        let report = parse_report(output, &checker()).unwrap();
        let docs: Vec<(&str, &[String])> = report.iter().collect();
        assert_eq!(docs, vec![("data-analytics/b.mdx", &["/analysts/y".to_string()][..])]);
    }

    #[test]
    fn empty_and_noise_output_yields_nothing() {
        assert!(parse_report("", &checker()).unwrap().is_empty());
        assert!(parse_report("success, no broken links found\n", &checker()).unwrap().is_empty());
    }

    #[test]
    fn legacy_filter_keeps_section_prefixed_links() {
        let config = Config::builtin().unwrap();
        let mut report = BrokenLinks::default();
        report.add("a.mdx", "/engineers/csv");
        report.add("a.mdx", "docs/analysts/filter#x");
        report.add("a.mdx", "/data-engineering/missing");
        report.add("b.mdx", "img/x.png");

        let legacy = report.legacy_only(&config);
        assert_eq!(legacy.unique_links(), vec!["/engineers/csv", "docs/analysts/filter#x"]);
        assert_eq!(legacy.document_count(), 1);
    }

    #[test]
    fn missing_program_is_reported_as_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = checker();
        config.program = "linkfix-test-no-such-checker".to_string();
        let err = run_checker(dir.path(), &config).unwrap_err();
        assert!(matches!(err, Error::CheckerNotFound { .. }), "{err}");
    }
}
