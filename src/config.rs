//! Project configuration: `.linkfix.toml` layered over the built-in defaults.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::Error;

/// File name of the project configuration, relative to the documentation root.
pub const CONFIG_FILE: &str = ".linkfix.toml";

/// Built-in configuration, including the per-section fallback tables.
const DEFAULTS: &str = include_str!("../defaults/linkfix.toml");

/// How to invoke the external link checker and read its report.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckerConfig {
    /// Arguments passed to the checker program.
    pub args: Vec<String>,
    /// Glyph that marks a broken-link line in the report.
    pub bullet: String,
    /// Trailing text that marks a document line in the report.
    pub file_marker: String,
    /// Checker executable, looked up on `PATH`.
    pub program: String,
}

/// Resolved configuration for one documentation tree.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Corrupted extensions left behind by an earlier migration.
    pub bad_suffixes: Vec<String>,
    /// External link checker settings.
    pub checker: CheckerConfig,
    /// Extension of documents in the tree, without the dot.
    pub doc_extension: String,
    /// Directory names whose links are images and never rewritten.
    pub image_dirs: Vec<String>,
    /// Image file extensions, without the dot.
    pub image_extensions: Vec<String>,
    /// Pre-migration document extension, with the dot.
    pub legacy_extension: String,
    /// Optional leading segments that may precede a legacy section name.
    pub legacy_roots: Vec<String>,
    /// Default report file, relative to the documentation root.
    pub report: String,
    /// Directories to index. Empty means every section root.
    #[serde(default)]
    pub scan_dirs: Vec<String>,
    /// Sections keyed by their root directory name.
    pub sections: BTreeMap<String, SectionConfig>,
}

/// One top-level content section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SectionConfig {
    /// Legacy short name to current document path, for irregular renames.
    #[serde(default)]
    pub fallback: BTreeMap<String, String>,
    /// Legacy URL prefixes that referred to this section.
    #[serde(default)]
    pub legacy: Vec<String>,
}

impl Config {
    /// The built-in configuration, used when the project has no config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the embedded defaults are malformed.
    pub fn builtin() -> Result<Self, Error> {
        return Ok(toml::from_str(DEFAULTS)?);
    }

    /// Look up a section's fallback target for a legacy short name.
    pub fn fallback(&self, section: &str, name: &str) -> Option<&str> {
        return self
            .sections
            .get(section)
            .and_then(|s| return s.fallback.get(name))
            .map(String::as_str);
    }

    /// Parse a project config and layer it over the defaults.
    ///
    /// Tables merge key by key, so a project can add one fallback entry
    /// without restating the rest. Setting `inherit_defaults = false`
    /// makes the file self-contained.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the content is not valid TOML or a
    /// required key is missing.
    pub fn from_toml_str(content: &str) -> Result<Self, Error> {
        let overrides: toml::Table = toml::from_str(content)?;
        let inherit = overrides
            .get("inherit_defaults")
            .and_then(toml::Value::as_bool)
            .unwrap_or(true);

        if !inherit {
            return Ok(toml::Value::Table(overrides).try_into()?);
        }

        let mut merged: toml::Table = toml::from_str(DEFAULTS)?;
        merge_tables(&mut merged, overrides);
        return Ok(toml::Value::Table(merged).try_into()?);
    }

    /// Whether `name` is a configured section root.
    pub fn is_section(&self, name: &str) -> bool {
        return self.sections.contains_key(name);
    }

    /// Split a legacy section prefix (`engineers/...`, optionally under a
    /// legacy root such as `docs/`) off a path with no leading slash.
    /// Returns the section name and the remainder of the path.
    pub fn legacy_section_of<'p>(&self, path: &'p str) -> Option<(&str, &'p str)> {
        let unrooted = self
            .legacy_roots
            .iter()
            .find_map(|root| return strip_segment_prefix(path, root))
            .unwrap_or(path);

        for (name, section) in &self.sections {
            for legacy in &section.legacy {
                if unrooted == legacy.as_str() {
                    return Some((name.as_str(), ""));
                }
                if let Some(rest) = strip_segment_prefix(unrooted, legacy) {
                    return Some((name.as_str(), rest));
                }
            }
        }
        return None;
    }

    /// Load config from `.linkfix.toml` in the given root directory.
    /// Returns the built-in defaults if the file doesn't exist.
    /// Returns an error if the file exists but is malformed; never silently
    /// falls back to defaults when the user wrote a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::builtin(),
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        return Self::from_toml_str(&content);
    }

    /// Directories the path index should cover.
    pub fn scan_dirs(&self) -> Vec<&str> {
        if self.scan_dirs.is_empty() {
            return self.sections.keys().map(String::as_str).collect();
        }
        return self.scan_dirs.iter().map(String::as_str).collect();
    }

    /// The section a document belongs to, judged by its first path segment.
    pub fn section_of_document(&self, document: &str) -> Option<&str> {
        let trimmed = document.trim_start_matches('/');
        let first = trimmed.split('/').next().unwrap_or(trimmed);
        return self.sections.get_key_value(first).map(|(name, _)| return name.as_str());
    }
}

/// Remove `prefix/` from the front of `path`, matching whole segments only.
pub fn strip_segment_prefix<'p>(path: &'p str, prefix: &str) -> Option<&'p str> {
    if prefix.is_empty() {
        return None;
    }
    return path.strip_prefix(prefix)?.strip_prefix('/');
}

/// Recursively overlay `overrides` onto `base`. Tables merge; other values replace.
fn merge_tables(base: &mut toml::Table, overrides: toml::Table) {
    for (key, value) in overrides {
        match value {
            toml::Value::Table(incoming) => {
                if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                    merge_tables(existing, incoming);
                    continue;
                }
                base.insert(key, toml::Value::Table(incoming));
            },
            other => {
                base.insert(key, other);
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;

    #[test]
    fn builtin_defaults_carry_both_sections() {
        let config = Config::builtin().unwrap();
        assert!(config.is_section("data-engineering"));
        assert!(config.is_section("data-analytics"));
        assert_eq!(config.checker.program, "mint");
        assert_eq!(config.checker.bullet, "⎿");
        assert_eq!(
            config.fallback("data-engineering", "csv"),
            Some("data-engineering/gems/source-target/file/csv")
        );
        assert_eq!(
            config.fallback("data-analytics", "csv"),
            Some("data-analytics/gems/source-target/file/file-types/csv")
        );
    }

    #[test]
    fn project_file_overrides_single_keys() {
        let config = Config::from_toml_str(
            r#"
doc_extension = "md"

[checker]
program = "cat"
args = ["report.txt"]

[sections.data-engineering.fallback]
legacy-page = "data-engineering/new/page"
"#,
        )
        .unwrap();

        assert_eq!(config.doc_extension, "md");
        assert_eq!(config.checker.program, "cat");
        assert_eq!(config.checker.file_marker, ".mdx");
        assert_eq!(config.fallback("data-engineering", "legacy-page"), Some("data-engineering/new/page"));
        assert!(config.fallback("data-engineering", "dependencies").is_some());
        assert_eq!(config.sections.get("data-engineering").unwrap().legacy, vec!["engineers"]);
    }

    #[test]
    fn self_contained_file_skips_defaults() {
        let config = Config::from_toml_str(
            r#"
inherit_defaults = false
doc_extension = "md"
report = "out.json"
bad_suffixes = []
legacy_extension = ".md"
legacy_roots = []
image_dirs = []
image_extensions = []

[checker]
program = "lychee"
args = []
file_marker = ".md"
bullet = "*"

[sections.guides]
legacy = ["old-guides"]
"#,
        )
        .unwrap();

        assert_eq!(config.scan_dirs(), vec!["guides"]);
        assert!(!config.is_section("data-engineering"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(Config::from_toml_str("doc_extension = [").is_err());
    }

    #[test]
    fn legacy_prefix_with_and_without_docs_root() {
        let config = Config::builtin().unwrap();
        assert_eq!(
            config.legacy_section_of("engineers/gems/filter"),
            Some(("data-engineering", "gems/filter"))
        );
        assert_eq!(
            config.legacy_section_of("docs/analysts/csv"),
            Some(("data-analytics", "csv"))
        );
        assert_eq!(config.legacy_section_of("docs/other/csv"), None);
        assert_eq!(config.legacy_section_of("engineersx/csv"), None);
        assert_eq!(config.legacy_section_of("docs/engineers"), Some(("data-engineering", "")));
    }

    #[test]
    fn document_section_uses_first_segment() {
        let config = Config::builtin().unwrap();
        assert_eq!(config.section_of_document("data-analytics/guide.mdx"), Some("data-analytics"));
        assert_eq!(config.section_of_document("/data-engineering/a/b.mdx"), Some("data-engineering"));
        assert_eq!(config.section_of_document("index.mdx"), None);
    }

    #[test]
    fn missing_file_loads_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.report, "link_fix_report.json");
        assert_eq!(config.scan_dirs(), vec!["data-analytics", "data-engineering"]);
    }
}
