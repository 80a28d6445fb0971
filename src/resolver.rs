//! Broken-link resolution: normalize a stale link target and pick the
//! single best current document for it.

use std::collections::HashMap;

use crate::config::{Config, strip_segment_prefix};
use crate::index::PathIndex;
use crate::types::{MatchRule, NormalizedLink, Resolution};

/// Outcome of applying the tie-break to one candidate list.
enum Pick<'c> {
    /// A unique candidate, or the one inside the preferred section.
    Decisive(&'c str),
    /// Several candidates and none preferred; first in index order.
    Provisional(&'c str),
}

/// Memoized resolutions for one batch. Keyed by the normalized link, so
/// repeated or differently-spelled occurrences resolve identically.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    /// Resolution per normalized link; `None` records an unresolved link.
    entries: HashMap<NormalizedLink, Option<Resolution>>,
}

impl ResolutionCache {
    /// Number of distinct normalized links seen.
    pub fn len(&self) -> usize {
        return self.entries.len();
    }

    /// Resolve `raw` through the cache. Passthrough links are never cached.
    pub fn resolve(
        &mut self,
        resolver: &Resolver<'_>,
        raw: &str,
        caller_hint: Option<&str>,
    ) -> Option<Resolution> {
        if resolver.is_passthrough(raw) {
            return None;
        }
        let link = resolver.normalize(raw, caller_hint)?;
        if let Some(cached) = self.entries.get(&link) {
            return cached.clone();
        }
        let resolved = resolver.resolve_normalized(&link);
        self.entries.insert(link, resolved.clone());
        return resolved;
    }
}

/// Resolves link targets against a path index and the configured sections.
pub struct Resolver<'a> {
    /// Sections, suffix rules, and fallback tables.
    config: &'a Config,
    /// Documents that currently exist.
    index: &'a PathIndex,
}

impl<'a> Resolver<'a> {
    /// Consult the static fallback table for the link's section, or every
    /// section in order when none is known.
    fn fallback_target(&self, link: &NormalizedLink) -> Option<&'a str> {
        let config = self.config;
        return match link.section.as_deref() {
            None => config.sections.values().find_map(|s| return s.fallback.get(&link.path)).map(String::as_str),
            Some(section) => {
                let key = strip_segment_prefix(&link.path, section).unwrap_or(&link.path);
                config.fallback(section, key)
            },
        };
    }

    /// Images and external URLs. These are never resolved or rewritten.
    pub fn is_passthrough(&self, raw: &str) -> bool {
        let target = raw.trim();
        let lower = target.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return true;
        }

        let path = lower.split_once('#').map_or(lower.as_str(), |(p, _)| return p);
        let in_image_dir = path
            .split('/')
            .any(|segment| return self.config.image_dirs.iter().any(|d| return d.eq_ignore_ascii_case(segment)));
        let is_image = path.rsplit_once('.').is_some_and(|(_, ext)| {
            return self.config.image_extensions.iter().any(|e| return e.eq_ignore_ascii_case(ext));
        });

        return in_image_dir || is_image;
    }

    /// Create a resolver over an index and configuration.
    pub const fn new(index: &'a PathIndex, config: &'a Config) -> Self {
        return Self { config, index };
    }

    /// Run the normalization pipeline. Returns `None` when nothing is left
    /// of the path.
    ///
    /// `caller_hint` is the section of the referencing document; it is used
    /// for tie-breaking only when the link itself names no section, and then
    /// only decides between candidates of a single-segment key.
    pub fn normalize(&self, raw: &str, caller_hint: Option<&str>) -> Option<NormalizedLink> {
        let trimmed = raw.trim();
        let unrooted = trimmed.strip_prefix('/').unwrap_or(trimmed);
        let (mut path, fragment) = match unrooted.split_once('#') {
            None => (unrooted, None),
            Some((p, f)) => (p, Some(f.to_string())),
        };

        if let Some(stripped) =
            self.config.bad_suffixes.iter().find_map(|s| return path.strip_suffix(s.as_str()))
        {
            path = stripped;
        }
        if !self.config.legacy_extension.is_empty() {
            path = path.strip_suffix(self.config.legacy_extension.as_str()).unwrap_or(path);
        }
        path = path.trim_end_matches(['.', '/']);

        let (path, legacy_section) = match self.config.legacy_section_of(path) {
            None => (path, None),
            Some((section, rest)) => (rest, Some(section.to_string())),
        };
        if path.is_empty() {
            return None;
        }

        let first_segment = path.split_once('/').map(|(head, _)| return head);
        let named_section = legacy_section
            .or_else(|| return first_segment.filter(|s| return self.config.is_section(s)).map(str::to_string));
        let hint_from_caller = named_section.is_none() && caller_hint.is_some();
        let hint = named_section
            .or_else(|| return caller_hint.map(str::to_string))
            .or_else(|| return first_segment.map(str::to_string));
        let section = hint.clone().filter(|h| return self.config.is_section(h));

        return Some(NormalizedLink {
            fragment,
            hint,
            hint_from_caller,
            path: path.to_string(),
            section,
        });
    }

    /// Normalize and resolve a raw link target.
    pub fn resolve(&self, raw: &str, caller_hint: Option<&str>) -> Option<Resolution> {
        if self.is_passthrough(raw) {
            return None;
        }
        let link = self.normalize(raw, caller_hint)?;
        return self.resolve_normalized(&link);
    }

    /// Resolve an already-normalized link.
    ///
    /// Structural rules run first: filename, exact path, then path suffixes
    /// from longest to shortest. An ambiguous key without a preferred-section
    /// candidate only yields a provisional pick, which is used if no later
    /// rule finds a decisive one. Then the section's fallback table, then
    /// section-prefix synthesis.
    pub fn resolve_normalized(&self, link: &NormalizedLink) -> Option<Resolution> {
        let hint = link.hint.as_deref();
        let filename = link.path.rsplit_once('/').map_or(link.path.as_str(), |(_, name)| return name);

        let structural = [(MatchRule::Filename, filename.to_string()), (MatchRule::ExactPath, link.path.clone())]
            .into_iter()
            .chain(path_suffixes(&link.path).into_iter().map(|s| return (MatchRule::Suffix, s)));

        let mut provisional: Option<Resolution> = None;
        for (rule, key) in structural {
            let Some(candidates) = self.index.candidates(&key) else {
                continue;
            };
            let hint_decides = !link.hint_from_caller || key.contains('/');
            match pick_candidate(candidates, hint, hint_decides) {
                None => {},
                Some(Pick::Decisive(path)) => return Some(finish(path, rule, link)),
                Some(Pick::Provisional(path)) => {
                    if provisional.is_none() {
                        provisional = Some(finish(path, rule, link));
                    }
                },
            }
        }
        if provisional.is_some() {
            return provisional;
        }

        if let Some(target) = self.fallback_target(link) {
            return Some(finish(target, MatchRule::Fallback, link));
        }

        let section = link.section.as_deref()?;
        let remainder = strip_segment_prefix(&link.path, section).unwrap_or(&link.path);
        let synthesized = if remainder.is_empty() || link.path == section {
            section.to_string()
        } else {
            format!("{section}/{remainder}")
        };
        return Some(finish(&synthesized, MatchRule::Synthesized, link));
    }
}

/// Build the final absolute target, re-attaching the fragment.
fn finish(path: &str, rule: MatchRule, link: &NormalizedLink) -> Resolution {
    let path = path.trim_start_matches('/');
    let target = match &link.fragment {
        None => format!("/{path}"),
        Some(fragment) => format!("/{path}#{fragment}"),
    };
    return Resolution { rule, target };
}

/// Whether `path` lies inside the directory named by `prefix`.
fn in_section(path: &str, prefix: &str) -> bool {
    return path == prefix || strip_segment_prefix(path, prefix).is_some();
}

/// Trailing suffixes of `path`, longest first, down to a single segment.
fn path_suffixes(path: &str) -> Vec<String> {
    let segments: Vec<&str> = path.split('/').filter(|s| return !s.is_empty()).collect();
    return (0..segments.len())
        .filter_map(|start| return segments.get(start..).map(|tail| return tail.join("/")))
        .collect();
}

/// Apply the tie-break: unique candidate, else first in the preferred
/// section, else first in index order. When `hint_decides` is false the
/// preferred candidate is only provisional.
fn pick_candidate<'c>(candidates: &'c [String], hint: Option<&str>, hint_decides: bool) -> Option<Pick<'c>> {
    return match candidates {
        [] => None,
        [only] => Some(Pick::Decisive(only.as_str())),
        [first, ..] => {
            let preferred = hint.and_then(|h| return candidates.iter().find(|c| return in_section(c, h)));
            Some(match preferred {
                None => Pick::Provisional(first.as_str()),
                Some(c) if hint_decides => Pick::Decisive(c.as_str()),
                Some(c) => Pick::Provisional(c.as_str()),
            })
        },
    };
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;

    fn index_of(paths: &[&str]) -> PathIndex {
        let mut index = PathIndex::default();
        for path in paths {
            index.insert(path);
        }
        index
    }

    fn target(resolution: Option<Resolution>) -> Option<String> {
        resolution.map(|r| r.target)
    }

    #[test]
    fn tie_break_prefers_hinted_section() {
        let config = Config::builtin().unwrap();
        let index = index_of(&["data-analytics/y/csv", "data-engineering/x/csv"]);
        let resolver = Resolver::new(&index, &config);

        let resolved = resolver.resolve("csv", Some("data-engineering")).unwrap();
        assert_eq!(resolved.target, "/data-engineering/x/csv");
        assert_eq!(resolved.rule, MatchRule::Filename);

        assert_eq!(target(resolver.resolve("/engineers/csv", None)), Some("/data-engineering/x/csv".into()));
        assert_eq!(target(resolver.resolve("/analysts/csv", None)), Some("/data-analytics/y/csv".into()));
    }

    #[test]
    fn ambiguous_without_hint_takes_first_in_index_order() {
        let config = Config::builtin().unwrap();
        let index = index_of(&["data-analytics/y/csv", "data-engineering/x/csv"]);
        let resolver = Resolver::new(&index, &config);

        let resolved = resolver.resolve("csv", None).unwrap();
        assert_eq!(resolved.target, "/data-analytics/y/csv");
        assert_eq!(resolved.rule, MatchRule::Filename);
    }

    #[test]
    fn suffix_disambiguates_shared_filename() {
        let config = Config::builtin().unwrap();
        let index = index_of(&["data-analytics/gems/prepare/filter", "data-engineering/gems/transform/filter"]);
        let resolver = Resolver::new(&index, &config);

        let resolved = resolver.resolve("transform/filter", None).unwrap();
        assert_eq!(resolved.target, "/data-engineering/gems/transform/filter");

        let resolved = resolver.resolve("old/layout/transform/filter", None).unwrap();
        assert_eq!(resolved.target, "/data-engineering/gems/transform/filter");
        assert_eq!(resolved.rule, MatchRule::Suffix);
    }

    #[test]
    fn document_section_does_not_outrank_a_longer_path_match() {
        let config = Config::builtin().unwrap();
        let index = index_of(&["data-analytics/gems/prepare/filter", "data-engineering/gems/transform/filter"]);
        let resolver = Resolver::new(&index, &config);

        for raw in ["transform/filter", "/gems/transform/filter", "old/transform/filter.md"] {
            let resolved = resolver.resolve(raw, Some("data-analytics")).unwrap();
            assert_eq!(resolved.target, "/data-engineering/gems/transform/filter", "{raw}");
        }
        assert_eq!(
            target(resolver.resolve("filter", Some("data-analytics"))),
            Some("/data-analytics/gems/prepare/filter".into())
        );
        assert_eq!(
            target(resolver.resolve("filter", Some("data-engineering"))),
            Some("/data-engineering/gems/transform/filter".into())
        );
    }

    #[test]
    fn suffix_recovers_when_filename_misses() {
        let config = Config::builtin().unwrap();
        let index = index_of(&["data-engineering/gems/transform/filter"]);
        let resolver = Resolver::new(&index, &config);

        let resolved = resolver.resolve("/transform/filter/", None).unwrap();
        assert_eq!(resolved.target, "/data-engineering/gems/transform/filter");
    }

    #[test]
    fn malformed_extension_is_stripped() {
        let config = Config::builtin().unwrap();
        let index = index_of(&["data-engineering/x/bar"]);
        let resolver = Resolver::new(&index, &config);

        let link = resolver.normalize("/foo/bar.mdengineers", None).unwrap();
        assert_eq!(link.path, "foo/bar");
        assert_eq!(target(resolver.resolve("/foo/bar.mdengineers", None)), Some("/data-engineering/x/bar".into()));
        assert_eq!(target(resolver.resolve("foo/bar.mdanalysts", None)), Some("/data-engineering/x/bar".into()));
        assert_eq!(target(resolver.resolve("foo/bar.md", None)), Some("/data-engineering/x/bar".into()));
    }

    #[test]
    fn fragment_is_preserved() {
        let config = Config::builtin().unwrap();
        let index = index_of(&["data-engineering/gems/source-target/file/csv"]);
        let resolver = Resolver::new(&index, &config);

        let resolved = resolver.resolve("/engineers/csv.md#write-options", None).unwrap();
        assert_eq!(resolved.target, "/data-engineering/gems/source-target/file/csv#write-options");

        let unknown = resolver.resolve("/engineers/nowhere#section", None).unwrap();
        assert!(unknown.target.ends_with("#section"));
    }

    #[test]
    fn images_and_urls_pass_through() {
        let config = Config::builtin().unwrap();
        let index = index_of(&["data-engineering/img/diagram", "data-engineering/a"]);
        let resolver = Resolver::new(&index, &config);

        for raw in ["https://example.com/a.png", "img/diagram.svg", "./img/a", "/data/img/chart", "HTTP://x/a", "photo.JPG"] {
            assert!(resolver.is_passthrough(raw), "{raw} should pass through");
            assert_eq!(resolver.resolve(raw, Some("data-engineering")), None);
        }
        assert!(!resolver.is_passthrough("/engineers/images-overview"));
    }

    #[test]
    fn legacy_prefix_under_docs_root() {
        let config = Config::builtin().unwrap();
        let index = index_of(&["data-analytics/gems/prepare/filter", "data-engineering/gems/transform/filter"]);
        let resolver = Resolver::new(&index, &config);

        let link = resolver.normalize("docs/analysts/filter", None).unwrap();
        assert_eq!(link.path, "filter");
        assert_eq!(link.section.as_deref(), Some("data-analytics"));
        assert_eq!(target(resolver.resolve("docs/analysts/filter", None)), Some("/data-analytics/gems/prepare/filter".into()));
    }

    #[test]
    fn fallback_table_covers_irregular_renames() {
        let config = Config::builtin().unwrap();
        let index = index_of(&["data-engineering/ci-cd/git/git-resolve"]);
        let resolver = Resolver::new(&index, &config);

        let resolved = resolver.resolve("/engineers/resolve-git-conflicts", None).unwrap();
        assert_eq!(resolved.target, "/data-engineering/ci-cd/git/git-resolve");
        assert_eq!(resolved.rule, MatchRule::Fallback);

        let resolved = resolver.resolve("/analysts/project-editor#tabs", None).unwrap();
        assert_eq!(resolved.target, "/data-analytics/development/studio/studio#tabs");
    }

    #[test]
    fn prefix_synthesis_needs_a_section() {
        let config = Config::builtin().unwrap();
        let index = PathIndex::default();
        let resolver = Resolver::new(&index, &config);

        let resolved = resolver.resolve("/engineers/brand/new/page", None).unwrap();
        assert_eq!(resolved.target, "/data-engineering/brand/new/page");
        assert_eq!(resolved.rule, MatchRule::Synthesized);

        let resolved = resolver.resolve("/data-analytics/moved/page", None).unwrap();
        assert_eq!(resolved.target, "/data-analytics/moved/page");

        assert_eq!(resolver.resolve("unknown-page", None), None);
        assert_eq!(
            target(resolver.resolve("unknown-page", Some("data-analytics"))),
            Some("/data-analytics/unknown-page".into())
        );
    }

    #[test]
    fn empty_paths_are_unresolved() {
        let config = Config::builtin().unwrap();
        let index = index_of(&["data-engineering/a"]);
        let resolver = Resolver::new(&index, &config);

        for raw in ["", "/", "#only-fragment", "./", "/engineers/", ".md"] {
            assert_eq!(resolver.resolve(raw, Some("data-engineering")), None, "{raw:?}");
        }
    }

    #[test]
    fn cache_returns_same_resolution_for_equivalent_spellings() {
        let config = Config::builtin().unwrap();
        let index = index_of(&["data-engineering/x/csv"]);
        let resolver = Resolver::new(&index, &config);
        let mut cache = ResolutionCache::default();

        let first = cache.resolve(&resolver, "/engineers/csv.md", None);
        let second = cache.resolve(&resolver, "engineers/csv", None);
        let third = cache.resolve(&resolver, "/engineers/csv.mdengineers", None);
        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(cache.len(), 1);

        assert_eq!(cache.resolve(&resolver, "img/a.png", None), None);
        assert_eq!(cache.len(), 1);
    }
}
