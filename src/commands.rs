//! Core CLI commands for linkfix: check, fix, migrate, resolve.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::checker::{self, BrokenLinks};
use crate::config::Config;
use crate::error::Error;
use crate::index::PathIndex;
use crate::report::{ReplacementRecord, Report};
use crate::resolver::{ResolutionCache, Resolver};
use crate::rewriter;
use crate::scanner;

/// Options shared by the repair commands.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Compute and print everything, write nothing.
    pub dry_run: bool,
    /// Report destination; the configured default when unset.
    pub report: Option<PathBuf>,
}

/// Which broken links a batch works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// Every link the checker reports.
    All,
    /// Only links that still carry a legacy section prefix, from the checker
    /// report and from a sweep of every document.
    Legacy,
}

/// Run the checker and print its broken links per document.
/// Exits 0 when nothing is broken, 1 otherwise.
///
/// # Errors
///
/// Returns errors from config loading or from running the checker.
pub fn check(root: &Path) -> Result<ExitCode, Error> {
    let config = Config::load(root)?;
    let output = checker::run_checker(root, &config.checker)?;
    let broken = checker::parse_report(&output, &config.checker)?;

    if broken.is_empty() {
        println!("No broken links");
        return Ok(ExitCode::SUCCESS);
    }

    for (document, links) in broken.iter() {
        println!("{document}");
        for link in links {
            println!("  {link}");
        }
    }
    println!();
    println!("{} broken links in {} documents", broken.link_count(), broken.document_count());
    return Ok(ExitCode::from(1));
}

/// Gather the broken links a batch will work on.
///
/// # Errors
///
/// Returns errors from running the checker or compiling the sweep pattern.
fn collect_broken(root: &Path, config: &Config, scope: Scope) -> Result<BrokenLinks, Error> {
    let output = checker::run_checker(root, &config.checker)?;
    let reported = checker::parse_report(&output, &config.checker)?;

    return match scope {
        Scope::All => Ok(reported),
        Scope::Legacy => {
            let mut legacy = reported.legacy_only(config);
            legacy.merge(&scanner::scan_legacy_links(root, config)?);
            Ok(legacy)
        },
    };
}

/// Repair every broken link the checker reports.
///
/// # Errors
///
/// Returns errors from config loading, the checker, or report writing.
pub fn fix(root: &Path, options: &BatchOptions) -> Result<ExitCode, Error> {
    return run_batch(root, Scope::All, options);
}

/// Rewrite links that still use the legacy section layout.
///
/// # Errors
///
/// Returns errors from config loading, the checker, or report writing.
pub fn migrate(root: &Path, options: &BatchOptions) -> Result<ExitCode, Error> {
    return run_batch(root, Scope::Legacy, options);
}

/// Links of `broken` that received no mapping. Stands in for a checker
/// re-run when nothing was written.
fn predicted_remaining(broken: &BrokenLinks, report: &Report) -> BrokenLinks {
    let mut remaining = BrokenLinks::default();
    for (document, links) in broken.iter() {
        for link in links {
            if !report.mappings.contains_key(link.as_str()) {
                remaining.add(document, link);
            }
        }
    }
    return remaining;
}

/// Print how one link resolves, and which rule decided it.
///
/// # Errors
///
/// Returns `Error::UnknownSection` if `section` is not configured, or errors
/// from config loading.
pub fn resolve(root: &Path, link: &str, section: Option<&str>) -> Result<(), Error> {
    let config = Config::load(root)?;
    if let Some(name) = section
        && !config.is_section(name)
    {
        return Err(Error::UnknownSection {
            name: name.to_string(),
        });
    }

    let index = PathIndex::build(root, &config.scan_dirs(), &config.doc_extension);
    let resolver = Resolver::new(&index, &config);

    if resolver.is_passthrough(link) {
        println!("{link}  passthrough");
        return Ok(());
    }
    match resolver.resolve(link, section) {
        None => println!("{link}  unresolved"),
        Some(resolution) => println!("{link} -> {}  ({})", resolution.target, resolution.rule),
    }
    return Ok(());
}

/// Resolve one document's broken links into `(old, new)` pairs, recording
/// mappings and unmapped links in the report.
fn resolve_document(
    document: &str,
    links: &[String],
    config: &Config,
    resolver: &Resolver<'_>,
    cache: &mut ResolutionCache,
    report: &mut Report,
) -> Vec<(String, String)> {
    let hint = config.section_of_document(document);
    let mut pairs = Vec::new();

    for link in links {
        if resolver.is_passthrough(link) {
            tracing::debug!(document, link = %link, "passthrough");
            continue;
        }
        let Some(resolution) = cache.resolve(resolver, link, hint) else {
            report.unmapped.push(link.clone());
            continue;
        };
        if resolution.target == link.trim() {
            report.unmapped.push(link.clone());
            continue;
        }

        tracing::debug!(document, link = %link, target = %resolution.target, rule = %resolution.rule, "resolved");
        let first_target = report.mappings.entry(link.clone()).or_insert_with(|| return resolution.target.clone());
        if *first_target != resolution.target {
            tracing::debug!(document, link = %link, first = %first_target, target = %resolution.target, "link resolves differently here");
        }
        pairs.push((link.clone(), resolution.target));
    }

    return pairs;
}

/// Rewrite one document with its pairs. Returns whether the document was
/// (or, in a dry run, would be) updated. Read and write failures are logged
/// and leave the document untouched.
fn rewrite_document(
    root: &Path,
    document: &str,
    pairs: &[(String, String)],
    dry_run: bool,
    report: &mut Report,
) -> Result<bool, Error> {
    let path = root.join(document);
    let content = match std::fs::read_to_string(&path) {
        Err(e) => {
            tracing::warn!(document, error = %e, "skipping unreadable document");
            return Ok(false);
        },
        Ok(c) => c,
    };

    let outcome = rewriter::rewrite(&content, pairs)?;
    if !outcome.changed() {
        tracing::debug!(document, "no link occurrence matched");
        return Ok(false);
    }

    if !dry_run && let Err(e) = rewriter::write_document(&path, &outcome.content) {
        tracing::warn!(document, error = %e, "failed to write document");
        return Ok(false);
    }

    tracing::info!(document, occurrences = outcome.occurrences, "rewrote links");
    for replacement in outcome.replacements {
        report.replacements.push(ReplacementRecord {
            document: document.to_string(),
            new: replacement.new,
            old: replacement.old,
        });
    }
    return Ok(true);
}

/// The repair batch behind `fix` and `migrate`.
///
/// Runs the checker, resolves every broken link, rewrites documents, runs
/// the checker again, and writes the report. Exits 0 when no broken link
/// remains, 1 otherwise.
///
/// # Errors
///
/// Returns errors from config loading, the checker, or report writing.
/// Per-document failures are logged and do not abort the batch.
fn run_batch(root: &Path, scope: Scope, options: &BatchOptions) -> Result<ExitCode, Error> {
    let config = Config::load(root)?;
    let broken = collect_broken(root, &config, scope)?;
    tracing::info!(
        documents = broken.document_count(),
        links = broken.link_count(),
        "collected broken links"
    );

    let index = PathIndex::build(root, &config.scan_dirs(), &config.doc_extension);
    if index.is_empty() {
        tracing::warn!(dirs = ?config.scan_dirs(), "no documents found to resolve against");
    }
    tracing::info!(documents = index.document_count(), keys = index.key_count(), "indexed documents");
    let resolver = Resolver::new(&index, &config);
    let mut cache = ResolutionCache::default();

    let mut report = Report {
        broken_before: broken.clone(),
        ..Report::default()
    };

    for (document, links) in broken.iter() {
        let pairs = resolve_document(document, links, &config, &resolver, &mut cache, &mut report);
        if pairs.is_empty() {
            continue;
        }
        if rewrite_document(root, document, &pairs, options.dry_run, &mut report)? {
            report.summary.documents_updated = report.summary.documents_updated.saturating_add(1);
        }
    }
    tracing::debug!(cached = cache.len(), "resolution cache");

    report.remaining_broken = if options.dry_run {
        predicted_remaining(&broken, &report)
    } else {
        collect_broken(root, &config, scope)?
    };
    report.finalize();
    report.print_summary();

    if options.dry_run {
        println!("{}", report.to_json()?);
    } else {
        let path = options.report.clone().unwrap_or_else(|| return root.join(&config.report));
        report.write(&path)?;
        tracing::info!(path = %path.display(), "wrote report");
    }

    if report.remaining_broken.is_empty() {
        return Ok(ExitCode::SUCCESS);
    }
    return Ok(ExitCode::from(1));
}
