use std::path::{Path, PathBuf};

use crate::config::{self, Config};
use crate::error::Error;

// ── CLI commands ──────────────────────────────────────────────────────

/// Add a fallback mapping to a section's table in `.linkfix.toml`.
///
/// # Errors
///
/// Returns `Error::UnknownSection` if the section is not configured, or
/// errors from config reading and writing.
pub fn cmd_add(root: &Path, section: &str, name: &str, target: &str) -> Result<(), Error> {
    let config = Config::load(root)?;
    if !config.is_section(section) {
        return Err(Error::UnknownSection {
            name: section.to_string(),
        });
    }

    add_to_config(root, section, name, target)?;
    println!("Added mapping: {section}: {name} -> {target}");
    return Ok(());
}

/// List fallback mappings of one section, or of every section.
///
/// # Errors
///
/// Returns `Error::UnknownSection` if `section` is given but not configured,
/// or errors from config loading.
pub fn cmd_list(root: &Path, section: Option<&str>) -> Result<(), Error> {
    let config = Config::load(root)?;

    if let Some(name) = section
        && !config.is_section(name)
    {
        return Err(Error::UnknownSection {
            name: name.to_string(),
        });
    }

    let mut printed = 0_usize;
    for (name, entry) in &config.sections {
        if section.is_some_and(|s| return s != name.as_str()) {
            continue;
        }
        for (legacy, target) in &entry.fallback {
            println!("{name}: {legacy} -> {target}");
            printed = printed.saturating_add(1);
        }
    }

    if printed == 0 {
        println!("No mappings configured.");
    }
    return Ok(());
}

/// Remove a fallback mapping from a section's table in `.linkfix.toml`.
/// Built-in mappings cannot be removed this way; override them instead.
///
/// # Errors
///
/// Returns `Error::UnknownMapping` if the project file has no such entry.
pub fn cmd_remove(root: &Path, section: &str, name: &str) -> Result<(), Error> {
    remove_from_config(root, section, name)?;
    println!("Removed mapping: {section}: {name}");
    return Ok(());
}

// ── Config file editing ───────────────────────────────────────────────

/// Set `[sections.<section>.fallback] <name> = "<target>"`, creating the
/// tables as needed and keeping the rest of the file as written.
///
/// # Errors
///
/// Returns `Error::ParseFailed` if the config can't be parsed,
/// or `Error::Io` if writing fails.
fn add_to_config(root: &Path, section: &str, name: &str, target: &str) -> Result<(), Error> {
    let (config_path, mut doc) = read_config_doc(root)?;

    let sections = table_entry(&mut doc, "sections", &config_path)?;
    sections.set_implicit(true);
    let entry = table_entry(sections, section, &config_path)?;
    entry.set_implicit(true);
    let fallback = table_entry(entry, "fallback", &config_path)?;
    fallback.insert(name, toml_edit::value(target));

    std::fs::write(&config_path, doc.to_string())?;
    return Ok(());
}

/// Parse `.linkfix.toml` into a format-preserving document.
/// Returns an empty document if the file doesn't exist.
///
/// # Errors
///
/// Returns `Error::Io` on read failure or `Error::ParseFailed` on parse failure.
fn read_config_doc(root: &Path) -> Result<(PathBuf, toml_edit::DocumentMut), Error> {
    let config_path = root.join(config::CONFIG_FILE);
    let content = match std::fs::read_to_string(&config_path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(Error::Io(e)),
        Ok(c) => c,
    };

    let doc: toml_edit::DocumentMut = content.parse().map_err(|e: toml_edit::TomlError| {
        return Error::ParseFailed {
            file: config_path.clone(),
            reason: e.to_string(),
        };
    })?;

    return Ok((config_path, doc));
}

/// Remove `<name>` from `[sections.<section>.fallback]`.
///
/// # Errors
///
/// Returns `Error::UnknownMapping` if the entry isn't in the file.
fn remove_from_config(root: &Path, section: &str, name: &str) -> Result<(), Error> {
    let (config_path, mut doc) = read_config_doc(root)?;
    let unknown = || {
        return Error::UnknownMapping {
            name: name.to_string(),
            section: section.to_string(),
        };
    };

    let fallback = doc
        .get_mut("sections")
        .and_then(|s| return s.get_mut(section))
        .and_then(|s| return s.get_mut("fallback"))
        .and_then(toml_edit::Item::as_table_like_mut)
        .ok_or_else(unknown)?;

    if fallback.remove(name).is_none() {
        return Err(unknown());
    }

    std::fs::write(&config_path, doc.to_string())?;
    return Ok(());
}

/// Get the sub-table `key`, creating it when missing.
///
/// # Errors
///
/// Returns `Error::ParseFailed` if `key` holds a value that is not a table.
fn table_entry<'t>(
    parent: &'t mut toml_edit::Table,
    key: &str,
    file: &Path,
) -> Result<&'t mut toml_edit::Table, Error> {
    return parent
        .entry(key)
        .or_insert_with(toml_edit::table)
        .as_table_mut()
        .ok_or_else(|| {
            return Error::ParseFailed {
                file: file.to_path_buf(),
                reason: format!("`{key}` is not a table"),
            };
        });
}
