use std::fmt::Write as _;

use crate::config::CONFIG_FILE;
use crate::error::Error;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
    return;
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened and, where a concrete
/// remedy exists, how to fix it.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::CheckerFailed { program, reason } => render_checker_failed(program, reason),
        Error::CheckerNotFound { program } => render_checker_not_found(program),
        Error::UnknownMapping { name, section } => render_unknown_mapping(name, section),
        Error::UnknownSection { name } => render_unknown_section(name),
        Error::Io(_) | Error::Json(_) | Error::ParseFailed { .. } | Error::Pattern(_) | Error::TomlDe(_) => {
            render_generic(e)
        },
    };
}

fn render_checker_failed(program: &str, reason: &str) -> String {
    return format!(
        "\
# Error: Link Checker Failed

`{program}` could not be run: {reason}

No document was modified.
"
    );
}

fn render_checker_not_found(program: &str) -> String {
    return format!(
        "\
# Error: Link Checker Not Found

`{program}` is not installed or not on `PATH`. No document was modified.

## Fix

Install `{program}`, or point linkfix at another checker in `{CONFIG_FILE}`:

    [checker]
    program = \"{program}\"
    args = [\"broken-links\"]
"
    );
}

fn render_generic(e: &Error) -> String {
    return match e {
        Error::Io(e) => format!(
            "\
# Error: I/O

{e}
"
        ),
        Error::Json(e) => format!(
            "\
# Error: Report Serialization

{e}
"
        ),
        Error::ParseFailed { file, reason } => format!(
            "\
# Error: Parse Failed

Could not parse `{}`: {reason}
",
            file.display()
        ),
        Error::TomlDe(e) => format!(
            "\
# Error: Invalid TOML

{e}

## Fix

Correct `{CONFIG_FILE}`, or delete it to use the built-in defaults.
"
        ),
        _ => format!(
            "\
# Error

{e}
"
        ),
    };
}

fn render_unknown_mapping(name: &str, section: &str) -> String {
    return format!(
        "\
# Error: Unknown Mapping

`{name}` is not in the `{section}` fallback table of `{CONFIG_FILE}`.
Built-in mappings can be overridden but not removed.

## Fix

List the mappings in effect:

    linkfix mapping list --section {section}
"
    );
}

fn render_unknown_section(name: &str) -> String {
    let mut out = format!(
        "\
# Error: Unknown Section

Section `{name}` is not configured.

## Fix

Add it to `{CONFIG_FILE}`:

"
    );
    let _ = writeln!(out, "    [sections.{name}]");
    let _ = writeln!(out, "    legacy = []");
    return out;
}
