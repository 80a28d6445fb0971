/// Crate-level error types for linkfix diagnostics.
use std::path::PathBuf;

/// All errors in linkfix carry enough context to produce a useful diagnostic
/// without a debugger. Each variant names the program, file, or section involved.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The link checker started but could not be run to completion.
    #[error("link checker `{program}` failed: {reason}")]
    CheckerFailed {
        /// Program that was invoked.
        program: String,
        /// Description of the failure.
        reason: String,
    },

    /// The link checker executable is not installed or not on `PATH`.
    #[error("link checker not found: `{program}`")]
    CheckerNotFound {
        /// Program that was invoked.
        program: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON serialization of a report failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped serde_json error.
        #[from]
        serde_json::Error,
    ),

    /// A configuration file could not be parsed for editing.
    #[error("parse failed: {}: {reason}", file.display())]
    ParseFailed {
        /// File that failed to parse.
        file: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// A link rewrite pattern could not be compiled.
    #[error("pattern: {0}")]
    Pattern(
        /// The wrapped regex error.
        #[from]
        regex::Error,
    ),

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// No fallback mapping with this name exists in the project config.
    #[error("unknown mapping: `{name}` in section `{section}`")]
    UnknownMapping {
        /// Legacy short name that was not found.
        name: String,
        /// Section whose fallback table was searched.
        section: String,
    },

    /// No configured section matches the given name.
    #[error("unknown section: `{name}`")]
    UnknownSection {
        /// Section name that was not found.
        name: String,
    },
}
