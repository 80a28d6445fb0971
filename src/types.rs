/// Core domain types for link references, resolutions, and replacements.
use std::fmt;

use serde::Serialize;

/// Which resolution rule produced a replacement target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchRule {
    /// The full normalized path is itself an index key.
    ExactPath,
    /// The per-section static fallback table named the target.
    Fallback,
    /// The final path segment matched a document filename.
    Filename,
    /// A trailing suffix of the path matched an index key.
    Suffix,
    /// No document matched; the section root was prepended to the path.
    Synthesized,
}

impl MatchRule {
    /// Short label used in command output.
    pub const fn as_str(self) -> &'static str {
        return match self {
            MatchRule::ExactPath => "exact path",
            MatchRule::Fallback => "fallback table",
            MatchRule::Filename => "filename",
            MatchRule::Suffix => "path suffix",
            MatchRule::Synthesized => "section prefix",
        };
    }
}

impl fmt::Display for MatchRule {
    /// Write the short label.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(self.as_str());
    }
}

/// A link target after the normalization pipeline. Used as the resolution
/// cache key, so two spellings that normalize identically share one result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedLink {
    /// Fragment after `#`, carried through verbatim.
    pub fragment: Option<String>,
    /// Path prefix preferred when several candidates match.
    pub hint: Option<String>,
    /// The hint is only the referencing document's section; the link itself
    /// named none. Such a hint breaks ties on a bare filename but does not
    /// outrank a longer path key.
    pub hint_from_caller: bool,
    /// Fragment-free path with legacy prefixes and bad suffixes removed.
    pub path: String,
    /// Configured section the link belongs to, when one can be determined.
    pub section: Option<String>,
}

/// Chosen replacement for one broken link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Rule that selected the target.
    pub rule: MatchRule,
    /// Absolute target path, with the original fragment re-attached.
    pub target: String,
}

/// One `(old, new)` substitution actually applied to a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Replacement {
    /// Resolved link target written in place of `old`.
    pub new: String,
    /// Broken link target as originally written.
    pub old: String,
}
