//! Text-level rewrite of the manifest's version field
//!
//! The manifest is treated as opaque text: only the bytes between the
//! version markers change, so formatting, comments and encoding quirks of
//! the rest of the document survive untouched.

use crate::errors::ManifestError;
use once_cell::sync::Lazy;
use regex::Regex;

pub const VERSION_START: &str = "<Version>";
pub const VERSION_END: &str = "</Version>";

// Literal markers, non-greedy body, body may span lines.
static VERSION_FIELD: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"(?s)<Version>(.*?)</Version>"));

/// Locate the single version field and return the byte range of its inner text
fn locate(text: &str) -> Result<std::ops::Range<usize>, ManifestError> {
    let pattern = VERSION_FIELD
        .as_ref()
        .map_err(|e| ManifestError::Pattern(e.to_string()))?;
    let mut fields = pattern.captures_iter(text);

    let Some(first) = fields.next() else {
        return Err(ManifestError::MarkerMissing {
            start: VERSION_START,
            end: VERSION_END,
        });
    };

    let extra = fields.count();
    if extra > 0 {
        return Err(ManifestError::AmbiguousMarker {
            start: VERSION_START,
            count: extra + 1,
        });
    }

    first
        .get(1)
        .map(|inner| inner.range())
        .ok_or(ManifestError::MarkerMissing {
            start: VERSION_START,
            end: VERSION_END,
        })
}

/// Return `text` with the version field's content replaced by `version`.
///
/// The input is never modified; on error no output is produced.
pub fn set_version(text: &str, version: &str) -> Result<String, ManifestError> {
    if version.trim().is_empty() || version.contains('<') || version.contains('>') {
        return Err(ManifestError::InvalidVersion(version.to_string()));
    }

    let range = locate(text)?;
    let mut stamped = String::with_capacity(text.len() + version.len());
    stamped.push_str(&text[..range.start]);
    stamped.push_str(version);
    stamped.push_str(&text[range.end..]);
    Ok(stamped)
}

/// Current content of the version field
pub fn current_version(text: &str) -> Result<&str, ManifestError> {
    let range = locate(text)?;
    Ok(&text[range])
}
