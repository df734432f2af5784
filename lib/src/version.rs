//! Version parsing and ordering.
//!
//! Registry versions are semantic-version-like but not guaranteed valid:
//! two-component forms ("2.1"), `v`-prefixed tags, and outright junk all
//! show up in the wild. Parsing here is lenient, and the comparison is a
//! total order so callers can sort with it and never fail on bad input.

use semver::Version;
use std::cmp::Ordering;

/// Parse a version string leniently.
///
/// Trims whitespace, tolerates a leading `v`, and pads short numeric forms
/// ("1", "1.2", "1.2-rc.1") to three components before handing the string
/// to `semver`. Returns `None` for anything `semver` still rejects.
///
/// ## Examples
///
/// ```
/// use gazette_lib::version::parse;
///
/// assert_eq!(parse("1.2.3").unwrap().minor, 2);
/// assert_eq!(parse("v2.1").unwrap().to_string(), "2.1.0");
/// assert!(parse("1.0.0.post1").is_none());
/// ```
pub fn parse(text: &str) -> Option<Version> {
    let trimmed = text.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(version) = Version::parse(trimmed) {
        return Some(version);
    }

    let padded = pad_short_version(trimmed)?;
    Version::parse(&padded).ok()
}

/// Expand "1" and "1.2" style versions to three components, keeping any
/// pre-release or build suffix attached ("1.2-rc.1" becomes "1.2.0-rc.1").
fn pad_short_version(text: &str) -> Option<String> {
    let boundary = text.find(['-', '+']).unwrap_or(text.len());
    let (core, suffix) = text.split_at(boundary);

    let components: Vec<&str> = core.split('.').collect();
    if components.is_empty() || components.len() > 2 {
        return None;
    }
    if !components
        .iter()
        .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }

    let mut padded = core.to_string();
    for _ in components.len()..3 {
        padded.push_str(".0");
    }
    padded.push_str(suffix);
    Some(padded)
}

/// Total order over version strings.
///
/// When both sides parse, semantic-versioning precedence applies, with the
/// raw strings as a tie-break so distinct spellings of the same version
/// still order deterministically. A string that fails to parse sorts below
/// every parseable version; two unparseable strings fall back to plain
/// string order. Safe to hand to `sort_by`.
pub fn compare(a: &str, b: &str) -> Ordering {
    match (parse(a), parse(b)) {
        (Some(va), Some(vb)) => va.cmp(&vb).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}

/// Collect versions into an ascending, deduplicated list ordered by
/// [`compare`].
pub fn sorted_unique(versions: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut sorted: Vec<String> = versions.into_iter().collect();
    sorted.sort_by(|a, b| compare(a, b));
    sorted.dedup();
    sorted
}

/// The version immediately preceding `target` within `sorted_versions`.
///
/// `sorted_versions` must be ascending per [`compare`] (see
/// [`sorted_unique`]). Returns `None` when `target` is the oldest version
/// or does not appear at all.
pub fn previous_version<'a>(sorted_versions: &'a [String], target: &str) -> Option<&'a str> {
    let position = sorted_versions.iter().position(|v| v == target)?;
    if position == 0 {
        None
    } else {
        Some(sorted_versions[position - 1].as_str())
    }
}
