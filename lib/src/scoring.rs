//! Release importance scoring.
//!
//! A release's importance is a pure heuristic over two inputs: the size of
//! the version jump from its predecessor, and keyword families matched in
//! its release notes. Scoring never fails; malformed versions and empty
//! notes degrade to low scores instead of erroring.

use crate::release::ReleaseRecord;
use crate::version;

/// Outcome of scoring one release.
///
/// `categories` is never empty; the first entry is the primary bucket the
/// renderer groups by.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportanceResult {
    /// Total heuristic score
    pub score: f64,
    /// Category tags in the order they were earned
    pub categories: Vec<String>,
}

/// One keyword family: a category tag, the points it contributes, and the
/// substrings that trigger it.
struct KeywordRule {
    tag: &'static str,
    points: f64,
    keywords: &'static [&'static str],
}

/// Keyword families checked against release notes, in match order. The
/// first family to match supplies the primary category tag. Adding a
/// family here is the whole change; scoring iterates the table.
const KEYWORD_RULES: &[KeywordRule] = &[
    KeywordRule {
        tag: "breaking",
        points: 5.0,
        keywords: &[
            "breaking",
            "backwards incompatible",
            "incompatible",
            "removed",
            "changed default",
        ],
    },
    KeywordRule {
        tag: "deprecation",
        points: 3.0,
        keywords: &[
            "deprecate",
            "deprecated",
            "will be removed",
            "scheduled for removal",
        ],
    },
    KeywordRule {
        tag: "security",
        points: 6.0,
        keywords: &[
            "security",
            "cve-",
            "vulnerability",
            "exploit",
            "xss",
            "sql injection",
        ],
    },
    KeywordRule {
        tag: "performance",
        points: 1.5,
        keywords: &["performance", "optimization", "faster"],
    },
];

/// Weight of the version jump from `previous` to `current`.
///
/// No previous version earns a moderate 2.0 so first-time packages still
/// surface. A parse failure on either side earns 0.0. Otherwise the
/// highest differing component decides: major 5.0, minor 3.0, patch 1.0,
/// identical 0.5 (a re-tag). Inequality counts in either direction, and
/// pre-release qualifiers are ignored here.
fn version_bump_score(current: &str, previous: Option<&str>) -> f64 {
    let Some(previous) = previous else {
        return 2.0;
    };
    let (Some(cur), Some(prev)) = (version::parse(current), version::parse(previous)) else {
        return 0.0;
    };

    if cur.major != prev.major {
        5.0
    } else if cur.minor != prev.minor {
        3.0
    } else if cur.patch != prev.patch {
        1.0
    } else {
        0.5
    }
}

/// Score a release against its predecessor and its notes.
///
/// Total score is the version-bump weight plus the points of every keyword
/// family with at least one case-insensitive substring match in the notes.
/// Raw family tags are recorded in match order; rollup buckets are then
/// appended after them: `breaking_major` when `breaking` matched or the
/// total reached 5.0, `deprecations` when `deprecation` matched,
/// `security` again when `security` matched, and `other` only when no tag
/// was earned at all. Keeping the rollups behind the raw tags means the
/// first entry is always the strongest direct match when one exists.
///
/// ## Examples
///
/// ```
/// use chrono::Utc;
/// use gazette_lib::release::{ReleaseOrigin, ReleaseRecord};
/// use gazette_lib::scoring::score_release;
///
/// let mut release = ReleaseRecord::new(
///     "foo",
///     "1.0.0",
///     Utc::now(),
///     "https://pypi.org/project/foo/1.0.0/",
///     ReleaseOrigin::Registry,
/// );
/// release.notes = "This is a breaking change, removed old API".to_string();
///
/// let result = score_release(&release, None);
/// assert_eq!(result.score, 7.0);
/// assert_eq!(result.categories, vec!["breaking", "breaking_major"]);
/// ```
pub fn score_release(release: &ReleaseRecord, previous_version: Option<&str>) -> ImportanceResult {
    let mut score = version_bump_score(&release.version, previous_version);
    let notes = release.notes.to_lowercase();

    let mut categories: Vec<String> = vec![];
    for rule in KEYWORD_RULES {
        if rule.keywords.iter().any(|keyword| notes.contains(keyword)) {
            score += rule.points;
            categories.push(rule.tag.to_string());
        }
    }

    if categories.iter().any(|tag| tag == "breaking") || score >= 5.0 {
        categories.push("breaking_major".to_string());
    }
    if categories.iter().any(|tag| tag == "deprecation") {
        categories.push("deprecations".to_string());
    }
    if categories.iter().any(|tag| tag == "security") {
        categories.push("security".to_string());
    }
    if categories.is_empty() {
        categories.push("other".to_string());
    }

    ImportanceResult { score, categories }
}
