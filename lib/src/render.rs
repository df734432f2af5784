//! Markdown digest rendering.
//!
//! Turns the scored releases of one run into a grouped markdown document.
//! Releases are bucketed by their primary category; only the four fixed
//! sections below appear in the output, in a stable order, and sections
//! with no releases are omitted.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::release::ReleaseRecord;

/// Section keys and headings, in render order.
const SECTIONS: [(&str, &str); 4] = [
    ("breaking_major", "Breaking & Major Changes"),
    ("deprecations", "Deprecations"),
    ("security", "Security & Critical Fixes"),
    ("other", "Other Notable Changes"),
];

/// Bullets rendered per release.
const MAX_SUMMARY_LINES: usize = 5;

/// Condense release notes into at most [`MAX_SUMMARY_LINES`] bullet lines.
///
/// Non-blank lines are kept with surrounding `-` and space characters
/// stripped, so existing bullet lists come through as plain text. Empty
/// notes yield a fixed placeholder; whitespace-only notes fall back to the
/// raw text, truncated to 120 characters.
pub fn summarize_notes(notes: &str) -> Vec<String> {
    if notes.is_empty() {
        return vec!["No detailed notes provided.".to_string()];
    }

    let lines: Vec<String> = notes
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            line.trim_matches(|c: char| c == '-' || c == ' ')
                .to_string()
        })
        .collect();
    if lines.is_empty() {
        if notes.chars().count() > 120 {
            let mut truncated: String = notes.chars().take(120).collect();
            truncated.push_str("...");
            return vec![truncated];
        }
        return vec![notes.to_string()];
    }

    lines.into_iter().take(MAX_SUMMARY_LINES).collect()
}

/// Render the digest document for `releases`, dated `date`.
///
/// The input order is preserved within each section, so callers pass
/// releases already sorted newest-first. Releases whose primary category
/// is not one of the four section keys do not appear.
pub fn render_markdown(releases: &[ReleaseRecord], date: NaiveDate) -> String {
    let mut grouped: HashMap<&str, Vec<&ReleaseRecord>> = HashMap::new();
    for release in releases {
        let primary = release
            .categories
            .first()
            .map(String::as_str)
            .unwrap_or("other");
        grouped.entry(primary).or_default().push(release);
    }

    let mut content: Vec<String> = Vec::new();
    content.push(format!("# Python Package Release Highlights – {date}\n"));
    content.push(
        "Automated summary of notable Python package releases. This digest focuses on major updates, breaking changes, deprecations,\nand security fixes detected since the last run."
            .to_string(),
    );
    content.push(String::new());

    for (key, heading) in SECTIONS {
        let Some(section) = grouped.get(key) else {
            continue;
        };
        content.push(format!("## {heading}\n"));
        for release in section {
            content.push(format!(
                "### {} {} ({})",
                release.package,
                release.version,
                release.release_date.format("%Y-%m-%d")
            ));
            for bullet in summarize_notes(&release.notes) {
                content.push(format!("- {bullet}"));
            }
            content.push(String::new());
            content.push(format!("[Release notes]({})", release.url));
            content.push(String::new());
        }
    }

    content.join("\n")
}

/// Render and write the digest to `path`.
pub fn write_newsletter(
    path: impl AsRef<Path>,
    releases: &[ReleaseRecord],
    date: NaiveDate,
) -> std::io::Result<()> {
    fs::write(path, render_markdown(releases, date))
}

// ============================================================================
// Tests
// ============================================================================
