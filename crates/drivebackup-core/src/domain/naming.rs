//! Local naming rules for remote items
//!
//! The remote store permits sibling items with identical names and names
//! that are not valid local file names. [`sanitize_name`] makes a single
//! name portable; [`SiblingNames`] disambiguates duplicates within one
//! folder by appending or incrementing a ` (n)` marker before the
//! extension.

use std::collections::HashSet;

/// Characters replaced by [`sanitize_name`]
const INVALID_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Replacement for invalid characters and for names that sanitise to nothing
const REPLACEMENT: &str = "-";

/// Makes a remote name usable as a single local path component
///
/// Reserved and control characters become `-`, trailing dots and spaces are
/// trimmed, and names that end up empty or as `.`/`..` become `-`.
pub fn sanitize_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if INVALID_CHARS.contains(&c) || c.is_control() {
                '-'
            } else {
                c
            }
        })
        .collect();

    let trimmed = replaced.trim_end_matches(['.', ' ']);
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        REPLACEMENT.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Produces the next duplicate name for `name`
///
/// The name is split at its first dot into stem and extension. A trailing
/// ` (n)` on the stem is incremented; otherwise ` (1)` is appended.
///
/// ```
/// use drivebackup_core::domain::naming::next_duplicate_name;
///
/// assert_eq!(next_duplicate_name("report.pdf"), "report (1).pdf");
/// assert_eq!(next_duplicate_name("report (1).pdf"), "report (2).pdf");
/// assert_eq!(next_duplicate_name("archive.tar.gz"), "archive (1).tar.gz");
/// ```
pub fn next_duplicate_name(name: &str) -> String {
    let (stem, extension) = match name.find('.') {
        Some(pos) => name.split_at(pos),
        None => (name, ""),
    };

    let (base, count) = match parse_duplicate_marker(stem) {
        Some((base, n)) => (base, n.saturating_add(1)),
        None => (stem, 1),
    };

    format!("{base} ({count}){extension}")
}

/// Splits `"stem (n)"` into `("stem", n)`
fn parse_duplicate_marker(stem: &str) -> Option<(&str, u32)> {
    let inner = stem.strip_suffix(')')?;
    let open = inner.rfind(" (")?;
    let digits = &inner[open + 2..];
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let n = digits.parse().ok()?;
    Some((&inner[..open], n))
}

/// Names already used among the siblings of one folder
///
/// Files and folders are tracked in separate instances, matching the
/// order in which a folder's contents are materialized.
#[derive(Debug, Default)]
pub struct SiblingNames {
    seen: HashSet<String>,
}

impl SiblingNames {
    /// Creates an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves a name for the next sibling
    ///
    /// Returns `name` unchanged if it is free, otherwise the first free
    /// name produced by repeated [`next_duplicate_name`] calls.
    pub fn claim(&mut self, name: &str) -> String {
        let mut candidate = name.to_string();
        while self.seen.contains(&candidate) {
            candidate = next_duplicate_name(&candidate);
        }
        self.seen.insert(candidate.clone());
        candidate
    }

    /// Returns true if `name` was already claimed
    pub fn contains(&self, name: &str) -> bool {
        self.seen.contains(name)
    }
}
