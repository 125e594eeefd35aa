//! Name normalization and validation
//!
//! Workflow file stems are derived deterministically from pipeline names and
//! kept collision-free within one conversion run; target repository names are
//! validated (never rewritten) against the target platform's rules.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Default upper bound on a derived workflow file stem
pub const DEFAULT_STEM_MAX: usize = 50;

const SEPARATOR: char = '-';
const FALLBACK_STEM: &str = "workflow";

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));
static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]").expect("disallowed regex"));
static REPEATED_SEP: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").expect("separator regex"));
static REPO_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("repo name regex"));

/// Validate a candidate repository name against target naming rules.
///
/// Non-empty, at most 100 characters, restricted to alphanumerics plus
/// dot, hyphen and underscore.
pub fn valid_repo_name(name: &str) -> bool {
    !name.is_empty() && name.chars().count() <= 100 && REPO_NAME.is_match(name)
}

/// Normalize a raw pipeline name into a workflow file stem.
///
/// Deterministic and idempotent: re-applying to its own output is a no-op.
pub fn normalize_stem(raw: &str, max_len: usize) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return FALLBACK_STEM.to_string();
    }

    let sep = SEPARATOR.to_string();
    let mut stem = WHITESPACE.replace_all(trimmed, sep.as_str()).into_owned();
    stem = DISALLOWED.replace_all(&stem, sep.as_str()).into_owned();
    stem = REPEATED_SEP.replace_all(&stem, sep.as_str()).into_owned();
    stem = stem
        .trim_matches(|c| c == SEPARATOR || c == '.' || c == '_')
        .to_string();
    if stem.is_empty() {
        return FALLBACK_STEM.to_string();
    }
    stem = stem.to_ascii_lowercase();

    // Everything left is ASCII, so byte truncation is safe; re-trim so the
    // result stays stable under re-application.
    if stem.len() > max_len {
        stem.truncate(max_len);
        stem = stem
            .trim_end_matches(|c| c == SEPARATOR || c == '.' || c == '_')
            .to_string();
    }
    if stem.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        stem
    }
}

/// Collision-safe stem allocator for one conversion run
#[derive(Debug)]
pub struct StemSet {
    seen: HashSet<String>,
    max_len: usize,
}

impl StemSet {
    pub fn new(max_len: usize) -> Self {
        Self {
            seen: HashSet::new(),
            max_len: max_len.max(1),
        }
    }

    /// Derive a unique stem for `raw`, appending a numeric suffix on
    /// collision while preserving the length bound.
    pub fn derive(&mut self, raw: &str) -> String {
        let base = normalize_stem(raw, self.max_len);
        let mut stem = base.clone();
        let mut counter = 1u32;

        while self.seen.contains(&stem) {
            counter += 1;
            let suffix = format!("{}{}", SEPARATOR, counter);
            stem = if self.max_len > suffix.len() {
                let limit = self.max_len - suffix.len();
                let trimmed = if base.len() > limit {
                    &base[..limit]
                } else {
                    base.as_str()
                };
                format!("{}{}", trimmed, suffix)
            } else {
                // No room for any of the base next to the suffix; the bare
                // counter still keeps candidates distinct.
                counter.to_string()
            };
        }

        self.seen.insert(stem.clone());
        stem
    }

    pub fn contains(&self, stem: &str) -> bool {
        self.seen.contains(stem)
    }
}
