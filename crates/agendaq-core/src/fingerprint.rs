//! Content fingerprints for agenda events.
//!
//! The portal re-publishes a minister's full agenda on every export, so two
//! collection passes see mostly the same rows, give or take whitespace and
//! letter-case drift in the source text. The merge layer needs a stable
//! notion of "same event" that survives that drift: a SHA-256 over the
//! normalized row fields. Rows hash equal exactly when they describe the
//! same date, start time, title and location.

use chrono::{NaiveDate, NaiveTime};
use sha2::{Digest, Sha256};

/// Normalize one text field for fingerprinting.
///
/// Trims, collapses interior whitespace runs to a single space, and
/// case-folds, so reflowed or re-capitalized source text still fingerprints
/// identically.
pub fn normalize_field(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Compute the content fingerprint of one agenda row.
///
/// Hashes the normalized date, start time, title and location, joined by a
/// `|` separator, and returns the digest as lowercase hex. The end time is
/// not part of the fingerprint: the upstream export carries no end column
/// today, and one appearing later must not re-create stored events.
pub fn event_fingerprint(
    date: NaiveDate,
    start_time: Option<NaiveTime>,
    title: &str,
    location: Option<&str>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(date.format("%Y-%m-%d").to_string());
    hasher.update("|");
    if let Some(start) = start_time {
        hasher.update(start.format("%H:%M").to_string());
    }
    hasher.update("|");
    hasher.update(normalize_field(title));
    hasher.update("|");
    hasher.update(normalize_field(location.unwrap_or_default()));
    hex::encode(hasher.finalize())
}
