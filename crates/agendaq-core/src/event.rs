//! Agenda event records.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::fingerprint::event_fingerprint;

/// One row of a minister's agenda.
///
/// Times are optional because the source publishes all-day entries without
/// an `Heure` value; absence is represented, never defaulted to midnight.
/// `end_time` is carried for exports but plays no part in identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgendaEvent {
    pub date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub title: String,
    pub location: Option<String>,
    /// Content fingerprint over (date, start_time, title, location).
    ///
    /// Computed at construction and recomputed when records are loaded from
    /// disk; it is never persisted, so the stored format stays free of
    /// derivable columns.
    pub source_row_hash: String,
}

impl AgendaEvent {
    /// Build an event, trimming the text fields and computing the
    /// fingerprint. A blank location becomes `None`.
    pub fn new(
        date: NaiveDate,
        start_time: Option<NaiveTime>,
        end_time: Option<NaiveTime>,
        title: impl Into<String>,
        location: Option<String>,
    ) -> Self {
        let title = title.into().trim().to_string();
        let location = location
            .map(|loc| loc.trim().to_string())
            .filter(|loc| !loc.is_empty());
        let source_row_hash = event_fingerprint(date, start_time, &title, location.as_deref());
        Self {
            date,
            start_time,
            end_time,
            title,
            location,
            source_row_hash,
        }
    }

    /// Total order used wherever events are laid out for humans: date, then
    /// timed entries ascending, then untimed entries, ties broken by title
    /// and location so repeated builds order identically.
    pub fn sort_key(&self) -> (NaiveDate, bool, Option<NaiveTime>, &str, Option<&str>) {
        (
            self.date,
            self.start_time.is_none(),
            self.start_time,
            self.title.as_str(),
            self.location.as_deref(),
        )
    }
}
