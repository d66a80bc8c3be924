//! Daily cross-minister summaries.
//!
//! Built from persisted active records only, never from a live fetch. One
//! summary per calendar day of the window, in two renderings: markdown for
//! humans and JSON for the dashboards. Empty days are emitted too, so
//! consumers always see a complete day sequence.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use agendaq_core::{AgendaEvent, display_name_from_slug};
use chrono::{Days, NaiveDate, NaiveTime};
use serde::Serialize;
use tracing::info;

use crate::StoreError;

pub const SUMMARY_DIR: &str = "daily_summaries";

/// Trailing window of calendar days a summary run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub end: NaiveDate,
    pub days: u32,
}

impl DayWindow {
    /// The `days` calendar days ending at `end`, inclusive.
    pub fn trailing(end: NaiveDate, days: u32) -> Self {
        Self { end, days }
    }

    /// Dates covered, ascending.
    pub fn dates(&self) -> Vec<NaiveDate> {
        (0..u64::from(self.days))
            .rev()
            .filter_map(|back| self.end.checked_sub_days(Days::new(back)))
            .collect()
    }
}

/// One day's consolidated agenda across all active ministers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub entries: Vec<SummaryEntry>,
}

/// One event attributed to its minister.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryEntry {
    pub minister: String,
    pub event: AgendaEvent,
}

/// Build one summary per day of the window, ascending.
///
/// Entry order within a day is total: start time ascending with untimed
/// entries last, ties broken by minister name, then title, then location,
/// so rebuilding from the same stored state is byte-identical.
pub fn build(
    records: &BTreeMap<String, Vec<AgendaEvent>>,
    window: DayWindow,
) -> Vec<DailySummary> {
    let mut by_day: BTreeMap<NaiveDate, Vec<SummaryEntry>> = window
        .dates()
        .into_iter()
        .map(|date| (date, Vec::new()))
        .collect();

    for (slug, events) in records {
        let minister = display_name_from_slug(slug);
        for event in events {
            if let Some(entries) = by_day.get_mut(&event.date) {
                entries.push(SummaryEntry {
                    minister: minister.clone(),
                    event: event.clone(),
                });
            }
        }
    }

    by_day
        .into_iter()
        .map(|(date, mut entries)| {
            entries.sort_by(|a, b| entry_key(a).cmp(&entry_key(b)));
            DailySummary { date, entries }
        })
        .collect()
}

fn entry_key(entry: &SummaryEntry) -> (bool, Option<NaiveTime>, &str, &str, Option<&str>) {
    (
        entry.event.start_time.is_none(),
        entry.event.start_time,
        entry.minister.as_str(),
        entry.event.title.as_str(),
        entry.event.location.as_deref(),
    )
}

// ── Renderings ──

/// Markdown rendering of one day.
pub fn render_markdown(summary: &DailySummary) -> String {
    let mut out = format!("# Agenda des ministres - {}\n", summary.date.format("%Y-%m-%d"));
    if summary.entries.is_empty() {
        out.push_str("\nAucune activité inscrite.\n");
        return out;
    }
    for entry in &summary.entries {
        let time = entry
            .event
            .start_time
            .map(|t| t.format("%H:%M").to_string())
            .unwrap_or_else(|| "Heure non spécifiée".to_string());
        out.push_str(&format!("\n## {time} - {}\n", entry.minister));
        out.push_str(&format!("**{}**\n", entry.event.title));
        if let Some(location) = entry.event.location.as_deref() {
            out.push_str(&format!("*Lieu: {location}*\n"));
        }
        out.push_str("\n---\n");
    }
    out
}

#[derive(Serialize)]
struct SummaryDoc<'a> {
    date: String,
    events: Vec<EventDoc<'a>>,
}

#[derive(Serialize)]
struct EventDoc<'a> {
    time: Option<String>,
    minister: &'a str,
    description: &'a str,
    location: Option<&'a str>,
}

/// JSON rendering of one day, in the shape the dashboards consume.
pub fn render_json(summary: &DailySummary) -> Result<String, StoreError> {
    let doc = SummaryDoc {
        date: summary.date.format("%Y-%m-%d").to_string(),
        events: summary
            .entries
            .iter()
            .map(|entry| EventDoc {
                time: entry.event.start_time.map(|t| t.format("%H:%M").to_string()),
                minister: &entry.minister,
                description: &entry.event.title,
                location: entry.event.location.as_deref(),
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// Write both renderings of every summary under `<data_dir>/daily_summaries/`.
pub fn write_summaries(data_dir: &Path, summaries: &[DailySummary]) -> Result<(), StoreError> {
    let dir = data_dir.join(SUMMARY_DIR);
    fs::create_dir_all(&dir).map_err(|err| StoreError::io(&dir, err))?;
    for summary in summaries {
        let stem = summary.date.format("%Y-%m-%d").to_string();
        let md_path = dir.join(format!("{stem}.md"));
        fs::write(&md_path, render_markdown(summary))
            .map_err(|err| StoreError::io(&md_path, err))?;
        let json_path = dir.join(format!("{stem}.json"));
        fs::write(&json_path, render_json(summary)?)
            .map_err(|err| StoreError::io(&json_path, err))?;
    }
    info!(days = summaries.len(), "summaries written");
    Ok(())
}
