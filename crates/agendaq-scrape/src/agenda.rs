//! Agenda export discovery and parsing.
//!
//! A minister's detail page links a CSV export of their agenda. The export
//! is semicolon-delimited with French headers
//! (`Type d'activité;Description;Lieu;Date;Heure;Participants`), dates as
//! `DD-MM-YYYY`, times as `HHhMM`, and cells that may carry HTML fragments.
//! This module turns that shape into normalized [`AgendaEvent`]s.

use agendaq_core::AgendaEvent;
use chrono::{NaiveDate, NaiveTime};
use scraper::{Html, Selector};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ParseError {
    /// The page or export no longer has the shape this parser expects.
    #[error("structural break: {0}")]
    Structural(String),
    /// The export could not be read as CSV at all.
    #[error("unreadable export: {0}")]
    Csv(#[from] csv::Error),
}

/// Parsed export: the usable events plus a count of rows dropped on the way.
#[derive(Debug, Default)]
pub struct ParsedAgenda {
    pub events: Vec<AgendaEvent>,
    pub skipped_rows: usize,
}

/// Find the agenda export link on a minister's detail page.
///
/// The portal's label wording drifts, so the match is the first anchor
/// whose whitespace-normalized text mentions both "csv" and "agenda",
/// case-insensitively. The href is resolved against `page_url`.
pub fn find_export_url(page_html: &str, page_url: &str) -> Result<String, ParseError> {
    let document = Html::parse_document(page_html);
    let Ok(anchors) = Selector::parse("a") else {
        return Err(ParseError::Structural("anchor selector".into()));
    };

    for anchor in document.select(&anchors) {
        let text = anchor.text().collect::<String>();
        let text = text
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        if !(text.contains("csv") && text.contains("agenda")) {
            continue;
        }
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let base = reqwest::Url::parse(page_url)
            .map_err(|e| ParseError::Structural(format!("bad page url {page_url}: {e}")))?;
        let resolved = base
            .join(href)
            .map_err(|e| ParseError::Structural(format!("unresolvable export href {href}: {e}")))?;
        return Ok(resolved.to_string());
    }

    Err(ParseError::Structural(format!(
        "no agenda export link on {page_url}"
    )))
}

/// Parse a CSV export into normalized events.
///
/// The `csv` crate handles the quoted multi-line cells the export uses for
/// participant lists. Row anomalies (unparseable dates, rows with no usable
/// title) are counted and skipped; only a header without a `Date` column is
/// structural.
pub fn parse_export(export: &str) -> Result<ParsedAgenda, ParseError> {
    let body = export.strip_prefix('\u{feff}').unwrap_or(export);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_reader(body.as_bytes());

    let columns = Columns::locate(reader.headers()?)?;

    let mut parsed = ParsedAgenda::default();
    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                warn!(error = %err, "unreadable export row skipped");
                parsed.skipped_rows += 1;
                continue;
            }
        };
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let Some(date) = record.get(columns.date).and_then(parse_source_date) else {
            parsed.skipped_rows += 1;
            continue;
        };

        let raw_time = columns
            .time
            .and_then(|i| record.get(i))
            .unwrap_or("")
            .trim();
        let start_time = if raw_time.is_empty() {
            None
        } else {
            let time = parse_source_time(raw_time);
            if time.is_none() {
                warn!(time = raw_time, %date, "unparseable time, keeping row as all-day");
            }
            time
        };

        let description = columns
            .description
            .and_then(|i| record.get(i))
            .map(clean_cell)
            .unwrap_or_default();
        let title = if description.is_empty() {
            columns
                .activity_type
                .and_then(|i| record.get(i))
                .map(clean_cell)
                .unwrap_or_default()
        } else {
            description
        };
        if title.is_empty() {
            parsed.skipped_rows += 1;
            continue;
        }

        let location = columns
            .location
            .and_then(|i| record.get(i))
            .map(clean_cell)
            .filter(|loc| !loc.is_empty());

        parsed
            .events
            .push(AgendaEvent::new(date, start_time, None, title, location));
    }

    Ok(parsed)
}

/// Column indices located from the header row, case-insensitively.
struct Columns {
    date: usize,
    time: Option<usize>,
    description: Option<usize>,
    activity_type: Option<usize>,
    location: Option<usize>,
}

impl Columns {
    fn locate(headers: &csv::StringRecord) -> Result<Self, ParseError> {
        let mut date = None;
        let mut time = None;
        let mut description = None;
        let mut activity_type = None;
        let mut location = None;

        for (idx, raw) in headers.iter().enumerate() {
            let name = raw.trim().to_lowercase();
            match name.as_str() {
                "date" => {
                    date.get_or_insert(idx);
                }
                "heure" => {
                    time.get_or_insert(idx);
                }
                "description" => {
                    description.get_or_insert(idx);
                }
                "lieu" => {
                    location.get_or_insert(idx);
                }
                // "Type d'activité", apostrophe and accent included, so
                // match on the stable prefix only.
                _ if name.starts_with("type") => {
                    activity_type.get_or_insert(idx);
                }
                _ => {}
            }
        }

        let date =
            date.ok_or_else(|| ParseError::Structural("export has no Date column".into()))?;
        Ok(Self {
            date,
            time,
            description,
            activity_type,
            location,
        })
    }
}

/// `DD-MM-YYYY`, tolerating trailing annotations after the tenth character.
fn parse_source_date(raw: &str) -> Option<NaiveDate> {
    let head: String = raw.trim().chars().take(10).collect();
    NaiveDate::parse_from_str(&head, "%d-%m-%Y").ok()
}

/// `HHhMM` as published, with `HH:MM` accepted as a variant.
fn parse_source_time(raw: &str) -> Option<NaiveTime> {
    let normalized = raw.trim().to_lowercase().replace('h', ":");
    NaiveTime::parse_from_str(&normalized, "%H:%M").ok()
}

/// Strip markup from a cell: entities decoded, tags dropped, whitespace
/// collapsed to single spaces.
fn clean_cell(raw: &str) -> String {
    if !raw.contains('<') && !raw.contains('&') {
        return raw.split_whitespace().collect::<Vec<_>>().join(" ");
    }
    let fragment = Html::parse_fragment(raw);
    let text = fragment.root_element().text().collect::<String>();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
