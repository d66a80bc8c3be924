//! iCalendar export of persisted records.
//!
//! One `.ics` per minister under `<data_dir>/ical/{active,inactive}/`.
//! Timed events get a fixed one-hour slot when the record carries no end
//! time, untimed events are all-day, and a record with zero events
//! produces no file.

use std::fs;

use agendaq_core::{AgendaEvent, MinisterStatus, display_name_from_slug};
use chrono::Duration;
use icalendar::{Calendar, Component, Event, EventLike};
use tracing::info;

use crate::{AgendaStore, StoreError};

pub const ICAL_DIR: &str = "ical";

/// Export every non-empty record in both partitions.
///
/// Returns the number of calendar files written.
pub fn export_all(store: &AgendaStore) -> Result<usize, StoreError> {
    let mut written = 0;
    for status in [MinisterStatus::Active, MinisterStatus::Inactive] {
        let out_dir = store.root().join(ICAL_DIR).join(status.as_str());
        fs::create_dir_all(&out_dir).map_err(|err| StoreError::io(&out_dir, err))?;

        for (slug, events) in store.load_partition(status)? {
            if events.is_empty() {
                continue;
            }
            let calendar = calendar_for(&slug, &events);
            let path = out_dir.join(format!("{slug}.ics"));
            fs::write(&path, calendar.to_string()).map_err(|err| StoreError::io(&path, err))?;
            written += 1;
        }
    }
    info!(written, "calendar export complete");
    Ok(written)
}

/// Build one minister's calendar from their record.
fn calendar_for(slug: &str, events: &[AgendaEvent]) -> Calendar {
    let mut calendar = Calendar::new();
    calendar.name(&format!("Agenda - {}", display_name_from_slug(slug)));
    for event in events {
        calendar.push(calendar_entry(event));
    }
    calendar.done()
}

fn calendar_entry(event: &AgendaEvent) -> Event {
    let mut entry = Event::new();
    entry.summary(&event.title);
    if let Some(location) = event.location.as_deref() {
        entry.location(location);
    }
    match event.start_time {
        Some(start) => {
            let begin = event.date.and_time(start);
            let end = event
                .end_time
                .map(|end| event.date.and_time(end))
                .unwrap_or_else(|| begin + Duration::hours(1));
            entry.starts(begin).ends(end);
        }
        None => {
            entry.all_day(event.date);
        }
    }
    entry.done()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn exports_one_file_per_non_empty_record() {
        let tmp = TempDir::new().unwrap();
        let store = AgendaStore::open(tmp.path()).unwrap();
        store
            .merge(
                "jean-dupont",
                MinisterStatus::Active,
                &[AgendaEvent::new(
                    date(2025, 1, 10),
                    Some(time(9, 30)),
                    None,
                    "Réunion",
                    Some("Québec".into()),
                )],
            )
            .unwrap();
        store
            .merge(
                "ancien-ministre",
                MinisterStatus::Inactive,
                &[AgendaEvent::new(date(2025, 1, 5), None, None, "Entrevue", None)],
            )
            .unwrap();
        store.merge("sans-agenda", MinisterStatus::Active, &[]).unwrap();

        let written = export_all(&store).unwrap();
        assert_eq!(written, 2);
        assert!(tmp.path().join("ical/active/jean-dupont.ics").is_file());
        assert!(tmp.path().join("ical/inactive/ancien-ministre.ics").is_file());
        assert!(
            !tmp.path().join("ical/active/sans-agenda.ics").exists(),
            "empty records must not produce a calendar"
        );
    }

    #[test]
    fn timed_events_get_a_one_hour_slot() {
        let calendar = calendar_for(
            "jean-dupont",
            &[AgendaEvent::new(
                date(2025, 1, 10),
                Some(time(9, 30)),
                None,
                "Réunion",
                Some("Québec".into()),
            )],
        );
        let ics = calendar.to_string();
        assert!(ics.contains("SUMMARY:Réunion"), "{ics}");
        assert!(ics.contains("LOCATION:Québec"), "{ics}");
        assert!(ics.contains("DTSTART:20250110T093000"), "{ics}");
        assert!(ics.contains("DTEND:20250110T103000"), "{ics}");
    }

    #[test]
    fn stored_end_times_override_the_default_duration() {
        let calendar = calendar_for(
            "jean-dupont",
            &[AgendaEvent::new(
                date(2025, 1, 10),
                Some(time(9, 0)),
                Some(time(11, 0)),
                "Commission parlementaire",
                None,
            )],
        );
        let ics = calendar.to_string();
        assert!(ics.contains("DTEND:20250110T110000"), "{ics}");
    }

    #[test]
    fn untimed_events_are_all_day() {
        let calendar = calendar_for(
            "jean-dupont",
            &[AgendaEvent::new(date(2025, 1, 10), None, None, "Visite régionale", None)],
        );
        let ics = calendar.to_string();
        assert!(ics.contains("DTSTART;VALUE=DATE:20250110"), "{ics}");
    }

    #[test]
    fn calendar_is_named_after_the_minister() {
        let calendar = calendar_for(
            "jean-dupont",
            &[AgendaEvent::new(date(2025, 1, 10), None, None, "Visite", None)],
        );
        let ics = calendar.to_string();
        assert!(ics.contains("BEGIN:VCALENDAR"), "{ics}");
        assert!(ics.contains("Agenda - Jean Dupont"), "{ics}");
        assert!(ics.contains("BEGIN:VEVENT"), "{ics}");
    }
}
