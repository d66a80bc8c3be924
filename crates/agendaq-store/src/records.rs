//! Per-minister agenda records.
//!
//! One comma-delimited CSV per minister under the partition directory
//! matching their status (`active/` or `inactive/`), header
//! `date,start_time,end_time,title,location`, ISO dates and `HH:MM` times.
//! Merging is a fingerprint-keyed set union, and every rewrite goes
//! through a temp file and an atomic rename so a crash can never leave a
//! half-written record behind.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use agendaq_core::{AgendaEvent, MinisterStatus};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::StoreError;

const RECORD_HEADER: [&str; 5] = ["date", "start_time", "end_time", "title", "location"];

/// Counts from one merge pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeResult {
    pub added: usize,
    pub duplicates: usize,
}

/// Store of per-minister agenda records under one data root.
pub struct AgendaStore {
    root: PathBuf,
}

/// Wire shape of one persisted row; absent optionals are empty strings.
#[derive(Debug, Serialize, Deserialize)]
struct StoredRow {
    date: String,
    start_time: String,
    end_time: String,
    title: String,
    location: String,
}

impl StoredRow {
    fn from_event(event: &AgendaEvent) -> Self {
        Self {
            date: event.date.format("%Y-%m-%d").to_string(),
            start_time: format_optional_time(event.start_time),
            end_time: format_optional_time(event.end_time),
            title: event.title.clone(),
            location: event.location.clone().unwrap_or_default(),
        }
    }

    /// Rehydrate an event; the fingerprint is recomputed from the stored
    /// fields, so the file carries no derivable columns.
    fn into_event(self, path: &Path) -> Result<AgendaEvent, StoreError> {
        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").map_err(|err| {
            StoreError::MalformedRecord {
                path: path.to_path_buf(),
                message: format!("bad date {:?}: {err}", self.date),
            }
        })?;
        let start_time = parse_optional_time(&self.start_time, path)?;
        let end_time = parse_optional_time(&self.end_time, path)?;
        let location = if self.location.is_empty() {
            None
        } else {
            Some(self.location)
        };
        Ok(AgendaEvent::new(date, start_time, end_time, self.title, location))
    }
}

fn format_optional_time(time: Option<NaiveTime>) -> String {
    time.map(|t| t.format("%H:%M").to_string()).unwrap_or_default()
}

fn parse_optional_time(raw: &str, path: &Path) -> Result<Option<NaiveTime>, StoreError> {
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveTime::parse_from_str(raw, "%H:%M")
        .map(Some)
        .map_err(|err| StoreError::MalformedRecord {
            path: path.to_path_buf(),
            message: format!("bad time {raw:?}: {err}"),
        })
}

impl AgendaStore {
    /// Open a store rooted at `root`, creating both partition directories.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        for status in [MinisterStatus::Active, MinisterStatus::Inactive] {
            let dir = root.join(status.as_str());
            fs::create_dir_all(&dir).map_err(|err| StoreError::io(&dir, err))?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, status: MinisterStatus, slug: &str) -> PathBuf {
        self.root.join(status.as_str()).join(format!("{slug}.csv"))
    }

    /// Partition a slug's record currently lives in, if any.
    pub fn status_of(&self, slug: &str) -> Option<MinisterStatus> {
        [MinisterStatus::Active, MinisterStatus::Inactive]
            .into_iter()
            .find(|status| self.record_path(*status, slug).exists())
    }

    // ── Reads ──

    /// Load one minister's record from whichever partition holds it.
    /// A missing record is an empty record.
    pub fn load(&self, slug: &str) -> Result<Vec<AgendaEvent>, StoreError> {
        match self.status_of(slug) {
            Some(status) => self.load_from(&self.record_path(status, slug)),
            None => Ok(Vec::new()),
        }
    }

    /// All records currently in the active partition, keyed by slug.
    pub fn load_active(&self) -> Result<BTreeMap<String, Vec<AgendaEvent>>, StoreError> {
        self.load_partition(MinisterStatus::Active)
    }

    /// All records in one partition, keyed by slug in sorted order.
    pub fn load_partition(
        &self,
        status: MinisterStatus,
    ) -> Result<BTreeMap<String, Vec<AgendaEvent>>, StoreError> {
        let dir = self.root.join(status.as_str());
        let mut records = BTreeMap::new();
        let entries = fs::read_dir(&dir).map_err(|err| StoreError::io(&dir, err))?;
        for entry in entries {
            let entry = entry.map_err(|err| StoreError::io(&dir, err))?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("csv") {
                continue;
            }
            let Some(slug) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            records.insert(slug.to_string(), self.load_from(&path)?);
        }
        Ok(records)
    }

    fn load_from(&self, path: &Path) -> Result<Vec<AgendaEvent>, StoreError> {
        let file = fs::File::open(path).map_err(|err| StoreError::io(path, err))?;
        let mut reader = csv::Reader::from_reader(file);
        let mut events = Vec::new();
        for row in reader.deserialize::<StoredRow>() {
            events.push(row?.into_event(path)?);
        }
        Ok(events)
    }

    // ── Writes ──

    /// Merge freshly parsed events into a minister's record.
    ///
    /// Events whose fingerprint is already present count as duplicates; the
    /// rest are appended. The full record is then re-sorted and atomically
    /// replaced in the `status` partition, and any counterpart file in the
    /// other partition is removed so partitions stay exclusive. A failed
    /// merge leaves the prior persisted state untouched.
    pub fn merge(
        &self,
        slug: &str,
        status: MinisterStatus,
        new_events: &[AgendaEvent],
    ) -> Result<MergeResult, StoreError> {
        let mut events = self.load(slug)?;
        let mut known: HashSet<String> = events
            .iter()
            .map(|event| event.source_row_hash.clone())
            .collect();

        let mut result = MergeResult::default();
        for event in new_events {
            if known.insert(event.source_row_hash.clone()) {
                events.push(event.clone());
                result.added += 1;
            } else {
                result.duplicates += 1;
            }
        }

        events.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        self.write_record(status, slug, &events)?;
        self.remove_counterpart(status, slug)?;

        debug!(
            slug,
            added = result.added,
            duplicates = result.duplicates,
            "merged record"
        );
        Ok(result)
    }

    /// Move a minister's record into `status`, idempotently.
    ///
    /// No-op when the record is already there or does not exist at all.
    /// When files exist in both partitions (crash remnant), their event
    /// sets are unioned by fingerprint before the move so nothing is lost
    /// or duplicated.
    pub fn set_status(&self, slug: &str, status: MinisterStatus) -> Result<(), StoreError> {
        let target = self.record_path(status, slug);
        let counterpart = self.record_path(status.other(), slug);

        match (target.exists(), counterpart.exists()) {
            (_, false) => Ok(()),
            (false, true) => {
                fs::rename(&counterpart, &target).map_err(|err| StoreError::io(&target, err))?;
                info!(slug, status = %status, "record moved between partitions");
                Ok(())
            }
            (true, true) => {
                let mut events = self.load_from(&target)?;
                let known: HashSet<String> = events
                    .iter()
                    .map(|event| event.source_row_hash.clone())
                    .collect();
                for event in self.load_from(&counterpart)? {
                    if !known.contains(&event.source_row_hash) {
                        events.push(event);
                    }
                }
                events.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
                self.write_record(status, slug, &events)?;
                self.remove_counterpart(status, slug)?;
                info!(slug, status = %status, "unioned a both-partition remnant");
                Ok(())
            }
        }
    }

    fn write_record(
        &self,
        status: MinisterStatus,
        slug: &str,
        events: &[AgendaEvent],
    ) -> Result<(), StoreError> {
        let dir = self.root.join(status.as_str());
        let tmp = NamedTempFile::new_in(&dir).map_err(|err| StoreError::io(&dir, err))?;
        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(tmp.as_file());
            writer.write_record(RECORD_HEADER)?;
            for event in events {
                writer.serialize(StoredRow::from_event(event))?;
            }
            writer.flush().map_err(|err| StoreError::io(&dir, err))?;
        }
        let path = self.record_path(status, slug);
        tmp.persist(&path)
            .map_err(|err| StoreError::io(&path, err.error))?;
        Ok(())
    }

    fn remove_counterpart(&self, status: MinisterStatus, slug: &str) -> Result<(), StoreError> {
        let other = self.record_path(status.other(), slug);
        match fs::remove_file(&other) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::io(&other, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn event(d: NaiveDate, t: Option<NaiveTime>, title: &str) -> AgendaEvent {
        AgendaEvent::new(d, t, None, title, Some("Québec".into()))
    }

    #[test]
    fn open_creates_both_partitions() {
        let tmp = TempDir::new().unwrap();
        let store = AgendaStore::open(tmp.path()).unwrap();
        assert!(store.root().join("active").is_dir());
        assert!(store.root().join("inactive").is_dir());
    }

    #[test]
    fn merge_then_reload_round_trips() {
        let tmp = TempDir::new().unwrap();
        let store = AgendaStore::open(tmp.path()).unwrap();
        let events = vec![
            event(date(2025, 1, 10), Some(time(10, 0)), "Réunion"),
            event(date(2025, 1, 11), None, "Visite régionale"),
        ];

        let result = store
            .merge("jean-dupont", MinisterStatus::Active, &events)
            .unwrap();
        assert_eq!(result, MergeResult { added: 2, duplicates: 0 });

        let loaded = store.load("jean-dupont").unwrap();
        assert_eq!(loaded, events, "stored fields and fingerprints survive the round trip");
    }

    #[test]
    fn second_merge_of_identical_content_is_pure_duplicates() {
        let tmp = TempDir::new().unwrap();
        let store = AgendaStore::open(tmp.path()).unwrap();
        let events = vec![
            event(date(2025, 1, 10), Some(time(10, 0)), "Réunion"),
            event(date(2025, 1, 10), Some(time(14, 0)), "Conférence"),
        ];

        store.merge("jean-dupont", MinisterStatus::Active, &events).unwrap();
        let second = store
            .merge("jean-dupont", MinisterStatus::Active, &events)
            .unwrap();

        assert_eq!(second.added, 0);
        assert_eq!(second.duplicates, events.len());
        assert_eq!(store.load("jean-dupont").unwrap().len(), 2);
    }

    #[test]
    fn merge_with_one_new_and_one_known_event() {
        // The worked example: a stored 10:00 Réunion, then a fetch that
        // returns the same row plus a new 14:00 Conférence.
        let tmp = TempDir::new().unwrap();
        let store = AgendaStore::open(tmp.path()).unwrap();
        let reunion = event(date(2025, 1, 10), Some(time(10, 0)), "Réunion");
        store
            .merge("jean-dupont", MinisterStatus::Active, &[reunion.clone()])
            .unwrap();

        let fetched = vec![
            reunion,
            event(date(2025, 1, 10), Some(time(14, 0)), "Conférence"),
        ];
        let result = store
            .merge("jean-dupont", MinisterStatus::Active, &fetched)
            .unwrap();

        assert_eq!(result, MergeResult { added: 1, duplicates: 1 });
        let loaded = store.load("jean-dupont").unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].title, "Réunion");
        assert_eq!(loaded[1].title, "Conférence", "record stays time-sorted");
    }

    #[test]
    fn whitespace_drift_in_the_source_does_not_duplicate() {
        let tmp = TempDir::new().unwrap();
        let store = AgendaStore::open(tmp.path()).unwrap();
        let original = AgendaEvent::new(
            date(2025, 1, 10),
            Some(time(10, 0)),
            None,
            "Conseil des ministres",
            Some("Québec".into()),
        );
        let drifted = AgendaEvent::new(
            date(2025, 1, 10),
            Some(time(10, 0)),
            None,
            "  Conseil  DES  ministres ",
            Some("QUÉBEC".into()),
        );

        store.merge("jean-dupont", MinisterStatus::Active, &[original]).unwrap();
        let result = store
            .merge("jean-dupont", MinisterStatus::Active, &[drifted])
            .unwrap();
        assert_eq!(result, MergeResult { added: 0, duplicates: 1 });
    }

    #[test]
    fn merging_never_shrinks_history() {
        let tmp = TempDir::new().unwrap();
        let store = AgendaStore::open(tmp.path()).unwrap();
        let full = vec![
            event(date(2025, 1, 10), Some(time(10, 0)), "Réunion"),
            event(date(2025, 1, 11), Some(time(9, 0)), "Annonce"),
        ];
        store.merge("jean-dupont", MinisterStatus::Active, &full).unwrap();

        // The source now publishes only one of the two rows.
        store
            .merge("jean-dupont", MinisterStatus::Active, &full[..1])
            .unwrap();
        assert_eq!(
            store.load("jean-dupont").unwrap().len(),
            2,
            "previously stored events must survive a shrunken fetch"
        );
    }

    #[test]
    fn merge_keeps_partitions_exclusive() {
        let tmp = TempDir::new().unwrap();
        let store = AgendaStore::open(tmp.path()).unwrap();
        let events = vec![event(date(2025, 1, 10), None, "Réunion")];

        store.merge("jean-dupont", MinisterStatus::Active, &events).unwrap();
        assert_eq!(store.status_of("jean-dupont"), Some(MinisterStatus::Active));

        // Status change observed at merge time.
        store.merge("jean-dupont", MinisterStatus::Inactive, &events).unwrap();
        assert_eq!(store.status_of("jean-dupont"), Some(MinisterStatus::Inactive));
        assert!(!store.root().join("active/jean-dupont.csv").exists());
    }

    #[test]
    fn set_status_moves_without_losing_events() {
        let tmp = TempDir::new().unwrap();
        let store = AgendaStore::open(tmp.path()).unwrap();
        let events = vec![
            event(date(2025, 1, 10), Some(time(10, 0)), "Réunion"),
            event(date(2025, 1, 11), None, "Visite"),
        ];
        store.merge("jean-dupont", MinisterStatus::Active, &events).unwrap();

        store.set_status("jean-dupont", MinisterStatus::Inactive).unwrap();
        assert_eq!(store.status_of("jean-dupont"), Some(MinisterStatus::Inactive));
        assert_eq!(store.load("jean-dupont").unwrap(), events);
    }

    #[test]
    fn set_status_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = AgendaStore::open(tmp.path()).unwrap();
        store
            .merge(
                "jean-dupont",
                MinisterStatus::Active,
                &[event(date(2025, 1, 10), None, "Réunion")],
            )
            .unwrap();

        store.set_status("jean-dupont", MinisterStatus::Active).unwrap();
        store.set_status("jean-dupont", MinisterStatus::Active).unwrap();
        assert_eq!(store.status_of("jean-dupont"), Some(MinisterStatus::Active));
        assert_eq!(store.load("jean-dupont").unwrap().len(), 1);
    }

    #[test]
    fn set_status_for_unknown_slug_is_a_no_op() {
        let tmp = TempDir::new().unwrap();
        let store = AgendaStore::open(tmp.path()).unwrap();
        store.set_status("inconnu", MinisterStatus::Inactive).unwrap();
        assert_eq!(store.status_of("inconnu"), None);
    }

    #[test]
    fn set_status_unions_a_both_partition_remnant() {
        let tmp = TempDir::new().unwrap();
        let store = AgendaStore::open(tmp.path()).unwrap();
        let shared = event(date(2025, 1, 10), Some(time(10, 0)), "Réunion");
        let active_only = event(date(2025, 1, 11), Some(time(9, 0)), "Annonce");
        let inactive_only = event(date(2025, 1, 12), None, "Visite");

        // Simulate a crash that left the slug in both partitions.
        store
            .write_record(
                MinisterStatus::Active,
                "jean-dupont",
                &[shared.clone(), active_only.clone()],
            )
            .unwrap();
        store
            .write_record(
                MinisterStatus::Inactive,
                "jean-dupont",
                &[shared.clone(), inactive_only.clone()],
            )
            .unwrap();

        store.set_status("jean-dupont", MinisterStatus::Active).unwrap();
        assert_eq!(store.status_of("jean-dupont"), Some(MinisterStatus::Active));
        let loaded = store.load("jean-dupont").unwrap();
        assert_eq!(loaded, vec![shared, active_only, inactive_only]);
    }

    #[test]
    fn load_active_keys_by_slug_in_sorted_order() {
        let tmp = TempDir::new().unwrap();
        let store = AgendaStore::open(tmp.path()).unwrap();
        store
            .merge(
                "marie-tremblay",
                MinisterStatus::Active,
                &[event(date(2025, 1, 10), None, "Annonce")],
            )
            .unwrap();
        store
            .merge(
                "jean-dupont",
                MinisterStatus::Active,
                &[event(date(2025, 1, 10), None, "Réunion")],
            )
            .unwrap();
        store
            .merge(
                "ancien-ministre",
                MinisterStatus::Inactive,
                &[event(date(2025, 1, 10), None, "Entrevue")],
            )
            .unwrap();

        let active = store.load_active().unwrap();
        let slugs: Vec<&str> = active.keys().map(String::as_str).collect();
        assert_eq!(slugs, vec!["jean-dupont", "marie-tremblay"]);
    }

    #[test]
    fn empty_record_file_loads_as_empty() {
        let tmp = TempDir::new().unwrap();
        let store = AgendaStore::open(tmp.path()).unwrap();
        store.write_record(MinisterStatus::Active, "jean-dupont", &[]).unwrap();
        assert_eq!(store.load("jean-dupont").unwrap(), Vec::new());
    }

    #[test]
    fn record_files_use_the_documented_format() {
        let tmp = TempDir::new().unwrap();
        let store = AgendaStore::open(tmp.path()).unwrap();
        store
            .merge(
                "jean-dupont",
                MinisterStatus::Active,
                &[event(date(2025, 1, 10), Some(time(9, 30)), "Réunion")],
            )
            .unwrap();

        let raw = fs::read_to_string(store.root().join("active/jean-dupont.csv")).unwrap();
        let mut lines = raw.lines();
        assert_eq!(lines.next(), Some("date,start_time,end_time,title,location"));
        assert_eq!(lines.next(), Some("2025-01-10,09:30,,Réunion,Québec"));
    }

    #[test]
    fn corrupt_record_is_reported_with_its_path() {
        let tmp = TempDir::new().unwrap();
        let store = AgendaStore::open(tmp.path()).unwrap();
        let path = store.root().join("active/jean-dupont.csv");
        fs::write(
            &path,
            "date,start_time,end_time,title,location\nnot-a-date,,,Réunion,\n",
        )
        .unwrap();

        let err = store.load("jean-dupont").unwrap_err();
        assert!(matches!(err, StoreError::MalformedRecord { .. }), "{err}");
        assert!(err.to_string().contains("jean-dupont.csv"));
    }
}
