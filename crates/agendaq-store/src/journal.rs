//! Append-only run journal.
//!
//! One JSON line per pipeline run, written to `<data_dir>/runs.log` from
//! the coordinating task once the run is over. Operators read it; the
//! pipeline itself never does.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::StoreError;

pub const JOURNAL_FILE: &str = "runs.log";

/// Outcome of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(default)]
    pub roster_active: usize,
    #[serde(default)]
    pub roster_inactive: usize,
    #[serde(default)]
    pub ministers_processed: usize,
    #[serde(default)]
    pub ministers_skipped: Vec<SkippedMinister>,
    #[serde(default)]
    pub events_added: usize,
    #[serde(default)]
    pub events_duplicate: usize,
    #[serde(default)]
    pub rows_skipped: usize,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fatal: Option<String>,
}

/// A minister the run gave up on, and why.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedMinister {
    pub slug: String,
    pub reason: String,
}

impl RunReport {
    /// Fresh report for a run starting now.
    pub fn begin(run: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            run: run.into(),
            started_at: now,
            finished_at: now,
            roster_active: 0,
            roster_inactive: 0,
            ministers_processed: 0,
            ministers_skipped: Vec::new(),
            events_added: 0,
            events_duplicate: 0,
            rows_skipped: 0,
            warnings: Vec::new(),
            fatal: None,
        }
    }

    /// Record a minister as skipped.
    pub fn skip(&mut self, slug: impl Into<String>, reason: impl Into<String>) {
        self.ministers_skipped.push(SkippedMinister {
            slug: slug.into(),
            reason: reason.into(),
        });
    }

    /// Stamp the finish time.
    pub fn finish(&mut self) {
        self.finished_at = Utc::now();
    }
}

/// Append one report as a JSON line to the journal.
pub fn append(data_dir: &Path, report: &RunReport) -> Result<(), StoreError> {
    let path = data_dir.join(JOURNAL_FILE);
    let mut line = serde_json::to_string(report)?;
    line.push('\n');

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|err| StoreError::io(&path, err))?;
    file.write_all(line.as_bytes())
        .map_err(|err| StoreError::io(&path, err))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn appends_one_json_line_per_run() {
        let tmp = TempDir::new().unwrap();

        let mut first = RunReport::begin("collect");
        first.roster_active = 3;
        first.events_added = 5;
        first.finish();
        append(tmp.path(), &first).unwrap();

        let mut second = RunReport::begin("summarize");
        second.warnings.push("roster section missing".into());
        second.finish();
        append(tmp.path(), &second).unwrap();

        let raw = std::fs::read_to_string(tmp.path().join(JOURNAL_FILE)).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2, "earlier runs must survive later appends");

        let parsed: RunReport = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.run, "collect");
        assert_eq!(parsed.roster_active, 3);
        assert_eq!(parsed.events_added, 5);

        let parsed: RunReport = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed.run, "summarize");
        assert_eq!(parsed.warnings.len(), 1);
        assert!(parsed.fatal.is_none());
    }

    #[test]
    fn fatal_outcomes_round_trip() {
        let tmp = TempDir::new().unwrap();
        let mut report = RunReport::begin("collect");
        report.fatal = Some("no ministers found on the roster page".into());
        report.skip("jean-dupont", "structural break");
        report.finish();
        append(tmp.path(), &report).unwrap();

        let raw = std::fs::read_to_string(tmp.path().join(JOURNAL_FILE)).unwrap();
        let parsed: RunReport = serde_json::from_str(raw.trim()).unwrap();
        assert_eq!(parsed.fatal.as_deref(), Some("no ministers found on the roster page"));
        assert_eq!(parsed.ministers_skipped[0].slug, "jean-dupont");
    }
}
