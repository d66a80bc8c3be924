//! The summarize run: render daily summaries over persisted records.

use std::path::Path;

use agendaq_store::summary::{self, DayWindow};
use agendaq_store::{AgendaStore, RunReport, journal};
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use tracing::{info, warn};

pub fn run(data_dir: &Path, days: u32, end_date: Option<NaiveDate>) -> Result<()> {
    let store = AgendaStore::open(data_dir)
        .with_context(|| format!("opening the agenda store at {}", data_dir.display()))?;
    let mut report = RunReport::begin("summarize");

    let end = end_date.unwrap_or_else(|| Local::now().date_naive());
    let window = DayWindow::trailing(end, days);

    let records = store.load_active().context("loading active records")?;
    let summaries = summary::build(&records, window);
    summary::write_summaries(store.root(), &summaries).context("writing daily summaries")?;
    info!(
        end = %window.end,
        days = window.days,
        ministers = records.len(),
        "daily summaries written"
    );

    report.finish();
    if let Err(err) = journal::append(store.root(), &report) {
        warn!(error = %err, "could not append to the run journal");
    }
    Ok(())
}
