//! The ical run: export persisted records as calendar files.

use std::path::Path;

use agendaq_store::ical::export_all;
use agendaq_store::{AgendaStore, RunReport, journal};
use anyhow::{Context, Result};
use tracing::{info, warn};

pub fn run(data_dir: &Path) -> Result<()> {
    let store = AgendaStore::open(data_dir)
        .with_context(|| format!("opening the agenda store at {}", data_dir.display()))?;
    let mut report = RunReport::begin("ical");

    let calendars = export_all(&store).context("exporting calendars")?;
    info!(calendars, "calendar export finished");

    report.finish();
    if let Err(err) = journal::append(store.root(), &report) {
        warn!(error = %err, "could not append to the run journal");
    }
    Ok(())
}
