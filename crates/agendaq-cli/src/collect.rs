//! The collect run: resolve the roster, pull every minister's export,
//! merge into the store, journal the outcome.

use std::path::Path;

use agendaq_core::{MinisterIdentity, MinisterStatus};
use agendaq_scrape::{
    Fetcher, ParsedAgenda, RosterOutcome, find_export_url, parse_export, resolve_roster,
};
use agendaq_store::{AgendaStore, RunReport, journal};
use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

/// Published index of the Conseil des ministres agendas. Minister pages
/// hang off this URL by slug.
pub const PORTAL_URL: &str = "https://www.quebec.ca/gouvernement/gouvernement-ouvert/transparence-performance/agenda-membres-conseil-ministres";

pub async fn run(data_dir: &Path, base_url: &str, concurrency: usize) -> Result<()> {
    let store = AgendaStore::open(data_dir)
        .with_context(|| format!("opening the agenda store at {}", data_dir.display()))?;
    let mut report = RunReport::begin("collect");

    let outcome = collect_into(&store, base_url, concurrency, &mut report).await;
    if let Err(err) = &outcome {
        report.fatal = Some(format!("{err:#}"));
    }
    report.finish();
    if let Err(err) = journal::append(store.root(), &report) {
        warn!(error = %err, "could not append to the run journal");
    }
    outcome
}

async fn collect_into(
    store: &AgendaStore,
    base_url: &str,
    concurrency: usize,
    report: &mut RunReport,
) -> Result<()> {
    let fetcher = Fetcher::new().context("building the http client")?;

    let index_html = fetcher
        .fetch_text(base_url)
        .await
        .context("fetching the roster page")?;
    let RosterOutcome { ministers, warnings } =
        resolve_roster(&index_html).context("resolving the roster")?;
    for warning in &warnings {
        warn!(warning = %warning, "roster anomaly");
    }
    report.warnings.extend(warnings);
    report.roster_active = ministers
        .iter()
        .filter(|m| m.status == MinisterStatus::Active)
        .count();
    report.roster_inactive = ministers.len() - report.roster_active;

    // Reconcile partitions before fetching, so a minister whose pull fails
    // still sits under their current roster status.
    for minister in &ministers {
        if let Err(err) = store.set_status(&minister.slug, minister.status) {
            warn!(slug = %minister.slug, error = %err, "partition reconciliation failed");
            report.warnings.push(format!(
                "{}: partition reconciliation failed: {err}",
                minister.slug
            ));
        }
    }

    let mut pulls = stream::iter(ministers.into_iter().map(|minister| {
        let fetcher = &fetcher;
        async move {
            let pulled = pull_agenda(fetcher, base_url, &minister.slug).await;
            (minister, pulled)
        }
    }))
    .buffer_unordered(concurrency.max(1));

    while let Some((minister, pulled)) = pulls.next().await {
        record_pull(store, report, &minister, pulled);
    }

    info!(
        processed = report.ministers_processed,
        skipped = report.ministers_skipped.len(),
        added = report.events_added,
        duplicates = report.events_duplicate,
        rows_skipped = report.rows_skipped,
        "collect finished"
    );
    Ok(())
}

/// Fold one minister's pull into the store and the run report. A failed
/// pull or merge skips that minister only; the run keeps going.
fn record_pull(
    store: &AgendaStore,
    report: &mut RunReport,
    minister: &MinisterIdentity,
    pulled: Result<ParsedAgenda>,
) {
    match pulled {
        Ok(parsed) => {
            report.rows_skipped += parsed.skipped_rows;
            match store.merge(&minister.slug, minister.status, &parsed.events) {
                Ok(merged) => {
                    report.ministers_processed += 1;
                    report.events_added += merged.added;
                    report.events_duplicate += merged.duplicates;
                    info!(
                        slug = %minister.slug,
                        added = merged.added,
                        duplicates = merged.duplicates,
                        skipped_rows = parsed.skipped_rows,
                        "agenda merged"
                    );
                }
                Err(err) => {
                    warn!(slug = %minister.slug, error = %err, "merge failed");
                    report.skip(&minister.slug, format!("merge failed: {err}"));
                }
            }
        }
        Err(err) => {
            let reason = format!("{err:#}");
            warn!(slug = %minister.slug, error = %reason, "minister skipped");
            report.skip(&minister.slug, reason);
        }
    }
}

/// Pull one minister's agenda: detail page, export link, export body.
async fn pull_agenda(fetcher: &Fetcher, base_url: &str, slug: &str) -> Result<ParsedAgenda> {
    let page_url = format!("{}/{slug}", base_url.trim_end_matches('/'));
    let page_html = fetcher
        .fetch_text(&page_url)
        .await
        .context("fetching the minister page")?;
    let export_url = find_export_url(&page_html, &page_url)?;
    let export = fetcher
        .fetch_text(&export_url)
        .await
        .context("fetching the agenda export")?;
    Ok(parse_export(&export)?)
}
