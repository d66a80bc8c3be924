//! Roster resolution: who sits on the Conseil des ministres right now.
//!
//! The portal index page lists current members under `#ministres-actifs`
//! and former members under `#anciens-membres`. Each entry is a linked name
//! whose href ends with the minister's own page segment; that segment is
//! the slug the rest of the pipeline keys on.

use std::collections::HashSet;

use agendaq_core::{MinisterIdentity, MinisterStatus, display_name_from_slug, slugify};
use scraper::{Html, Selector};
use thiserror::Error;
use tracing::info;

const ACTIVE_SECTION: &str = "div#ministres-actifs";
const INACTIVE_SECTION: &str = "div#anciens-membres";
const MINISTER_LINKS: &str = "ul.ministres-list li.ministre-item a";

#[derive(Error, Debug)]
pub enum ResolutionError {
    /// Neither roster section produced a single usable entry.
    #[error("no ministers found on the roster page")]
    Empty,
}

/// Resolved roster plus the non-fatal oddities met while parsing it.
#[derive(Debug, Default)]
pub struct RosterOutcome {
    pub ministers: Vec<MinisterIdentity>,
    pub warnings: Vec<String>,
}

/// Parse the portal index page into the current roster.
///
/// Partial success is deliberate: a missing section becomes a warning and
/// the other section still resolves; only a page yielding no entry at all
/// is an error. Duplicate slugs keep their first occurrence, and the active
/// section is walked first, so a name listed in both sections stays active.
pub fn resolve_roster(index_html: &str) -> Result<RosterOutcome, ResolutionError> {
    let document = Html::parse_document(index_html);
    let mut outcome = RosterOutcome::default();
    let mut seen: HashSet<String> = HashSet::new();

    for (section_css, status) in [
        (ACTIVE_SECTION, MinisterStatus::Active),
        (INACTIVE_SECTION, MinisterStatus::Inactive),
    ] {
        let Ok(section_sel) = Selector::parse(section_css) else {
            continue;
        };
        let Ok(link_sel) = Selector::parse(MINISTER_LINKS) else {
            continue;
        };
        let Some(section) = document.select(&section_sel).next() else {
            outcome
                .warnings
                .push(format!("roster section {section_css} is missing"));
            continue;
        };

        for link in section.select(&link_sel) {
            let name = link.text().collect::<String>();
            let name = name.split_whitespace().collect::<Vec<_>>().join(" ");

            let slug = match link.value().attr("href").and_then(slug_from_href) {
                Some(slug) => slug,
                None => {
                    let derived = slugify(&name);
                    if derived.is_empty() {
                        outcome
                            .warnings
                            .push(format!("roster entry under {section_css} has no usable slug"));
                        continue;
                    }
                    derived
                }
            };

            if !seen.insert(slug.clone()) {
                outcome.warnings.push(format!(
                    "duplicate roster entry for {slug}, keeping the first"
                ));
                continue;
            }

            let name = if name.is_empty() {
                display_name_from_slug(&slug)
            } else {
                name
            };
            outcome.ministers.push(MinisterIdentity::new(name, slug, status));
        }
    }

    if outcome.ministers.is_empty() {
        return Err(ResolutionError::Empty);
    }

    let active = outcome
        .ministers
        .iter()
        .filter(|m| m.status == MinisterStatus::Active)
        .count();
    info!(
        active,
        inactive = outcome.ministers.len() - active,
        warnings = outcome.warnings.len(),
        "roster resolved"
    );
    Ok(outcome)
}

/// Last non-empty path segment of a roster link, query and fragment
/// stripped, lowercased.
fn slug_from_href(href: &str) -> Option<String> {
    let path = href.split(['?', '#']).next().unwrap_or(href);
    let segment = path.trim_end_matches('/').rsplit('/').next()?.trim();
    if segment.is_empty() {
        None
    } else {
        Some(segment.to_ascii_lowercase())
    }
}
