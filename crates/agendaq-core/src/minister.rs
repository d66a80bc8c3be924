//! Minister identities as listed on the Conseil des ministres portal.
//!
//! A minister is keyed by `slug` everywhere in the pipeline: the roster
//! page, the on-disk record files, and the calendar exports all use the
//! same identifier, so a cabinet member keeps their history across runs
//! even when the portal reorders or restyles the listing.

use serde::{Deserialize, Serialize};

/// Whether a minister currently sits on the Conseil des ministres.
///
/// Doubles as the name of the storage partition their records live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MinisterStatus {
    Active,
    Inactive,
}

impl MinisterStatus {
    /// Directory name of the partition this status maps to.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    /// The opposite partition.
    pub fn other(&self) -> Self {
        match self {
            Self::Active => Self::Inactive,
            Self::Inactive => Self::Active,
        }
    }
}

impl std::fmt::Display for MinisterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One roster entry scraped from the portal index page.
///
/// Two entries describe the same minister exactly when their slugs match;
/// `name` is display text and may drift between runs without changing
/// identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinisterIdentity {
    pub name: String,
    pub slug: String,
    pub status: MinisterStatus,
}

impl MinisterIdentity {
    pub fn new(name: impl Into<String>, slug: impl Into<String>, status: MinisterStatus) -> Self {
        Self {
            name: name.into(),
            slug: slug.into(),
            status,
        }
    }
}

/// Derive a stable identifier from a display name.
///
/// Lowercases, folds French diacritics to their ASCII base letters, and
/// collapses every other run of non-alphanumeric characters into a single
/// `-`: `"Ève Côté-Tremblay"` becomes `"eve-cote-tremblay"`.
///
/// The portal URL's trailing path segment is preferred as the slug when
/// present; this is the fallback for roster entries whose link omits one.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_dash = true;
    for c in name.chars() {
        match fold_diacritic(c) {
            Some(folded) => {
                for f in folded.chars() {
                    push_slug_char(&mut out, f, &mut prev_dash);
                }
            }
            None => push_slug_char(&mut out, c, &mut prev_dash),
        }
    }
    if out.ends_with('-') {
        out.pop();
    }
    out
}

fn push_slug_char(out: &mut String, c: char, prev_dash: &mut bool) {
    let c = c.to_ascii_lowercase();
    if c.is_ascii_alphanumeric() {
        out.push(c);
        *prev_dash = false;
    } else if !*prev_dash {
        out.push('-');
        *prev_dash = true;
    }
}

/// ASCII base letters for the diacritics that occur in Québécois names.
fn fold_diacritic(c: char) -> Option<&'static str> {
    let folded = match c {
        'à' | 'â' | 'ä' => "a",
        'À' | 'Â' | 'Ä' => "A",
        'ç' => "c",
        'Ç' => "C",
        'é' | 'è' | 'ê' | 'ë' => "e",
        'É' | 'È' | 'Ê' | 'Ë' => "E",
        'î' | 'ï' => "i",
        'Î' | 'Ï' => "I",
        'ô' | 'ö' => "o",
        'Ô' | 'Ö' => "O",
        'ù' | 'û' | 'ü' => "u",
        'Ù' | 'Û' | 'Ü' => "U",
        'ÿ' => "y",
        'œ' => "oe",
        'Œ' => "OE",
        'æ' => "ae",
        'Æ' => "AE",
        _ => return None,
    };
    Some(folded)
}

/// Reconstruct a display name from a slug: `jean-dupont` -> `Jean Dupont`.
///
/// Lossy inverse of [`slugify`] (folded diacritics stay folded). Used by
/// consumers that only see persisted record files, which are keyed by slug.
pub fn display_name_from_slug(slug: &str) -> String {
    slug.split('-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
