//! Portal access: rotating-identity HTTP fetch, roster resolution, and
//! agenda export parsing. Every structural assumption about the portal's
//! markup lives in this crate.

pub mod agenda;
pub mod fetch;
pub mod identity;
pub mod roster;

pub use agenda::{ParseError, ParsedAgenda, find_export_url, parse_export};
pub use fetch::{FetchError, Fetcher};
pub use identity::{ClientIdentity, IdentityRotation, UserAgentPool};
pub use roster::{ResolutionError, RosterOutcome, resolve_roster};
