pub mod event;
pub mod fingerprint;
pub mod minister;

pub use event::AgendaEvent;
pub use fingerprint::{event_fingerprint, normalize_field};
pub use minister::{MinisterIdentity, MinisterStatus, display_name_from_slug, slugify};
