//! Persistence layer: per-minister agenda records, daily summaries,
//! calendar export, and the run journal.

mod error;
pub use error::StoreError;

pub mod ical;
pub mod journal;
pub mod records;
pub mod summary;

pub use journal::RunReport;
pub use records::{AgendaStore, MergeResult};
pub use summary::{DailySummary, DayWindow, SummaryEntry};
