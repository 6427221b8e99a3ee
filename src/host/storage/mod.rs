//!  Usage is stored through [usage_store::FileUsageStore].
//!  The basic idea is:
//!   - Time is aggregated per domain and local calendar day, never per visit.
//!   - All records live in a single JSON object keyed by `<domain>_<YYYY-MM-DD>`.
//!   - Every change is a read-modify-write under a file lock, so the host and the cli can share
//!     the directory.

pub mod entities;
pub mod ledger;
pub mod usage_store;
