//! Tracks how much time you spend on every website. A browser extension reports tab and page
//! activity to a native messaging host, which aggregates it per domain and day. The same records
//! can be inspected and cleaned up from a terminal.
//!

pub mod cli;
pub mod host;
pub mod settings;
pub mod utils;
