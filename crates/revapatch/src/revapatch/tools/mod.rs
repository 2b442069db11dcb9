//! Fetching and installing the external tools a run needs.

pub mod naming;
pub mod provision;
pub mod release;
