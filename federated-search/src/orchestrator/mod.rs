//! Query orchestrator: routing, concurrent fan-out, merge, calibration.
//!
//! A fresh text query picks its providers once, then every invocation of
//! the lineage fetches one page from each selected provider concurrently,
//! appends the pages to the session's windows and emits the prefix of the
//! merged order that is already safe.

pub mod dedup;
pub mod merge;
pub mod routing;
pub mod scoring;
pub mod search;
pub mod session;
