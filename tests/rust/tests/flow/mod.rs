//! Connection flow integration tests
//!
//! Drive `ConnectionService` end to end against the mock window host,
//! mock backend and in-memory browser storage.

mod popup;
mod status;
