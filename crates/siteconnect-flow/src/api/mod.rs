//! Connection backend API

mod client;
mod types;

pub use client::{BackendApiClient, ConnectionApi};
pub use types::{AuthUrlResponse, StatusResponse};
