//! Statistics routes

pub mod api;

pub use api::{api_server_stats, api_stats};
