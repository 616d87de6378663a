//! Refund routes

pub mod api;

pub use api::api_create_refund;
