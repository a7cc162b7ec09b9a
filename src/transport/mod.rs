//! The `transport` module exposes the bridge over HTTP.
//!
//! `rest` holds the axum router and its handlers; `response` turns broker
//! failures into the JSON error body every failing route returns.

pub mod response;
pub mod rest;

pub use response::ApiError;
pub use rest::{router, serve};
