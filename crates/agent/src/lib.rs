//! Launchcast agent: serves launch-suitability predictions over HTTP
//!
//! Loads a trained artifact triple at startup and answers prediction,
//! schema, site, health and metrics requests.

pub mod api;
pub mod config;
