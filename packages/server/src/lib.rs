// Product extraction API - server core
//
// HTTP surface for the product extraction pipeline: JWT-backed admin gate,
// the extraction endpoint, and a health check.

pub mod auth;
pub mod config;
pub mod server;

pub use config::*;
