//! HTTP API module: REST surface over the chat pipeline

pub mod handlers;
pub mod routes;
pub mod server;
pub mod types;

pub use server::serve_api;
