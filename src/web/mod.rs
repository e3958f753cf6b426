//! HTTP surface of the gateway.

pub mod adhoc;
pub mod error;
pub mod homepage;
pub mod middleware;
pub mod routes;

pub use routes::*;
