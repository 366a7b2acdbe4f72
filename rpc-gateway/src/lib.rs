//! HTTP gateway for the splitledger RPC surface
//!
//! A single `POST /` endpoint takes `{"module", "method", "params"}` and runs
//! the matching ledger operation against the tenant named in the params.

pub mod config;
pub mod dispatch;
pub mod errors;
pub mod handlers;
pub mod models;

pub use config::Config;
pub use dispatch::Dispatcher;
pub use errors::{GatewayError, Result};
pub use handlers::AppState;
