//! Admin panel HTTP API
//!
//! Runs on its own multi-threaded runtime next to the gateway. Reads come
//! from the shared store and platform cache; publishing goes through the
//! bridge.

mod api;
mod logs;
mod server;

pub use api::ApiState;
pub use server::{start_web_server, WebServerConfig};
