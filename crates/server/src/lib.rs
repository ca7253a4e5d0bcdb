//! HTTP and WebSocket front end for the shopwise sales agent.

pub mod bootstrap;
pub mod health;
pub mod routes;

pub use bootstrap::{bootstrap, bootstrap_with_config, Application, BootstrapError};
pub use routes::{router, AppState};
