//! `helpdesk-server` exposes the helpdesk assistant over HTTP.
//!
//! Messages go to `POST /api/messages`, feedback button presses to
//! `POST /api/feedback`. The catalogue is fully indexed before the listener
//! binds, so every accepted request can be answered.

pub mod config;
pub mod server;

pub use config::{EmbedderKind, ServerConfig};
pub use server::{AppState, app_router, run_server};
