//! # forge_server
//!
//! Session router for Contract Forge: configuration, strategy wiring, and
//! the HTTP surface.
//!
//! # Routes
//!
//! - `POST /api/generation/generate-start` starts a session and returns at once
//! - `GET /api/generation/generate-stream/:session_id?userId=` is the SSE feed
//! - `GET /api/code/:cid` fetches a stored artifact
//! - `GET /` and `GET /health`

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::{GeneratorKind, Overrides, ServerConfig, StoreKind};
pub use error::{ApiError, ServerError, ServerResult};
pub use routes::router;
pub use state::AppState;
