//! Room Service library.
//!
//! A small collaborative selection service: a room holds a question and a
//! set of options, participants claim options (at most one participant per
//! option at a time), and viewers see a redacted projection of the room
//! depending on who they are.
//!
//! # Modules
//!
//! - `config` - Service configuration
//! - `errors` - Error types
//! - `handlers` - HTTP request handlers
//! - `middleware` - Session identity and metrics middleware
//! - `models` - Data models and request validation
//! - `observability` - Metrics definitions
//! - `projection` - Viewer-scoped room projection
//! - `routes` - Router and application state
//! - `services` - Selection engine
//! - `storage` - Storage adapter (Postgres + in-memory)

pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod projection;
pub mod routes;
pub mod services;
pub mod storage;
