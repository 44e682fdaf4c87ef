//! Govi API Library Crate
//!
//! This library contains all the logic for the Govi backend web service:
//! environment configuration, the shared application state, the HTTP
//! handlers and routing, and the background worker that attaches the
//! realtime voice agent to a room. The `bin/api.rs` binary is a thin
//! wrapper around this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
pub mod worker;
