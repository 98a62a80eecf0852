//! Detour CLI - command line tools for the Detour routing server.
//!
//! Binaries:
//! - detour-route: request a hazard-aware route between two points
//! - detour-ingest: pull the road network for an area into the server's store

pub mod client;

pub use client::{DetourClient, NetworkStats};
