//! Detour server: road graph store, network ingestion, pathfinding service
//! and the HTTP API around them.

pub mod api;
pub mod backoff;
pub mod config;
pub mod ingest;
pub mod ledger;
pub mod pathfinder;
pub mod persistence;
pub mod state;
pub mod workers;
