//! Persistence layer for the routing server.
//!
//! SQLite-backed road graph store plus read access to hazard reports.

pub mod db;
pub mod graph;
pub mod hazards;

pub use db::{init_database, Database};
pub use graph::{GraphCounts, NewEdge};
pub use hazards::SqliteHazardSource;
