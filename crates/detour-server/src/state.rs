//! Shared application state.

use crate::config::Config;
use crate::pathfinder::Pathfinder;
use crate::persistence::Database;

pub struct AppState {
    pub pathfinder: Pathfinder,
    pub config: Config,
    db: Database,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        let pathfinder = Pathfinder::from_config(db.pool().clone(), &config);
        Self::with_pathfinder(db, config, pathfinder)
    }

    pub fn with_pathfinder(db: Database, config: Config, pathfinder: Pathfinder) -> Self {
        Self {
            pathfinder,
            config,
            db,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}
