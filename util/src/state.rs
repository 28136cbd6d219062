//! Application state container shared across Axum route handlers.
//!
//! Holds the database connection and the region cache. It is cloned into
//! route handlers via Axum's `State<T>` extractor.

use crate::cache::RegionCache;
use sea_orm::DatabaseConnection;

/// Central application state shared across the server.
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    cache: RegionCache,
}

impl AppState {
    /// Creates a new `AppState` with the given database connection and an
    /// empty region cache.
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            cache: RegionCache::new(),
        }
    }

    /// Returns a shared reference to the internal `DatabaseConnection`.
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Returns a shared reference to the region cache.
    pub fn cache(&self) -> &RegionCache {
        &self.cache
    }

    /// Returns a cloned copy of the database connection.
    ///
    /// Useful for async contexts or spawned tasks that require ownership.
    pub fn db_clone(&self) -> DatabaseConnection {
        self.db.clone()
    }
}
