//! Application state shared across all handlers

use sea_orm::DatabaseConnection;

use crate::services::allocation_service::LineLocks;

/// Application state: the database connection plus the per-equipment-line
/// lock registry every claim/release serializes on.
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    pub line_locks: LineLocks,
}

impl AppState {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            line_locks: LineLocks::new(),
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl AsRef<DatabaseConnection> for AppState {
    fn as_ref(&self) -> &DatabaseConnection {
        &self.db
    }
}

// Allow handlers that only need the connection to extract it directly
impl axum::extract::FromRef<AppState> for DatabaseConnection {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
