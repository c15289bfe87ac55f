//! Application state injected into handlers and middleware.
//!
//! The database pool and the media store are constructed once in `run()` and
//! passed down explicitly so tests can build a state with no pool (handlers
//! answer 503 for store-backed paths) or with a substitute media store.

use std::sync::Arc;

use sqlx::PgPool;

use crate::error::ApiError;
use crate::media::MediaStore;

#[derive(Clone)]
pub struct AppState {
    pub db: Option<Arc<PgPool>>,
    pub media: Arc<dyn MediaStore>,
}

impl AppState {
    pub fn new(db: Option<Arc<PgPool>>, media: Arc<dyn MediaStore>) -> Self {
        Self { db, media }
    }

    /// Store-backed handlers call this first; without a pool they answer 503
    /// so validation paths stay exercisable in dev and tests.
    pub fn pool(&self) -> Result<&PgPool, ApiError> {
        self.db
            .as_deref()
            .ok_or_else(|| ApiError::Unavailable("Database not available".to_string()))
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("db", &self.db.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
impl AppState {
    /// State with no database and the default media client; tests exercise
    /// everything up to the first store round trip.
    pub fn for_tests() -> Self {
        Self {
            db: None,
            media: Arc::new(crate::media::CloudinaryStore::from_env()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_absent_is_unavailable() {
        let state = AppState::for_tests();
        let err = state.pool().unwrap_err();
        assert!(matches!(err, ApiError::Unavailable(_)));
    }
}
