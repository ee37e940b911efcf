use std::sync::Arc;

use tracing::error;

use leafcare_db::Database;

use crate::ai::TextModel;
use crate::detection::Classifier;
use crate::error::ApiError;
use crate::events::Revalidator;
use crate::storage::ObjectStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub storage: ObjectStore,
    pub model: TextModel,
    pub classifier: Classifier,
    pub revalidator: Revalidator,
}

impl AppStateInner {
    /// Runs a blocking DB call off the async runtime.
    pub async fn db<F, T>(self: &Arc<Self>, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let state = self.clone();
        tokio::task::spawn_blocking(move || f(&state.db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ApiError::Internal(e.into())
            })?
            .map_err(ApiError::from)
    }
}
