use std::sync::Arc;

use crate::{config::AppConfig, db::Db, storage::ImageStore};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub images: ImageStore,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(db: Db, config: AppConfig) -> Self {
        Self {
            db,
            images: ImageStore::new(config.upload_dir.clone()),
            config: Arc::new(config),
        }
    }
}
