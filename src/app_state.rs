use crate::config::Config;
use crate::media::MediaStore;
use crate::store::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub media: Arc<dyn MediaStore>,
    pub config: Config,
}

impl AppState {
    pub fn store(&self) -> &dyn Store {
        &*self.store
    }

    pub fn media(&self) -> &dyn MediaStore {
        &*self.media
    }
}
