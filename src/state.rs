use std::sync::Arc;

use crate::config::Config;
use crate::history::RecipeLog;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub log: Arc<dyn RecipeLog>,
}

impl AppState {
    pub fn new(config: Config, log: Arc<dyn RecipeLog>) -> Self {
        AppState {
            config: Arc::new(config),
            log,
        }
    }
}
