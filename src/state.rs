use std::sync::Arc;

use crate::clock::Clock;
use crate::config::Settings;
use crate::db::Pool;

#[derive(Clone)]
pub struct AppState {
    pub pool: Pool,
    pub settings: Arc<Settings>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(pool: Pool, settings: Settings, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            settings: Arc::new(settings),
            clock,
        }
    }
}
