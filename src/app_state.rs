use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::config::Config;
use crate::db::{self, DbPool};
use crate::notify::Notifier;
use crate::otp::OtpStore;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub notifier: Notifier,
    pub otp_store: Arc<OtpStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn init(config: Config) -> Result<Self> {
        let db_pool = db::create_pool(&config.database.url).await?;
        let otp_store = Arc::new(OtpStore::new(Duration::from_secs(config.otp_ttl_secs)));
        Ok(Self {
            db_pool,
            notifier: Notifier::default(),
            otp_store,
            config: Arc::new(config),
        })
    }
}
