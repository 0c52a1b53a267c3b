use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use tracing::debug;

use crate::tasks::Task;
use crate::{Data, Error};

/// Sweeps expired requests once per second, in case a per-request timer was
/// lost (for example when the runtime was starved).
#[derive(Debug, Clone, Default)]
pub struct ExpireTask;

#[async_trait]
impl Task for ExpireTask {
    fn name(&self) -> &str {
        "TeleportExpiry"
    }

    fn schedule(&self) -> Option<Duration> {
        Some(Duration::from_secs(1))
    }

    async fn execute(&mut self, data: &Data) -> Result<(), Error> {
        let expired = data.tracker.expire(Utc::now()).await;
        if !expired.is_empty() {
            debug!("Expiry sweep removed {} requests", expired.len());
        }
        Ok(())
    }
}
