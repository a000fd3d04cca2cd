use blog_common::db::RevocationStore;

use async_trait::async_trait;
use std::sync::Arc;

use crate::jobs::{Job, JobError};

/// Deletes revocation entries for tokens that have expired on their own. An expired
/// token is rejected on its expiration alone, so its entry no longer does anything.
pub struct PruneRevokedTokensJob {
    revocations: Arc<dyn RevocationStore>,
    is_running: bool,
}

impl PruneRevokedTokensJob {
    pub fn new(revocations: Arc<dyn RevocationStore>) -> Self {
        Self {
            revocations,
            is_running: false,
        }
    }
}

#[async_trait]
impl Job for PruneRevokedTokensJob {
    fn name(&self) -> &'static str {
        "Prune Revoked Tokens"
    }

    fn is_ready(&self) -> bool {
        !self.is_running
    }

    async fn execute(&mut self) -> Result<(), JobError> {
        self.is_running = true;

        let revocations = Arc::clone(&self.revocations);
        let result = tokio::task::spawn_blocking(move || revocations.clear_all_expired_tokens())
            .await
            .map_err(JobError::from)
            .and_then(|r| r.map_err(JobError::from));

        self.is_running = false;

        let pruned = result?;
        log::info!("Pruned {pruned} expired revocation entries");

        Ok(())
    }
}
