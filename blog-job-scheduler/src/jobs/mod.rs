mod prune_revoked_tokens;

pub use prune_revoked_tokens::PruneRevokedTokensJob;

use blog_common::db::DaoError;

use async_trait::async_trait;
use std::fmt;
use tokio::task::JoinError;

#[derive(Debug)]
pub enum JobError {
    DaoFailure(Option<DaoError>),
    ConcurrencyError(JoinError),
    NotReady,
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobError::DaoFailure(e) => {
                if let Some(inner_err) = e {
                    write!(f, "JobError: {inner_err}")
                } else {
                    write!(f, "JobError: DaoFailure")
                }
            }
            JobError::ConcurrencyError(e) => {
                write!(f, "JobError: ConcurrencyError: {e}")
            }
            JobError::NotReady => {
                write!(f, "JobError: Attempted execution before job was ready")
            }
        }
    }
}

impl From<DaoError> for JobError {
    fn from(e: DaoError) -> Self {
        JobError::DaoFailure(Some(e))
    }
}

impl From<JoinError> for JobError {
    fn from(e: JoinError) -> Self {
        JobError::ConcurrencyError(e)
    }
}

#[async_trait]
pub trait Job: Send {
    fn name(&self) -> &'static str;
    fn is_ready(&self) -> bool;
    async fn execute(&mut self) -> Result<(), JobError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    pub struct MockJob {
        pub name: &'static str,
        pub is_ready: bool,
        pub fail: bool,
        pub runs: Arc<Mutex<usize>>,
    }

    impl MockJob {
        pub fn new(name: &'static str) -> Self {
            Self {
                name,
                is_ready: true,
                fail: false,
                runs: Arc::new(Mutex::new(0)),
            }
        }
    }

    #[async_trait]
    impl Job for MockJob {
        fn name(&self) -> &'static str {
            self.name
        }

        fn is_ready(&self) -> bool {
            self.is_ready
        }

        async fn execute(&mut self) -> Result<(), JobError> {
            if !self.is_ready {
                return Err(JobError::NotReady);
            }

            *self.runs.lock().unwrap() += 1;

            if self.fail {
                Err(JobError::DaoFailure(None))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_mock_job_execute() {
        let mut job = MockJob::new("Mock");
        let job_run_count = Arc::clone(&job.runs);

        job.is_ready = false;
        assert!(matches!(
            job.execute().await.unwrap_err(),
            JobError::NotReady
        ));
        assert_eq!(*job_run_count.lock().unwrap(), 0);

        job.is_ready = true;
        job.execute().await.unwrap();
        assert_eq!(*job_run_count.lock().unwrap(), 1);
    }

    #[test]
    fn test_job_error_display() {
        assert_eq!(
            JobError::DaoFailure(Some(DaoError::WontRunQuery)).to_string(),
            "JobError: DaoError: DAO will not run query"
        );
        assert_eq!(
            JobError::DaoFailure(None).to_string(),
            "JobError: DaoFailure"
        );
    }
}
