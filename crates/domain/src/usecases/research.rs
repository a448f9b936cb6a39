//! Research status use case - reads deep research job snapshots

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    mock,
    model::ResearchJob,
    ports::{Clock, ResearchClient, ResearchError, ResearchStatusSource},
};

/// Body returned by `/research-status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    #[serde(flatten)]
    pub job: ResearchJob,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_mock_data: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct ResearchStatusUseCase {
    client: Option<Arc<dyn ResearchClient>>,
    clock: Arc<dyn Clock>,
}

impl ResearchStatusUseCase {
    pub fn new(client: Option<Arc<dyn ResearchClient>>, clock: Arc<dyn Clock>) -> Self {
        Self { client, clock }
    }

    /// Status for the HTTP surface. Mock ids, a missing credential and API
    /// failures all produce a mock snapshot instead of an error.
    pub async fn status(&self, job_id: &str) -> Result<StatusReport, ResearchError> {
        let job_id = require_job_id(job_id)?;

        match self.fetch(job_id).await {
            Some(Ok(job)) => Ok(StatusReport {
                job,
                is_mock_data: false,
                error: None,
            }),
            Some(Err(e)) => {
                tracing::warn!(job_id, error = %e, "Status read failed, serving mock snapshot");
                Ok(StatusReport {
                    job: mock::research_status(job_id, self.clock.now()),
                    is_mock_data: true,
                    error: Some(e.to_string()),
                })
            }
            None => Ok(StatusReport {
                job: mock::research_status(job_id, self.clock.now()),
                is_mock_data: true,
                error: None,
            }),
        }
    }

    /// Real snapshot, or `None` when the job can only be answered with mock
    /// data (mock id or no client)
    async fn fetch(&self, job_id: &str) -> Option<Result<ResearchJob, ResearchError>> {
        if mock::is_mock_job_id(job_id) {
            return None;
        }
        let client = self.client.as_ref()?;

        Some(client.status(job_id).await.map(|mut job| {
            if job.job_id.is_empty() {
                job.job_id = job_id.to_string();
            }
            job.refresh_progress();
            tracing::debug!(
                job_id,
                status = ?job.status,
                depth = job.current_depth,
                max_depth = job.max_depth,
                "Research status"
            );
            job
        }))
    }
}

/// The poller sees real read errors; only mock ids and a missing credential
/// are answered from mock data.
#[async_trait]
impl ResearchStatusSource for ResearchStatusUseCase {
    async fn read_status(&self, job_id: &str) -> Result<ResearchJob, ResearchError> {
        let job_id = require_job_id(job_id)?;
        match self.fetch(job_id).await {
            Some(result) => result,
            None => Ok(mock::research_status(job_id, self.clock.now())),
        }
    }
}

fn require_job_id(job_id: &str) -> Result<&str, ResearchError> {
    let job_id = job_id.trim();
    if job_id.is_empty() {
        Err(ResearchError::MissingJobId)
    } else {
        Ok(job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ResearchOptions, ResearchStatus};
    use crate::ports::FixedClock;
    use time::macros::datetime;
    use time::Duration;

    struct FakeResearch(Result<ResearchJob, ResearchError>);

    #[async_trait]
    impl ResearchClient for FakeResearch {
        async fn start(
            &self,
            _query: &str,
            _options: &ResearchOptions,
        ) -> Result<String, ResearchError> {
            Ok("job".into())
        }

        async fn status(&self, _job_id: &str) -> Result<ResearchJob, ResearchError> {
            self.0.clone()
        }
    }

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(datetime!(2024-05-01 12:00:10 UTC)))
    }

    #[tokio::test]
    async fn test_real_status_gets_progress_and_id() {
        let mut job = ResearchJob::initial("", 4);
        job.current_depth = 3;
        let uc = ResearchStatusUseCase::new(Some(Arc::new(FakeResearch(Ok(job)))), clock());

        let report = uc.status("job-7").await.unwrap();
        assert_eq!(report.job.job_id, "job-7");
        assert_eq!(report.job.progress_percentage, 75);
        assert!(!report.is_mock_data);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["progressPercentage"], 75);
        assert_eq!(json["status"], "in_progress");
    }

    #[tokio::test]
    async fn test_mock_id_bypasses_client() {
        let uc = ResearchStatusUseCase::new(
            Some(Arc::new(FakeResearch(Err(ResearchError::Api("unused".into()))))),
            clock(),
        );
        let created = datetime!(2024-05-01 12:00:10 UTC) - Duration::seconds(4);
        let id = mock::mock_job_id(created);

        let report = uc.status(&id).await.unwrap();
        assert!(report.is_mock_data);
        assert!(report.error.is_none());
        assert_eq!(report.job.current_depth, 2);
        assert_eq!(report.job.status, ResearchStatus::InProgress);
    }

    #[tokio::test]
    async fn test_api_error_serves_mock_with_error() {
        let uc = ResearchStatusUseCase::new(
            Some(Arc::new(FakeResearch(Err(ResearchError::Api("Job not found".into()))))),
            clock(),
        );
        let report = uc.status("job-7").await.unwrap();
        assert!(report.is_mock_data);
        assert!(report.error.unwrap().contains("Job not found"));
    }

    #[tokio::test]
    async fn test_read_status_surfaces_errors() {
        let uc = ResearchStatusUseCase::new(
            Some(Arc::new(FakeResearch(Err(ResearchError::Network("reset".into()))))),
            clock(),
        );
        assert!(uc.read_status("job-7").await.is_err());
    }

    #[tokio::test]
    async fn test_missing_job_id() {
        let uc = ResearchStatusUseCase::new(None, clock());
        assert_eq!(uc.status(" ").await.unwrap_err(), ResearchError::MissingJobId);
    }
}
