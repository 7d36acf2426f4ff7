use std::sync::Arc;
use std::time::Duration;

use crate::core::config::UploadConfig;
use crate::core::error::Result;
use crate::features::drive_files::models::DriveFile;
use crate::features::uploads::services::UploadService;

/// One deferred upload: a file version for one owning record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadJob {
    pub file_version_id: String,
    pub record_id: String,
}

/// Hands upload jobs off to run after the caller has returned
pub trait UploadDispatcher: Send + Sync {
    fn dispatch(&self, job: UploadJob);
}

/// Runs every job on its own tokio task
///
/// With `max_attempts` at 1 a failed upload is logged and dropped. Higher
/// values retry after `retry_delay`; a retry after a partial success can
/// leave a duplicate file in Drive.
pub struct SpawnDispatcher {
    upload_service: Arc<UploadService>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl SpawnDispatcher {
    pub fn new(upload_service: Arc<UploadService>, config: &UploadConfig) -> Self {
        Self {
            upload_service,
            max_attempts: config.max_attempts.max(1),
            retry_delay: config.retry_delay,
        }
    }
}

impl UploadDispatcher for SpawnDispatcher {
    fn dispatch(&self, job: UploadJob) {
        let service = Arc::clone(&self.upload_service);
        let max_attempts = self.max_attempts;
        let retry_delay = self.retry_delay;

        tokio::spawn(async move {
            // Failures are already logged per attempt
            let _ = run_job(&service, &job, max_attempts, retry_delay).await;
        });
    }
}

async fn run_job(
    service: &UploadService,
    job: &UploadJob,
    max_attempts: u32,
    retry_delay: Duration,
) -> Result<DriveFile> {
    let mut attempt = 1;
    loop {
        match service.upload(&job.file_version_id, &job.record_id).await {
            Ok(file) => return Ok(file),
            Err(e) if attempt < max_attempts => {
                tracing::warn!(
                    "Upload of file version {} for record {} failed ({}/{}), retrying: {}",
                    job.file_version_id,
                    job.record_id,
                    attempt,
                    max_attempts,
                    e
                );
                attempt += 1;
                tokio::time::sleep(retry_delay).await;
            }
            Err(e) => {
                tracing::error!(
                    "Upload of file version {} for record {} failed after {} attempt(s): {:?}",
                    job.file_version_id,
                    job.record_id,
                    attempt,
                    e
                );
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::drive_files::services::DriveFileService;
    use crate::shared::test_helpers::{
        invoice_version, FakeCrm, FakeDrive, InMemoryDriveFileRepository,
    };

    fn setup(crm: FakeCrm) -> (Arc<UploadService>, Arc<InMemoryDriveFileRepository>, Arc<FakeDrive>) {
        let repository = Arc::new(InMemoryDriveFileRepository::default());
        let drive = Arc::new(FakeDrive::default());
        let service = Arc::new(UploadService::new(
            Arc::new(crm),
            drive.clone(),
            Arc::new(DriveFileService::new(repository.clone())),
            "root",
        ));
        (service, repository, drive)
    }

    fn crm() -> FakeCrm {
        FakeCrm::default()
            .with_file(invoice_version("068A"), b"pdf".to_vec())
            .with_object_type("ACC-001", "Account")
    }

    fn job() -> UploadJob {
        UploadJob {
            file_version_id: "068A".to_string(),
            record_id: "ACC-001".to_string(),
        }
    }

    #[tokio::test]
    async fn test_single_attempt_gives_up_on_failure() {
        let fake = crm();
        fake.fail_content_fetches(1);
        let (service, repository, _) = setup(fake);

        let result = run_job(&service, &job(), 1, Duration::ZERO).await;

        assert!(result.is_err());
        assert!(repository.rows().is_empty());
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let fake = crm();
        fake.fail_content_fetches(2);
        let (service, repository, _) = setup(fake);

        let file = run_job(&service, &job(), 3, Duration::from_millis(1))
            .await
            .unwrap();

        assert_eq!(file.related_record_id, "ACC-001");
        assert_eq!(repository.rows().len(), 1);
    }

    #[tokio::test]
    async fn test_spawned_job_completes_in_background() {
        let (service, repository, drive) = setup(crm());
        let dispatcher = SpawnDispatcher::new(service, &UploadConfig::default());

        dispatcher.dispatch(job());

        for _ in 0..100 {
            if !repository.rows().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(repository.rows().len(), 1);
        assert_eq!(drive.uploads().len(), 1);
    }
}
