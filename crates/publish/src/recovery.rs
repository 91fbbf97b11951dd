//! Startup recovery for submissions whose `registrations` rows exist but
//! whose `is_published` flag never flipped -- the crash window between
//! an external publish step succeeding and the local transaction
//! committing (SPEC_FULL.md §5).

use shared::ApiError;

use crate::{PublishOrchestrator, PublishOutcome};

pub struct RecoveryReport {
    pub resumed: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl PublishOrchestrator {
    /// Re-invokes `publish` for every partially-published submission.
    /// Idempotence comes from `update-if-null`: a resumed run picks up
    /// from the first missing external id rather than redoing work.
    pub async fn recover_partial_publishes(&self) -> Result<RecoveryReport, ApiError> {
        let partial = self
            .submissions
            .list_partially_published()
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        let mut report = RecoveryReport { resumed: Vec::new(), failed: Vec::new() };

        for submission in partial {
            match self.publish(&submission.submission_id).await {
                Ok(PublishOutcome::Published) | Ok(PublishOutcome::AlreadyPublished) => {
                    report.resumed.push(submission.submission_id);
                }
                Err(e) => {
                    tracing::error!(submission_id = %submission.submission_id, error = %e, "failed to recover partially published submission");
                    report.failed.push((submission.submission_id, e.to_string()));
                }
            }
        }

        Ok(report)
    }
}
