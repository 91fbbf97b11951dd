use database::models::{File, IngestErrorType, IngestStatus};
use database::repositories::FileRepository;
use shared::ApiError;

/// Pure state-transition logic for `File.ingest_status`, driven in
/// production by `apps/submission-worker`'s polling loop rather than an
/// AMQP consumer (see SPEC_FULL.md §2).
pub struct FileService {
    repo: FileRepository,
}

impl FileService {
    pub fn new(repo: FileRepository) -> Self {
        FileService { repo }
    }

    pub async fn add(&self, file: &File) -> Result<File, ApiError> {
        self.repo.add(file).await.map_err(internal)
    }

    pub async fn list_by_project(&self, project_id: &str) -> Result<Vec<File>, ApiError> {
        self.repo.list_by_project(project_id).await.map_err(internal)
    }

    pub async fn list_non_terminal(&self) -> Result<Vec<File>, ApiError> {
        self.repo.list_non_terminal().await.map_err(internal)
    }

    /// Advances `file`'s ingest status, rejecting transitions that
    /// violate the `added -> verified -> ready` partial order (`failed`
    /// is reachable from any non-terminal state).
    pub async fn advance_ingest_status(
        &self,
        file: &File,
        next: IngestStatus,
        error: Option<String>,
        error_type: Option<IngestErrorType>,
    ) -> Result<(), ApiError> {
        let current = file.status();
        if !current.can_transition_to(next) {
            return Err(ApiError::Conflict(format!(
                "file '{}' cannot transition from {current:?} to {next:?}",
                file.file_id
            )));
        }

        let status_str = match next {
            IngestStatus::Added => "added",
            IngestStatus::Verified => "verified",
            IngestStatus::Ready => "ready",
            IngestStatus::Failed => "failed",
        };
        let error_type_str = error_type.map(|t| match t {
            IngestErrorType::UserError => "user_error",
            IngestErrorType::TransientError => "transient_error",
            IngestErrorType::PermanentError => "permanent_error",
        });

        self.repo
            .update_ingest_status(&file.file_id, status_str, error.as_deref(), error_type_str)
            .await
            .map_err(internal)
    }
}

fn internal(err: sqlx::Error) -> ApiError {
    ApiError::Internal(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_unreachable_from_ready() {
        assert!(!IngestStatus::Ready.can_transition_to(IngestStatus::Failed));
    }
}
