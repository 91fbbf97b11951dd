use database::models::IngestStatus;
use tracing::{error, info, warn};

use crate::WorkerState;

/// One sweep over every file not yet at a terminal ingest state: for
/// each, ask ingestion-admin (keyed by the owning project, per the same
/// `project_id`-as-user convention `publish::trigger_ingestion` uses)
/// whether the file's path shows up in its ready list, and advance the
/// state machine one step if so.
///
/// Out-of-band push notifications from the ingestion service are out of
/// scope (spec.md §4.F); this sweep is the poll-based substitute.
pub async fn sweep(state: &WorkerState) {
    let files = match state.files.list_non_terminal().await {
        Ok(files) => files,
        Err(e) => {
            error!(error = %e, "failed to list non-terminal files");
            return;
        }
    };

    for file in files {
        let submission = match state.submissions.get_by_id(&file.submission_id).await {
            Ok(Some(s)) => s,
            Ok(None) => {
                warn!(file_id = %file.file_id, submission_id = %file.submission_id, "file references a missing submission");
                continue;
            }
            Err(e) => {
                error!(file_id = %file.file_id, error = %e, "failed to load owning submission");
                continue;
            }
        };

        let ready_paths = match state.ingestion.list_user_files(&submission.project_id).await {
            Ok(paths) => paths,
            Err(e) => {
                warn!(project_id = %submission.project_id, error = %e, "ingestion-admin poll failed, will retry next sweep");
                continue;
            }
        };

        let next = match file.status() {
            IngestStatus::Added if ready_paths.iter().any(|p| p == &file.path) => Some(IngestStatus::Verified),
            IngestStatus::Verified if ready_paths.iter().any(|p| p == &file.path) => Some(IngestStatus::Ready),
            _ => None,
        };

        if let Some(next) = next {
            if let Err(e) = state.files.advance_ingest_status(&file, next, None, None).await {
                error!(file_id = %file.file_id, error = %e, "failed to advance ingest status");
            } else {
                info!(file_id = %file.file_id, status = ?next, "advanced ingest status");
            }
        }
    }
}
