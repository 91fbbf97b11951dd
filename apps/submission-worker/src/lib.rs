use std::sync::Arc;

use database::repositories::{FileRepository, ObjectRepository, RegistrationRepository, SubmissionRepository};
use database::Database;
use external_clients::access_management::AccessManagementClient;
use external_clients::catalog::CatalogClient;
use external_clients::doi::DoiClient;
use external_clients::ingestion_admin::IngestionAdminClient;
use external_clients::RetryingClient;
use metadata_core::FileService;
use publish::PublishOrchestrator;
use shared::AppConfig;
use workflow::WorkflowRegistry;

pub mod ingest_poll;

/// Everything the worker's polling loops need, built once at startup --
/// the out-of-band counterpart to `submission-api`'s `AppState`.
pub struct WorkerState {
    pub files: FileService,
    pub submissions: SubmissionRepository,
    pub ingestion: IngestionAdminClient,
    pub publish: Arc<PublishOrchestrator>,
    pub polling_interval: std::time::Duration,
}

impl WorkerState {
    pub async fn build(config: &AppConfig, db: Arc<Database>) -> anyhow::Result<Self> {
        let workflows = Arc::new(WorkflowRegistry::load_from_dir(&config.workflows_dir)?);

        let submissions_repo = SubmissionRepository::new(db.pool.clone());
        let objects_repo = ObjectRepository::new(db.pool.clone());
        let registrations_repo = RegistrationRepository::new(db.pool.clone());
        let files_repo = FileRepository::new(db.pool.clone());

        let timeout = std::time::Duration::from_secs(15);
        let doi_http = RetryingClient::new(&config.datacite_api, timeout)?.with_basic_auth(&config.datacite_user, &config.datacite_key);
        let catalog_http = RetryingClient::new(&config.metax_url, timeout)?.with_basic_auth(&config.metax_user, &config.metax_pass);
        let access_http = RetryingClient::new(&config.rems_url, timeout)?.with_basic_auth(&config.rems_user_id, &config.rems_key);
        let ingestion_http = RetryingClient::new(&config.admin_url, timeout)?;

        let doi = DoiClient::new(doi_http, &config.datacite_prefix);
        let catalog = CatalogClient::new(catalog_http, &config.metax_catalog_pid);
        let access = AccessManagementClient::new(access_http, &config.rems_user_id);
        let ingestion = IngestionAdminClient::new(ingestion_http);

        let publish = Arc::new(PublishOrchestrator::new(
            submissions_repo.clone(),
            objects_repo,
            registrations_repo,
            files_repo.clone(),
            workflows,
            doi,
            catalog,
            access,
            ingestion.clone(),
        ));

        Ok(WorkerState {
            files: FileService::new(files_repo),
            submissions: submissions_repo,
            ingestion,
            publish,
            polling_interval: config.polling_interval,
        })
    }
}
