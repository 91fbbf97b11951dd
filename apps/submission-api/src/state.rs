use std::sync::Arc;

use access::{ApiKeyService, SessionService};
use database::repositories::{
    FileRepository, ObjectRepository, ProjectRepository, RegistrationRepository, SubmissionRepository, UserRepository,
};
use database::Database;
use external_clients::access_management::AccessManagementClient;
use external_clients::catalog::CatalogClient;
use external_clients::doi::DoiClient;
use external_clients::ingestion_admin::IngestionAdminClient;
use external_clients::pid::PidClient;
use external_clients::RetryingClient;
use ids::IdentifierService;
use metadata_core::{FileService, ObjectService, SubmissionService};
use publish::PublishOrchestrator;
use schema::SchemaRegistry;
use workflow::WorkflowRegistry;

use shared::AppConfig;

/// Everything an axum handler might need, composed once at startup and
/// shared behind `Arc`/`Clone`, matching the teacher's `AppState`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<UserRepository>,

    pub submissions: Arc<SubmissionService>,
    pub objects: Arc<ObjectService>,
    pub files: Arc<FileService>,
    pub schemas: Arc<SchemaRegistry>,
    pub workflows: Arc<WorkflowRegistry>,

    pub sessions: Arc<SessionService>,
    pub api_keys: Arc<ApiKeyService>,

    pub publish: Arc<PublishOrchestrator>,
    pub access: Arc<AccessManagementClient>,
    pub doi: Arc<DoiClient>,
    pub catalog: Arc<CatalogClient>,
    pub pid: Arc<PidClient>,
    pub ingestion: Arc<IngestionAdminClient>,
}

impl AppState {
    pub async fn build(config: AppConfig, db: Arc<Database>) -> anyhow::Result<Self> {
        let clock = Arc::new(shared::SystemClock);
        let ids = Arc::new(IdentifierService::new(clock));

        let schemas = Arc::new(SchemaRegistry::load_from_dir(&config.schemas_dir)?);
        let workflows = Arc::new(WorkflowRegistry::load_from_dir(&config.workflows_dir)?);

        let submissions_repo = SubmissionRepository::new(db.pool.clone());
        let objects_repo = ObjectRepository::new(db.pool.clone());
        let registrations_repo = RegistrationRepository::new(db.pool.clone());
        let files_repo = FileRepository::new(db.pool.clone());
        let users_repo = Arc::new(UserRepository::new(db.pool.clone()));
        let projects_repo = ProjectRepository::new(db.pool.clone());
        let api_keys_repo = database::repositories::ApiKeyRepository::new(db.pool.clone());

        let submissions = Arc::new(SubmissionService::new(submissions_repo.clone(), ids.clone(), workflows.clone()));
        let objects = Arc::new(ObjectService::new(
            objects_repo.clone(),
            submissions_repo.clone(),
            schemas.clone(),
            workflows.clone(),
            ids.clone(),
        ));
        let files = Arc::new(FileService::new(files_repo.clone()));

        let sessions = Arc::new(SessionService::new(UserRepository::new(db.pool.clone()), projects_repo, ids.clone()));
        let api_keys = Arc::new(ApiKeyService::new(api_keys_repo, ids.clone()));

        let timeout = std::time::Duration::from_secs(15);
        let doi_http = RetryingClient::new(&config.datacite_api, timeout)?.with_basic_auth(&config.datacite_user, &config.datacite_key);
        let pid_http = RetryingClient::new(&config.pid_url, timeout)?;
        let catalog_http = RetryingClient::new(&config.metax_url, timeout)?.with_basic_auth(&config.metax_user, &config.metax_pass);
        let access_http = RetryingClient::new(&config.rems_url, timeout)?.with_basic_auth(&config.rems_user_id, &config.rems_key);
        let ingestion_http = RetryingClient::new(&config.admin_url, timeout)?;

        let doi = Arc::new(DoiClient::new(doi_http, &config.datacite_prefix));
        let pid = Arc::new(PidClient::new(pid_http, &config.pid_apikey));
        let catalog = Arc::new(CatalogClient::new(catalog_http, &config.metax_catalog_pid));
        let access = Arc::new(AccessManagementClient::new(access_http, &config.rems_user_id));
        let ingestion = Arc::new(IngestionAdminClient::new(ingestion_http));

        let publish = Arc::new(PublishOrchestrator::new(
            submissions_repo,
            objects_repo,
            registrations_repo,
            files_repo,
            workflows.clone(),
            (*doi).clone(),
            (*catalog).clone(),
            (*access).clone(),
            (*ingestion).clone(),
        ));

        Ok(AppState {
            config: Arc::new(config),
            users: users_repo,
            submissions,
            objects,
            files,
            schemas,
            workflows,
            sessions,
            api_keys,
            publish,
            access,
            doi,
            catalog,
            pid,
            ingestion,
        })
    }
}
