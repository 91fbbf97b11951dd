pub mod apikey_repo;
pub mod file_repo;
pub mod object_repo;
pub mod project_repo;
pub mod registration_repo;
pub mod submission_repo;
pub mod user_repo;

pub use apikey_repo::ApiKeyRepository;
pub use file_repo::FileRepository;
pub use object_repo::{ObjectFilter, ObjectRepository};
pub use project_repo::ProjectRepository;
pub use registration_repo::RegistrationRepository;
pub use submission_repo::{SubmissionFilter, SubmissionRepository, SubmissionSort};
pub use user_repo::UserRepository;
