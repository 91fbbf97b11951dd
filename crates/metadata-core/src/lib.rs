pub mod file_service;
pub mod object_service;
pub mod submission_service;

pub use file_service::FileService;
pub use object_service::{AddedObject, ObjectDocument, ObjectFormat, ObjectService};
pub use submission_service::{NewSubmission, SubmissionService};
