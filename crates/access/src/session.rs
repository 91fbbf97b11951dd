use database::repositories::{ProjectRepository, UserRepository};
use ids::IdentifierService;
use shared::ApiError;
use std::sync::Arc;

/// Claims lifted from an already-validated OIDC session or access token.
/// Establishing and verifying that token is the routing layer's concern
/// (an external collaborator to this crate); this service only turns
/// claims into a resolved `(user_id, user_name)` pair.
#[derive(Debug, Clone)]
pub struct SessionClaims {
    pub external_id: String,
    pub name: String,
    pub project_external_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUser {
    pub user_id: String,
    pub user_name: String,
}

pub struct SessionService {
    users: UserRepository,
    projects: ProjectRepository,
    ids: Arc<IdentifierService>,
}

impl SessionService {
    pub fn new(users: UserRepository, projects: ProjectRepository, ids: Arc<IdentifierService>) -> Self {
        SessionService { users, projects, ids }
    }

    /// Upserts the user and lazily creates any project referenced by the
    /// claims, reflecting membership as of this login (SPEC_FULL.md §3,
    /// Project/User entities).
    pub async fn resolve(&self, claims: &SessionClaims) -> Result<ResolvedUser, ApiError> {
        let mut project_ids = Vec::with_capacity(claims.project_external_ids.len());
        for external_id in &claims.project_external_ids {
            let candidate_id = self.ids.new_accession();
            let project = self.projects.get_or_create(&candidate_id, external_id).await.map_err(internal)?;
            project_ids.push(project.project_id);
        }

        let existing = self.users.get_by_external_id(&claims.external_id).await.map_err(internal)?;
        let user_id = match existing {
            Some(u) => u.user_id,
            None => self.ids.new_accession(),
        };

        let user = self
            .users
            .upsert(&user_id, &claims.external_id, &claims.name, &project_ids)
            .await
            .map_err(internal)?;

        Ok(ResolvedUser { user_id: user.user_id, user_name: user.name })
    }
}

fn internal(err: sqlx::Error) -> ApiError {
    ApiError::Internal(err.to_string())
}
