//! Project management

use hoprun_storage::{LocalStorage, Project};
use uuid::Uuid;

use crate::{ServiceError, ServiceResult};

/// Most projects returned by one listing
pub const PROJECT_PAGE_SIZE: usize = 10;

pub struct ProjectService {
    storage: LocalStorage,
}

impl ProjectService {
    pub fn new(storage: LocalStorage) -> Self {
        Self { storage }
    }

    #[tracing::instrument(skip(self, name), fields(user_id = %user_id))]
    pub async fn create_project(&self, user_id: Uuid, name: &str) -> ServiceResult<Project> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::Validation(
                "project name must not be empty".to_string(),
            ));
        }

        let project = self
            .storage
            .run(move |storage| storage.create_project(user_id, &name))
            .await?;

        tracing::info!(project_id = %project.id, "project created");
        Ok(project)
    }

    /// The caller's projects, newest first
    pub async fn list_projects(&self, user_id: Uuid) -> ServiceResult<Vec<Project>> {
        Ok(self
            .storage
            .run(move |storage| storage.list_projects(user_id, PROJECT_PAGE_SIZE))
            .await?)
    }
}
