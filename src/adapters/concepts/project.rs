//! In-memory Project concept. Projects belong to a team.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::foundation::DomainError;
use crate::domain::sync::{error_output, fields_of, into_output, optional_str, require_str, Fields};
use crate::ports::Concept;

/// Concept name used in synchronization declarations.
pub const PROJECT: &str = "Project";

#[derive(Debug, Clone, Serialize)]
struct Project {
    id: String,
    team: String,
    name: String,
}

#[derive(Default)]
pub struct ProjectConcept {
    projects: RwLock<Vec<Project>>,
}

impl ProjectConcept {
    pub fn new() -> Self {
        Self::default()
    }

    async fn create(&self, input: &Fields) -> Result<Fields, DomainError> {
        let team = require_str(input, "team")?;
        let name = require_str(input, "name")?;
        let id = optional_str(input, "project")?.unwrap_or_else(|| Uuid::new_v4().to_string());

        let project = Project { id, team, name };
        self.projects.write().await.push(project.clone());
        Ok(fields_of(json!({ "project": project })))
    }

    async fn by_team(&self, input: &Fields) -> Vec<Fields> {
        let Ok(team) = require_str(input, "team") else {
            return Vec::new();
        };
        self.projects
            .read()
            .await
            .iter()
            .filter(|p| p.team == team)
            .map(|p| fields_of(json!({ "project": p.id, "name": p.name })))
            .collect()
    }
}

#[async_trait]
impl Concept for ProjectConcept {
    fn name(&self) -> &str {
        PROJECT
    }

    fn actions(&self) -> &[&'static str] {
        &["create"]
    }

    fn queries(&self) -> &[&'static str] {
        &["_getByTeam"]
    }

    async fn perform(&self, action: &str, input: Fields) -> Fields {
        match action {
            "create" => into_output(self.create(&input).await),
            other => error_output(format!("Unknown action '{}'", other)),
        }
    }

    async fn query(&self, name: &str, input: Fields) -> Vec<Fields> {
        match name {
            "_getByTeam" => self.by_team(&input).await,
            _ => Vec::new(),
        }
    }
}
