//! In-memory Team concept.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::sync::{error_output, fields_of, into_output, optional_str, require_str, Fields};
use crate::ports::Concept;

/// Concept name used in synchronization declarations.
pub const TEAM: &str = "Team";

#[derive(Debug, Clone, Serialize)]
struct Team {
    id: String,
    name: String,
    description: String,
}

/// Teams kept in insertion order.
#[derive(Default)]
pub struct TeamConcept {
    teams: RwLock<Vec<Team>>,
}

impl TeamConcept {
    pub fn new() -> Self {
        Self::default()
    }

    /// `create {team?, name, description?}` -> `{team: {id, name, description}}`
    async fn create(&self, input: &Fields) -> Result<Fields, DomainError> {
        let name = require_str(input, "name")?;
        let description = optional_str(input, "description")?.unwrap_or_default();
        let id = optional_str(input, "team")?.unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut teams = self.teams.write().await;
        if teams.iter().any(|t| t.id == id) {
            return Err(DomainError::new(
                ErrorCode::AlreadyExists,
                format!("Team {} already exists", id),
            ));
        }
        let team = Team {
            id,
            name,
            description,
        };
        teams.push(team.clone());
        Ok(fields_of(json!({ "team": team })))
    }

    async fn get_by_id(&self, input: &Fields) -> Vec<Fields> {
        let Ok(id) = require_str(input, "team") else {
            return Vec::new();
        };
        self.teams
            .read()
            .await
            .iter()
            .filter(|t| t.id == id)
            .map(|t| fields_of(json!({ "team": t })))
            .collect()
    }

    async fn list(&self) -> Vec<Fields> {
        self.teams
            .read()
            .await
            .iter()
            .map(|t| fields_of(json!({ "team": t.id, "name": t.name, "description": t.description })))
            .collect()
    }
}

#[async_trait]
impl Concept for TeamConcept {
    fn name(&self) -> &str {
        TEAM
    }

    fn actions(&self) -> &[&'static str] {
        &["create"]
    }

    fn queries(&self) -> &[&'static str] {
        &["_getById", "_list"]
    }

    async fn perform(&self, action: &str, input: Fields) -> Fields {
        match action {
            "create" => into_output(self.create(&input).await),
            other => error_output(format!("Unknown action '{}'", other)),
        }
    }

    async fn query(&self, name: &str, input: Fields) -> Vec<Fields> {
        match name {
            "_getById" => self.get_by_id(&input).await,
            "_list" => self.list().await,
            _ => Vec::new(),
        }
    }
}
