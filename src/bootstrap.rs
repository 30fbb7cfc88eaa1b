//! Composition root.
//!
//! Builds the engine, instruments the concepts, registers the bundled
//! synchronizations and assembles the HTTP router around them.

use std::sync::Arc;
use std::time::Duration;

use http::HeaderValue;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::adapters::concepts::{ApiConcept, MembershipConcept, ProjectConcept, TeamConcept};
use crate::adapters::http::gateway::{gateway_router, GatewayAppState};
use crate::application::engine::{ConceptHandle, EngineError, SyncEngine};
use crate::application::syncs::{project_syncs, team_syncs};
use crate::config::{AppConfig, ServerConfig};

/// A fully wired engine plus handles to every bundled concept.
#[derive(Clone)]
pub struct Application {
    pub engine: SyncEngine,
    pub api: ConceptHandle,
    pub team: ConceptHandle,
    pub membership: ConceptHandle,
    pub project: ConceptHandle,
    config: AppConfig,
}

impl Application {
    /// Wires the bundled concepts and synchronizations.
    ///
    /// The configuration is assumed to be validated already.
    pub fn new(config: AppConfig) -> Result<Self, EngineError> {
        let engine = SyncEngine::new(config.engine.clone());

        let api = engine.instrument(Arc::new(ApiConcept::new(&config.gateway)))?;
        let team = engine.instrument(Arc::new(TeamConcept::new()))?;
        let membership = engine.instrument(Arc::new(MembershipConcept::new()))?;
        let project = engine.instrument(Arc::new(ProjectConcept::new()))?;

        engine.register(team_syncs(&api, &team, &membership))?;
        engine.register(project_syncs(&api, &membership, &project))?;

        tracing::info!(
            concepts = 4,
            syncs = engine.sync_count(),
            "Application wired"
        );

        Ok(Self {
            engine,
            api,
            team,
            membership,
            project,
            config,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The gateway router wrapped in the HTTP middleware stack.
    pub fn router(&self) -> Router {
        let state = GatewayAppState::new(self.api.clone(), self.config.gateway.response_timeout());
        gateway_router(state).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(cors_layer(&self.config.server))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    self.config.server.request_timeout_secs,
                ))),
        )
    }
}

/// Allows the configured origins, or any origin when none are configured.
fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let configured = server.cors_origins_list();
    let origins: Vec<HeaderValue> = configured
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if configured.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}
