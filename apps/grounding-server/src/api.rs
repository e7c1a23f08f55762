//! API handlers for the grounding server
//!
//! Provides REST endpoints for:
//! - Text location and field grounding
//! - Multi-agent extraction
//! - Consensus review

use std::collections::BTreeMap;
use std::sync::Arc;

use agent_orchestrator::{
    normalize_extraction, AgentOrchestrator, ExtractionProvider, ExtractionRequest, FieldSpec,
    ProviderKind,
};
use axum::{extract::State, Json};
use consensus_engine::{
    agreement_report, agreement_stats, build_default_consensus, candidates, override_field,
    unresolved_fields, AgreementStats, Candidate, FieldAgreement,
};
use grounding_core::{document_text, GroundingPipeline, LocateError, TextLocator};
use serde::{Deserialize, Serialize};
use shared_types::{AgentRun, ConsensusResult, GroundedFieldResult, ResolvedLocation, UngroundedReason};
use tracing::{debug, info};

use crate::document::{DocumentInput, LoadedDocument};
use crate::error::ServerError;
use crate::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handler: GET /health
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "grounding-server",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Provider list response
#[derive(Serialize)]
pub struct ProviderListResponse {
    pub success: bool,
    pub providers: Vec<ProviderInfo>,
    pub count: usize,
}

/// Provider metadata; API keys are never echoed
#[derive(Serialize)]
pub struct ProviderInfo {
    pub id: String,
    pub kind: Option<ProviderKind>,
    pub model: Option<String>,
    pub api_key_env: Option<String>,
    pub api_key_set: Option<bool>,
}

/// Handler: GET /api/providers
pub async fn handle_list_providers(State(state): State<AppState>) -> Json<ProviderListResponse> {
    let providers: Vec<ProviderInfo> = state
        .providers
        .iter()
        .map(|provider| {
            let id = provider.id().to_string();
            match state.provider_configs.iter().find(|c| c.id == id) {
                Some(config) => ProviderInfo {
                    kind: Some(config.kind),
                    model: Some(config.model.clone()),
                    api_key_env: Some(config.api_key_env().to_string()),
                    api_key_set: Some(std::env::var(config.api_key_env()).is_ok()),
                    id,
                },
                None => ProviderInfo {
                    id,
                    kind: None,
                    model: None,
                    api_key_env: None,
                    api_key_set: None,
                },
            }
        })
        .collect();

    let count = providers.len();

    Json(ProviderListResponse {
        success: true,
        providers,
        count,
    })
}

/// Locate request body
#[derive(Deserialize)]
pub struct LocateApiRequest {
    #[serde(flatten)]
    pub document: DocumentInput,
    /// Fragment to find
    pub text: String,
    #[serde(default)]
    pub max_pages: Option<usize>,
}

/// Locate response; `location` is null when the text was not found
#[derive(Serialize)]
pub struct LocateApiResponse {
    pub success: bool,
    pub location: Option<ResolvedLocation>,
    /// Why nothing was found
    pub reason: Option<UngroundedReason>,
    pub fingerprint: Option<String>,
}

/// Handler: POST /api/locate
pub async fn handle_locate(
    State(state): State<AppState>,
    Json(req): Json<LocateApiRequest>,
) -> Result<Json<LocateApiResponse>, ServerError> {
    let max_pages = resolve_max_pages(req.max_pages, &state)?;
    debug!("Locate request: {} chars, max_pages={}", req.text.len(), max_pages);

    let document = LoadedDocument::load(req.document, max_pages).await?;
    let fingerprint = document.fingerprint();
    let text = req.text;
    let outcome =
        off_executor(move || TextLocator::new(&document).locate(&text, max_pages)).await?;

    let (location, reason) = match outcome {
        Ok(location) => (Some(location), None),
        Err(LocateError::NoMatch) => (None, Some(UngroundedReason::NoMatch)),
        Err(LocateError::MalformedPageContent { page, detail }) => {
            (None, Some(UngroundedReason::MalformedPageContent { page, detail }))
        }
    };

    Ok(Json(LocateApiResponse {
        success: true,
        location,
        reason,
        fingerprint,
    }))
}

/// Ground request body
#[derive(Deserialize)]
pub struct GroundApiRequest {
    #[serde(flatten)]
    pub document: DocumentInput,
    /// Extraction output in any shape the normalizer accepts
    pub fields: serde_json::Value,
    #[serde(default)]
    pub max_pages: Option<usize>,
}

#[derive(Serialize)]
pub struct GroundApiResponse {
    pub success: bool,
    pub results: Vec<GroundedFieldResult>,
    /// Number of results with a resolved location
    pub grounded: usize,
    pub fingerprint: Option<String>,
}

/// Handler: POST /api/ground
pub async fn handle_ground(
    State(state): State<AppState>,
    Json(req): Json<GroundApiRequest>,
) -> Result<Json<GroundApiResponse>, ServerError> {
    let max_pages = resolve_max_pages(req.max_pages, &state)?;
    let fields = normalize_extraction(&req.fields)?;
    info!("Ground request: {} fields", fields.len());

    let document = LoadedDocument::load(req.document, max_pages).await?;
    let fingerprint = document.fingerprint();
    let results =
        off_executor(move || GroundingPipeline::new(max_pages).ground(&fields, &document)).await?;
    let grounded = results.iter().filter(|r| r.is_grounded()).count();

    Ok(Json(GroundApiResponse {
        success: true,
        results,
        grounded,
        fingerprint,
    }))
}

/// Extract request body
#[derive(Deserialize)]
pub struct ExtractApiRequest {
    #[serde(flatten)]
    pub document: DocumentInput,
    pub fields: Vec<FieldSpec>,
    /// Text sent to the models; assembled from the pages when absent
    #[serde(default, alias = "documentText")]
    pub document_text: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    /// Subset of provider ids to invoke; all configured providers when absent
    #[serde(default)]
    pub providers: Option<Vec<String>>,
    #[serde(default)]
    pub max_pages: Option<usize>,
}

#[derive(Serialize)]
pub struct ExtractApiResponse {
    pub success: bool,
    pub runs: Vec<AgentRun>,
    pub agreement: Vec<FieldAgreement>,
    pub stats: AgreementStats,
    pub consensus: ConsensusResult,
    pub unresolved: Vec<String>,
    pub fingerprint: Option<String>,
}

/// Handler: POST /api/extract
pub async fn handle_extract(
    State(state): State<AppState>,
    Json(req): Json<ExtractApiRequest>,
) -> Result<Json<ExtractApiResponse>, ServerError> {
    let max_pages = resolve_max_pages(req.max_pages, &state)?;
    if req.fields.is_empty() {
        return Err(ServerError::InvalidRequest("No fields requested".into()));
    }
    let providers = select_providers(&state, req.providers.as_deref())?;

    let document = LoadedDocument::load(req.document, max_pages).await?;
    let document_text = match req.document_text {
        Some(text) if !text.trim().is_empty() => text,
        _ => document_text(&document, max_pages),
    };
    if document_text.trim().is_empty() {
        return Err(ServerError::InvalidRequest(
            "Document has no extractable text".into(),
        ));
    }

    info!(
        "Extract request: {} fields across {} providers",
        req.fields.len(),
        providers.len()
    );

    let request = ExtractionRequest {
        document_text,
        fields: req.fields,
        instructions: req.instructions,
    };
    let runs = AgentOrchestrator::new(GroundingPipeline::new(max_pages))
        .run_all(&providers, &request, &document)
        .await;

    let consensus = build_default_consensus(&runs);
    let unresolved = unresolved_fields(&consensus, &runs);

    Ok(Json(ExtractApiResponse {
        success: true,
        agreement: agreement_report(&runs),
        stats: agreement_stats(&runs),
        consensus,
        unresolved,
        fingerprint: document.fingerprint(),
        runs,
    }))
}

/// Consensus request body
#[derive(Deserialize)]
pub struct ConsensusApiRequest {
    pub runs: Vec<AgentRun>,
}

#[derive(Serialize)]
pub struct ConsensusApiResponse {
    pub success: bool,
    pub agreement: Vec<FieldAgreement>,
    pub stats: AgreementStats,
    pub consensus: ConsensusResult,
    pub unresolved: Vec<String>,
    /// Per unresolved field, what each completed agent reported
    pub candidates: BTreeMap<String, Vec<Candidate>>,
}

/// Handler: POST /api/consensus
pub async fn handle_consensus(
    Json(req): Json<ConsensusApiRequest>,
) -> Json<ConsensusApiResponse> {
    let consensus = build_default_consensus(&req.runs);
    let unresolved = unresolved_fields(&consensus, &req.runs);
    let candidates = unresolved
        .iter()
        .map(|name| (name.clone(), candidates(name, &req.runs)))
        .collect();

    debug!(
        "Consensus over {} runs: {} resolved, {} unresolved",
        req.runs.len(),
        consensus.len(),
        unresolved.len()
    );

    Json(ConsensusApiResponse {
        success: true,
        agreement: agreement_report(&req.runs),
        stats: agreement_stats(&req.runs),
        consensus,
        unresolved,
        candidates,
    })
}

/// Override request body
#[derive(Deserialize)]
pub struct OverrideApiRequest {
    pub consensus: ConsensusResult,
    #[serde(alias = "fieldName")]
    pub field_name: String,
    /// The candidate the reviewer picked
    pub result: GroundedFieldResult,
}

#[derive(Serialize)]
pub struct OverrideApiResponse {
    pub success: bool,
    pub consensus: ConsensusResult,
}

/// Handler: POST /api/consensus/override
pub async fn handle_override(
    Json(req): Json<OverrideApiRequest>,
) -> Result<Json<OverrideApiResponse>, ServerError> {
    if req.field_name.trim().is_empty() {
        return Err(ServerError::InvalidRequest("field_name must not be empty".into()));
    }

    info!("Override for field '{}'", req.field_name);
    let consensus = override_field(&req.consensus, &req.field_name, req.result);

    Ok(Json(OverrideApiResponse {
        success: true,
        consensus,
    }))
}

/// Page indexing and scanning is CPU bound; keep it off the async workers
async fn off_executor<T, F>(work: F) -> Result<T, ServerError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ServerError::Internal(format!("Grounding task failed: {}", e)))
}

fn resolve_max_pages(requested: Option<usize>, state: &AppState) -> Result<usize, ServerError> {
    match requested {
        Some(0) => Err(ServerError::InvalidRequest(
            "max_pages must be at least 1".into(),
        )),
        Some(n) => Ok(n),
        None => Ok(state.max_pages),
    }
}

/// Configured providers, narrowed to `wanted` in config order
fn select_providers(
    state: &AppState,
    wanted: Option<&[String]>,
) -> Result<Vec<Arc<dyn ExtractionProvider>>, ServerError> {
    if state.providers.is_empty() {
        return Err(ServerError::NoProviders);
    }

    let Some(wanted) = wanted else {
        return Ok(state.providers.to_vec());
    };

    if let Some(unknown) = wanted
        .iter()
        .find(|id| !state.providers.iter().any(|p| p.id().as_str() == id.as_str()))
    {
        return Err(ServerError::ProviderNotFound(unknown.clone()));
    }

    let selected: Vec<_> = state
        .providers
        .iter()
        .filter(|p| wanted.iter().any(|id| id == p.id().as_str()))
        .cloned()
        .collect();
    if selected.is_empty() {
        return Err(ServerError::InvalidRequest("Provider list is empty".into()));
    }
    Ok(selected)
}
