// HTTP request handlers

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::stream::stream_run;
use super::AppState;
use crate::agents::ModelClient;
use crate::candidate::DEFAULT_LANGUAGE;
use crate::config::constants::API_KEY_ENV;
use crate::dataset::{BugInfo, MockDataset, ProjectCheckout};
use crate::pipelines::{self, PipelineKind};

const CUSTOM_PROJECT: &str = "custom_project";
const CUSTOM_BUG_ID: &str = "custom_1";
const SECURITY_PROJECT: &str = "security_project";
const SECURITY_BUG_ID: &str = "security_audit_1";
const PLACEHOLDER_TEST: &str = "def test_placeholder(): pass\n";

#[derive(Debug, Deserialize)]
pub struct FixRequest {
    pub description: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct SecurityRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct OptimizeRequest {
    pub code: String,
    #[serde(default)]
    pub test_input: String,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

/// Failure before a stream was started
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{:#}", e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!("Request failed: {}", self.message);
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

pub async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Agentic Code Studio API is running. Please use the Next.js frontend."
    }))
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Client for the configured provider; 503 while no API key is set
fn model_client(state: &AppState) -> Result<ModelClient, ApiError> {
    let provider = state.provider.as_ref().ok_or_else(|| ApiError {
        status: StatusCode::SERVICE_UNAVAILABLE,
        message: format!(
            "No API key configured. Set {} and restart the server.",
            API_KEY_ENV
        ),
    })?;
    Ok(ModelClient::new(Arc::clone(provider), &state.config.provider))
}

/// Register `bug` in a private dataset and check it out
async fn private_checkout(state: &AppState, bug: BugInfo) -> Result<MockDataset, ApiError> {
    let work_dir = state
        .config
        .dataset
        .work_dir
        .join(uuid::Uuid::new_v4().to_string());
    let mut dataset = MockDataset::with_work_dir(&state.config.dataset, work_dir);
    let (project, id) = (bug.project.clone(), bug.id.clone());
    dataset.insert_bug(bug);
    dataset.checkout(&project, &id).await?;
    Ok(dataset)
}

pub async fn analyze_fix(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FixRequest>,
) -> Result<Response, ApiError> {
    tracing::info!("Fix request ({} bytes of code)", request.code.len());
    let client = model_client(&state)?;
    let bug = BugInfo {
        project: CUSTOM_PROJECT.to_string(),
        id: CUSTOM_BUG_ID.to_string(),
        description: request.description,
        file_path: "custom.py".to_string(),
        code: request.code,
        test_file: "test_custom.py".to_string(),
        test_code: PLACEHOLDER_TEST.to_string(),
    };
    let dataset = private_checkout(&state, bug.clone()).await?;
    let scratch = dataset.work_dir().to_path_buf();

    let orchestrator = pipelines::repair_pipeline(
        client,
        Arc::new(dataset),
        state.config.ceilings(PipelineKind::Repair),
    );
    Ok(stream_run(orchestrator, pipelines::repair_task(&bug), Some(scratch)))
}

pub async fn analyze_security(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SecurityRequest>,
) -> Result<Response, ApiError> {
    tracing::info!("Security audit request ({} bytes of code)", request.code.len());
    let client = model_client(&state)?;
    let bug = BugInfo {
        project: SECURITY_PROJECT.to_string(),
        id: SECURITY_BUG_ID.to_string(),
        description: "SQL Security Audit".to_string(),
        file_path: "query.sql".to_string(),
        code: request.code,
        test_file: "test_sql.py".to_string(),
        test_code: PLACEHOLDER_TEST.to_string(),
    };
    let dataset = private_checkout(&state, bug.clone()).await?;
    let scratch = dataset.work_dir().to_path_buf();

    let orchestrator = pipelines::security_pipeline(
        client,
        Arc::new(dataset),
        state.config.ceilings(PipelineKind::Security),
    );
    Ok(stream_run(orchestrator, pipelines::security_task(&bug), Some(scratch)))
}

pub async fn analyze_optimize(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OptimizeRequest>,
) -> Result<Response, ApiError> {
    tracing::info!("Optimization request for language: {}", request.language);
    let orchestrator = pipelines::optimization_pipeline(
        model_client(&state)?,
        state.comparator.clone(),
        state.config.ceilings(PipelineKind::Optimization),
    );
    let task = pipelines::optimization_task(request.code, request.test_input, &request.language);
    Ok(stream_run(orchestrator, task, None))
}

