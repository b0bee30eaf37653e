use crate::classify::{UserAgentBreakdown, UserAgentClassifier};
use crate::config::Config;
use crate::format::FormatCache;
use crate::ingest::{IngestError, Ingestor, LogBatch, LogRequest};
use crate::parse::{AccessParser, ErrorLineParser, ParsedAccessRecord, ParsedErrorRecord};
use crate::source::{parse_positions, ArchiveCache, LogRole};
use axum::{
    extract::{Query, Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

/// Shared state for the HTTP API
pub struct AppState {
    pub ingestor: Ingestor,
    pub classifier: UserAgentClassifier,
    pub access_parser: AccessParser,
    pub error_parser: ErrorLineParser,
    pub access_format: Option<String>,
    pub auth_token: Option<String>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self, IngestError> {
        let archives = Arc::new(ArchiveCache::new());
        let formats = Arc::new(FormatCache::new());

        Ok(Self {
            ingestor: Ingestor::new(config, archives)?,
            classifier: UserAgentClassifier::new(),
            access_parser: AccessParser::new(formats),
            error_parser: ErrorLineParser::new(),
            access_format: config.parsing.access_format.clone(),
            auth_token: config.server.auth_token.clone().filter(|t| !t.is_empty()),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(rename = "type", default)]
    pub role: LogRole,
    #[serde(default)]
    pub positions: Option<String>,
    #[serde(rename = "includeCompressed", default)]
    pub include_compressed: bool,
}

#[derive(Debug, Deserialize)]
pub struct ClassifyQuery {
    #[serde(default)]
    pub ua: String,
}

#[derive(Debug, Deserialize)]
pub struct ParseAccessRequest {
    pub lines: Vec<String>,
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ParseErrorRequest {
    pub lines: Vec<String>,
}

/// GET /health
pub async fn health_check() -> &'static str {
    "OK"
}

/// GET /api/logs?type=access|error&positions=<json>&includeCompressed=bool
pub async fn get_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<LogBatch>, ApiError> {
    let request = LogRequest {
        role: query.role,
        positions: parse_positions(query.positions.as_deref()),
        include_archived: query.include_compressed,
    };

    let batch = state.ingestor.fetch(&request).await?;
    Ok(Json(batch))
}

/// GET /api/classify?ua=...
pub async fn classify_user_agent(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ClassifyQuery>,
) -> Json<UserAgentBreakdown> {
    Json(state.classifier.classify(&query.ua))
}

/// POST /api/parse/access
pub async fn parse_access(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ParseAccessRequest>,
) -> Json<Vec<ParsedAccessRecord>> {
    let format = request.format.as_deref().or(state.access_format.as_deref());
    Json(state.access_parser.parse(&request.lines, format))
}

/// POST /api/parse/error
pub async fn parse_error(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ParseErrorRequest>,
) -> Json<Vec<ParsedErrorRecord>> {
    Json(state.error_parser.parse(&request.lines))
}

/// Rejects `/api/*` requests without the configured bearer token.
pub async fn require_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = &state.auth_token else {
        return next.run(request).await;
    };

    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if presented == Some(expected.as_str()) {
        next.run(request).await
    } else {
        tracing::debug!(path = %request.uri().path(), "Rejected request without valid token");
        ApiError::Unauthorized.into_response()
    }
}

// Error handling
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    Ingest(IngestError),
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        ApiError::Ingest(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            ApiError::Ingest(e) => (
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                e.to_string(),
            ),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
