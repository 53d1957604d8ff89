//! HTTP surface: login, agent CRUD pass-throughs, and the upload endpoint
//! that triggers a distribution run.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Multipart, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use crate::auth::{AuthContext, AuthService};
use crate::config::AppConfig;
use crate::distribution::Distributor;
use crate::error::{DistributionError, RosterError};
use crate::ingest::UploadFormat;
use crate::roster::{Agent, AgentRoster, NewAgent};

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub roster: Arc<dyn AgentRoster>,
    pub distributor: Arc<Distributor>,
    /// Runs replace assignments wholesale, so overlapping runs would race
    /// with last-writer-wins. The service serializes them here.
    pub run_lock: Arc<tokio::sync::Mutex<()>>,
    pub cancel: CancellationToken,
}

impl AppState {
    pub fn new(roster: Arc<dyn AgentRoster>, config: &AppConfig, cancel: CancellationToken) -> Self {
        Self {
            auth: Arc::new(AuthService::new()),
            distributor: Arc::new(Distributor::new(roster.clone(), config.commit.clone())),
            roster,
            run_lock: Arc::new(tokio::sync::Mutex::new(())),
            cancel,
        }
    }
}

/// Bearer-token extractor for protected routes. The token must have been
/// issued by `POST /api/users/login`.
#[async_trait]
impl FromRequestParts<AppState> for AuthContext {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Response> {
        let token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        match token {
            Some(token) => match state.auth.authenticate(token).await {
                Some(ctx) => Ok(ctx),
                None => Err(error_response(StatusCode::UNAUTHORIZED, "Please authenticate")),
            },
            None => Err(error_response(StatusCode::UNAUTHORIZED, "Please authenticate")),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/users/login", post(login_handler))
        .route("/api/agents", post(create_agent_handler))
        .route("/api/agents", get(list_agents_handler))
        .route("/api/agents/upload", post(upload_handler))
        // Historical path from when only CSV was accepted; kept for
        // drop-in compatibility with existing clients.
        .route("/api/agents/upload-csv", post(upload_handler))
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the shutdown token fires.
pub async fn serve(
    addr: SocketAddr,
    state: AppState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let app = router(state);
    tracing::info!(addr = %addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
}

async fn login_handler(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Response {
    match state.auth.login(&payload.email, &payload.password).await {
        Some(token) => Json(LoginResponse {
            token: token.to_string(),
        })
        .into_response(),
        None => error_response(StatusCode::UNAUTHORIZED, "Invalid login credentials"),
    }
}

async fn create_agent_handler(
    State(state): State<AppState>,
    _ctx: AuthContext,
    Json(payload): Json<NewAgent>,
) -> Response {
    let agent = Agent::new(payload);
    match state.roster.insert(agent.clone()).await {
        Ok(()) => {
            tracing::info!(agent_id = %agent.id, email = %agent.email, "Agent created");
            (StatusCode::CREATED, Json(agent)).into_response()
        }
        Err(RosterError::DuplicateEmail(email)) => error_response(
            StatusCode::BAD_REQUEST,
            format!("Agent with email {email} already exists"),
        ),
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

async fn list_agents_handler(State(state): State<AppState>, _ctx: AuthContext) -> Response {
    match state.roster.list_all().await {
        Ok(agents) => Json(agents).into_response(),
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

/// Accept an uploaded lead sheet and run one distribution over the current
/// roster. Responds with the aggregate `DistributionResult`.
async fn upload_handler(
    State(state): State<AppState>,
    _ctx: AuthContext,
    mut multipart: Multipart,
) -> Response {
    let mut upload: Option<(Vec<u8>, UploadFormat)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("Malformed multipart body: {err}"),
                )
            }
        };
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let format =
            match UploadFormat::from_declared(content_type.as_deref(), filename.as_deref()) {
                Ok(format) => format,
                Err(err) => return error_response(StatusCode::BAD_REQUEST, err.to_string()),
            };

        match field.bytes().await {
            Ok(bytes) => {
                upload = Some((bytes.to_vec(), format));
                break;
            }
            Err(err) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("Failed to read upload: {err}"),
                )
            }
        }
    }

    let Some((bytes, format)) = upload else {
        return error_response(StatusCode::BAD_REQUEST, "No file uploaded");
    };

    // One run at a time; a queued upload waits for the previous replace to
    // finish rather than racing it.
    let _run_guard = state.run_lock.lock().await;

    match state.distributor.run(bytes, format, &state.cancel).await {
        Ok(result) => Json(result).into_response(),
        Err(err @ DistributionError::Parse(_)) => {
            error_response(StatusCode::BAD_REQUEST, err.to_string())
        }
        Err(err @ DistributionError::NoAgents) => {
            error_response(StatusCode::BAD_REQUEST, err.to_string())
        }
        Err(err @ DistributionError::Cancelled) => {
            error_response(StatusCode::SERVICE_UNAVAILABLE, err.to_string())
        }
        Err(err @ DistributionError::Infrastructure(_)) => {
            tracing::error!(error = %err, "Distribution run failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}
