//! The HTTP subsystem whose lifetime the lifecycle manager owns.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use common_status::{Status, StatusReporter};
use lifecycle::{Subsystem, SubsystemError};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::AppMode;
use crate::data::{Artist, ArtistStore, DataError};

#[derive(Clone)]
pub struct AppState {
    reporter: StatusReporter,
    mode: AppMode,
    store: Arc<dyn ArtistStore>,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(reporter: StatusReporter, mode: AppMode, store: Arc<dyn ArtistStore>) -> Self {
        Self {
            reporter,
            mode,
            store,
            shutdown: CancellationToken::new(),
        }
    }
}

#[derive(Serialize)]
struct StatusResponse {
    status: Status,
    mode: AppMode,
}

#[derive(Deserialize)]
struct NewArtist {
    title: String,
}

struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "error": self.1 }))).into_response()
    }
}

impl From<DataError> for ApiError {
    fn from(err: DataError) -> Self {
        let code = match &err {
            DataError::NotFound(_) => StatusCode::NOT_FOUND,
            DataError::MissingKey | DataError::Json(_) => StatusCode::BAD_REQUEST,
        };
        ApiError(code, err.to_string())
    }
}

/// Histogram buckets in seconds, sized for shutdown and request latencies.
const BUCKETS: &[f64] = &[
    0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];

fn prometheus_builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new().set_buckets(BUCKETS)
}

pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    prometheus_builder()?.install_recorder()
}

pub fn router(state: AppState, metrics: Option<PrometheusHandle>) -> Router {
    let router = Router::new()
        .route("/_liveness", get(liveness))
        .route("/_readiness", get(readiness))
        .route("/api/v0/status", get(status))
        .route("/api/v0/artists", post(create_artist))
        .route("/api/v0/artists/:id", get(get_artist).delete(delete_artist))
        .with_state(state);

    match metrics {
        Some(handle) => router.route(
            "/metrics",
            get(move || std::future::ready(handle.render())),
        ),
        None => router,
    }
}

async fn liveness() -> &'static str {
    "ok"
}

/// 503 as soon as shutdown begins, so load balancers stop routing here.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.shutdown.is_cancelled() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    }
}

async fn status(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let status = state.reporter.snapshot().map_err(|e| {
        error!("failed to build status snapshot: {e}");
        ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    Ok(Json(StatusResponse {
        status,
        mode: state.mode,
    }))
}

async fn create_artist(
    State(state): State<AppState>,
    Json(body): Json<NewArtist>,
) -> Result<(StatusCode, Json<Artist>), ApiError> {
    let mut artist = Artist {
        id: 0,
        title: body.title,
    };
    artist.save(state.store.as_ref()).await?;
    Ok((StatusCode::CREATED, Json(artist)))
}

async fn get_artist(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Artist>, ApiError> {
    let mut artist = Artist {
        id,
        title: String::new(),
    };
    artist.load(state.store.as_ref()).await?;
    Ok(Json(artist))
}

async fn delete_artist(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let artist = Artist {
        id,
        title: String::new(),
    };
    artist.delete(state.store.as_ref()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Serves the API until asked to stop; in-flight requests are drained on stop.
pub struct HttpSubsystem {
    bind: String,
    state: AppState,
    metrics: Option<PrometheusHandle>,
    local_addr: Option<SocketAddr>,
    server: Option<JoinHandle<std::io::Result<()>>>,
}

impl HttpSubsystem {
    pub fn new(bind: String, state: AppState, metrics: Option<PrometheusHandle>) -> Self {
        Self {
            bind,
            state,
            metrics,
            local_addr: None,
            server: None,
        }
    }

    /// Address actually bound, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

#[async_trait]
impl Subsystem for HttpSubsystem {
    async fn start(&mut self) -> Result<(), SubsystemError> {
        let listener = tokio::net::TcpListener::bind(&self.bind)
            .await
            .map_err(|e| SubsystemError::new(format!("failed to bind {}: {e}", self.bind)))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| SubsystemError::new(format!("failed to read bound address: {e}")))?;

        let app = router(self.state.clone(), self.metrics.clone());
        let token = self.state.shutdown.clone();
        self.server = Some(tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await
        }));
        self.local_addr = Some(local_addr);

        info!(address = %local_addr, "Listening for connections");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), SubsystemError> {
        self.state.shutdown.cancel();
        let Some(server) = self.server.take() else {
            return Ok(());
        };
        match server.await {
            Ok(Ok(())) => {
                info!("HTTP server drained");
                Ok(())
            }
            Ok(Err(e)) => Err(SubsystemError::new(format!("http server error: {e}"))),
            Err(e) => Err(SubsystemError::new(format!("http server task failed: {e}"))),
        }
    }
}
