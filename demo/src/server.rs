//! HTTP server for the demo site.
//!
//! [`router`] serves the index view at `/` and a 404 for every other path.
//! Each request runs inside a `request` span tagged with a fresh id.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use webplus_core::logging::request_span;
use webplus_core::{Settings, WebplusError};
use webplus_http::{HttpRequest, HttpResponse};
use webplus_template::MustacheBackend;

use crate::env::EnvironmentSource;
use crate::views;

/// Everything a request handler needs.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application settings.
    pub settings: Arc<Settings>,
    /// The template backend, with templates and locales loaded.
    pub backend: MustacheBackend,
    /// Where the view reads `WP_*` variables from.
    pub environment: EnvironmentSource,
}

impl AppState {
    /// Builds the state from settings, loading the first configured
    /// template engine.
    ///
    /// # Errors
    ///
    /// Returns `ImproperlyConfigured` if no template engine is configured,
    /// and any error raised while loading locales.
    pub fn from_settings(settings: Settings, environment: EnvironmentSource) -> Result<Self, WebplusError> {
        let backend = MustacheBackend::from_settings(&settings, Vec::new())?;
        Ok(Self {
            settings: Arc::new(settings),
            backend,
            environment,
        })
    }
}

/// Builds the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .fallback(not_found)
        .with_state(state)
}

async fn index(State(state): State<AppState>, request: Request) -> Response {
    let (parts, _body) = request.into_parts();
    let request = HttpRequest::from_axum(parts);
    handle(&state, &request).into_response()
}

async fn not_found(request: Request) -> Response {
    tracing::debug!(path = %request.uri().path(), "No route");
    HttpResponse::not_found(format!("Not found: {}", request.uri().path())).into_response()
}

fn handle(state: &AppState, request: &HttpRequest) -> HttpResponse {
    let request_id = uuid::Uuid::new_v4().to_string();
    let span = request_span(&request_id, request.path());
    let _guard = span.enter();

    match views::index(state, request) {
        Ok(response) => {
            tracing::info!(status = response.status().as_u16(), "Request finished");
            response
        }
        Err(e) => {
            tracing::error!(error = %e, status = e.status_code(), "Request failed");
            HttpResponse::from_error(&e)
        }
    }
}

/// Serves the router on `addr` until the process is stopped.
///
/// # Errors
///
/// Returns `ImproperlyConfigured` if the address cannot be bound and
/// `InternalServerError` if the server fails while running.
pub async fn run(state: AppState, addr: &str) -> Result<(), WebplusError> {
    let debug = state.settings.debug;
    let router = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        WebplusError::ImproperlyConfigured(format!("Failed to bind to {addr}: {e}"))
    })?;

    if debug {
        tracing::info!("Starting development server at http://{addr}/");
    }

    axum::serve(listener, router)
        .await
        .map_err(|e| WebplusError::InternalServerError(format!("Server error: {e}")))?;

    Ok(())
}
