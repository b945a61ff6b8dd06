//! Gateway HTTP server - Axum router around [`ChatRelay`]

use std::any::Any;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, FromRequest, Request, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use chatrelay_core::{ChatRelay, FAILURE_MESSAGE, RelayOutcome, RelayResult};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::protocol::{
    DEFAULT_CHAT_PATH, METHOD_NOT_ALLOWED_BODY, ProviderStatus, STATUS_PATH, StatusBody,
};

/// Default request body limit (1 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared state for all requests
#[derive(Clone)]
pub struct GatewayState {
    pub relay: Arc<ChatRelay>,
    pub start_time: Instant,
}

/// The gateway server
pub struct GatewayServer {
    state: GatewayState,
    bind: SocketAddr,
    chat_path: String,
    cors: bool,
    max_body_bytes: usize,
}

impl GatewayServer {
    /// Create a new gateway server
    pub fn new(bind: SocketAddr, relay: Arc<ChatRelay>) -> Self {
        let state = GatewayState {
            relay,
            start_time: Instant::now(),
        };
        Self {
            state,
            bind,
            chat_path: DEFAULT_CHAT_PATH.to_string(),
            cors: true,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Serve the chat endpoint on a different route
    pub fn with_chat_path(mut self, path: impl Into<String>) -> Self {
        self.chat_path = path.into();
        self
    }

    /// Enable or disable the permissive CORS layer
    pub fn with_cors(mut self, enabled: bool) -> Self {
        self.cors = enabled;
        self
    }

    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Build the Axum router
    pub fn router(&self) -> Router {
        let router = Router::new()
            .route(&self.chat_path, any(chat_handler))
            .route(STATUS_PATH, get(status_handler))
            .layer(DefaultBodyLimit::max(self.max_body_bytes))
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(TraceLayer::new_for_http());

        let router = if self.cors {
            router.layer(CorsLayer::permissive())
        } else {
            router
        };
        router.with_state(self.state.clone())
    }

    /// Start the server and block until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.router();
        let listener = tokio::net::TcpListener::bind(self.bind).await?;
        info!("Gateway listening on {}{}", self.bind, self.chat_path);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Gateway stopped");
        Ok(())
    }
}

// ── HTTP Handlers ──

/// The method is checked before the body is buffered, so a non-POST request
/// is always 405 whatever its body looks like.
async fn chat_handler(State(state): State<GatewayState>, request: Request) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    if method != Method::POST {
        debug!("Rejecting {} {}", method, request.uri().path());
        return (StatusCode::METHOD_NOT_ALLOWED, METHOD_NOT_ALLOWED_BODY).into_response();
    }

    let body = match Bytes::from_request(request, &state).await {
        Ok(body) => body,
        Err(rejection) => {
            warn!("Chat request body rejected: {}", rejection);
            return rejection.into_response();
        }
    };

    let response = match state.relay.handle(&method, &body).await {
        RelayOutcome::MethodNotAllowed => {
            (StatusCode::METHOD_NOT_ALLOWED, METHOD_NOT_ALLOWED_BODY).into_response()
        }
        RelayOutcome::Completed(result) => {
            let status = if result.is_reply() {
                StatusCode::OK
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, axum::Json(result)).into_response()
        }
    };

    debug!(
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Chat request handled"
    );
    response
}

async fn status_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    let providers = state
        .relay
        .providers()
        .iter()
        .map(|p| ProviderStatus {
            name: p.provider_name().to_string(),
            model: p.model().to_string(),
            configured: p.is_configured(),
        })
        .collect();

    axum::Json(StatusBody {
        status: "ok".to_string(),
        providers,
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// Turn a handler panic into the same generic failure the relay returns
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    error!(kind = "unexpected", "Handler panicked: {}", detail);

    let body = RelayResult::Failure {
        error: FAILURE_MESSAGE.to_string(),
    };
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
}
