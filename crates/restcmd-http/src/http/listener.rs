//! Reply listener: an HTTP endpoint receiving out-of-band command replies

use super::common::{ErrorResponse, HealthCheckResponse, REPLY_ACK, REPLY_ROUTE};
use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use log::{info, trace, warn};
use restcmd::{Correlator, ListenerError, ReplyMessage};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

pub type ListenerState = Arc<ListenerStateInner>;

pub struct ListenerStateInner {
    pub correlator: Correlator,
}

/// Accepts a reply and hands it to the correlator. The body is decoded as
/// JSON whatever its content type.
#[tracing::instrument(level = "debug", skip(state, body), fields(bytes = body.len()))]
pub async fn receive_reply(
    State(state): State<ListenerState>,
    body: Bytes,
) -> Result<&'static str, (StatusCode, Json<ErrorResponse>)> {
    match ReplyMessage::from_slice(&body) {
        Ok(reply) => {
            trace!(
                "POST {REPLY_ROUTE} - reply for '{}' (success: {})",
                reply.cmdid, reply.success
            );
            state.correlator.deposit(reply);
            Ok(REPLY_ACK)
        }
        Err(err) => {
            warn!("POST {REPLY_ROUTE} rejected: {err}");
            Err((StatusCode::BAD_REQUEST, Json(ErrorResponse::from(&err))))
        }
    }
}

pub async fn health_check(State(state): State<ListenerState>) -> Json<HealthCheckResponse> {
    trace!("GET /health");
    Json(HealthCheckResponse {
        status: "healthy".to_string(),
        service: "restcmd-reply-listener".to_string(),
        timestamp: chrono::Utc::now().timestamp().max(0) as u64,
        pending_replies: state.correlator.len(),
    })
}

pub fn create_router(state: ListenerState) -> Router {
    Router::new()
        .route(REPLY_ROUTE, post(receive_reply))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Running reply listener. Stop it with [`ReplyListener::stop`]; dropping it
/// signals shutdown without waiting for the server task.
pub struct ReplyListener {
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<Result<(), ListenerError>>>,
}

impl ReplyListener {
    /// Bind `bind_address:port` and start serving in a background task.
    /// Port 0 picks a free port; see [`ReplyListener::port`].
    pub async fn start(
        bind_address: &str,
        port: u16,
        correlator: Correlator,
    ) -> Result<Self, ListenerError> {
        let address = format!("{bind_address}:{port}");
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|e| ListenerError::from_io_error(e, &address))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| ListenerError::from_io_error(e, &address))?;

        let app = create_router(Arc::new(ListenerStateInner { correlator }));
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .map_err(|e| ListenerError::Serve {
                    reason: e.to_string(),
                })
        });

        info!("Reply listener accepting on http://{local_addr}{REPLY_ROUTE}");
        Ok(Self {
            local_addr,
            shutdown: Some(shutdown_tx),
            server: Some(server),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Stop accepting and wait for the server task to finish.
    pub async fn stop(mut self) -> Result<(), ListenerError> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(server) = self.server.take() {
            server.await.map_err(|e| ListenerError::Serve {
                reason: e.to_string(),
            })??;
        }
        info!("Reply listener on {} stopped", self.local_addr);
        Ok(())
    }
}

impl Drop for ReplyListener {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}
