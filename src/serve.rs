//! Purpose: Run an in-memory spy cat service for local development and tests.
//! Exports: `ServeConfig`, `serve`, `router`, `BUILTIN_BREEDS`.
//! Role: Axum server speaking the same `/cats/spycats/` contract the console consumes.
//! Invariants: Loopback-only unless explicitly allowed.
//! Invariants: Rejections use the field-map shape; unknown ids answer 404 with a `detail` envelope.
//! Invariants: State lives only in memory and is lost on exit.

use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde_json::{Value, json};
use std::future::IntoFuture;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::info;

use spycats::api::{BreedOption, Error, ErrorKind, MemoryGateway, SpyCatGateway};

/// Directory served at `/v1/breeds`, shaped like TheCatAPI's entries.
pub const BUILTIN_BREEDS: [(&str, &str); 8] = [
    ("abys", "Abyssinian"),
    ("abob", "American Bobtail"),
    ("bali", "Balinese"),
    ("beng", "Bengal"),
    ("bsho", "British Shorthair"),
    ("mcoo", "Maine Coon"),
    ("siam", "Siamese"),
    ("sphy", "Sphynx"),
];

#[derive(Clone, Debug)]
pub struct ServeConfig {
    pub bind: SocketAddr,
    pub allow_non_loopback: bool,
    /// Reject breeds outside `BUILTIN_BREEDS` on create.
    pub check_breeds: bool,
}

struct AppState {
    store: MemoryGateway,
    breeds: Vec<BreedOption>,
}

pub async fn serve(config: ServeConfig) -> Result<(), Error> {
    validate_config(&config)?;

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to bind server")
                .with_hint("Pick a free port with --bind 127.0.0.1:<port>.")
                .with_source(err)
        })?;
    let local = listener.local_addr().unwrap_or(config.bind);
    info!(addr = %local, check_breeds = config.check_breeds, "spy cat dev server listening");

    let app = router(config.check_breeds);
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            result.map_err(server_failed)?;
        }
        _ = shutdown_signal() => {
            info!("shutting down");
            let _ = shutdown_tx.send(());
            match tokio::time::timeout(Duration::from_secs(10), &mut server).await {
                Ok(result) => result.map_err(server_failed)?,
                Err(_) => {
                    return Err(Error::new(ErrorKind::Io).with_message("server shutdown timed out"));
                }
            }
        }
    };
    Ok(())
}

pub fn router(check_breeds: bool) -> Router {
    let breeds: Vec<BreedOption> = BUILTIN_BREEDS
        .iter()
        .map(|(id, name)| BreedOption::new(*id, *name))
        .collect();
    let store = if check_breeds {
        MemoryGateway::new().with_known_breeds(breeds.iter().map(|breed| breed.name.clone()))
    } else {
        MemoryGateway::new()
    };
    let state = Arc::new(AppState { store, breeds });

    Router::new()
        .route("/healthz", get(healthz))
        .route("/cats/spycats/", get(list_cats).post(create_cat))
        .route("/cats/spycats/:id/", patch(update_cat).delete(delete_cat))
        .route("/v1/breeds", get(list_breeds))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn server_failed(err: std::io::Error) -> Error {
    Error::new(ErrorKind::Io)
        .with_message("server failed")
        .with_source(err)
}

fn validate_config(config: &ServeConfig) -> Result<(), Error> {
    if !is_loopback(config.bind.ip()) && !config.allow_non_loopback {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("non-loopback bind requires explicit opt-in")
            .with_hint("Re-run with --allow-non-loopback or use a loopback address."));
    }
    Ok(())
}

fn is_loopback(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(addr) => addr.is_loopback(),
        IpAddr::V6(addr) => addr.is_loopback(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    #[cfg(not(unix))]
    ctrl_c.await;
}

async fn healthz() -> Response {
    Json(json!({ "ok": true })).into_response()
}

async fn list_cats(State(state): State<Arc<AppState>>) -> Response {
    match state.store.list() {
        Ok(cats) => Json(cats).into_response(),
        Err(err) => error_response(err),
    }
}

async fn create_cat(State(state): State<Arc<AppState>>, body: String) -> Response {
    let payload = match parse_body(&body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    match state.store.create_from_json(&payload) {
        Ok(cat) => (StatusCode::CREATED, Json(cat)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn update_cat(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
    body: String,
) -> Response {
    let Some(id) = parse_id(&id) else {
        return not_found();
    };
    let payload = match parse_body(&body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    match state.store.update_from_json(id, &payload) {
        Ok(cat) => Json(cat).into_response(),
        Err(err) => error_response(err),
    }
}

async fn delete_cat(State(state): State<Arc<AppState>>, AxumPath(id): AxumPath<String>) -> Response {
    let Some(id) = parse_id(&id) else {
        return not_found();
    };
    match state.store.delete(id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

async fn list_breeds(State(state): State<Arc<AppState>>) -> Response {
    Json(state.breeds.clone()).into_response()
}

fn parse_id(raw: &str) -> Option<u64> {
    raw.parse().ok()
}

fn parse_body(body: &str) -> Result<Value, Response> {
    serde_json::from_str(body).map_err(|err| {
        detail_response(
            StatusCode::BAD_REQUEST,
            &format!("JSON parse error - {err}"),
        )
    })
}

fn not_found() -> Response {
    detail_response(StatusCode::NOT_FOUND, "Not found.")
}

fn detail_response(status: StatusCode, detail: &str) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

fn error_response(err: Error) -> Response {
    match err.kind() {
        ErrorKind::Validation => {
            let fields = err.into_fields().unwrap_or_default();
            (StatusCode::BAD_REQUEST, Json(fields)).into_response()
        }
        ErrorKind::NotFound => not_found(),
        ErrorKind::Usage => detail_response(
            StatusCode::BAD_REQUEST,
            err.message().unwrap_or("Bad Request"),
        ),
        _ => detail_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            err.message().unwrap_or("A server error occurred."),
        ),
    }
}
