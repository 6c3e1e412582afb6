//! Login relay.
//!
//! Accepts a form-encoded login on `POST /api/login` and forwards it to the
//! authentication backend. Backend rejections come back with the backend's
//! own status and a `{"detail": ...}` body; anything else, including a form
//! that cannot be read, becomes a 500 with a generic message.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Form, Json};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::api::{AuthBackend, BackendError, Credentials};

/// Route the relay listens on
pub const LOGIN_ROUTE: &str = "/api/login";

const UNEXPECTED_ERROR: &str = "An unexpected error occurred.";

#[derive(Debug, Serialize)]
struct ErrorDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

/// Build the relay router forwarding to `backend`
pub fn router(backend: Arc<dyn AuthBackend>) -> axum::Router {
    axum::Router::new()
        .route(LOGIN_ROUTE, post(relay_login))
        .with_state(backend)
}

/// Serve the relay on `addr` until the process is stopped
pub async fn serve(addr: &str, backend: Arc<dyn AuthBackend>) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind relay to {}", addr))?;
    info!(addr = %addr, "Login relay listening");

    axum::serve(listener, router(backend))
        .await
        .context("Login relay stopped unexpectedly")
}

fn unexpected_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorDetail {
            detail: Some(UNEXPECTED_ERROR.to_string()),
        }),
    )
        .into_response()
}

async fn relay_login(
    State(backend): State<Arc<dyn AuthBackend>>,
    form: Result<Form<Credentials>, FormRejection>,
) -> Response {
    let credentials = match form {
        Ok(Form(credentials)) => credentials,
        Err(e) => {
            warn!(error = %e, "Login relay received an unreadable form");
            return unexpected_error();
        }
    };

    match backend.login(&credentials).await {
        Ok(grant) => Json(grant).into_response(),
        Err(BackendError::Rejected { status, detail }) => {
            warn!(status, username = %credentials.username, "Backend rejected login");
            let code = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (code, Json(ErrorDetail { detail })).into_response()
        }
        Err(e) => {
            error!(error = %e, "Login relay could not reach backend");
            unexpected_error()
        }
    }
}
