//! Error responses.
//!
//! # Design Decisions
//! - Playground authors are the audience, so 500s carry the underlying error text
//! - Everything that is not a missing route maps to 500

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::render::RenderError;
use crate::routing::ScanError;

#[derive(Debug, Error)]
pub enum PlaygroundError {
    #[error("no playground file for {method} {path}")]
    NotFound { method: String, path: String },

    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("template error: {0}")]
    Render(#[from] RenderError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl PlaygroundError {
    pub fn status(&self) -> StatusCode {
        match self {
            PlaygroundError::NotFound { .. } => StatusCode::NOT_FOUND,
            PlaygroundError::Scan(_)
            | PlaygroundError::Render(_)
            | PlaygroundError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PlaygroundError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            PlaygroundError::NotFound { method, path } => {
                tracing::debug!(%method, %path, "No playground file");
                (status, "404 page not found\n").into_response()
            }
            other => {
                tracing::error!(error = %other, "Request failed");
                (status, format!("{other}\n")).into_response()
            }
        }
    }
}
