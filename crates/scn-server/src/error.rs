use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

use scn_diff::DiffError;
use scn_merge::MergeError;
use scn_store::StoreError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Diff(#[from] DiffError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ServerError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

fn store_status(e: &StoreError) -> (StatusCode, &'static str) {
    match e {
        StoreError::ScenarioNotFound(_) | StoreError::RowNotFound { .. } => {
            (StatusCode::NOT_FOUND, "not_found")
        }
        StoreError::Validation(_) | StoreError::NotWritable { .. } | StoreError::CannotRemove { .. } => {
            (StatusCode::BAD_REQUEST, "validation")
        }
        StoreError::StaleSnapshot { .. } => (StatusCode::CONFLICT, "stale_snapshot"),
        StoreError::Consistency(_) => (StatusCode::INTERNAL_SERVER_ERROR, "consistency"),
        StoreError::LockPoisoned(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    }
}

impl ServerError {
    /// HTTP status and the machine-readable `error` field of the body.
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "validation"),
            Self::Store(e) | Self::Diff(DiffError::Store(e)) => store_status(e),
            Self::Diff(DiffError::NotParent { .. }) => (StatusCode::BAD_REQUEST, "validation"),
            Self::Diff(DiffError::Consistency(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "consistency")
            }
            Self::Merge(e) => {
                let status = match e {
                    MergeError::NotFound(_) => StatusCode::NOT_FOUND,
                    MergeError::InvalidMergeSource { .. } | MergeError::Validation(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    MergeError::ConflictsPending { .. }
                    | MergeError::MergeInProgress { .. }
                    | MergeError::StaleSnapshot { .. } => StatusCode::CONFLICT,
                    MergeError::Consistency(_) | MergeError::Store(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, e.kind())
            }
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, kind, "request failed");
        }
        let mut body = json!({
            "success": false,
            "error": kind,
            "message": self.to_string(),
        });
        if let Self::Merge(MergeError::ConflictsPending { conflicts }) = &self {
            body["conflicts"] = json!(conflicts);
        }
        if let Self::Merge(e) = &self {
            body["retryable"] = json!(e.is_retryable());
        }
        (status, Json(body)).into_response()
    }
}
