use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde_json::json;
use serde_json::Value;
use tracing::error;

use crate::domain::history::HistoryError;
use crate::services::FetchError;

#[derive(Debug)]
pub struct Error {
    pub code: StatusCode,
    pub body: Json<Value>,
}

impl Error {
    pub fn new(code: StatusCode, message: &str) -> Self {
        Self {
            code,
            body: Json(json!({"success": false, "message": message})),
        }
    }

    pub fn not_found(message: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: &str) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn message(&self) -> Option<&str> {
        self.body.0["message"].as_str()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (self.code, self.body).into_response()
    }
}

impl From<(StatusCode, &str)> for Error {
    fn from((code, msg): (StatusCode, &str)) -> Self {
        Self::new(code, msg)
    }
}

impl From<sqlx::Error> for Error {
    fn from(error: sqlx::Error) -> Self {
        error!("Database error: {error}");
        Self::internal(&format!("Database error: {error}"))
    }
}

impl From<FetchError> for Error {
    fn from(error: FetchError) -> Self {
        error!("Upstream fetch failed: {error}");
        Self::new(StatusCode::BAD_GATEWAY, &error.to_string())
    }
}

impl From<HistoryError> for Error {
    fn from(error: HistoryError) -> Self {
        match error {
            HistoryError::Db(e) => e.into(),
            other => Self::not_found(&other.to_string()),
        }
    }
}
