use std::error::Error;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Value, json};

use crate::utils::error::BrokerError;

/// A broker failure as returned to the HTTP caller.
#[derive(Debug)]
pub struct ApiError(pub BrokerError);

impl From<BrokerError> for ApiError {
    fn from(error: BrokerError) -> Self {
        Self(error)
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub description: String,
}

impl ErrorBody {
    /// The error's message, followed by its cause if it has one.
    pub fn from_error(error: &(dyn Error + 'static)) -> Self {
        let description = match error.source() {
            Some(cause) => format!("{error} Cause: {cause}"),
            None => error.to_string(),
        };
        Self { description }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody::from_error(&self.0);
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

/// The `{}` body returned by successful commands.
pub fn empty() -> Json<Value> {
    Json(json!({}))
}
