//! Mapping of session errors onto HTTP responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::errors::CloudError;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// A [`CloudError`] returned from a handler
#[derive(Debug)]
pub struct ApiError(pub CloudError);

impl From<CloudError> for ApiError {
    fn from(err: CloudError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            CloudError::NotFound(_) => StatusCode::NOT_FOUND,
            CloudError::AuthFailure(_) => StatusCode::UNAUTHORIZED,
            CloudError::HttpError(_) | CloudError::ConnectivityLoss(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            CloudError::Status { .. }
            | CloudError::UnsupportedServer(_)
            | CloudError::XmlError(_)
            | CloudError::ParseError(_)
            | CloudError::IncompleteRefresh { .. }
            | CloudError::TaskFailure(_) => StatusCode::BAD_GATEWAY,
            CloudError::JsonError(_)
            | CloudError::ConfigError(_)
            | CloudError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (
            status,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}
