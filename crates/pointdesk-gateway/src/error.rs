use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pointdesk_core::DeskError;
use pointdesk_platform::ErrorBody;
use tracing::error;

/// A desk failure rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub DeskError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            DeskError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DeskError::NotFound { .. } => StatusCode::NOT_FOUND,
            DeskError::ConstraintViolation(_) | DeskError::Conflict(_) => StatusCode::CONFLICT,
            DeskError::Authentication => StatusCode::UNAUTHORIZED,
            DeskError::Forbidden => StatusCode::FORBIDDEN,
            DeskError::DataAccess(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DeskError> for ApiError {
    fn from(err: DeskError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("request failed: {}", self.0);
        }
        let fields = match &self.0 {
            DeskError::Validation(errors) => Some(errors.clone()),
            _ => None,
        };
        let body = ErrorBody {
            error: self.0.to_string(),
            fields,
        };
        (status, Json(body)).into_response()
    }
}

pub fn internal_error<E: std::fmt::Display>(err: E) -> ApiError {
    ApiError(DeskError::DataAccess(err.to_string()))
}
