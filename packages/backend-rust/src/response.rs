use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use masterly_algo::BktError;
use serde::Serialize;

use crate::services::calibration::CalibrationError;
use crate::services::practice::PracticeError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Json<SuccessResponse<T>> {
    Json(SuccessResponse {
        success: true,
        data,
    })
}

#[derive(Debug, Clone)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    is_operational: bool,
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::CONFLICT, "CONFLICT", message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
            is_operational: false,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    fn operational(
        status: StatusCode,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            is_operational: true,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.is_operational {
            self.message
        } else {
            tracing::error!(code = %self.code, error = %self.message, "request failed");
            "Internal server error".to_string()
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code: self.code,
        };

        (self.status, Json(body)).into_response()
    }
}

pub fn json_error(
    status: StatusCode,
    code: impl Into<String>,
    message: impl Into<String>,
) -> AppError {
    AppError {
        status,
        code: code.into(),
        message: message.into(),
        is_operational: true,
    }
}

/// Corrupt calibration or mastery data is a server fault, but the code tells
/// operators which kind.
impl From<BktError> for AppError {
    fn from(err: BktError) -> Self {
        let code = match err {
            BktError::InvalidParameter { .. } => "INVALID_PARAMETER",
            BktError::InvalidState { .. } => "INVALID_STATE",
        };
        json_error(StatusCode::INTERNAL_SERVER_ERROR, code, err.to_string())
    }
}

impl From<PracticeError> for AppError {
    fn from(err: PracticeError) -> Self {
        match err {
            PracticeError::Validation(message) => AppError::validation(message),
            PracticeError::NotFound(message) => AppError::not_found(message),
            PracticeError::Conflict(message) => AppError::conflict(message),
            PracticeError::Estimator(err) => err.into(),
            PracticeError::Sql(err) => AppError::internal(err.to_string()),
        }
    }
}

impl From<CalibrationError> for AppError {
    fn from(err: CalibrationError) -> Self {
        match err {
            CalibrationError::NotFound(message) => AppError::not_found(message),
            CalibrationError::Estimator(err) => err.into(),
            CalibrationError::Sql(err) => AppError::internal(err.to_string()),
            CalibrationError::Task(err) => AppError::internal(err.to_string()),
        }
    }
}
