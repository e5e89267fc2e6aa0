//! Request error taxonomy and its mapping onto the JSON response contract.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use crate::types::ApiResponse;

pub const MSG_INVALID_METHOD: &str = "Неверный метод запроса";
pub const MSG_VALIDATION: &str = "Ошибка валидации";
pub const MSG_DELIVERY: &str = "Ошибка отправки сообщения. Попробуйте позже или свяжитесь по телефону.";
pub const MSG_INTERNAL: &str = "Внутренняя ошибка сервера. Попробуйте позже.";

/// Everything that can terminate a submission early. Internal detail never
/// reaches the caller; only validation errors carry field-level messages.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("request method is not POST")]
    InvalidMethod,
    #[error("submission failed validation")]
    Validation(BTreeMap<String, String>),
    #[error("email delivery failed")]
    Delivery,
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for FormError {
    fn into_response(self) -> Response {
        // Status class follows the contract: 400 only when field details
        // exist, 500 for every other failure.
        let (status, message, details) = match self {
            FormError::InvalidMethod => (StatusCode::INTERNAL_SERVER_ERROR, MSG_INVALID_METHOD, None),
            FormError::Validation(details) => {
                (StatusCode::BAD_REQUEST, MSG_VALIDATION, Some(details))
            }
            FormError::Delivery => (StatusCode::INTERNAL_SERVER_ERROR, MSG_DELIVERY, None),
            FormError::Internal(detail) => {
                error!("internal error while handling submission: {}", detail);
                (StatusCode::INTERNAL_SERVER_ERROR, MSG_INTERNAL, None)
            }
        };
        (status, Json(ApiResponse::failure(message, details))).into_response()
    }
}
