use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::db::StoreError;

pub const UNKNOWN_PARTICIPANTS_CODE: &str = "UNKNOWN_PARTICIPANTS";

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("{0}")]
    Validation(String),

    #[error("Some participants are not registered users")]
    UnknownParticipants(Vec<String>),

    #[error("Appointment not found")]
    NotFound,

    #[error("You are not authorized to {action} this appointment")]
    Forbidden { action: &'static str },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BookingError {
    pub fn validation(msg: impl Into<String>) -> Self {
        BookingError::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            BookingError::Validation(_) | BookingError::UnknownParticipants(_) => {
                StatusCode::BAD_REQUEST
            }
            BookingError::NotFound => StatusCode::NOT_FOUND,
            BookingError::Forbidden { .. } => StatusCode::FORBIDDEN,
            BookingError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error envelope returned by the appointment routes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unknown_participants: Option<Vec<String>>,
}

impl ErrorBody {
    pub fn message(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: None,
            unknown_participants: None,
        }
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        let body = match self {
            BookingError::UnknownParticipants(emails) => ErrorBody {
                error: message,
                code: Some(UNKNOWN_PARTICIPANTS_CODE),
                unknown_participants: Some(emails),
            },
            BookingError::Store(e) => {
                error!(error = %e, "store operation failed");
                ErrorBody::message("Internal server error")
            }
            _ => ErrorBody::message(message),
        };
        (status, Json(body)).into_response()
    }
}
