use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;

use crate::workflow::{WorkflowError, balance::BalanceError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error(transparent)]
    Balance(#[from] BalanceError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(what: &str) -> Self {
        AppError::NotFound(format!("{what} not found"))
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) | AppError::Workflow(WorkflowError::Unauthorized) => {
                "FORBIDDEN"
            }
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Workflow(WorkflowError::NotOpen(_)) => "NOT_OPEN",
            AppError::Workflow(WorkflowError::IllegalTransition { .. }) => "ILLEGAL_TRANSITION",
            AppError::Balance(BalanceError::Missing) => "MISSING_BALANCE",
            AppError::Balance(BalanceError::Insufficient { .. }) => "INSUFFICIENT_BALANCE",
            AppError::Database(_) | AppError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) | AppError::Workflow(WorkflowError::Unauthorized) => {
                StatusCode::FORBIDDEN
            }
            AppError::BadRequest(_)
            | AppError::Balance(_)
            | AppError::Workflow(WorkflowError::IllegalTransition { .. }) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Conflict(_) | AppError::Workflow(WorkflowError::NotOpen(_)) => {
                StatusCode::CONFLICT
            }
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self {
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                "Internal Server Error".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!(error = ?e, "Internal error");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error,
            code: self.code(),
        })
    }
}
