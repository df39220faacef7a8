use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Every fallible operation in the service surfaces one of these kinds.
/// Persistence-layer details are logged, never sent to the caller.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: Uuid,
        requested: i32,
        available: i32,
    },
    #[error("{0}")]
    InvalidAdjustment(String),
    #[error("internal server error")]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::NotFound(_) => "not_found",
            ApiError::InvalidState(_) => "invalid_state",
            ApiError::InsufficientStock { .. } => "insufficient_stock",
            ApiError::InvalidAdjustment(_) => "invalid_adjustment",
            ApiError::Database(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidState(_) => StatusCode::CONFLICT,
            ApiError::InsufficientStock { .. } => StatusCode::CONFLICT,
            ApiError::InvalidAdjustment(_) => StatusCode::CONFLICT,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Database(ref e) = self {
            log::error!("database error: {}", e);
        }
        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds() {
        assert_eq!(ApiError::Validation("x".into()).kind(), "validation_error");
        assert_eq!(ApiError::NotFound("x".into()).kind(), "not_found");
        assert_eq!(ApiError::InvalidState("x".into()).kind(), "invalid_state");
        assert_eq!(
            ApiError::InsufficientStock {
                product_id: Uuid::nil(),
                requested: 5,
                available: 2
            }
            .kind(),
            "insufficient_stock"
        );
        assert_eq!(
            ApiError::InvalidAdjustment("x".into()).kind(),
            "invalid_adjustment"
        );
    }

    #[test]
    fn http_status_mapping() {
        assert_eq!(
            ApiError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::InvalidState("x".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::InsufficientStock {
                product_id: Uuid::nil(),
                requested: 10,
                available: 3
            }
            .status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn database_errors_stay_generic() {
        let err = ApiError::Database(sqlx::Error::PoolTimedOut);
        assert_eq!(err.to_string(), "internal server error");
    }

    #[test]
    fn insufficient_stock_names_the_product() {
        let id = Uuid::new_v4();
        let err = ApiError::InsufficientStock {
            product_id: id,
            requested: 10,
            available: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains(&id.to_string()));
        assert!(msg.contains("requested 10"));
        assert!(msg.contains("available 3"));
    }
}
