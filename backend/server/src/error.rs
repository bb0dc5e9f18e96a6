use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use clinic::{RemoteError, UpstreamBody, UpstreamResponse, ValidationErrors};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload")]
    MalformedPayload,

    #[error("{0}")]
    BadRequest(&'static str),

    #[error("{message}")]
    Validation {
        message: String,
        fields: ValidationErrors,
    },

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{message}")]
    Upstream {
        status: StatusCode,
        message: String,
        details: Value,
    },

    #[error("{message}")]
    BadGateway { message: String, details: Value },

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl AppError {
    /// Validation failure reported with the first field error as the message.
    pub fn invalid(fields: ValidationErrors) -> Self {
        Self::Validation {
            message: fields.summary(),
            fields,
        }
    }

    /// Relays a rejected upstream response with its status.
    pub fn upstream(response: UpstreamResponse, fallback: &str) -> Self {
        let message = response.message().unwrap_or(fallback).to_string();

        Self::Upstream {
            status: response.status,
            message,
            details: response.body.to_details(),
        }
    }

    pub fn malformed_upstream(body: &UpstreamBody) -> Self {
        Self::BadGateway {
            message: "Upstream returned a malformed response".to_string(),
            details: body.to_details(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::MalformedPayload => (
                StatusCode::BAD_REQUEST,
                json!({ "message": "Malformed payload" }),
            ),
            AppError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, json!({ "message": message }))
            }
            AppError::Validation { message, fields } => (
                StatusCode::BAD_REQUEST,
                json!({ "message": message, "fields": fields }),
            ),
            AppError::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, json!({ "message": message }))
            }
            AppError::Upstream {
                status,
                message,
                details,
            } => {
                warn!(%status, %message, "Upstream rejected request");
                (status, json!({ "message": message, "details": details }))
            }
            AppError::BadGateway { message, details } => {
                warn!(%message, "Unusable upstream response");
                (
                    StatusCode::BAD_GATEWAY,
                    json!({ "message": message, "details": details }),
                )
            }
            AppError::Remote(RemoteError::InvalidSegment(segment)) => {
                warn!(%segment, "Rejected path segment");
                (
                    StatusCode::BAD_REQUEST,
                    json!({ "message": "Invalid identifier" }),
                )
            }
            AppError::Remote(e) => {
                error!(error = %e, "Upstream unavailable");
                let status = match e {
                    RemoteError::Transport(_) => StatusCode::BAD_GATEWAY,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, json!({ "message": e.to_string() }))
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_message_fallback() {
        let response = UpstreamResponse {
            status: StatusCode::NOT_FOUND,
            body: UpstreamBody::parse("missing"),
        };

        match AppError::upstream(response, "Failed to fetch doctors") {
            AppError::Upstream {
                status,
                message,
                details,
            } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(message, "Failed to fetch doctors");
                assert_eq!(details, json!({ "message": "missing" }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_upstream_message_from_body() {
        let response = UpstreamResponse {
            status: StatusCode::CONFLICT,
            body: UpstreamBody::parse(r#"{"message":"Email taken"}"#),
        };

        assert_eq!(
            AppError::upstream(response, "Registration failed").to_string(),
            "Email taken"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::Unauthorized("Unauthorized - No token")
                .into_response()
                .status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::malformed_upstream(&UpstreamBody::Malformed("x".into()))
                .into_response()
                .status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::MalformedPayload.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(RemoteError::InvalidSegment("..".into()))
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
    }
}
