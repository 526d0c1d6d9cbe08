use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorObject,
}

#[derive(Debug, Serialize)]
pub struct ErrorObject {
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(&'static str, String),
    Forbidden(&'static str, String),
    BadRequest(&'static str, String),
    NotFound(&'static str, String),
    Conflict(&'static str, String),
    Internal(String),
}

impl ApiError {
    pub fn invalid_credentials() -> Self {
        ApiError::Unauthorized("INVALID_CREDENTIALS", "Email or password is incorrect".into())
    }

    pub fn session_expired() -> Self {
        ApiError::Unauthorized("SESSION_EXPIRED", "Session expired".into())
    }

    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound("NOT_FOUND", format!("{what} not found"))
    }

    /// One or more supplied ids do not resolve to existing rows.
    /// Always carries the complete offending id list, not just the first.
    pub fn invalid_reference(what: &str, ids: &[Uuid]) -> Self {
        let list = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        ApiError::BadRequest("INVALID_REFERENCE", format!("unknown {what} ids: {list}"))
    }

    pub fn slot_booked(schedule_id: Uuid) -> Self {
        ApiError::Conflict(
            "SLOT_BOOKED",
            format!("schedule {schedule_id} is already booked, cannot remove"),
        )
    }

    pub fn email_taken() -> Self {
        ApiError::Conflict("EMAIL_TAKEN", "Email is already in use".into())
    }

    fn to_error_response(code: &str, message: &str) -> Json<ErrorResponse> {
        Json(ErrorResponse {
            error: ErrorObject {
                code: code.to_string(),
                message: message.to_string(),
            },
        })
    }

    /// Status, code and client-visible message for this error. Internal
    /// detail (storage errors and the like) is logged here and replaced
    /// with a generic message; it never reaches the response body.
    fn response_parts(self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::Unauthorized(code, msg) => (StatusCode::UNAUTHORIZED, code, msg),
            ApiError::Forbidden(code, msg) => (StatusCode::FORBIDDEN, code, msg),
            ApiError::BadRequest(code, msg) => (StatusCode::BAD_REQUEST, code, msg),
            ApiError::NotFound(code, msg) => (StatusCode::NOT_FOUND, code, msg),
            ApiError::Conflict(code, msg) => (StatusCode::CONFLICT, code, msg),
            ApiError::Internal(detail) => {
                tracing::error!("internal error: {detail}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "internal error".to_string(),
                )
            }
        }
    }
}

/// Postgres unique_violation (SQLSTATE 23505). An insert racing against a
/// concurrent duplicate fails here instead of silently duplicating; callers
/// on idempotent paths treat it as "already present".
pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|d| d.code())
        .map(|c| c == "23505")
        .unwrap_or(false)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, msg) = self.response_parts();
        (status, ApiError::to_error_response(code, &msg)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_reference_lists_every_offending_id() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        match ApiError::invalid_reference("specialty", &[a, b]) {
            ApiError::BadRequest(code, msg) => {
                assert_eq!(code, "INVALID_REFERENCE");
                assert!(msg.contains(&a.to_string()));
                assert!(msg.contains(&b.to_string()));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn internal_detail_never_reaches_the_client() {
        let err = ApiError::Internal("db error: relation \"doctor\" does not exist".into());
        let (status, code, msg) = err.response_parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code, "INTERNAL");
        assert_eq!(msg, "internal error");
        assert!(!msg.contains("relation"));
    }

    #[test]
    fn client_facing_variants_keep_their_message() {
        let (status, code, msg) =
            ApiError::NotFound("NOT_FOUND", "doctor not found".into()).response_parts();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(code, "NOT_FOUND");
        assert_eq!(msg, "doctor not found");
    }

    #[test]
    fn slot_booked_is_a_conflict() {
        let id = Uuid::new_v4();
        match ApiError::slot_booked(id) {
            ApiError::Conflict(code, msg) => {
                assert_eq!(code, "SLOT_BOOKED");
                assert!(msg.contains(&id.to_string()));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
