use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;
use tracing::error;

#[derive(Debug, ThisError)]
pub enum CmsError {
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("Password hash error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Hosted backend error ({status}): {code}: {message}")]
    Backend {
        status: StatusCode,
        code: String,
        message: String,
    },

    #[error("No {table} row with id {id}")]
    RowMissing { table: &'static str, id: i64 },

    #[error("No stored file named {0}")]
    FileMissing(String),

    #[error("Missing required configuration: {0}")]
    MissingConfig(&'static str),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for CmsError {
    fn into_response(self) -> axum::response::Response {
        if !matches!(
            self,
            CmsError::RowMissing { .. }
                | CmsError::FileMissing(_)
                | CmsError::InvalidInput(_)
                | CmsError::Unauthorized
        ) {
            error!(error = %self, "request failed");
        }
        let (status, error_body) = match self {
            CmsError::DatabaseError(_)
            | CmsError::PasswordHash(_)
            | CmsError::Io(_)
            | CmsError::Json(_)
            | CmsError::MissingConfig(_)
            | CmsError::Internal(_) => {
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                let body = ApiErrorBody {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred.".to_string(),
                };
                (status, body)
            }
            CmsError::Reqwest(_) | CmsError::UrlParse(_) | CmsError::Backend { .. } => {
                let status = StatusCode::BAD_GATEWAY;
                let body = ApiErrorBody {
                    code: "BAD_GATEWAY".to_string(),
                    message: "Storage backend is unavailable.".to_string(),
                };
                (status, body)
            }
            CmsError::RowMissing { table, id } => {
                let status = StatusCode::NOT_FOUND;
                let body = ApiErrorBody {
                    code: "NOT_FOUND".to_string(),
                    message: format!("No {table} row with id {id}."),
                };
                (status, body)
            }
            CmsError::FileMissing(name) => {
                let status = StatusCode::NOT_FOUND;
                let body = ApiErrorBody {
                    code: "NOT_FOUND".to_string(),
                    message: format!("File {name} not found."),
                };
                (status, body)
            }
            CmsError::InvalidInput(msg) => {
                let status = StatusCode::BAD_REQUEST;
                let body = ApiErrorBody {
                    code: "INVALID_INPUT".to_string(),
                    message: msg,
                };
                (status, body)
            }
            CmsError::Unauthorized => {
                let status = StatusCode::UNAUTHORIZED;
                let body = ApiErrorBody {
                    code: "UNAUTHORIZED".to_string(),
                    message: "Authentication required.".to_string(),
                };
                (status, body)
            }
        };
        (status, Json(ApiErrorResponse { error: error_body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

/// PostgREST error response structure
#[derive(Deserialize, Debug, Default)]
pub struct PostgrestError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl PostgrestError {
    /// PostgREST reports "zero rows for a single-object request" with this code.
    pub const NO_ROWS: &'static str = "PGRST116";

    pub fn is_no_rows(&self) -> bool {
        self.code == Self::NO_ROWS
    }

    pub fn into_error(self, status: StatusCode) -> CmsError {
        let message = match self.details {
            Some(details) if !details.is_empty() => format!("{} ({details})", self.message),
            _ => self.message,
        };
        CmsError::Backend {
            status,
            code: self.code,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_missing_maps_to_404() {
        let resp = CmsError::RowMissing {
            table: "banners",
            id: 7,
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn file_errors_split_between_404_and_500() {
        let missing = CmsError::FileMissing("1-a.png".to_string()).into_response();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let resp = CmsError::from(io).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn backend_failures_map_to_bad_gateway() {
        let err = PostgrestError {
            code: "42P01".to_string(),
            message: "relation does not exist".to_string(),
            ..Default::default()
        }
        .into_error(StatusCode::NOT_FOUND);
        assert!(err.to_string().contains("42P01"));
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn no_rows_code_is_recognized() {
        let err: PostgrestError = serde_json::from_str(
            r#"{"code":"PGRST116","details":"The result contains 0 rows","hint":null,"message":"JSON object requested, multiple (or no) rows returned"}"#,
        )
        .unwrap();
        assert!(err.is_no_rows());
    }
}
