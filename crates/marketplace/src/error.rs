use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::directory::CatalogImportError;
use crate::workflows::http::{repository_code, repository_status};
use crate::workflows::store::RepositoryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

/// Process-level failures: startup, seeding, and serving. Workflow requests
/// render their own typed errors instead.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Catalog(CatalogImportError),
    Seed(RepositoryError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Catalog(CatalogImportError::Repository(err)) | AppError::Seed(err) => {
                repository_status(err)
            }
            AppError::Catalog(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Catalog(CatalogImportError::Repository(err)) | AppError::Seed(err) => {
                repository_code(err)
            }
            AppError::Catalog(_) => "CATALOG_IMPORT_FAILED",
            AppError::Config(_) => "CONFIGURATION_ERROR",
            AppError::Telemetry(_) | AppError::Io(_) | AppError::Server(_) => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Catalog(err) => write!(f, "listing catalog error: {}", err),
            AppError::Seed(err) => write!(f, "directory seeding failed: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Catalog(err) => Some(err),
            AppError::Seed(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "message": self.to_string(),
            "errorCode": self.error_code(),
        }));
        (self.status(), body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<CatalogImportError> for AppError {
    fn from(value: CatalogImportError) -> Self {
        Self::Catalog(value)
    }
}

impl From<RepositoryError> for AppError {
    fn from(value: RepositoryError) -> Self {
        Self::Seed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_catalog_rows_are_client_errors() {
        let err = AppError::from(CatalogImportError::InvalidField {
            line: 3,
            field: "price",
            value: "lots".to_string(),
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "CATALOG_IMPORT_FAILED");
    }

    #[test]
    fn seeding_a_duplicate_reports_the_storage_code() {
        let err = AppError::from(RepositoryError::Conflict);
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.error_code(), "DUPLICATE_RECORD");
        assert!(err.to_string().starts_with("directory seeding failed"));

        let nested = AppError::from(CatalogImportError::Repository(RepositoryError::Unavailable(
            "lock poisoned".to_string(),
        )));
        assert_eq!(nested.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(nested.error_code(), "STORAGE_UNAVAILABLE");
    }
}
