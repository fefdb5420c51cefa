//! JSON error envelope shared by the workflow routers.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::store::RepositoryError;
use super::validation::ValidationError;

/// Errors that know how they should surface over HTTP.
pub trait WorkflowError: std::error::Error {
    fn status(&self) -> StatusCode;

    /// Machine-readable code clients can branch on.
    fn error_code(&self) -> &'static str;

    /// Extra top-level fields merged into the error body.
    fn details(&self) -> Option<Value> {
        None
    }
}

pub fn error_response<E: WorkflowError>(error: &E) -> Response {
    let mut body = Map::new();
    body.insert("success".to_string(), Value::Bool(false));
    body.insert("message".to_string(), Value::String(error.to_string()));
    body.insert(
        "errorCode".to_string(),
        Value::String(error.error_code().to_string()),
    );
    if let Some(Value::Object(extra)) = error.details() {
        body.extend(extra);
    }

    (error.status(), Json(Value::Object(body))).into_response()
}

pub fn success_response(status: StatusCode, message: &str, data: Value) -> Response {
    let payload = json!({
        "success": true,
        "message": message,
        "data": data,
    });
    (status, Json(payload)).into_response()
}

/// Body that failed to parse before reaching a workflow.
pub fn rejection_response(rejection: JsonRejection) -> Response {
    malformed_request(rejection.body_text())
}

/// Query string that failed to parse before reaching a workflow.
pub fn query_rejection_response(rejection: QueryRejection) -> Response {
    malformed_request(rejection.body_text())
}

fn malformed_request(message: String) -> Response {
    let payload = json!({
        "success": false,
        "message": message,
        "errorCode": "VALIDATION_ERROR",
    });
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}

pub fn validation_details(error: &ValidationError) -> Value {
    json!({ "errors": error.errors })
}

pub fn repository_status(error: &RepositoryError) -> StatusCode {
    match error {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict | RepositoryError::VersionMismatch { .. } => StatusCode::CONFLICT,
        RepositoryError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn repository_code(error: &RepositoryError) -> &'static str {
    match error {
        RepositoryError::NotFound => "NOT_FOUND",
        RepositoryError::Conflict => "DUPLICATE_RECORD",
        RepositoryError::VersionMismatch { .. } => "CONCURRENT_UPDATE",
        RepositoryError::Unavailable(_) => "STORAGE_UNAVAILABLE",
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Accepts RFC 3339 timestamps or bare dates (read as midnight UTC).
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    let date = parse_date(trimmed)?;
    Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

pub fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).map_err(serde::de::Error::custom)
}

pub fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.map(|value| parse_date(&value).map_err(serde::de::Error::custom))
        .transpose()
}

pub fn deserialize_instant<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_instant(&raw).map_err(serde::de::Error::custom)
}
