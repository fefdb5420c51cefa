use std::fmt;

use serde::Serialize;

/// Field-level validation message returned with 400 responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Collects field errors while a request is being checked.
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: Vec<FieldError>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Records `message` against `field` unless `condition` holds.
    pub fn ensure(&mut self, condition: bool, field: impl Into<String>, message: impl Into<String>) {
        if !condition {
            self.push(field, message);
        }
    }

    pub fn require_text(&mut self, value: &str, field: impl Into<String>) {
        let field = field.into();
        if value.trim().is_empty() {
            let message = format!("{field} is required");
            self.push(field, message);
        }
    }

    pub fn require_email(&mut self, value: &str, field: impl Into<String>) {
        let field = field.into();
        let trimmed = value.trim();
        let valid = match trimmed.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
            }
            None => false,
        };
        if !valid {
            let message = format!("{field} must be a valid email address");
            self.push(field, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> Result<(), ValidationError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                errors: self.errors,
            })
        }
    }
}

/// Malformed or missing request fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.push(field, message);
        Self {
            errors: errors.errors,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.errors.iter().map(|e| e.field.as_str()).collect();
        write!(f, "invalid request fields: {}", fields.join(", "))
    }
}

impl std::error::Error for ValidationError {}
