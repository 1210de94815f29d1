//! Error aggregation for the scoping pipeline. Pure data, no HTTP framework
//! dependencies; the binding layer maps `Status` to a wire response.

use http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// A single user-visible pipeline error: a message plus a diagnostic body
/// (usually the offending field names, or an identifier).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{message}")]
pub struct ScopeError {
    pub message: String,
    pub body: Value,
}

impl ScopeError {
    pub fn new(message: impl Into<String>, body: Value) -> Self {
        Self {
            message: message.into(),
            body,
        }
    }
}

/// Terminal outcome status of a pipeline invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Ok,
    Created,
    BadRequest,
    Forbidden,
    NotFound,
    Unprocessable,
}

impl Status {
    /// Wire-level status code mapping.
    #[must_use]
    pub fn status_code(self) -> StatusCode {
        match self {
            Status::Ok => StatusCode::OK,
            Status::Created => StatusCode::CREATED,
            Status::BadRequest => StatusCode::BAD_REQUEST,
            Status::Forbidden => StatusCode::FORBIDDEN,
            Status::NotFound => StatusCode::NOT_FOUND,
            Status::Unprocessable => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    #[must_use]
    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }
}

/// Accumulates structured errors across all validation stages.
///
/// Errors keep stage order; the terminal status is last-writer-wins among
/// stages that reported a non-default status, so with the fixed stage order
/// pagination → sort → filter → field → attachment a later stage's status
/// overwrites an earlier one.
#[derive(Debug, Default)]
pub struct ErrorCollector {
    errors: Vec<ScopeError>,
    status: Status,
}

impl ErrorCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ScopeError, status: Status) {
        self.errors.push(error);
        if !status.is_ok() {
            self.status = status;
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    #[must_use]
    pub fn errors(&self) -> &[ScopeError] {
        &self.errors
    }

    #[must_use]
    pub fn into_parts(self) -> (Vec<ScopeError>, Status) {
        (self.errors, self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_maps_to_wire_codes() {
        assert_eq!(Status::Ok.status_code().as_u16(), 200);
        assert_eq!(Status::Created.status_code().as_u16(), 201);
        assert_eq!(Status::BadRequest.status_code().as_u16(), 400);
        assert_eq!(Status::Forbidden.status_code().as_u16(), 403);
        assert_eq!(Status::NotFound.status_code().as_u16(), 404);
        assert_eq!(Status::Unprocessable.status_code().as_u16(), 422);
    }

    #[test]
    fn collector_keeps_insertion_order() {
        let mut c = ErrorCollector::new();
        c.push(ScopeError::new("first", json!(["a"])), Status::BadRequest);
        c.push(ScopeError::new("second", json!(["b"])), Status::BadRequest);
        let (errors, status) = c.into_parts();
        assert_eq!(errors[0].message, "first");
        assert_eq!(errors[1].message, "second");
        assert_eq!(status, Status::BadRequest);
    }

    #[test]
    fn status_is_last_writer_wins() {
        let mut c = ErrorCollector::new();
        c.push(ScopeError::new("a", Value::Null), Status::BadRequest);
        c.push(ScopeError::new("b", Value::Null), Status::NotFound);
        assert_eq!(c.status(), Status::NotFound);
    }

    #[test]
    fn ok_status_does_not_overwrite() {
        let mut c = ErrorCollector::new();
        c.push(ScopeError::new("a", Value::Null), Status::BadRequest);
        c.push(ScopeError::new("b", Value::Null), Status::Ok);
        assert_eq!(c.status(), Status::BadRequest);
    }

    #[test]
    fn scope_error_serializes_as_message_body() {
        let e = ScopeError::new("Unknown Sort", json!(["code"]));
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v, json!({"message": "Unknown Sort", "body": ["code"]}));
    }
}
