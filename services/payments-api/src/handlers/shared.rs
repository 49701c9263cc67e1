//! Shared handler utilities
//!
//! Common validation, pagination and metrics helpers used across handlers.

use std::time::Instant;

use serde::Deserialize;

use linkup_types::PageRequest;

use crate::error::ApiError;

// ============================================================================
// Input Validation
// ============================================================================

/// Maximum length for user-provided strings
const MAX_STRING_LEN: usize = 256;

/// Maximum number of benefits on a package
const MAX_BENEFITS: usize = 20;

/// Validate a user-provided string is within safe bounds.
pub fn validate_string_length(value: &str, field_name: &str) -> Result<(), ApiError> {
    if value.len() > MAX_STRING_LEN {
        return Err(ApiError::BadRequest(format!(
            "{field_name} too long (max {MAX_STRING_LEN} chars)"
        )));
    }
    Ok(())
}

/// Validate a package benefit list
pub fn validate_benefits(benefits: &[String]) -> Result<(), ApiError> {
    if benefits.len() > MAX_BENEFITS {
        return Err(ApiError::BadRequest(format!(
            "too many benefits (max {MAX_BENEFITS})"
        )));
    }
    benefits
        .iter()
        .try_for_each(|b| validate_string_length(b, "benefit"))
}

/// Parse a typed id from a request field
pub fn parse_id<T>(
    raw: &str,
    field_name: &str,
    parse: impl Fn(&str) -> Result<T, uuid::Error>,
) -> Result<T, ApiError> {
    parse(raw.trim()).map_err(|_| ApiError::BadRequest(format!("Invalid {field_name}")))
}

// ============================================================================
// Pagination
// ============================================================================

/// `?page=&limit=` query parameters
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl From<PageQuery> for PageRequest {
    fn from(query: PageQuery) -> Self {
        PageRequest::new(query.page, query.limit)
    }
}

// ============================================================================
// Metrics Helpers
// ============================================================================

/// Record HTTP handler duration with result label.
///
/// Labels: operation, result (ok/err)
#[inline]
pub fn record_op_duration(operation: &'static str, start: Instant, success: bool) {
    let result = if success { "ok" } else { "err" };
    metrics::histogram!(
        "http_request_duration_seconds",
        "operation" => operation,
        "result" => result
    )
    .record(start.elapsed().as_secs_f64());
}

// ============================================================================
// Tests
// ============================================================================
