//! Record acceptance endpoint
//!
//! Clients POST their whole unsynced set as a JSON array. Every element with
//! the required shape is acknowledged by id; anything else is dropped without
//! failing the batch. Nothing is persisted here.

use axum::{body::Bytes, response::Json};
use record_sync::AcceptanceResponse;
use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

use crate::error::{ApiError, ApiResult};

pub const INVALID_JSON: &str = "Invalid JSON payload";
pub const EXPECTED_ARRAY: &str = "Expected an array of records";
pub const USE_POST: &str = "Method not allowed. Use POST to submit an array of records.";

/// Shape a submitted record must have to be accepted.
///
/// `syncStatus` and unknown fields are ignored.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedRecord {
    #[validate(length(min = 1))]
    pub id: String,
    #[validate(length(min = 1))]
    pub patient_name: String,
    #[validate(length(min = 1))]
    pub diagnosis: String,
    #[validate(length(min = 1))]
    pub treatment: String,
    #[validate(length(min = 1))]
    pub date: String,
    #[validate(length(min = 1))]
    pub created_by: String,
    #[serde(default)]
    pub file_path: Option<String>,
}

impl SubmittedRecord {
    /// Parse one array element, `None` if it lacks the required shape
    pub fn accept(value: Value) -> Option<Self> {
        let record: SubmittedRecord = serde_json::from_value(value).ok()?;
        record.validate().ok()?;
        Some(record)
    }
}

/// Ids of the well-formed records in `elements`, in submission order
pub fn accepted_ids(elements: Vec<Value>) -> Vec<String> {
    elements
        .into_iter()
        .filter_map(SubmittedRecord::accept)
        .map(|record| record.id)
        .collect()
}

/// `POST /api/sync`
pub async fn accept_records(body: Bytes) -> ApiResult<Json<AcceptanceResponse>> {
    let payload: Value =
        serde_json::from_slice(&body).map_err(|_| ApiError::bad_request(INVALID_JSON))?;

    let Value::Array(elements) = payload else {
        return Err(ApiError::bad_request(EXPECTED_ARRAY));
    };

    let batch_size = elements.len();
    let synced = accepted_ids(elements);

    tracing::info!(
        batch_size,
        accepted = synced.len(),
        dropped = batch_size - synced.len(),
        "Record batch acknowledged"
    );

    Ok(Json(AcceptanceResponse { synced }))
}

/// Any other method on `/api/sync`
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed {
        message: USE_POST.to_string(),
        allow: "POST",
    }
}
