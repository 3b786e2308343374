use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::server::CareSyncServer;

#[derive(Debug, Deserialize)]
pub struct SendVerificationRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendVerificationResponse {
    pub success: bool,
    pub message: String,
    pub expires_in_seconds: u64,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub verified: bool,
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|_| ApiError::bad_request(super::sync::INVALID_JSON))
}

/// `POST /api/professional/send-verification`
pub async fn send_verification(
    State(server): State<CareSyncServer>,
    payload: Result<Json<SendVerificationRequest>, JsonRejection>,
) -> ApiResult<Json<SendVerificationResponse>> {
    let request = json_body(payload)?;
    let issued = server.verification().issue(&request.email).await?;

    Ok(Json(SendVerificationResponse {
        success: true,
        message: "Verification code sent".to_string(),
        expires_in_seconds: issued.expires_in_secs,
    }))
}

/// `POST /api/professional/verify`
pub async fn verify_code(
    State(server): State<CareSyncServer>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> ApiResult<Json<VerifyResponse>> {
    let request = json_body(payload)?;
    if request.code.trim().is_empty() {
        return Err(ApiError::bad_request("Verification code is required"));
    }

    server
        .verification()
        .verify(&request.email, &request.code)
        .await?;

    Ok(Json(VerifyResponse { verified: true }))
}
