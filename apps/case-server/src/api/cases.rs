// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    auth::Auth,
    cases::SubmissionReceipt,
    error::ApiError,
    models::{CaseSummary, CreateCaseRequest, SmsStatus},
    state::AppState,
    validation::validate_case,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCaseResponse {
    pub reference_number: String,
    pub sms_status: SmsStatus,
    pub sms_provider: String,
    pub masked_phone: String,
    pub message: String,
}

impl From<SubmissionReceipt> for CreateCaseResponse {
    fn from(receipt: SubmissionReceipt) -> Self {
        Self {
            reference_number: receipt.reference_number,
            sms_status: receipt.sms_status,
            sms_provider: receipt.sms_provider,
            masked_phone: receipt.masked_phone,
            message: "Case submitted successfully".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CaseListResponse {
    pub cases: Vec<CaseSummary>,
}

/// Submit a case and notify the submitter by SMS.
///
/// Responds 201 once the case is stored, whether or not the SMS went out;
/// `smsStatus` tells which.
#[utoipa::path(
    post,
    path = "/api/cases",
    request_body = CreateCaseRequest,
    tag = "Cases",
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Case stored", body = CreateCaseResponse),
        (status = 400, description = "Invalid request payload"),
        (status = 401, description = "Invalid or expired token")
    )
)]
pub async fn create_case(
    Auth(user): Auth,
    State(state): State<AppState>,
    payload: Result<Json<CreateCaseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateCaseResponse>), ApiError> {
    let Json(request) = payload?;
    let draft = validate_case(request).map_err(ApiError::from_payload)?;
    let receipt = state.cases.submit(&user.user_id, draft).await?;
    Ok((StatusCode::CREATED, Json(receipt.into())))
}

/// List the caller's cases, newest first.
#[utoipa::path(
    get,
    path = "/api/cases",
    tag = "Cases",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Cases owned by the caller", body = CaseListResponse),
        (status = 401, description = "Invalid or expired token")
    )
)]
pub async fn list_cases(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<CaseListResponse>, ApiError> {
    let cases = state.cases.list_cases(&user.user_id).await?;
    Ok(Json(CaseListResponse { cases }))
}
