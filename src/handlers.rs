use crate::engine::AnswerOutcome;
use crate::error::{AppError, ErrorDetail};
use crate::models::{AnswerEvent, ChannelId, StartTestRequest, UserId};
use crate::state::AppState;
use crate::telegram::Update;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

fn request_id_from_headers(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

pub async fn telegram_webhook(State(state): State<AppState>, Json(update): Json<Update>) -> StatusCode {
    state.engine.handle(update.into_event()).await;
    StatusCode::OK
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StartTestPayload {
    pub user_id: i64,
    /// Defaults to the user's private chat.
    pub channel: Option<i64>,
    #[validate(range(min = 1, max = 10000))]
    pub count: usize,
    #[validate(length(min = 1, max = 64))]
    pub subject: Option<String>,
}

pub async fn start_test(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<StartTestPayload>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let req_id = request_id_from_headers(&headers);
    if let Err(errors) = payload.validate() {
        let details = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| ErrorDetail {
                    field: field.to_string(),
                    issue: e.code.to_string(),
                })
            })
            .collect();
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "invalid start request",
            req_id,
        )
        .with_details(details));
    }

    let request = StartTestRequest {
        user_id: UserId(payload.user_id),
        channel: ChannelId(payload.channel.unwrap_or(payload.user_id)),
        count: payload.count,
        subject: payload.subject.map(|s| s.trim().to_string()),
    };
    let started = state
        .engine
        .start(&request)
        .await
        .map_err(|err| AppError::from_quiz(err, req_id))?;
    Ok((StatusCode::CREATED, Json(json!(started))))
}

pub async fn submit_answer(
    State(state): State<AppState>,
    Json(event): Json<AnswerEvent>,
) -> (StatusCode, Json<serde_json::Value>) {
    let body = match state.engine.submit_answer(event).await {
        AnswerOutcome::Ignored => json!({ "status": "ignored" }),
        AnswerOutcome::Advanced(progress) => json!({ "status": "advanced", "progress": progress }),
        AnswerOutcome::Completed(report) => json!({ "status": "completed", "report": report }),
    };
    (StatusCode::ACCEPTED, Json(body))
}

pub async fn list_subjects(State(state): State<AppState>) -> Json<serde_json::Value> {
    let bank = state.engine.bank().current().await;
    let items = bank.subjects().partitions().to_vec();
    Json(json!({ "items": items, "total": items.len(), "bankSize": bank.len() }))
}
