use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::store::{InterviewRecord, InterviewUpdate, Store, TranscriptEntry};

use super::auth::AuthUser;
use super::error::{ApiError, ApiResult};
use super::AppState;

const DEFAULT_PAGE: u64 = 1;
const DEFAULT_LIMIT: u64 = 10;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub pages: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub interviews: Vec<InterviewRecord>,
    pub page_info: PageInfo,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Extracts and validates the `questions` payload for interview creation.
fn validate_questions(body: &Value) -> ApiResult<Vec<String>> {
    let Some(questions) = body.get("questions") else {
        return Err(ApiError::Validation("Questions are required".to_string()));
    };
    let Some(list) = questions.as_array() else {
        return Err(ApiError::Validation("Questions must be an array".to_string()));
    };
    if list.is_empty() {
        return Err(ApiError::Validation("At least one question is required".to_string()));
    }
    let mut validated = Vec::with_capacity(list.len());
    for item in list {
        match item.as_str() {
            Some(text) if !text.trim().is_empty() => validated.push(text.to_string()),
            _ => {
                return Err(ApiError::Validation(
                    "Each question must be a non-empty string".to_string(),
                ))
            }
        }
    }
    Ok(validated)
}

/// Validates an update payload field by field. Nothing is written unless
/// every provided field passes, so a failed update never partially applies.
fn validate_update(body: &Value) -> ApiResult<InterviewUpdate> {
    let mut update = InterviewUpdate::default();

    if let Some(transcript) = body.get("transcript") {
        let Some(items) = transcript.as_array() else {
            return Err(ApiError::Validation("Transcript must be an array".to_string()));
        };
        let mut entries = Vec::with_capacity(items.len());
        for item in items {
            let entry = item
                .as_object()
                .and_then(|obj| {
                    let question_text = obj.get("questionText")?.as_str()?;
                    let answer_text = obj.get("answerText")?.as_str()?;
                    let duration_seconds = obj.get("durationSeconds")?.as_f64()?;
                    Some(TranscriptEntry {
                        question_text: question_text.to_string(),
                        answer_text: answer_text.to_string(),
                        duration_seconds,
                    })
                })
                .ok_or_else(|| {
                    ApiError::Validation(
                        "Each transcript item must have questionText (string), answerText (string), and durationSeconds (number)"
                            .to_string(),
                    )
                })?;
            entries.push(entry);
        }
        update.transcript = Some(entries);
    }

    if let Some(feedback) = body.get("feedback") {
        if !feedback.is_object() {
            return Err(ApiError::Validation("feedback must be an object".to_string()));
        }
        update.feedback = Some(feedback.clone());
    }

    if let Some(visual_analysis) = body.get("visualAnalysis") {
        if !visual_analysis.is_object() {
            return Err(ApiError::Validation("visualAnalysis must be an object".to_string()));
        }
        update.visual_analysis = Some(visual_analysis.clone());
    }

    if let Some(final_score) = body.get("finalScore") {
        let Some(score) = final_score.as_f64() else {
            return Err(ApiError::Validation("finalScore must be a number".to_string()));
        };
        update.final_score = Some(score);
    }

    Ok(update)
}

fn parse_interview_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::MalformedId)
}

pub async fn create_interview(store: &dyn Store, owner_id: Uuid, body: &Value) -> ApiResult<InterviewRecord> {
    let questions = validate_questions(body)?;
    let record = InterviewRecord::new(owner_id, questions);
    Ok(store.insert_interview(record).await?)
}

pub async fn list_interviews(
    store: &dyn Store,
    owner_id: Uuid,
    page: u64,
    limit: u64,
) -> ApiResult<ListResponse> {
    let page = page.max(1);
    let limit = limit.max(1);
    let offset = (page - 1) * limit;

    let interviews = store.list_interviews(owner_id, offset, limit).await?;
    let total = store.count_interviews(owner_id).await?;
    let pages = total.div_ceil(limit);

    Ok(ListResponse {
        interviews,
        page_info: PageInfo {
            page,
            limit,
            total,
            pages,
        },
    })
}

pub async fn get_interview(store: &dyn Store, owner_id: Uuid, raw_id: &str) -> ApiResult<InterviewRecord> {
    // A syntactically invalid id can never resolve to a record.
    let Ok(id) = Uuid::parse_str(raw_id) else {
        return Err(ApiError::NotFound("Interview"));
    };
    let record = store
        .find_interview(id)
        .await?
        .ok_or(ApiError::NotFound("Interview"))?;
    if record.owner_id != owner_id {
        return Err(ApiError::NotAuthorized);
    }
    Ok(record)
}

pub async fn update_interview(
    store: &dyn Store,
    owner_id: Uuid,
    raw_id: &str,
    body: &Value,
) -> ApiResult<InterviewRecord> {
    let id = parse_interview_id(raw_id)?;
    let update = validate_update(body)?;

    let mut record = store
        .find_interview(id)
        .await?
        .ok_or(ApiError::NotFound("Interview"))?;
    if record.owner_id != owner_id {
        return Err(ApiError::NotAuthorized);
    }

    record.apply(update);
    Ok(store.replace_interview(record).await?)
}

pub async fn delete_interview(store: &dyn Store, owner_id: Uuid, raw_id: &str) -> ApiResult<MessageResponse> {
    let id = parse_interview_id(raw_id)?;
    let record = store
        .find_interview(id)
        .await?
        .ok_or(ApiError::NotFound("Interview"))?;
    if record.owner_id != owner_id {
        return Err(ApiError::NotAuthorized);
    }
    store.delete_interview(id).await?;
    Ok(MessageResponse {
        message: "Interview removed".to_string(),
    })
}

pub async fn create_handler(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, Json<InterviewRecord>)> {
    let record = create_interview(state.store.as_ref(), owner_id, &body).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn list_handler(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<ListResponse>> {
    // Unparseable page/limit values fall back to the defaults.
    let page = params
        .get("page")
        .and_then(|p| p.parse().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(DEFAULT_PAGE);
    let limit = params
        .get("limit")
        .and_then(|l| l.parse().ok())
        .filter(|l| *l >= 1)
        .unwrap_or(DEFAULT_LIMIT);
    let response = list_interviews(state.store.as_ref(), owner_id, page, limit).await?;
    Ok(Json(response))
}

pub async fn get_handler(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<InterviewRecord>> {
    let record = get_interview(state.store.as_ref(), owner_id, &id).await?;
    Ok(Json(record))
}

pub async fn update_handler(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Json<InterviewRecord>> {
    let record = update_interview(state.store.as_ref(), owner_id, &id, &body).await?;
    Ok(Json(record))
}

pub async fn delete_handler(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let response = delete_interview(state.store.as_ref(), owner_id, &id).await?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InterviewStore, MemoryStore};
    use serde_json::json;

    async fn store_with_interview() -> (MemoryStore, Uuid, Uuid) {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let record = create_interview(&store, owner, &json!({ "questions": ["Q1", "Q2"] }))
            .await
            .unwrap();
        let id = record.id;
        (store, owner, id)
    }

    #[tokio::test]
    async fn test_create_persists_questions() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();

        let record = create_interview(&store, owner, &json!({ "questions": ["Q1", "Q2"] }))
            .await
            .unwrap();

        assert_eq!(record.questions.len(), 2);
        assert_eq!(record.owner_id, owner);
        assert!(record.transcript.is_none());
        assert!(store.find_interview(record.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_create_rejects_bad_questions() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();

        for (body, message) in [
            (json!({}), "Questions are required"),
            (json!({ "questions": "one" }), "Questions must be an array"),
            (json!({ "questions": [] }), "At least one question is required"),
            (json!({ "questions": ["ok", ""] }), "Each question must be a non-empty string"),
            (json!({ "questions": ["ok", 5] }), "Each question must be a non-empty string"),
        ] {
            match create_interview(&store, owner, &body).await {
                Err(ApiError::Validation(m)) => assert_eq!(m, message),
                other => panic!("expected validation error, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_get_distinguishes_missing_from_foreign() {
        let (store, owner, id) = store_with_interview().await;

        assert!(get_interview(&store, owner, &id.to_string()).await.is_ok());
        assert!(matches!(
            get_interview(&store, owner, &Uuid::new_v4().to_string()).await,
            Err(ApiError::NotFound("Interview"))
        ));
        assert!(matches!(
            get_interview(&store, Uuid::new_v4(), &id.to_string()).await,
            Err(ApiError::NotAuthorized)
        ));
        // An unparseable id can never resolve, so reads report not-found.
        assert!(matches!(
            get_interview(&store, owner, "not-a-valid-id").await,
            Err(ApiError::NotFound("Interview"))
        ));
    }

    #[tokio::test]
    async fn test_update_replaces_only_provided_fields() {
        let (store, owner, id) = store_with_interview().await;

        let updated = update_interview(
            &store,
            owner,
            &id.to_string(),
            &json!({
                "transcript": [
                    { "questionText": "Q1", "answerText": "A1", "durationSeconds": 12.5 }
                ],
                "feedback": { "fluencyScore": 8 }
            }),
        )
        .await
        .unwrap();
        assert_eq!(updated.transcript.as_ref().unwrap().len(), 1);
        assert_eq!(updated.feedback.as_ref().unwrap()["fluencyScore"], 8);

        // A later update touching only finalScore leaves the rest intact.
        let updated = update_interview(&store, owner, &id.to_string(), &json!({ "finalScore": 85 }))
            .await
            .unwrap();
        assert_eq!(updated.final_score, Some(85.0));
        assert_eq!(updated.transcript.as_ref().unwrap().len(), 1);
        assert_eq!(updated.feedback.as_ref().unwrap()["fluencyScore"], 8);
    }

    #[tokio::test]
    async fn test_update_validation_failure_writes_nothing() {
        let (store, owner, id) = store_with_interview().await;

        let result = update_interview(
            &store,
            owner,
            &id.to_string(),
            &json!({
                "finalScore": 90,
                "transcript": [{ "questionText": "Q1" }]
            }),
        )
        .await;

        assert!(matches!(result, Err(ApiError::Validation(_))));
        let record = store.find_interview(id).await.unwrap().unwrap();
        assert!(record.final_score.is_none());
        assert!(record.transcript.is_none());
    }

    #[tokio::test]
    async fn test_update_rejects_wrong_shapes() {
        let (store, owner, id) = store_with_interview().await;
        let id = id.to_string();

        for (body, message) in [
            (json!({ "transcript": "text" }), "Transcript must be an array"),
            (json!({ "feedback": [1, 2] }), "feedback must be an object"),
            (json!({ "feedback": null }), "feedback must be an object"),
            (json!({ "visualAnalysis": 3 }), "visualAnalysis must be an object"),
            (json!({ "finalScore": "85" }), "finalScore must be a number"),
        ] {
            match update_interview(&store, owner, &id, &body).await {
                Err(ApiError::Validation(m)) => assert_eq!(m, message),
                other => panic!("expected validation error, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_update_by_non_owner_is_unauthorized() {
        let (store, _owner, id) = store_with_interview().await;

        let result = update_interview(
            &store,
            Uuid::new_v4(),
            &id.to_string(),
            &json!({ "finalScore": 85 }),
        )
        .await;

        assert!(matches!(result, Err(ApiError::NotAuthorized)));
        let record = store.find_interview(id).await.unwrap().unwrap();
        assert!(record.final_score.is_none());
    }

    #[tokio::test]
    async fn test_delete_error_taxonomy() {
        let (store, owner, id) = store_with_interview().await;

        assert!(matches!(
            delete_interview(&store, owner, "not-a-valid-id").await,
            Err(ApiError::MalformedId)
        ));
        assert!(matches!(
            delete_interview(&store, owner, &Uuid::new_v4().to_string()).await,
            Err(ApiError::NotFound("Interview"))
        ));
        assert!(matches!(
            delete_interview(&store, Uuid::new_v4(), &id.to_string()).await,
            Err(ApiError::NotAuthorized)
        ));

        let response = delete_interview(&store, owner, &id.to_string()).await.unwrap();
        assert_eq!(response.message, "Interview removed");
        assert!(store.find_interview(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_pagination_envelope() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        for i in 0..7 {
            let mut record = InterviewRecord::new(owner, vec![format!("Q{i}")]);
            record.created_at += chrono::Duration::seconds(i);
            store.insert_interview(record).await.unwrap();
        }
        // Another user's records must never appear.
        store
            .insert_interview(InterviewRecord::new(Uuid::new_v4(), vec!["X".into()]))
            .await
            .unwrap();

        let response = list_interviews(&store, owner, 1, 3).await.unwrap();
        assert_eq!(response.interviews.len(), 3);
        assert_eq!(response.page_info.total, 7);
        assert_eq!(response.page_info.pages, 3);
        assert_eq!(response.interviews[0].questions, vec!["Q6".to_string()]);

        let last = list_interviews(&store, owner, 3, 3).await.unwrap();
        assert_eq!(last.interviews.len(), 1);

        let past_end = list_interviews(&store, owner, 9, 3).await.unwrap();
        assert!(past_end.interviews.is_empty());
        assert_eq!(past_end.page_info.total, 7);
    }
}
