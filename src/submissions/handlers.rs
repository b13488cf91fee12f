use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{error, instrument};

use crate::state::AppState;

use super::types::SubmissionRow;

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/submissions",
        get(list_submissions)
            .post(create_submission)
            .delete(clear_submissions),
    )
}

#[instrument(skip(state))]
pub async fn list_submissions(
    State(state): State<AppState>,
) -> Result<Json<Vec<SubmissionRow>>, (StatusCode, String)> {
    match state.submissions.list_rows().await {
        Ok(rows) => Ok(Json(rows)),
        Err(e) => {
            error!(error = %e, "list_submissions failed");
            Err((e.status(), e.to_string()))
        }
    }
}

#[instrument(skip(state, row))]
pub async fn create_submission(
    State(state): State<AppState>,
    Json(row): Json<SubmissionRow>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, String)> {
    match state.submissions.store_row(&row).await {
        Ok(()) => Ok((StatusCode::CREATED, Json(json!({ "success": true })))),
        Err(e) => {
            error!(error = %e, "create_submission failed");
            Err((e.status(), e.to_string()))
        }
    }
}

#[instrument(skip(state))]
pub async fn clear_submissions(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, String)> {
    match state.submissions.clear_all().await {
        Ok(()) => Ok(Json(json!({ "success": true }))),
        Err(e) => {
            error!(error = %e, "clear_submissions failed");
            Err((e.status(), e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submissions::types::sample_profile;

    #[tokio::test]
    async fn create_then_list_round_trips() {
        let state = AppState::fake().await;
        let row = SubmissionRow::build(Some("a1".into()), &sample_profile(), &[]).unwrap();

        let (status, body) = create_submission(State(state.clone()), Json(row.clone()))
            .await
            .expect("create should succeed");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body.0, json!({ "success": true }));

        let Json(rows) = list_submissions(State(state))
            .await
            .expect("list should succeed");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, row.id);
    }

    #[tokio::test]
    async fn clear_reports_success_and_empties_the_store() {
        let state = AppState::fake().await;
        let row = SubmissionRow::build(None, &sample_profile(), &[]).unwrap();
        let (status, _) = create_submission(State(state.clone()), Json(row))
            .await
            .expect("create should succeed");
        assert_eq!(status, StatusCode::CREATED);

        let Json(body) = clear_submissions(State(state.clone()))
            .await
            .expect("clear should succeed");
        assert_eq!(body, json!({ "success": true }));

        let Json(rows) = list_submissions(State(state))
            .await
            .expect("list should succeed");
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn stored_rows_serialize_with_wire_field_names() {
        let row = SubmissionRow::build(None, &sample_profile(), &[]).unwrap();
        let json = serde_json::to_string(&row).unwrap();
        assert!(json.contains("\"student_name\""));
        assert!(json.contains("\"academic_strengths\""));
        assert!(json.contains("\"match_score\""));
    }
}
