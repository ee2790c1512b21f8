use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use spellbee_core::{
    AnswerCheck, ContestError, ContestService, MissedWord, Phase, SessionId, SessionStatus,
    StartRequest, Started, Summary, Voice,
};

type AppState = Arc<ContestService>;

#[derive(Debug)]
pub enum ApiError {
    Contest(ContestError),
    Internal,
}

impl From<ContestError> for ApiError {
    fn from(e: ContestError) -> Self {
        ApiError::Contest(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Contest(ContestError::UnknownSession(_)) => StatusCode::NOT_FOUND,
            ApiError::Contest(ContestError::NotInProgress) => StatusCode::CONFLICT,
            ApiError::Contest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error = match &self {
            ApiError::Contest(e) => e.to_string(),
            ApiError::Internal => "internal error".to_string(),
        };
        (self.status(), Json(ErrorBody { error })).into_response()
    }
}

/// Run a core call off the async workers; store and speech calls block.
async fn blocking<T, F>(service: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&ContestService) -> Result<T, ContestError> + Send + 'static,
    T: Send + 'static,
{
    let service = Arc::clone(service);
    tokio::task::spawn_blocking(move || f(&service))
        .await
        .map_err(|e| {
            log::error!("blocking task failed: {e}");
            ApiError::Internal
        })?
        .map_err(ApiError::from)
}

fn session_id(raw: &str) -> Result<SessionId, ApiError> {
    Ok(raw.parse::<SessionId>()?)
}

#[derive(Serialize)]
struct ListsResponse {
    lists: Vec<String>,
}

async fn list_names(State(service): State<AppState>) -> Json<ListsResponse> {
    Json(ListsResponse {
        lists: service.list_names(),
    })
}

async fn missed_words(State(service): State<AppState>) -> Result<Json<Vec<MissedWord>>, ApiError> {
    let words = blocking(&service, |s| Ok(s.missed_words())).await?;
    Ok(Json(words))
}

#[derive(Serialize)]
struct OpenedSession {
    session_id: SessionId,
}

async fn open_session(State(service): State<AppState>) -> (StatusCode, Json<OpenedSession>) {
    let session_id = service.open_session();
    (StatusCode::CREATED, Json(OpenedSession { session_id }))
}

#[derive(Serialize)]
struct SessionView {
    #[serde(flatten)]
    status: SessionStatus,
    summary: Option<Summary>,
}

async fn session_status(
    State(service): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    let id = session_id(&id)?;
    let status = service.status(&id)?;
    let summary = if status.phase == Phase::Complete {
        service.summary(&id)?
    } else {
        None
    };
    Ok(Json(SessionView { status, summary }))
}

async fn start_contest(
    State(service): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<StartRequest>,
) -> Result<Json<Started>, ApiError> {
    let id = session_id(&id)?;
    let started = blocking(&service, move |s| s.start(&id, &request)).await?;
    Ok(Json(started))
}

#[derive(Deserialize)]
struct AnswerRequest {
    answer: String,
}

#[derive(Serialize)]
struct AnswerResponse {
    correct: bool,
    feedback: Option<String>,
    expected: Option<String>,
    cursor: usize,
    total: usize,
    phase: Phase,
}

async fn submit_answer(
    State(service): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let id = session_id(&id)?;
    let step = blocking(&service, move |s| s.answer(&id, &request.answer)).await?;

    let expected = (!step.check.is_match()).then(|| step.check.expected_display());
    let feedback = match &step.check {
        AnswerCheck::Match => None,
        AnswerCheck::Mismatch { feedback, .. } => Some(feedback.clone()),
    };

    Ok(Json(AnswerResponse {
        correct: step.check.is_match(),
        feedback,
        expected,
        cursor: step.cursor,
        total: step.total,
        phase: step.phase,
    }))
}

async fn pronounce(service: AppState, raw_id: String, voice: Voice) -> Result<Response, ApiError> {
    let id = session_id(&raw_id)?;
    let (clip, cursor) = blocking(&service, move |s| {
        let clip = s.pronounce(&id, voice)?;
        let cursor = s.status(&id)?.cursor;
        Ok((clip, cursor))
    })
    .await?;

    let extension = if clip.mime == "audio/wav" { "wav" } else { "mp3" };
    let disposition = format!("attachment; filename=\"pronunciation_{cursor}.{extension}\"");
    Ok((
        [
            (header::CONTENT_TYPE, clip.mime.to_string()),
            (header::CACHE_CONTROL, "no-store".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        clip.bytes,
    )
        .into_response())
}

async fn audio(State(service): State<AppState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    pronounce(service, id, Voice::Default).await
}

async fn alternate_audio(
    State(service): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    pronounce(service, id, Voice::Alternate).await
}

pub fn router(service: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/lists", get(list_names))
        .route("/missed", get(missed_words))
        .route("/sessions", post(open_session))
        .route("/sessions/{id}", get(session_status))
        .route("/sessions/{id}/start", post(start_contest))
        .route("/sessions/{id}/answer", post(submit_answer))
        .route("/sessions/{id}/audio", get(audio))
        .route("/sessions/{id}/audio/alternate", get(alternate_audio))
        .with_state(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use axum::body::{to_bytes, Body};
    use axum::http::{HeaderMap, Request};
    use serde_json::{json, Value};
    use spellbee_core::{AudioLibrary, MemoryStore, Pronouncer, WordCatalog};
    use tower::ServiceExt;

    // Each recording holds its own spelling, so the audio tells the test
    // which word is being asked.
    fn app() -> (tempfile::TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("lists")).unwrap();
        fs::create_dir_all(dir.path().join("audio/500")).unwrap();
        fs::write(dir.path().join("lists/2025.txt"), "cat\ndog\n").unwrap();
        fs::write(dir.path().join("audio/500/1.mp3"), b"cat").unwrap();
        fs::write(dir.path().join("audio/500/2.mp3"), b"dog").unwrap();

        let catalog = WordCatalog::new(dir.path().join("lists"), vec!["2025.txt".into()]);
        let pronouncer = Pronouncer::new(AudioLibrary::new(dir.path().join("audio")), None);
        let service = ContestService::new(catalog, Arc::new(MemoryStore::new()), pronouncer, 1500);
        (dir, router(Arc::new(service)))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, HeaderMap, Vec<u8>) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, bytes.to_vec())
    }

    fn json_body(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[tokio::test]
    async fn contest_runs_over_http() {
        let (_dir, app) = app();

        let (status, _, body) = send(&app, "POST", "/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = json_body(&body)["session_id"].as_str().unwrap().to_string();

        let start = json!({"list": "2025.txt", "start_id": 1, "end_id": 2, "count": 2});
        let (status, _, body) = send(&app, "POST", &format!("/sessions/{id}/start"), Some(start)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body)["selected"], 2);

        let (_, _, body) = send(&app, "GET", &format!("/sessions/{id}"), None).await;
        let view = json_body(&body);
        assert_eq!(view["phase"], "in_progress");
        assert!(view["summary"].is_null());
        assert!(view["created_at"].is_string());

        for cursor in 0..2 {
            let (status, headers, audio) = send(&app, "GET", &format!("/sessions/{id}/audio"), None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(headers[header::CONTENT_TYPE], "audio/mpeg");
            assert_eq!(headers[header::CACHE_CONTROL], "no-store");
            assert_eq!(
                headers[header::CONTENT_DISPOSITION],
                format!("attachment; filename=\"pronunciation_{cursor}.mp3\"")
            );
            let word = String::from_utf8(audio).unwrap();

            if cursor == 0 {
                let wrong = json!({"answer": "zebra"});
                let (_, _, body) = send(&app, "POST", &format!("/sessions/{id}/answer"), Some(wrong)).await;
                let outcome = json_body(&body);
                assert_eq!(outcome["correct"], false);
                assert_eq!(outcome["expected"], word.as_str());
                assert_eq!(outcome["cursor"], 0);
            }

            let right = json!({"answer": word});
            let (status, _, body) = send(&app, "POST", &format!("/sessions/{id}/answer"), Some(right)).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(json_body(&body)["correct"], true);
        }

        let (_, _, body) = send(&app, "GET", &format!("/sessions/{id}"), None).await;
        let view = json_body(&body);
        assert_eq!(view["phase"], "complete");
        assert_eq!(view["summary"]["total"], 2);
        assert_eq!(view["summary"]["first_try"], 1);
        assert_eq!(view["summary"]["wrong_answers"][0]["given"], "zebra");

        let (_, _, body) = send(&app, "GET", "/missed", None).await;
        assert_eq!(json_body(&body), json!([]));

        let late = json!({"answer": "cat"});
        let (status, _, body) = send(&app, "POST", &format!("/sessions/{id}/answer"), Some(late)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(json_body(&body)["error"].is_string());
    }

    #[tokio::test]
    async fn rejects_unknown_sessions_and_lists() {
        let (_dir, app) = app();

        let stranger = SessionId::new();
        let (status, _, body) = send(&app, "GET", &format!("/sessions/{stranger}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json_body(&body)["error"].is_string());

        let (_, _, body) = send(&app, "POST", "/sessions", None).await;
        let id = json_body(&body)["session_id"].as_str().unwrap().to_string();
        let start = json!({"list": "1999.txt", "start_id": 1, "end_id": 2, "count": 2});
        let (status, _, _) = send(&app, "POST", &format!("/sessions/{id}/start"), Some(start)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, _, body) = send(&app, "GET", "/lists", None).await;
        assert_eq!(json_body(&body)["lists"], json!(["2025.txt", "missed_words"]));
    }

    #[test]
    fn contest_errors_map_to_client_statuses() {
        let status = |e: ContestError| ApiError::from(e).status();
        assert_eq!(status(ContestError::UnknownSession("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(ContestError::NotInProgress), StatusCode::CONFLICT);
        assert_eq!(status(ContestError::UnknownList("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(ContestError::EmptySelection {
                list: "2025.txt".into(),
                start_id: 0,
                end_id: 5,
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn malformed_session_ids_are_not_found() {
        let err = session_id("nope").unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
