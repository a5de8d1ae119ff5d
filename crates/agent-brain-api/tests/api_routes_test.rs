//! HTTP-level coverage of `/health`, `/index`, `/jobs`, `/query` driven
//! through the real Axum router, with mock storage/embedding underneath.

mod test_utils;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use test_utils::{folder_path, sample_folder, test_app, wait_for_terminal};

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

#[tokio::test]
async fn health_reports_healthy_with_no_jobs() -> test_utils::TestResult {
    let app = test_app().await?;
    let router = agent_brain_api::routes::create_router().with_state(app.state);

    let response = router
        .oneshot(Request::builder().uri("/health/").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], json!("healthy"));
    Ok(())
}

#[tokio::test]
async fn index_rejects_nonexistent_folder() -> test_utils::TestResult {
    let app = test_app().await?;
    let router = agent_brain_api::routes::create_router().with_state(app.state);

    let payload = json!({ "folder_path": "/definitely/not/a/real/path" });
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/index/")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn duplicate_index_enqueue_returns_same_job() -> test_utils::TestResult {
    let app = test_app().await?;
    let dir = sample_folder();
    let router = agent_brain_api::routes::create_router().with_state(app.state);

    let payload = json!({ "folder_path": folder_path(&dir) });

    let first = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/index/")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))?,
        )
        .await?;
    assert_eq!(first.status(), StatusCode::ACCEPTED);
    let first_body = body_json(first).await;

    let second = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/index/")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))?,
        )
        .await?;
    let second_body = body_json(second).await;

    assert_eq!(first_body["job_id"], second_body["job_id"]);
    Ok(())
}

#[tokio::test]
async fn query_before_any_indexing_is_not_ready() -> test_utils::TestResult {
    let app = test_app().await?;
    let router = agent_brain_api::routes::create_router().with_state(app.state);

    let payload = json!({ "query": "how does chunking work" });
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/query/")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}

#[tokio::test]
async fn empty_query_is_rejected() -> test_utils::TestResult {
    let app = test_app().await?;
    let router = agent_brain_api::routes::create_router().with_state(app.state);

    let payload = json!({ "query": "   " });
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/query/")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn job_lookup_404s_on_unknown_id() -> test_utils::TestResult {
    let app = test_app().await?;
    let router = agent_brain_api::routes::create_router().with_state(app.state);

    let response = router
        .oneshot(Request::builder().uri(format!("/jobs/{}", uuid::Uuid::new_v4())).body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn cancel_pending_job_then_get_shows_cancelled() -> test_utils::TestResult {
    let app = test_app().await?;
    let dir = sample_folder();
    let router = agent_brain_api::routes::create_router().with_state(app.state);

    let payload = json!({ "folder_path": folder_path(&dir) });
    let enqueue_response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/index/")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))?,
        )
        .await?;
    let enqueued = body_json(enqueue_response).await;
    let job_id = enqueued["job_id"].as_str().unwrap();

    let cancel_response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/jobs/{job_id}"))
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(cancel_response.status(), StatusCode::OK);

    let get_response = router
        .oneshot(Request::builder().uri(format!("/jobs/{job_id}")).body(Body::empty())?)
        .await?;
    let job = body_json(get_response).await;
    assert_eq!(job["status"], json!("cancelled"));
    Ok(())
}

#[tokio::test]
async fn index_add_and_index_use_distinct_jobs_for_same_folder() -> test_utils::TestResult {
    let app = test_app().await?;
    let dir = sample_folder();
    let router = agent_brain_api::routes::create_router().with_state(app.state);
    let payload = json!({ "folder_path": folder_path(&dir) });

    let index_response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/index/")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))?,
        )
        .await?;
    let index_body = body_json(index_response).await;

    let add_response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/index/add")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))?,
        )
        .await?;
    let add_body = body_json(add_response).await;

    assert_ne!(index_body["job_id"], add_body["job_id"]);
    Ok(())
}

#[tokio::test]
async fn full_index_then_query_round_trip() -> test_utils::TestResult {
    let app = test_app().await?;
    let dir = sample_folder();
    let state_for_wait = app.state.clone();
    let worker_handle = tokio::spawn(app.worker.run());

    let router = agent_brain_api::routes::create_router().with_state(app.state);
    let payload = json!({ "folder_path": folder_path(&dir) });

    let enqueue_response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/index/")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))?,
        )
        .await?;
    let enqueued = body_json(enqueue_response).await;
    let job_id: uuid::Uuid = enqueued["job_id"].as_str().unwrap().parse()?;

    let terminal = wait_for_terminal(&state_for_wait, job_id, 200).await;
    assert_eq!(terminal.status, agent_brain_indexing::JobStatus::Completed);
    worker_handle.abort();

    let query_payload = json!({ "query": "documents", "mode": "bm25" });
    let query_response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/query/")
                .header("content-type", "application/json")
                .body(Body::from(query_payload.to_string()))?,
        )
        .await?;
    assert_eq!(query_response.status(), StatusCode::OK);
    let results = body_json(query_response).await;
    assert!(!results["results"].as_array().unwrap().is_empty());
    Ok(())
}
