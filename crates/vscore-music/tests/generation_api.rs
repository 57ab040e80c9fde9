//! End-to-end client tests against a mocked gateway.

use std::sync::Mutex;
use std::time::Duration;

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vscore_models::{GenerationStatus, ProgressUpdate, TaskId};
use vscore_music::{
    GenerateRequest, MusicConfig, MusicError, NoopProgress, PollConfig, ProgressSink, SunoClient,
};

fn client_for(server: &MockServer) -> SunoClient {
    let config = MusicConfig::new("test-key")
        .with_base_url(&server.uri())
        .unwrap();
    SunoClient::new(config).unwrap()
}

fn fast_poll() -> PollConfig {
    PollConfig::default()
        .with_interval(Duration::from_millis(5))
        .with_max_attempts(10)
}

fn pending_body() -> Value {
    json!({"code": 200, "data": {"taskId": "task-1", "status": "PENDING"}})
}

fn success_body() -> Value {
    json!({
        "code": 200,
        "data": {
            "taskId": "task-1",
            "status": "SUCCESS",
            "response": {"sunoData": [
                {"id": "t1", "audioUrl": "https://x/a.mp3", "title": "First Light"}
            ]}
        }
    })
}

fn empty_success_body() -> Value {
    json!({
        "code": 200,
        "data": {"taskId": "task-1", "status": "SUCCESS", "response": {"sunoData": []}}
    })
}

/// Sink that records every update for assertions.
#[derive(Default)]
struct RecordingSink(Mutex<Vec<ProgressUpdate>>);

impl ProgressSink for RecordingSink {
    fn update(&self, update: ProgressUpdate) {
        self.0.lock().unwrap().push(update);
    }
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.unwrap_or_default().len()
}

// ============================================================================
// Submission
// ============================================================================

#[tokio::test]
async fn test_submit_returns_task_id_and_sends_callback_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/generate"))
        .and(body_partial_json(json!({
            "prompt": "cinematic orchestral crescendo",
            "instrumental": true
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"code": 200, "msg": "success", "data": {"taskId": "task-42"}})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let task_id = client
        .submit(&GenerateRequest::new("cinematic orchestral crescendo"))
        .await
        .unwrap();
    assert_eq!(task_id.as_str(), "task-42");

    // The protocol demands a callback URL even though polling is used.
    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body.get("callBackUrl").and_then(Value::as_str).is_some());
}

#[tokio::test]
async fn test_submit_http_failure_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/generate"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .submit(&GenerateRequest::new("calm piano"))
        .await
        .unwrap_err();
    match err {
        MusicError::UpstreamRequest { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("expected UpstreamRequest, got {:?}", other),
    }
}

#[tokio::test]
async fn test_submit_business_failure_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"code": 429, "msg": "credit limit reached"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .submit(&GenerateRequest::new("calm piano"))
        .await
        .unwrap_err();
    match err {
        MusicError::UpstreamBusiness { code, message } => {
            assert_eq!(code, 429);
            assert!(message.contains("credit limit"));
        }
        other => panic!("expected UpstreamBusiness, got {:?}", other),
    }
}

#[tokio::test]
async fn test_submit_without_task_id_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 200, "data": {}})))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .submit(&GenerateRequest::new("calm piano"))
        .await
        .unwrap_err();
    assert!(matches!(err, MusicError::MalformedResponse(_)));
}

// ============================================================================
// Polling
// ============================================================================

#[tokio::test]
async fn test_pending_twice_then_success_returns_after_three_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/generate/record-info"))
        .and(query_param("taskId", "task-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pending_body()))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/generate/record-info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let tracks = client
        .poll_for_tracks(
            &TaskId::from_string("task-1"),
            &fast_poll(),
            &NoopProgress,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].id, "t1");
    assert_eq!(tracks[0].audio_url, "https://x/a.mp3");
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_failed_status_rejects_within_one_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/generate/record-info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "data": {"taskId": "task-1", "status": "GENERATE_AUDIO_FAILED", "errorMessage": "prompt rejected"}
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .poll_for_tracks(
            &TaskId::from_string("task-1"),
            &fast_poll(),
            &NoopProgress,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    match err {
        MusicError::GenerationFailed { message } => assert_eq!(message, "prompt rejected"),
        other => panic!("expected GenerationFailed, got {:?}", other),
    }
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_always_pending_times_out_after_exact_attempt_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/generate/record-info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pending_body()))
        .mount(&server)
        .await;

    let config = fast_poll().with_max_attempts(4);
    let err = client_for(&server)
        .poll_for_tracks(
            &TaskId::from_string("task-1"),
            &config,
            &NoopProgress,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    match err {
        MusicError::PollTimeout { last_status } => {
            assert_eq!(last_status.unwrap().status, GenerationStatus::Pending);
        }
        other => panic!("expected PollTimeout, got {:?}", other),
    }
    assert_eq!(request_count(&server).await, 4);
}

#[tokio::test]
async fn test_error_budget_exhaustion_after_exact_consecutive_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/generate/record-info"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let config = fast_poll().with_error_budget(3);
    let err = client_for(&server)
        .poll_for_tracks(
            &TaskId::from_string("task-1"),
            &config,
            &NoopProgress,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    match err {
        MusicError::RepeatedUpstreamFailure { attempts } => assert_eq!(attempts, 3),
        other => panic!("expected RepeatedUpstreamFailure, got {:?}", other),
    }
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_valid_response_resets_the_error_counter() {
    let server = MockServer::start().await;
    // Two failures, one good PENDING, two more failures, then PENDING
    // forever: the counter never reaches the budget of three.
    Mock::given(method("GET"))
        .and(path("/api/v1/generate/record-info"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/generate/record-info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pending_body()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/generate/record-info"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/generate/record-info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pending_body()))
        .mount(&server)
        .await;

    let config = fast_poll().with_error_budget(3).with_max_attempts(7);
    let err = client_for(&server)
        .poll_for_tracks(
            &TaskId::from_string("task-1"),
            &config,
            &NoopProgress,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    // Exhausts the attempt budget, not the error budget.
    assert!(matches!(err, MusicError::PollTimeout { .. }));
    assert_eq!(request_count(&server).await, 7);
}

#[tokio::test]
async fn test_business_error_envelope_counts_against_error_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/generate/record-info"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"code": 503, "msg": "busy"})),
        )
        .mount(&server)
        .await;

    let config = fast_poll().with_error_budget(2);
    let err = client_for(&server)
        .poll_for_tracks(
            &TaskId::from_string("task-1"),
            &config,
            &NoopProgress,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        MusicError::RepeatedUpstreamFailure { attempts: 2 }
    ));
}

#[tokio::test]
async fn test_empty_success_fails_once_grace_window_is_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/generate/record-info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_success_body()))
        .mount(&server)
        .await;

    let config = fast_poll().with_success_grace_attempts(2);
    let err = client_for(&server)
        .poll_for_tracks(
            &TaskId::from_string("task-1"),
            &config,
            &NoopProgress,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, MusicError::IncompleteSuccess));
    // First empty success plus the two tolerated by the grace window.
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_success_with_only_unplayable_tracks_fails_immediately_without_grace() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/generate/record-info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "data": {
                "taskId": "task-1",
                "status": "SUCCESS",
                "response": {"sunoData": [{"id": "t1", "title": "no audio"}]}
            }
        })))
        .mount(&server)
        .await;

    let config = fast_poll().with_success_grace_attempts(0);
    let err = client_for(&server)
        .poll_for_tracks(
            &TaskId::from_string("task-1"),
            &config,
            &NoopProgress,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, MusicError::IncompleteSuccess));
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_unknown_status_keeps_polling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/generate/record-info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "data": {"taskId": "task-1", "status": "NEWLY_INVENTED_STATE"}
        })))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/generate/record-info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .mount(&server)
        .await;

    let tracks = client_for(&server)
        .poll_for_tracks(
            &TaskId::from_string("task-1"),
            &fast_poll(),
            &NoopProgress,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(tracks.len(), 1);
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_string_encoded_response_variant_over_the_wire() {
    let server = MockServer::start().await;
    let encoded = json!({"sunoData": [
        {"id": "t1", "audio_url": "https://x/a.mp3"}
    ]})
    .to_string();
    Mock::given(method("GET"))
        .and(path("/api/v1/generate/record-info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "data": {"taskId": "task-1", "status": "SUCCESS", "response": encoded}
        })))
        .mount(&server)
        .await;

    let tracks = client_for(&server)
        .poll_for_tracks(
            &TaskId::from_string("task-1"),
            &fast_poll(),
            &NoopProgress,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(tracks[0].audio_url, "https://x/a.mp3");
}

#[tokio::test]
async fn test_cancellation_is_honored_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/generate/record-info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pending_body()))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = client_for(&server)
        .poll_for_tracks(
            &TaskId::from_string("task-1"),
            &fast_poll(),
            &NoopProgress,
            &cancel,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, MusicError::Cancelled));
    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn test_cancellation_interrupts_the_interval_sleep() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/generate/record-info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pending_body()))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let config = fast_poll().with_interval(Duration::from_secs(60));
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        client_for(&server).poll_for_tracks(
            &TaskId::from_string("task-1"),
            &config,
            &NoopProgress,
            &cancel,
        ),
    )
    .await
    .expect("cancellation should not wait for the full interval");

    assert!(matches!(result.unwrap_err(), MusicError::Cancelled));
}

// ============================================================================
// End to end
// ============================================================================

#[tokio::test]
async fn test_generate_reports_monotone_progress_through_the_stages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"code": 200, "data": {"taskId": "task-1"}})),
        )
        .mount(&server)
        .await;
    for (count, status) in [(1, "PENDING"), (1, "TEXT_SUCCESS"), (1, "FIRST_SUCCESS")] {
        Mock::given(method("GET"))
            .and(path("/api/v1/generate/record-info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "data": {"taskId": "task-1", "status": status}
            })))
            .up_to_n_times(count)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/api/v1/generate/record-info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .mount(&server)
        .await;

    let sink = RecordingSink::default();
    let tracks = client_for(&server)
        .generate(
            &GenerateRequest::new("cinematic orchestral crescendo").with_style("orchestral"),
            &fast_poll(),
            &sink,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(tracks.len(), 1);

    let updates = sink.0.into_inner().unwrap();
    let fractions: Vec<f32> = updates.iter().filter_map(|u| u.fraction).collect();
    assert_eq!(fractions.len(), 4);
    assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*fractions.last().unwrap(), 1.0);
}
