use super::*;
use axum::{body, body::Body, http::Request};
use rsvp_core::api::import_guests;
use shared::domain::{Attendance, EntreeChoice, GuestId};
use tower::ServiceExt;

const PASSWORD: &str = "wedding2026";

async fn test_app() -> (Router, Arc<AppState>) {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let api = ApiContext {
        storage,
        admin: AdminGate::new(PASSWORD, "router-test-secret", 600),
        export: ExportOptions::default(),
    };
    import_guests(
        &api,
        &[
            guest("1", "John Smith", "john.smith@email.com"),
            guest("2", "Sarah Johnson", "sarah.j@email.com"),
            guest("3", "Alex Kim", "alex.kim@email.com"),
            guest("4", "Alex Kim", "alex.k@work.com"),
        ],
    )
    .await
    .expect("seed");
    let (events, _) = broadcast::channel(32);
    let state = Arc::new(AppState { api, events });
    (build_router(state.clone()), state)
}

fn guest(id: &str, name: &str, email: &str) -> Guest {
    Guest {
        id: GuestId(id.into()),
        name: name.into(),
        email: email.into(),
        plus_one: None,
    }
}

fn attending(guest_id: &str) -> RsvpResponse {
    RsvpResponse {
        guest_id: GuestId(guest_id.into()),
        guest_name: "John Smith".into(),
        guest_email: "john.smith@email.com".into(),
        welcome_event: Attendance::Accept,
        wedding: Attendance::Accept,
        farewell_event: Attendance::Decline,
        entree_choice: Some(EntreeChoice::Fish),
        note: None,
        timestamp: Utc::now(),
    }
}

fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn authed_get(uri: &str, token: &str) -> Request<Body> {
    Request::get(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .expect("request")
}

async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

async fn login(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(json_post(
            "/admin/login",
            serde_json::json!({ "password": PASSWORD }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let session: AdminSessionResponse = read_json(response).await;
    session.token
}

#[tokio::test]
async fn healthz_reports_ok_when_storage_is_ready() {
    let (app, _state) = test_app().await;
    let request = Request::get("/healthz")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"ok");
}

#[tokio::test]
async fn verify_maps_lookup_outcomes_to_statuses() {
    let (app, _state) = test_app().await;

    let found = app
        .clone()
        .oneshot(json_post(
            "/guests/verify",
            serde_json::json!({ "name": "JOHN SMITH", "email": "" }),
        ))
        .await
        .expect("response");
    assert_eq!(found.status(), StatusCode::OK);
    let guest: Guest = read_json(found).await;
    assert_eq!(guest.id, GuestId("1".into()));

    let missing = app
        .clone()
        .oneshot(json_post(
            "/guests/verify",
            serde_json::json!({ "name": "Jon Smith" }),
        ))
        .await
        .expect("response");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    let err: ApiError = read_json(missing).await;
    assert_eq!(err.code, ErrorCode::NotFound);

    let ambiguous = app
        .clone()
        .oneshot(json_post(
            "/guests/verify",
            serde_json::json!({ "name": "alex kim" }),
        ))
        .await
        .expect("response");
    assert_eq!(ambiguous.status(), StatusCode::CONFLICT);

    let resolved = app
        .oneshot(json_post(
            "/guests/verify",
            serde_json::json!({ "name": "alex kim", "email": "alex.k@work.com" }),
        ))
        .await
        .expect("response");
    assert_eq!(resolved.status(), StatusCode::OK);
    let guest: Guest = read_json(resolved).await;
    assert_eq!(guest.id, GuestId("4".into()));
}

#[tokio::test]
async fn submitting_a_response_acks_and_broadcasts() {
    let (app, state) = test_app().await;
    let mut events = state.events.subscribe();

    let response = app
        .oneshot(json_post(
            "/responses",
            serde_json::to_value(attending("1")).expect("json"),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let ack: SubmitResponseAck = read_json(response).await;
    assert!(ack.success);

    match events.try_recv().expect("event") {
        ServerEvent::ResponseRecorded { response } => {
            assert_eq!(response.guest_id, GuestId("1".into()))
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn invalid_and_orphan_responses_are_rejected() {
    let (app, state) = test_app().await;

    let mut invalid = attending("1");
    invalid.note = Some("both branches".into());
    let response = app
        .clone()
        .oneshot(json_post(
            "/responses",
            serde_json::to_value(invalid).expect("json"),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(json_post(
            "/responses",
            serde_json::to_value(attending("999")).expect("json"),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert!(state
        .api
        .storage
        .list_responses()
        .await
        .expect("list")
        .is_empty());
}

#[tokio::test]
async fn malformed_bodies_answer_with_api_errors() {
    let (app, _state) = test_app().await;

    let broken = Request::post("/responses")
        .header("content-type", "application/json")
        .body(Body::from("{\"guestId\": \"1\""))
        .expect("request");
    let response = app.clone().oneshot(broken).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: ApiError = read_json(response).await;
    assert_eq!(error.code, ErrorCode::Validation);

    let mut mistyped = serde_json::to_value(attending("1")).expect("json");
    mistyped["wedding"] = serde_json::json!("maybe");
    let response = app
        .clone()
        .oneshot(json_post("/responses", mistyped))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let error: ApiError = read_json(response).await;
    assert_eq!(error.code, ErrorCode::Validation);

    let untyped = Request::post("/guests/verify")
        .body(Body::from("name=John"))
        .expect("request");
    let response = app.oneshot(untyped).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let error: ApiError = read_json(response).await;
    assert_eq!(error.code, ErrorCode::Validation);
}

#[tokio::test]
async fn admin_routes_require_a_valid_session() {
    let (app, _state) = test_app().await;

    let wrong = app
        .clone()
        .oneshot(json_post(
            "/admin/login",
            serde_json::json!({ "password": "guess" }),
        ))
        .await
        .expect("response");
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let anonymous = app
        .clone()
        .oneshot(
            Request::get("/admin/summary")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let forged = app
        .oneshot(authed_get("/admin/responses", "not-a-token"))
        .await
        .expect("response");
    assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_reads_responses_summary_and_export() {
    let (app, state) = test_app().await;
    state
        .api
        .storage
        .insert_response(&attending("1"))
        .await
        .expect("seed response");
    let token = login(&app).await;

    let responses = app
        .clone()
        .oneshot(authed_get("/admin/responses", &token))
        .await
        .expect("response");
    assert_eq!(responses.status(), StatusCode::OK);
    let responses: Vec<RsvpResponse> = read_json(responses).await;
    assert_eq!(responses.len(), 1);

    let summary = app
        .clone()
        .oneshot(authed_get("/admin/summary", &token))
        .await
        .expect("response");
    let summary: RsvpSummary = read_json(summary).await;
    assert_eq!(summary.total, 1);
    assert_eq!(summary.fish, 1);
    assert_eq!(summary.farewell_decline(), 1);

    let export = app
        .oneshot(authed_get("/admin/export.csv", &token))
        .await
        .expect("response");
    assert_eq!(export.status(), StatusCode::OK);
    assert_eq!(
        export.headers().get(header::CONTENT_TYPE).expect("type"),
        "text/csv"
    );
    assert_eq!(
        export
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .expect("disposition"),
        "attachment; filename=\"wedding-rsvp-responses.csv\""
    );
    let csv = body::to_bytes(export.into_body(), usize::MAX)
        .await
        .expect("body");
    let csv = String::from_utf8(csv.to_vec()).expect("utf8");
    assert_eq!(csv.lines().count(), 2);
    assert!(csv.contains("\"John Smith\",\"john.smith@email.com\""));
}

#[test]
fn error_codes_map_to_http_statuses() {
    assert_eq!(status_for(ErrorCode::NotFound), StatusCode::NOT_FOUND);
    assert_eq!(status_for(ErrorCode::Conflict), StatusCode::CONFLICT);
    assert_eq!(status_for(ErrorCode::Validation), StatusCode::BAD_REQUEST);
    assert_eq!(
        status_for(ErrorCode::Unavailable),
        StatusCode::SERVICE_UNAVAILABLE
    );
    assert_eq!(status_for(ErrorCode::Unauthorized), StatusCode::UNAUTHORIZED);
}
