//! End-to-end tests driving the router in-process against an in-memory database,
//! or a file database where concurrency matters

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use clinic_server::auth::{TenantIdentity, create_token};
use clinic_server::db::DbService;
use clinic_server::notify::{Notifier, NotifyError};
use clinic_server::{AppState, Config, create_router};
use http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use shared::models::Appointment;
use tempfile::TempDir;
use tokio::task::JoinSet;
use tower::ServiceExt;

const SECRET: &str = "test-secret";
const DATE: &str = "2026-03-02";

struct TestApp {
    router: Router,
    _dir: Option<TempDir>,
}

impl TestApp {
    async fn new() -> Self {
        Self::with_state(|state| state).await
    }

    async fn with_state(customize: impl FnOnce(AppState) -> AppState) -> Self {
        let db = DbService::in_memory().await.unwrap();
        let state = AppState::with_pool(Config::for_tests(SECRET), db.pool);
        Self {
            router: create_router(customize(state)),
            _dir: None,
        }
    }

    /// File-backed database with a multi-connection pool
    async fn on_disk(max_connections: u32) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            database_url: format!("sqlite://{}", dir.path().join("clinic.db").display()),
            db_max_connections: max_connections,
            ..Config::for_tests(SECRET)
        };
        let state = AppState::new(config).await.unwrap();
        Self {
            router: create_router(state),
            _dir: Some(dir),
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        dispatch(self.router.clone(), request).await
    }
}

async fn dispatch(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Tenant-scoped client
struct Client<'a> {
    app: &'a TestApp,
    token: String,
}

impl<'a> Client<'a> {
    fn new(app: &'a TestApp, tenant_id: &str) -> Self {
        let identity = TenantIdentity {
            tenant_id: tenant_id.into(),
            user_id: format!("{tenant_id}-frontdesk"),
            name: "Front Desk".into(),
            role: "staff".into(),
        };
        Self {
            app,
            token: create_token(&identity, SECRET).unwrap(),
        }
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.app.send(Method::GET, uri, Some(&self.token), None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.app
            .send(Method::POST, uri, Some(&self.token), Some(body))
            .await
    }

    async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.app
            .send(Method::PUT, uri, Some(&self.token), Some(body))
            .await
    }

    async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.app
            .send(Method::DELETE, uri, Some(&self.token), None)
            .await
    }

    async fn create_patient(&self, first_name: &str) -> Value {
        let (status, body) = self
            .post(
                "/api/patients",
                json!({"first_name": first_name, "last_name": "Tester", "phone": "555-0100"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"].clone()
    }

    async fn book(&self, patient_id: i64, doctor_id: i64, start: &str, end: &str) -> (StatusCode, Value) {
        self.post(
            "/api/appointments",
            json!({
                "patient_id": patient_id,
                "doctor_id": doctor_id,
                "appointment_date": DATE,
                "start_time": start,
                "end_time": end,
                "reason": "Checkup",
            }),
        )
        .await
    }

    async fn set_status(&self, appointment_id: i64, status: &str) -> (StatusCode, Value) {
        self.put(
            &format!("/api/appointments/{appointment_id}/status"),
            json!({"status": status}),
        )
        .await
    }
}

fn id_of(value: &Value) -> i64 {
    value["id"].as_i64().unwrap()
}

fn error_code(body: &Value) -> u64 {
    body["error"]["code"].as_u64().unwrap()
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new().await;
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
}

#[tokio::test]
async fn test_api_requires_token() {
    let app = TestApp::new().await;
    let (status, body) = app.send(Method::GET, "/api/patients", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(error_code(&body), 1001);

    let (status, body) = app
        .send(Method::GET, "/api/patients", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), 1004);
}

#[tokio::test]
async fn test_patient_numbers_are_sequential() {
    let app = TestApp::new().await;
    let client = Client::new(&app, "clinic-a");

    let first = client.create_patient("Ana").await;
    let second = client.create_patient("Ben").await;
    assert_eq!(first["patient_number"], "P-000001");
    assert_eq!(second["patient_number"], "P-000002");

    let (status, body) = client.get("/api/patients?search=Ben").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pagination"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["first_name"], "Ben");
}

#[tokio::test]
async fn test_patient_validation() {
    let app = TestApp::new().await;
    let client = Client::new(&app, "clinic-a");

    let (status, body) = client
        .post("/api/patients", json!({"first_name": "  ", "last_name": "X"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_overlapping_booking_is_rejected() {
    let app = TestApp::new().await;
    let client = Client::new(&app, "clinic-a");
    let patient = id_of(&client.create_patient("Ana").await);

    let (status, body) = client.book(patient, 7, "09:00", "09:30").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "scheduled");

    let (status, body) = client.book(patient, 7, "09:15", "09:45").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["message"], "Time slot is not available");
    assert_eq!(error_code(&body), 4002);

    // Enclosing interval
    let (status, _) = client.book(patient, 7, "08:30", "10:00").await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Touching intervals do not overlap
    let (status, _) = client.book(patient, 7, "09:30", "10:00").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = client.book(patient, 7, "08:30", "09:00").await;
    assert_eq!(status, StatusCode::OK);

    // Another doctor is unaffected
    let (status, _) = client.book(patient, 8, "09:00", "09:30").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_cancelled_appointment_frees_slot() {
    let app = TestApp::new().await;
    let client = Client::new(&app, "clinic-a");
    let patient = id_of(&client.create_patient("Ana").await);

    let (_, body) = client.book(patient, 7, "10:00", "10:30").await;
    let id = id_of(&body["data"]);
    let (status, body) = client.set_status(id, "cancelled").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["cancelled_by"], "clinic-a-frontdesk");

    let (status, _) = client.book(patient, 7, "10:00", "10:30").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_time_range() {
    let app = TestApp::new().await;
    let client = Client::new(&app, "clinic-a");
    let patient = id_of(&client.create_patient("Ana").await);

    let (status, body) = client.book(patient, 7, "10:00", "09:00").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), 4005);

    let (status, _) = client.book(patient, 7, "10:00", "10:00").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_booking_unknown_patient() {
    let app = TestApp::new().await;
    let client = Client::new(&app, "clinic-a");
    let (status, body) = client.book(999, 7, "09:00", "09:30").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), 7001);
}

#[tokio::test]
async fn test_availability_and_slots() {
    let app = TestApp::new().await;
    let client = Client::new(&app, "clinic-a");
    let patient = id_of(&client.create_patient("Ana").await);
    let (_, body) = client.book(patient, 7, "09:30", "10:00").await;
    let booked = id_of(&body["data"]);

    let (status, body) = client
        .get(&format!(
            "/api/appointments/availability?doctor_id=7&date={DATE}&start_time=09:45&end_time=10:15"
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["available"], false);

    // The appointment itself is ignored when rescheduling
    let (_, body) = client
        .get(&format!(
            "/api/appointments/availability?doctor_id=7&date={DATE}&start_time=09:45&end_time=10:15&exclude_id={booked}"
        ))
        .await;
    assert_eq!(body["data"]["available"], true);

    let (status, body) = client
        .get(&format!(
            "/api/appointments/slots?doctor_id=7&date={DATE}&day_start=09:00&day_end=10:30&slot_minutes=30"
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let starts: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["start_time"].as_str().unwrap())
        .collect();
    assert_eq!(starts, vec!["09:00", "10:00"]);

    let (status, _) = client
        .get(&format!("/api/appointments/slots?doctor_id=7&date={DATE}&slot_minutes=1"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reschedule_checks_conflicts() {
    let app = TestApp::new().await;
    let client = Client::new(&app, "clinic-a");
    let patient = id_of(&client.create_patient("Ana").await);
    let (_, first) = client.book(patient, 7, "09:00", "09:30").await;
    let (_, second) = client.book(patient, 7, "10:00", "10:30").await;
    let second = id_of(&second["data"]);

    let (status, body) = client
        .put(
            &format!("/api/appointments/{second}"),
            json!({"start_time": "09:15", "end_time": "09:45"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), 4002);

    // Shrinking within its own slot does not conflict with itself
    let (status, body) = client
        .put(
            &format!("/api/appointments/{second}"),
            json!({"start_time": "10:00", "end_time": "10:15", "notes": "Short visit"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["end_time"], "10:15");
    assert_eq!(body["data"]["notes"], "Short visit");
    assert_eq!(first["data"]["start_time"], "09:00");
}

#[tokio::test]
async fn test_completed_appointment_is_closed() {
    let app = TestApp::new().await;
    let client = Client::new(&app, "clinic-a");
    let patient = id_of(&client.create_patient("Ana").await);
    let (_, body) = client.book(patient, 7, "09:00", "09:30").await;
    let id = id_of(&body["data"]);

    // Completion requires the visit to be in progress
    let (status, body) = client.set_status(id, "completed").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&body), 4004);

    let (status, body) = client.set_status(id, "in_progress").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["started_at"].is_i64());

    // Going backwards is not allowed
    let (status, _) = client.set_status(id, "confirmed").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = client.set_status(id, "completed").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["completed_at"].is_i64());

    let (status, body) = client
        .put(&format!("/api/appointments/{id}"), json!({"notes": "late note"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), 4003);
    assert_eq!(
        body["error"]["message"],
        "Cannot update completed or cancelled appointment"
    );

    let (status, body) = client.set_status(id, "cancelled").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), 4003);
}

#[tokio::test]
async fn test_queue_positions_and_call_next() {
    let app = TestApp::new().await;
    let client = Client::new(&app, "clinic-a");
    let patient = id_of(&client.create_patient("Ana").await);

    let mut appointments = Vec::new();
    for (start, end) in [("09:00", "09:30"), ("09:30", "10:00"), ("10:00", "10:30")] {
        let (_, body) = client.book(patient, 7, start, end).await;
        appointments.push(id_of(&body["data"]));
    }
    for id in &appointments {
        let (status, body) = client.set_status(*id, "in_queue").await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }
    // Checking in twice keeps a single entry
    let (status, _) = client.set_status(appointments[0], "in_queue").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = client.get("/api/queue?doctor_id=7").await;
    assert_eq!(status, StatusCode::OK);
    let entries = body["data"].as_array().unwrap().clone();
    assert_eq!(entries.len(), 3);
    let numbers: Vec<&str> = entries
        .iter()
        .map(|e| e["queue_number"].as_str().unwrap())
        .collect();
    assert_eq!(numbers, vec!["Q-0001", "Q-0002", "Q-0003"]);
    let positions: Vec<i64> = entries
        .iter()
        .map(|e| e["position"].as_i64().unwrap())
        .collect();
    assert_eq!(positions, vec![1, 2, 3]);
    assert_eq!(entries[0]["estimated_wait_minutes"], 0);
    assert_eq!(entries[2]["estimated_wait_minutes"], 60);

    let (status, body) = client.post("/api/queue/call-next", json!({"doctor_id": 7})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let called = body["data"].clone();
    assert_eq!(called["queue_number"], "Q-0001");
    assert_eq!(called["status"], "in_progress");
    assert_eq!(called["position"], 0);
    assert!(called["called_at"].is_i64());

    // The appointment follows its queue entry
    let (_, body) = client
        .get(&format!("/api/appointments/{}", appointments[0]))
        .await;
    assert_eq!(body["data"]["status"], "in_progress");

    let (_, body) = client.get("/api/queue?doctor_id=7&status=waiting").await;
    let waiting = body["data"].as_array().unwrap();
    let positions: Vec<i64> = waiting
        .iter()
        .map(|e| e["position"].as_i64().unwrap())
        .collect();
    assert_eq!(positions, vec![1, 2]);
    assert_eq!(waiting[0]["estimated_wait_minutes"], 0);

    // Finishing the visit from the queue completes the appointment
    let called_id = id_of(&called);
    let (status, body) = client
        .put(&format!("/api/queue/{called_id}/status"), json!({"status": "completed"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "completed");
    let (_, body) = client
        .get(&format!("/api/appointments/{}", appointments[0]))
        .await;
    assert_eq!(body["data"]["status"], "completed");

    let (status, body) = client
        .put(&format!("/api/queue/{called_id}/status"), json!({"status": "cancelled"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), 5003);
}

#[tokio::test]
async fn test_cancelling_appointment_leaves_queue() {
    let app = TestApp::new().await;
    let client = Client::new(&app, "clinic-a");
    let patient = id_of(&client.create_patient("Ana").await);
    let (_, first) = client.book(patient, 7, "09:00", "09:30").await;
    let (_, second) = client.book(patient, 7, "09:30", "10:00").await;
    let first = id_of(&first["data"]);
    let second = id_of(&second["data"]);
    client.set_status(first, "in_queue").await;
    client.set_status(second, "in_queue").await;

    let (status, _) = client.set_status(first, "cancelled").await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = client.get("/api/queue?doctor_id=7&status=waiting").await;
    let waiting = body["data"].as_array().unwrap();
    assert_eq!(waiting.len(), 1);
    assert_eq!(waiting[0]["appointment_id"], second);
    assert_eq!(waiting[0]["position"], 1);
}

#[tokio::test]
async fn test_call_next_on_empty_queue() {
    let app = TestApp::new().await;
    let client = Client::new(&app, "clinic-a");
    let (status, body) = client.post("/api/queue/call-next", json!({"doctor_id": 7})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&body), 5002);
}

#[tokio::test]
async fn test_queued_appointment_keeps_its_doctor() {
    let app = TestApp::new().await;
    let client = Client::new(&app, "clinic-a");
    let patient = id_of(&client.create_patient("Ana").await);
    let (_, body) = client.book(patient, 7, "09:00", "09:30").await;
    let appointment = id_of(&body["data"]);
    client.set_status(appointment, "in_queue").await;

    let (status, body) = client
        .put(&format!("/api/appointments/{appointment}"), json!({"doctor_id": 8}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
    assert_eq!(error_code(&body), 4003);

    let (_, body) = client.get(&format!("/api/appointments/{appointment}")).await;
    assert_eq!(body["data"]["doctor_id"], 7);
    let (_, body) = client.get("/api/queue?doctor_id=7&status=waiting").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    // Other fields can still change, and the entry stays callable
    let (status, _) = client
        .put(&format!("/api/appointments/{appointment}"), json!({"notes": "Bring X-rays"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = client.post("/api/queue/call-next", json!({"doctor_id": 7})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["appointment_id"], appointment);

    let (status, _) = client
        .put(&format!("/api/appointments/{appointment}"), json!({"doctor_id": 8}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_unqueued_appointment_can_change_doctor() {
    let app = TestApp::new().await;
    let client = Client::new(&app, "clinic-a");
    let patient = id_of(&client.create_patient("Ana").await);
    let (_, body) = client.book(patient, 7, "09:00", "09:30").await;
    let appointment = id_of(&body["data"]);
    client.set_status(appointment, "confirmed").await;

    let (status, body) = client
        .put(&format!("/api/appointments/{appointment}"), json!({"doctor_id": 8}))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["doctor_id"], 8);

    client.set_status(appointment, "in_queue").await;
    let (status, body) = client.post("/api/queue/call-next", json!({"doctor_id": 8})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["appointment_id"], appointment);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_check_ins_get_distinct_numbers() {
    const PATIENTS: usize = 8;
    let app = TestApp::on_disk(PATIENTS as u32).await;
    let client = Client::new(&app, "clinic-a");
    let patient = id_of(&client.create_patient("Ana").await);

    let mut appointments = Vec::new();
    for slot in 0..PATIENTS {
        let start = format!("{:02}:00", 8 + slot);
        let end = format!("{:02}:30", 8 + slot);
        let (status, body) = client.book(patient, 7, &start, &end).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        appointments.push(id_of(&body["data"]));
    }

    let mut check_ins = JoinSet::new();
    for id in appointments {
        let request = Request::builder()
            .method(Method::PUT)
            .uri(format!("/api/appointments/{id}/status"))
            .header("authorization", format!("Bearer {}", client.token))
            .header("content-type", "application/json")
            .body(Body::from(json!({"status": "in_queue"}).to_string()))
            .unwrap();
        check_ins.spawn(dispatch(app.router.clone(), request));
    }
    while let Some(result) = check_ins.join_next().await {
        let (status, body) = result.unwrap();
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    let (_, body) = client.get("/api/queue?doctor_id=7&status=waiting").await;
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), PATIENTS);

    let mut numbers: Vec<&str> = entries
        .iter()
        .map(|e| e["queue_number"].as_str().unwrap())
        .collect();
    numbers.sort();
    let expected: Vec<String> = (1..=PATIENTS).map(|n| format!("Q-{n:04}")).collect();
    assert_eq!(numbers, expected);

    let mut positions: Vec<i64> = entries
        .iter()
        .map(|e| e["position"].as_i64().unwrap())
        .collect();
    positions.sort();
    assert_eq!(positions, (1..=PATIENTS as i64).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_call_next_is_audited_with_snapshots() {
    let app = TestApp::new().await;
    let client = Client::new(&app, "clinic-a");
    let patient = id_of(&client.create_patient("Ana").await);
    let (_, body) = client.book(patient, 7, "09:00", "09:30").await;
    let appointment = id_of(&body["data"]);
    client.set_status(appointment, "in_queue").await;

    let (_, body) = client.post("/api/queue/call-next", json!({"doctor_id": 7})).await;
    let entry = id_of(&body["data"]);

    let (_, body) = client
        .get(&format!("/api/audit-log?resource_type=queue_entry&resource_id={entry}"))
        .await;
    let items = body["data"]["items"].as_array().unwrap();
    let called = items
        .iter()
        .find(|e| e["action"] == "queue_entry_status_changed")
        .unwrap();
    assert_eq!(called["details"]["before"]["status"], "waiting");
    assert_eq!(called["details"]["before"]["position"], 1);
    assert_eq!(called["details"]["after"]["status"], "in_progress");
    assert_eq!(called["details"]["after"]["queue_number"], "Q-0001");
}

#[tokio::test]
async fn test_tenants_are_isolated() {
    let app = TestApp::new().await;
    let clinic_a = Client::new(&app, "clinic-a");
    let clinic_b = Client::new(&app, "clinic-b");

    let patient = id_of(&clinic_a.create_patient("Ana").await);
    let (_, body) = clinic_a.book(patient, 7, "09:00", "09:30").await;
    let appointment = id_of(&body["data"]);

    let (status, _) = clinic_b.get(&format!("/api/patients/{patient}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = clinic_b
        .get(&format!("/api/appointments/{appointment}"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Same doctor id in another tenant is a different calendar
    let other = id_of(&clinic_b.create_patient("Bob").await);
    let (status, _) = clinic_b.book(other, 7, "09:00", "09:30").await;
    assert_eq!(status, StatusCode::OK);

    // Numbering is per tenant
    let (_, body) = clinic_b.get(&format!("/api/patients/{other}")).await;
    assert_eq!(body["data"]["patient_number"], "P-000001");

    let (_, body) = clinic_b.get("/api/patients").await;
    assert_eq!(body["data"]["pagination"]["total"], 1);
}

#[tokio::test]
async fn test_patient_with_open_appointment_cannot_be_deleted() {
    let app = TestApp::new().await;
    let client = Client::new(&app, "clinic-a");
    let patient = id_of(&client.create_patient("Ana").await);
    let (_, body) = client.book(patient, 7, "09:00", "09:30").await;
    let appointment = id_of(&body["data"]);

    let (status, body) = client.delete(&format!("/api/patients/{patient}")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), 7002);

    let (status, _) = client.delete(&format!("/api/appointments/{appointment}")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = client.delete(&format!("/api/patients/{patient}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], true);

    let (status, _) = client.get(&format!("/api/patients/{patient}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invoice_payments() {
    let app = TestApp::new().await;
    let client = Client::new(&app, "clinic-a");
    let patient = id_of(&client.create_patient("Ana").await);

    let (status, body) = client
        .post(
            "/api/invoices",
            json!({
                "patient_id": patient,
                "items": [
                    {"description": "Consultation", "quantity": 2, "unit_price": 5000},
                    {"description": "Lab test", "quantity": 1, "unit_price": 2500},
                ],
                "discount": 500,
                "tax": 1000,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let invoice = body["data"].clone();
    let id = id_of(&invoice);
    assert_eq!(invoice["invoice_number"], "INV-000001");
    assert_eq!(invoice["subtotal"], 12500);
    assert_eq!(invoice["total"], 13000);
    assert_eq!(invoice["balance"], 13000);
    assert_eq!(invoice["status"], "pending");
    assert_eq!(invoice["items"].as_array().unwrap().len(), 2);
    assert_eq!(invoice["items"][0]["amount"], 10000);

    let payments = format!("/api/invoices/{id}/payments");
    let (status, body) = client
        .post(&payments, json!({"amount": 3000, "method": "cash"}))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["invoice"]["status"], "partially_paid");
    assert_eq!(body["data"]["invoice"]["balance"], 10000);
    assert_eq!(body["data"]["payment"]["amount"], 3000);

    let (status, body) = client
        .post(&payments, json!({"amount": 20000, "method": "card"}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&body), 6004);

    let (status, body) = client
        .post(&payments, json!({"amount": 0, "method": "card"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), 6005);

    // Partially paid invoices can neither be edited nor cancelled
    let (status, _) = client
        .put(&format!("/api/invoices/{id}"), json!({"discount": 0}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = client
        .post(&format!("/api/invoices/{id}/cancel"), json!({}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = client
        .post(&payments, json!({"amount": 10000, "method": "card"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["invoice"]["status"], "paid");
    assert_eq!(body["data"]["invoice"]["balance"], 0);

    let (status, body) = client
        .post(&payments, json!({"amount": 1, "method": "cash"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), 6006);

    let (_, body) = client.get(&payments).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_draft_and_cancelled_invoices() {
    let app = TestApp::new().await;
    let client = Client::new(&app, "clinic-a");
    let patient = id_of(&client.create_patient("Ana").await);

    let (_, body) = client
        .post(
            "/api/invoices",
            json!({
                "patient_id": patient,
                "items": [{"description": "Consultation", "quantity": 1, "unit_price": 4000}],
                "draft": true,
            }),
        )
        .await;
    let id = id_of(&body["data"]);
    assert_eq!(body["data"]["status"], "draft");

    let payments = format!("/api/invoices/{id}/payments");
    let (status, body) = client
        .post(&payments, json!({"amount": 1000, "method": "cash"}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&body), 6002);

    let (status, body) = client
        .put(
            &format!("/api/invoices/{id}"),
            json!({
                "items": [{"description": "Consultation", "quantity": 1, "unit_price": 6000}],
                "issue": true,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["total"], 6000);

    let (status, body) = client
        .post(&format!("/api/invoices/{id}/cancel"), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cancelled");

    let (status, body) = client
        .post(&payments, json!({"amount": 1000, "method": "cash"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), 6003);
}

#[tokio::test]
async fn test_discount_above_subtotal_is_rejected() {
    let app = TestApp::new().await;
    let client = Client::new(&app, "clinic-a");
    let patient = id_of(&client.create_patient("Ana").await);
    let (status, body) = client
        .post(
            "/api/invoices",
            json!({
                "patient_id": patient,
                "items": [{"description": "Consultation", "quantity": 1, "unit_price": 1000}],
                "discount": 2000,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), 8);
}

#[tokio::test]
async fn test_audit_log_records_changes() {
    let app = TestApp::new().await;
    let client = Client::new(&app, "clinic-a");
    let patient = id_of(&client.create_patient("Ana").await);
    let (_, body) = client.book(patient, 7, "09:00", "09:30").await;
    let appointment = id_of(&body["data"]);
    client.set_status(appointment, "confirmed").await;

    let (status, body) = client
        .get(&format!(
            "/api/audit-log?resource_type=appointment&resource_id={appointment}"
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    let changed = items
        .iter()
        .find(|e| e["action"] == "appointment_status_changed")
        .unwrap();
    assert_eq!(changed["actor_id"], "clinic-a-frontdesk");
    assert_eq!(changed["details"]["before"]["status"], "scheduled");
    assert_eq!(changed["details"]["after"]["status"], "confirmed");
    assert!(items.iter().any(|e| e["action"] == "appointment_created"));

    // Other tenants see nothing
    let other = Client::new(&app, "clinic-b");
    let (_, body) = other.get("/api/audit-log").await;
    assert_eq!(body["data"]["pagination"]["total"], 0);
}

struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn appointment_booked(&self, _appointment: &Appointment) -> Result<(), NotifyError> {
        Err(NotifyError::Delivery("smtp unreachable".into()))
    }

    async fn appointment_cancelled(&self, _appointment: &Appointment) -> Result<(), NotifyError> {
        Err(NotifyError::Delivery("smtp unreachable".into()))
    }
}

#[tokio::test]
async fn test_notification_failure_does_not_fail_booking() {
    let app = TestApp::with_state(|state| state.with_notifier(Arc::new(FailingNotifier))).await;
    let client = Client::new(&app, "clinic-a");
    let patient = id_of(&client.create_patient("Ana").await);

    let (status, body) = client.book(patient, 7, "09:00", "09:30").await;
    assert_eq!(status, StatusCode::OK);
    let id = id_of(&body["data"]);

    let (status, body) = client
        .put(
            &format!("/api/appointments/{id}/status"),
            json!({"status": "cancelled", "cancellation_reason": "Patient called in sick"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cancelled");
    assert_eq!(body["data"]["cancellation_reason"], "Patient called in sick");
}
