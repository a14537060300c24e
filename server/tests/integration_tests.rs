use std::path::PathBuf;
use std::sync::Arc;

use proms_server::bootstrap::Bootstrap;
use proms_server::db::connect_in_memory;
use proms_server::models::{CareEvent, EventType, FollowupPlan, Patient, Procedure, ProcedureBooking};
use proms_server::search::{reindex_all, SearchIndex};
use proms_server::{app, AppState};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

/// Serve the app on an ephemeral port; returns its base URL
async fn spawn_app() -> String {
    spawn_with_state(false).await
}

async fn spawn_with_state(seed: bool) -> String {
    let pool = connect_in_memory().await.expect("Failed to open database");
    if seed {
        let seed_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config");
        Bootstrap::new(pool.clone(), seed_dir)
            .with_hash_iterations(1)
            .run()
            .await;
    }
    let search = Arc::new(SearchIndex::new());
    reindex_all(&pool, &search).await.expect("Failed to build index");

    let state = Arc::new(AppState::new(pool, search));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        axum::serve(listener, app(state)).await.expect("Server error");
    });
    format!("http://{}", addr)
}

async fn create_patient(client: &Client, base: &str, given_name: &str, nhs_number: i64) -> Patient {
    let patient = json!({
        "givenName": given_name,
        "familyName": "Gauss",
        "birthDate": "1990-01-01T00:00:00Z",
        "gender": "MALE",
        "nhsNumber": nhs_number,
        "addresses": [{"street": "1 Brunswick Street", "lines": ["Old Town"], "city": "Gottingen"}]
    });

    let response = client
        .post(format!("{}/api/patients", base))
        .json(&patient)
        .send()
        .await
        .expect("Failed to create patient");
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.expect("Failed to parse response")
}

fn booking(procedure: &str) -> Value {
    json!({
        "consultantName": "Mr Weir",
        "hospitalSite": "Freeman",
        "scheduledDate": "2018-03-01T09:00:00Z",
        "performedDate": null,
        "primaryProcedure": procedure,
        "otherProcedures": null
    })
}

#[tokio::test]
async fn test_create_booking_creates_followup_plan() {
    let base = spawn_app().await;
    let client = Client::new();
    let patient = create_patient(&client, &base, "Carl", 4010232137).await;
    let patient_id = patient.id.unwrap();

    let response = client
        .post(format!("{}/api/patient/{}/procedure-bookings", base, patient_id))
        .json(&booking("1001"))
        .send()
        .await
        .expect("Failed to create booking");
    assert_eq!(response.status(), StatusCode::CREATED);
    let location = response.headers()["location"].to_str().unwrap().to_string();
    let created: ProcedureBooking = response.json().await.expect("Failed to parse response");
    assert_eq!(location, format!("/api/procedure-bookings/{}", created.id.unwrap()));

    let fetched: ProcedureBooking = client
        .get(format!("{}{}", base, location))
        .send()
        .await
        .expect("Failed to get booking")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(fetched, created);

    let plan: FollowupPlan = client
        .get(format!(
            "{}/api/patient/{}/primaryProcedure/1001/followup-plan",
            base, patient_id
        ))
        .send()
        .await
        .expect("Failed to get plan")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(plan.id, created.followup_plan_id);

    let events: Vec<CareEvent> = client
        .get(format!("{}/api/followup-plans/{}/care-events", base, plan.id.unwrap()))
        .send()
        .await
        .expect("Failed to get care events")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(events.len(), 4);
    assert_eq!(events[0].event_type, EventType::Preoperative);
    assert!(events.iter().all(|e| e.patient_id == Some(patient_id)));
}

#[tokio::test]
async fn test_booking_error_paths() {
    let base = spawn_app().await;
    let client = Client::new();
    let patient = create_patient(&client, &base, "Carl", 4010232137).await;

    let mut with_id = booking("1001");
    with_id["id"] = json!(1);
    let response = client
        .post(format!("{}/api/patient/{}/procedure-bookings", base, patient.id.unwrap()))
        .json(&with_id)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers()["x-promsapp-error"], "error.idexists");

    let response = client
        .post(format!("{}/api/patient/424242/procedure-bookings", base))
        .json(&booking("1001"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["errorKey"], "notfound");
}

#[tokio::test]
async fn test_booking_follows_its_new_patient() {
    let base = spawn_app().await;
    let client = Client::new();
    let first = create_patient(&client, &base, "Carl", 4010232137).await.id.unwrap();
    let second = create_patient(&client, &base, "Sophie", 4010232138).await.id.unwrap();

    let created: ProcedureBooking = client
        .post(format!("{}/api/patient/{}/procedure-bookings", base, first))
        .json(&booking("1001"))
        .send()
        .await
        .expect("Failed to create booking")
        .json()
        .await
        .expect("Failed to parse response");

    let response = client
        .put(format!("{}/api/patient/{}/procedure-bookings", base, second))
        .json(&created)
        .send()
        .await
        .expect("Failed to update booking");
    assert_eq!(response.status(), StatusCode::OK);

    let plan_url = |patient: i64| {
        format!("{}/api/patient/{}/primaryProcedure/1001/followup-plan", base, patient)
    };
    let plan: FollowupPlan = client
        .get(plan_url(second))
        .send()
        .await
        .expect("Failed to get plan")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(plan.id, created.followup_plan_id);
    assert_eq!(plan.patient_id, second);

    let response = client.get(plan_url(first)).send().await.expect("Failed to get plan");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    client
        .delete(format!("{}/api/patients/{}", base, first))
        .send()
        .await
        .expect("Failed to delete patient");
    let events: Vec<CareEvent> = client
        .get(format!("{}/api/patient/{}/care-events", base, second))
        .send()
        .await
        .expect("Failed to get care events")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(events.len(), 4);
}

#[tokio::test]
async fn test_malformed_requests_get_alerts() {
    let base = spawn_app().await;
    let client = Client::new();
    let patient = create_patient(&client, &base, "Carl", 4010232137).await;

    let response = client
        .post(format!("{}/api/patient/{}/procedure-bookings", base, patient.id.unwrap()))
        .json(&json!({"hospitalSite": "Freeman", "primaryProcedure": "1"}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers()["x-promsapp-error"], "error.invalidpayload");

    let response = client
        .get(format!("{}/api/procedure-bookings/abc", base))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["errorKey"], "invalidpath");
}

#[tokio::test]
async fn test_delete_then_read_returns_404() {
    let base = spawn_app().await;
    let client = Client::new();
    let patient = create_patient(&client, &base, "Carl", 4010232137).await;
    let url = format!("{}/api/patients/{}", base, patient.id.unwrap());

    let response = client.delete(&url).send().await.expect("Failed to delete");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-promsapp-alert"], "promsApp.patient.deleted");

    let response = client.get(&url).send().await.expect("Failed to get patient");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_criteria_and_pagination_headers() {
    let base = spawn_app().await;
    let client = Client::new();
    for (i, name) in ["Alice", "Bob", "Carol", "Dave", "Erin"].iter().enumerate() {
        create_patient(&client, &base, name, 9000 + i as i64).await;
    }

    let response = client
        .get(format!("{}/api/patients?page=1&size=2&sort=givenName,asc", base))
        .send()
        .await
        .expect("Failed to list patients");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-total-count"], "5");
    let link = response.headers()["link"].to_str().unwrap().to_string();
    assert!(link.contains("</api/patients?page=2&size=2>; rel=\"next\""));
    assert!(link.contains("</api/patients?page=0&size=2>; rel=\"prev\""));
    assert!(link.contains("</api/patients?page=2&size=2>; rel=\"last\""));
    let page: Vec<Patient> = response.json().await.expect("Failed to parse response");
    let names: Vec<&str> = page.iter().map(|p| p.given_name.as_str()).collect();
    assert_eq!(names, vec!["Carol", "Dave"]);

    let narrowed: Vec<Patient> = client
        .get(format!(
            "{}/api/patients?nhsNumber.greaterThan=9001&givenName.in=Alice,Carol,Erin",
            base
        ))
        .send()
        .await
        .expect("Failed to list patients")
        .json()
        .await
        .expect("Failed to parse response");
    let names: Vec<&str> = narrowed.iter().map(|p| p.given_name.as_str()).collect();
    assert_eq!(names, vec!["Carol", "Erin"]);
}

#[tokio::test]
async fn test_search_uses_index() {
    let base = spawn_app().await;
    let client = Client::new();
    let patient = create_patient(&client, &base, "Carl", 4010232137).await;

    let response = client
        .get(format!("{}/api/_search/patients?query=gott*", base))
        .send()
        .await
        .expect("Failed to search patients");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-total-count"], "1");
    let hits: Vec<Patient> = response.json().await.expect("Failed to parse response");
    assert_eq!(hits[0].id, patient.id);
}

#[tokio::test]
async fn test_seeded_reference_data() {
    let base = spawn_with_state(true).await;
    let client = Client::new();

    let hips: Vec<Procedure> = client
        .get(format!("{}/api/_search/procedures?query=hip", base))
        .send()
        .await
        .expect("Failed to search procedures")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(hips.len(), 2);

    let response = client
        .get(format!("{}/api/users?authority=ROLE_CONSULTANT", base))
        .send()
        .await
        .expect("Failed to list users");
    assert_eq!(response.headers()["x-total-count"], "3");

    let durham: Vec<Value> = client
        .get(format!("{}/api/addresses?city.equals=Durham", base))
        .send()
        .await
        .expect("Failed to list addresses")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(durham.len(), 1);
    assert_eq!(durham[0]["street"], "22 Market Place");

    let health: Value = client
        .get(format!("{}/health", base))
        .send()
        .await
        .expect("Failed to check health")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(health["status"], "UP");
}
