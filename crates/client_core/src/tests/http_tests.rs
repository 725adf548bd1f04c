use super::*;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use shared::{
    domain::{CompanyId, LocationId, ServiceId},
    error::{ApiError, ErrorCode},
    protocol::{CompanySubmission, ServiceEntry},
};
use std::collections::HashMap;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct BackendState {
    submissions: Arc<Mutex<Vec<(Option<String>, CompanySubmission)>>>,
    location_terms: Arc<Mutex<Vec<String>>>,
}

async fn search_locations(
    State(state): State<BackendState>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Vec<LocationCandidate>> {
    let term = query.get("term").cloned().unwrap_or_default();
    state.location_terms.lock().await.push(term.clone());
    Json(vec![LocationCandidate {
        id: LocationId(10),
        city: term,
        country: "USA".into(),
    }])
}

async fn search_companies(
    Query(query): Query<HashMap<String, String>>,
) -> Json<Vec<CompanyNameCandidate>> {
    let name = query.get("name").cloned().unwrap_or_default();
    Json(vec![CompanyNameCandidate {
        id: CompanyId(3),
        name: format!("{name} Holdings"),
    }])
}

async fn grouped_services() -> Json<GroupedServices> {
    let mut grouped = GroupedServices::new();
    grouped.insert(
        "Development".into(),
        vec![ServiceEntry {
            id: ServiceId(1),
            name: "Web".into(),
        }],
    );
    Json(grouped)
}

async fn create_company(
    State(state): State<BackendState>,
    headers: HeaderMap,
    Json(payload): Json<CompanySubmission>,
) -> axum::response::Response {
    let auth = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let name = payload.name.clone();
    state.submissions.lock().await.push((auth, payload));

    match name.as_str() {
        "Invalid" => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "title": "validation failed",
                "errors": { "ProjectName": ["required"], "Email": ["taken"] }
            })),
        )
            .into_response(),
        "Broken" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::new(ErrorCode::Internal, "database offline")),
        )
            .into_response(),
        _ => (
            StatusCode::CREATED,
            Json(json!({ "id": 42, "name": name })),
        )
            .into_response(),
    }
}

async fn spawn_backend() -> anyhow::Result<(String, BackendState)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = BackendState::default();
    let app = Router::new()
        .route("/locations/search", get(search_locations))
        .route("/companies/search", get(search_companies))
        .route("/services/grouped", get(grouped_services))
        .route("/companies", post(create_company))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

fn submission(name: &str) -> CompanySubmission {
    CompanySubmission {
        name: name.into(),
        description: String::new(),
        founded_year: 1999,
        address: "1 Main St".into(),
        location_id: LocationId(10),
        size: None,
        website: None,
        phone: None,
        email: None,
        service_ids: vec![ServiceId(1)],
        projects: Vec::new(),
    }
}

fn client(base_url: &str) -> HttpDirectoryApi {
    HttpDirectoryApi::new(format!("{base_url}/"), Duration::from_secs(5)).expect("client")
}

#[tokio::test]
async fn lookups_hit_search_routes() {
    let (base_url, state) = spawn_backend().await.expect("spawn backend");
    let api = client(&base_url);
    assert_eq!(api.base_url(), base_url);

    let locations = api.search_locations("San Francisco").await.expect("locations");
    assert_eq!(locations[0].city, "San Francisco");
    assert_eq!(
        state.location_terms.lock().await.as_slice(),
        ["San Francisco".to_string()]
    );

    let companies = api.search_companies_by_name("Acme").await.expect("companies");
    assert_eq!(companies[0].name, "Acme Holdings");

    let catalog = api.load_service_catalog().await.expect("catalog");
    assert!(catalog.contains(ServiceId(1)));
}

#[tokio::test]
async fn submit_forwards_bearer_credential() {
    let (base_url, state) = spawn_backend().await.expect("spawn backend");
    let api = client(&base_url);

    let created = api
        .submit_company(&submission("Northwind"), &Credential::new("token-123"))
        .await
        .expect("created");
    assert_eq!(created.id, CompanyId(42));

    let submissions = state.submissions.lock().await;
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].0.as_deref(), Some("Bearer token-123"));
    assert_eq!(submissions[0].1.service_ids, vec![ServiceId(1)]);
}

#[tokio::test]
async fn structured_rejection_maps_to_validation_error() {
    let (base_url, _state) = spawn_backend().await.expect("spawn backend");
    let api = client(&base_url);

    let err = api
        .submit_company(&submission("Invalid"), &Credential::new("t"))
        .await
        .expect_err("rejected");
    let fields = err.field_errors().expect("field errors");
    assert_eq!(fields["ProjectName"], vec!["required".to_string()]);
    assert_eq!(fields["Email"], vec!["taken".to_string()]);
}

#[tokio::test]
async fn unstructured_server_error_keeps_message() {
    let (base_url, _state) = spawn_backend().await.expect("spawn backend");
    let api = client(&base_url);

    let err = api
        .submit_company(&submission("Broken"), &Credential::new("t"))
        .await
        .expect_err("server error");
    match err {
        SubmitError::Server { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "database offline");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let api = client(&format!("http://{addr}"));
    let err = api
        .submit_company(&submission("Northwind"), &Credential::new("t"))
        .await
        .expect_err("transport");
    assert!(matches!(err, SubmitError::Transport(_)));
}

#[test]
fn bad_request_without_fields_is_a_server_error() {
    let err = classify_submit_failure(400, r#"{"errors":{}, "title":"bad payload"}"#);
    assert!(matches!(
        err,
        SubmitError::Server { status: 400, ref message } if message == "bad payload"
    ));

    let err = classify_submit_failure(502, "");
    assert!(matches!(
        err,
        SubmitError::Server { status: 502, ref message } if message == "request failed with status 502"
    ));
}

#[test]
fn field_errors_from_both_keys_are_merged() {
    let err = classify_submit_failure(
        400,
        r#"{"errors":{"Name":["required"]},"field_errors":{"Name":["too short"],"Phone":[]}}"#,
    );
    let fields = err.field_errors().expect("validation");
    assert_eq!(fields.len(), 1);
    assert_eq!(
        fields["Name"],
        vec!["required".to_string(), "too short".to_string()]
    );
}
