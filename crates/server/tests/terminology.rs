//! Terminology clients against a local stub of the NLM services.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;

use note2fhir_core::{Condition, Medication, StructuredNote};
use note2fhir_server::terminology::client::http_client;
use note2fhir_server::terminology::{
    Enricher, Icd10Client, LookupError, LookupOutcome, RxNormClient,
};

type Params = Query<HashMap<String, String>>;

/// Mimics clinicaltables icd10cm/v3/search
async fn icd10_search(Query(params): Params) -> Response {
    if params.get("sf").map(String::as_str) != Some("code,name")
        || params.get("maxList").map(String::as_str) != Some("1")
    {
        return StatusCode::BAD_REQUEST.into_response();
    }
    let body = match params.get("terms").map(String::as_str) {
        Some("hypertension") => json!([1, ["I10"], null, [["I10", "Essential (primary) hypertension"]]]),
        Some("asthma") => json!([1, ["J45.909"], null, [["J45.909", "Unspecified asthma"]]]),
        _ => json!([0, [], null, []]),
    };
    Json(body).into_response()
}

/// Mimics RxNav REST/rxcui.json
async fn rxcui(Query(params): Params) -> Json<serde_json::Value> {
    let name = params.get("name").cloned().unwrap_or_default();
    match name.as_str() {
        "lisinopril" => Json(json!({"idGroup": {"name": name, "rxnormId": ["29046"]}})),
        _ => Json(json!({"idGroup": {"name": name}})),
    }
}

async fn broken() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn garbage() -> &'static str {
    "<html>maintenance</html>"
}

async fn slow() -> Json<serde_json::Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!([0, [], null, []]))
}

/// Serve the stub on an ephemeral port and return its base URL
async fn spawn_stub() -> String {
    let app = Router::new()
        .route("/icd10cm/v3/search", get(icd10_search))
        .route("/REST/rxcui.json", get(rxcui))
        .route("/broken", get(broken))
        .route("/garbage", get(garbage))
        .route("/slow", get(slow));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// A local URL nothing is listening on
async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/search")
}

fn http() -> reqwest::Client {
    http_client(Duration::from_secs(2)).unwrap()
}

#[tokio::test]
async fn icd10_client_reads_first_code() {
    let base = spawn_stub().await;
    let client = Icd10Client::new(http(), format!("{base}/icd10cm/v3/search"));

    assert_eq!(client.search("hypertension").await.unwrap().as_deref(), Some("I10"));
    assert_eq!(client.search("not a disease").await.unwrap(), None);
}

#[tokio::test]
async fn rxnorm_client_reads_first_id() {
    let base = spawn_stub().await;
    let client = RxNormClient::new(http(), format!("{base}/REST/rxcui.json"));

    assert_eq!(client.search("lisinopril").await.unwrap().as_deref(), Some("29046"));
    assert_eq!(client.search("unobtainium").await.unwrap(), None);
}

#[tokio::test]
async fn error_status_is_reported() {
    let base = spawn_stub().await;
    let client = Icd10Client::new(http(), format!("{base}/broken"));

    assert!(matches!(client.search("asthma").await, Err(LookupError::Status(500))));
}

#[tokio::test]
async fn non_json_body_is_an_error() {
    let base = spawn_stub().await;
    let client = RxNormClient::new(http(), format!("{base}/garbage"));

    assert!(matches!(client.search("aspirin").await, Err(LookupError::Http(_))));
}

#[tokio::test]
async fn slow_service_times_out() {
    let base = spawn_stub().await;
    let client = Icd10Client::new(
        http_client(Duration::from_millis(100)).unwrap(),
        format!("{base}/slow"),
    );

    match client.search("asthma").await {
        Err(LookupError::Http(e)) => assert!(e.is_timeout()),
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn enricher_with_real_clients() {
    let base = spawn_stub().await;
    let enricher = Enricher::new(
        Arc::new(Icd10Client::new(http(), format!("{base}/icd10cm/v3/search"))),
        Arc::new(RxNormClient::new(http(), closed_port_url().await)),
        4,
        Duration::from_secs(2),
    );

    let note = StructuredNote {
        conditions: ["asthma", "hypertension", "made up"]
            .into_iter()
            .map(|name| Condition {
                name: name.to_string(),
                icd10_code: None,
            })
            .collect(),
        medications: vec![Medication {
            name: "lisinopril".to_string(),
            dose: Some("10mg".to_string()),
            route: None,
            frequency: None,
            rxnorm_code: None,
        }],
        ..Default::default()
    };

    let (enriched, report) = enricher.enrich(note).await;

    assert_eq!(enriched.conditions[0].icd10_code.as_deref(), Some("J45.909"));
    assert_eq!(enriched.conditions[1].icd10_code.as_deref(), Some("I10"));
    assert_eq!(enriched.conditions[2].icd10_code, None);
    assert_eq!(report.conditions[2], LookupOutcome::NoMatch);

    // RxNav unreachable: the medication keeps a null code
    assert_eq!(enriched.medications[0].rxnorm_code, None);
    assert!(matches!(report.medications[0], LookupOutcome::Failed(_)));
    assert_eq!(enriched.medications[0].dose.as_deref(), Some("10mg"));
}
