use axum::{extract::State, Json};
use assert_matches::assert_matches;
use serde_json::json;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path, query_param};

use patient_cell::handlers::list_patients;
use patient_cell::models::PatientSummary;
use shared_models::error::AppError;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig, PATIENT_ROLE_ID};

#[tokio::test]
async fn lists_only_patient_role_without_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/usuarios"))
        .and(query_param("rol_id", format!("eq.{}", PATIENT_ROLE_ID)))
        .and(query_param("select", "nombre,email,telefono,foto_url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "nombre": "Ana", "email": "ana@clinica.test", "telefono": "555", "foto_url": null },
            { "nombre": "Luis", "email": "luis@clinica.test", "telefono": null, "foto_url": "https://x/y.png" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let config = TestConfig::with_store(&server.uri()).to_arc();

    let Json(response) = list_patients(State(config)).await.unwrap();

    assert_eq!(response.pacientes.len(), 2);
    assert_eq!(response.pacientes[0], PatientSummary {
        nombre: "Ana".to_string(),
        email: Some("ana@clinica.test".to_string()),
        telefono: Some("555".to_string()),
        foto_url: None,
    });

    let body = serde_json::to_value(&response).unwrap();
    assert!(body["pacientes"][1].get("password").is_none());
}

#[tokio::test]
async fn no_patients_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/usuarios"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let config = TestConfig::with_store(&server.uri()).to_arc();

    let result = list_patients(State(config)).await;

    assert_matches!(result, Err(AppError::NotFound(msg)) if msg == "No se encontraron pacientes");
}

#[tokio::test]
async fn store_failure_is_a_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/usuarios"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let config = TestConfig::with_store(&server.uri()).to_arc();

    let result = list_patients(State(config)).await;

    assert_matches!(result, Err(AppError::Database(_)));
}

#[tokio::test]
async fn malformed_rows_are_skipped() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/usuarios"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::usuario_response("p-1", "Ana", "ana@clinica.test", PATIENT_ROLE_ID),
            { "email": "sin-nombre@clinica.test" }
        ])))
        .mount(&server)
        .await;

    let config = TestConfig::with_store(&server.uri()).to_arc();

    let Json(response) = list_patients(State(config)).await.unwrap();

    assert_eq!(response.pacientes.len(), 1);
    assert_eq!(response.pacientes[0].nombre, "Ana");
}
