use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{Request, StatusCode},
    Json,
};
use axum_extra::TypedHeader;
use assert_matches::assert_matches;
use headers::Authorization;
use serde_json::json;
use tower::ServiceExt;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{body_partial_json, header, method, path, path_regex, query_param};

use auth_cell::handlers::*;
use auth_cell::models::*;
use auth_cell::router::{auth_routes, user_routes};
use auth_cell::services::password::hash_password;
use shared_models::error::AppError;
use shared_utils::extractor::JsonBody;
use shared_utils::jwt::validate_token as decode_token;
use shared_utils::test_utils::{
    JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser, DOCTOR_ROLE_ID, PATIENT_ROLE_ID,
};

async fn mount_lookup(server: &MockServer, email: &str, rows: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/usuarios"))
        .and(query_param("email", format!("eq.{}", email)))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(server)
        .await;
}

fn registration(email: &str) -> RegisterRequest {
    RegisterRequest {
        nombre: "Ana Pérez".to_string(),
        email: email.to_string(),
        password: "clave-segura".to_string(),
        rol: None,
    }
}

// ==============================================================================
// REGISTER
// ==============================================================================

#[tokio::test]
async fn register_defaults_to_patient_role_and_hashes_password() {
    let server = MockServer::start().await;
    mount_lookup(&server, "ana@clinica.test", json!([])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/usuarios"))
        .and(header("Prefer", "return=representation"))
        .and(body_partial_json(json!({
            "email": "ana@clinica.test",
            "rol_id": PATIENT_ROLE_ID,
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::usuario_response("usr-1", "Ana Pérez", "ana@clinica.test", PATIENT_ROLE_ID)
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let config = TestConfig::with_store(&server.uri()).to_arc();

    let (status, Json(body)) = register(State(config), JsonBody(registration("  Ana@Clinica.test ")))
        .await
        .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Usuario registrado correctamente");

    let requests = server.received_requests().await.unwrap();
    let insert = requests.iter().find(|r| r.method.as_str() == "POST").unwrap();
    let sent: serde_json::Value = serde_json::from_slice(&insert.body).unwrap();
    assert!(sent["password"].as_str().unwrap().starts_with("$argon2id$"));
    assert!(sent["fecha_creacion"].is_string());
}

#[tokio::test]
async fn register_rejects_taken_email_without_insert() {
    let server = MockServer::start().await;
    mount_lookup(&server, "ana@clinica.test", json!([{ "id": "usr-1" }])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/usuarios"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let config = TestConfig::with_store(&server.uri()).to_arc();

    let result = register(State(config), JsonBody(registration("ana@clinica.test"))).await;

    assert_matches!(result, Err(AppError::BadRequest(msg)) if msg == "El usuario ya existe");
}

#[tokio::test]
async fn register_rejects_malformed_email() {
    let config = TestConfig::default().to_arc();

    let result = register(State(config), JsonBody(registration("no-es-un-correo"))).await;

    assert_matches!(result, Err(AppError::BadRequest(_)));
}

#[tokio::test]
async fn register_conflict_on_insert_is_duplicate() {
    let server = MockServer::start().await;
    mount_lookup(&server, "ana@clinica.test", json!([])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/usuarios"))
        .respond_with(ResponseTemplate::new(409).set_body_string("duplicate key value"))
        .mount(&server)
        .await;

    let config = TestConfig::with_store(&server.uri()).to_arc();

    let result = register(State(config), JsonBody(registration("ana@clinica.test"))).await;

    assert_matches!(result, Err(AppError::BadRequest(msg)) if msg == "El usuario ya existe");
}

// ==============================================================================
// LOGIN
// ==============================================================================

#[tokio::test]
async fn login_issues_token_and_hides_password() {
    let server = MockServer::start().await;
    let mut row = MockSupabaseResponses::usuario_response("usr-7", "Dr. Ruiz", "ruiz@clinica.test", DOCTOR_ROLE_ID);
    row["password"] = json!(hash_password("correcta").unwrap());
    mount_lookup(&server, "ruiz@clinica.test", json!([row])).await;

    let config = TestConfig::with_store(&server.uri()).to_arc();

    let Json(response) = login(
        State(config.clone()),
        JsonBody(LoginRequest {
            email: "Ruiz@Clinica.test".to_string(),
            password: "correcta".to_string(),
        }),
    )
    .await
    .unwrap();

    assert!(response.user.get("password").is_none());
    assert_eq!(response.user["nombre"], "Dr. Ruiz");
    assert!(response.token_expiration > chrono::Utc::now().timestamp_millis());

    let user = decode_token(&response.access_token, &config.jwt_secret).unwrap();
    assert_eq!(user.id, "usr-7");
    assert_eq!(user.role.as_deref(), Some(DOCTOR_ROLE_ID));
}

#[tokio::test]
async fn login_wrong_password_and_unknown_email_look_the_same() {
    let server = MockServer::start().await;
    let mut row = MockSupabaseResponses::usuario_response("usr-7", "Dr. Ruiz", "ruiz@clinica.test", DOCTOR_ROLE_ID);
    row["password"] = json!(hash_password("correcta").unwrap());
    mount_lookup(&server, "ruiz@clinica.test", json!([row])).await;
    mount_lookup(&server, "nadie@clinica.test", json!([])).await;

    let config = TestConfig::with_store(&server.uri()).to_arc();

    let wrong_password = login(
        State(config.clone()),
        JsonBody(LoginRequest {
            email: "ruiz@clinica.test".to_string(),
            password: "incorrecta".to_string(),
        }),
    )
    .await
    .unwrap_err();

    let unknown = login(
        State(config),
        JsonBody(LoginRequest {
            email: "nadie@clinica.test".to_string(),
            password: "correcta".to_string(),
        }),
    )
    .await
    .unwrap_err();

    assert_matches!(&wrong_password, AppError::Auth(msg) if msg == "Credenciales no válidas");
    assert_eq!(wrong_password.to_string(), unknown.to_string());
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
}

// ==============================================================================
// TOKEN VALIDATION
// ==============================================================================

#[tokio::test]
async fn validate_accepts_fresh_token() {
    let config = TestConfig::default().to_arc();
    let user = TestUser::patient("paciente@clinica.test");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

    let bearer = Authorization::bearer(&token).unwrap();
    let Json(response) = validate_token(State(config), Some(TypedHeader(bearer)))
        .await
        .unwrap();

    assert!(response.valid);
    assert_eq!(response.user_id, user.id);
    assert_eq!(response.email, Some(user.email));
}

#[tokio::test]
async fn validate_without_header_is_unauthorized() {
    let config = TestConfig::default().to_arc();

    let result = validate_token(State(config), None).await;

    assert_matches!(result, Err(AppError::Auth(msg)) if msg == "Missing authorization header");
}

#[tokio::test]
async fn validate_rejects_expired_token_through_router() {
    let config = TestConfig::default().to_arc();
    let token = JwtTestUtils::create_expired_token(&TestUser::default(), &config.jwt_secret);
    let app = auth_routes(config);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/validate")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ==============================================================================
// USER CREATION
// ==============================================================================

fn staff_request(foto: Option<&str>) -> CreateUserRequest {
    CreateUserRequest {
        nombre: "Dra. Soto".to_string(),
        email: "soto@clinica.test".to_string(),
        password: "clave".to_string(),
        rol_id: DOCTOR_ROLE_ID.to_string(),
        sucursal_id: "suc-1".to_string(),
        telefono: Some("5551234".to_string()),
        foto: foto.map(str::to_string),
        foto_nombre: Some("soto.png".to_string()),
    }
}

#[tokio::test]
async fn create_user_uploads_photo_and_stores_public_url() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/storage/v1/object/usuarios/[0-9a-f-]+_soto\.png$"))
        .and(header("Content-Type", "image/png"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Key": "usuarios/x" })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/usuarios"))
        .and(body_partial_json(json!({ "rol_id": DOCTOR_ROLE_ID, "sucursal_id": "suc-1" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": "usr-9",
            "nombre": "Dra. Soto",
            "email": "soto@clinica.test",
            "password": "$argon2id$stored",
            "foto_url": "https://store/usuarios/soto.png"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let config = TestConfig::with_store(&server.uri()).to_arc();

    let (status, Json(body)) = create_user(State(config), JsonBody(staff_request(Some("data:image/png;base64,iVBORw0KGgo="))))
        .await
        .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Usuario creado correctamente");
    assert!(body["user"].get("password").is_none());

    let requests = server.received_requests().await.unwrap();
    let insert = requests.iter().find(|r| r.url.path() == "/rest/v1/usuarios").unwrap();
    let sent: serde_json::Value = serde_json::from_slice(&insert.body).unwrap();
    let foto_url = sent["foto_url"].as_str().unwrap();
    assert!(foto_url.starts_with(&format!("{}/storage/v1/object/public/usuarios/", server.uri())));
}

#[tokio::test]
async fn create_user_without_photo_skips_storage() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/storage/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/usuarios"))
        .and(body_partial_json(json!({ "foto_url": null })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{ "id": "usr-9" }])))
        .expect(1)
        .mount(&server)
        .await;

    let config = TestConfig::with_store(&server.uri()).to_arc();

    let result = create_user(State(config), JsonBody(staff_request(None))).await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn create_user_rejects_undecodable_photo() {
    let config = TestConfig::default().to_arc();

    let result = create_user(State(config), JsonBody(staff_request(Some("data:image/png;base64,@@@")))).await;

    assert_matches!(result, Err(AppError::BadRequest(_)));
}

// ==============================================================================
// REQUEST BODIES
// ==============================================================================

async fn post_json(app: axum::Router, uri: &str, content_type: &str, body: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", content_type)
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn register_without_name_names_the_field() {
    let app = auth_routes(TestConfig::default().to_arc());

    let (status, body) = post_json(app, "/register", "application/json", r#"{"email":"a@b.co","password":"x"}"#).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Falta el campo obligatorio: nombre" }));
}

#[tokio::test]
async fn login_with_malformed_json_is_a_bad_request() {
    let app = auth_routes(TestConfig::default().to_arc());

    let (status, body) = post_json(app, "/login", "application/json", r#"{"email":"#).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn login_with_form_encoding_is_a_bad_request() {
    let app = auth_routes(TestConfig::default().to_arc());

    let (status, body) = post_json(app, "/login", "application/x-www-form-urlencoded", "email=a%40b.co&password=x").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn create_user_without_role_names_the_field() {
    let app = user_routes(TestConfig::default().to_arc());

    let (status, body) = post_json(
        app,
        "/usuarios",
        "application/json",
        r#"{"nombre":"Dra. Soto","email":"soto@clinica.test","password":"x","sucursal_id":"suc-1"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Falta el campo obligatorio: rol_id" }));
}
