use std::sync::Arc;

use axum::{
    extract::{rejection::{FormRejection, JsonRejection}, FromRequest, State},
    http::Request,
    middleware::Next,
    response::Response,
    body::Body,
    Form, Json,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use shared_models::error::AppError;
use shared_config::AppConfig;

use crate::jwt::validate_token;

/// Reads the bearer token from a raw header value.
pub fn bearer_token(header_value: &str) -> Result<&str, AppError> {
    header_value
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))
}

pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    let token = bearer_token(auth_value)?;

    let user = validate_token(token, &config.jwt_secret)
        .map_err(AppError::Auth)?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

pub const INVALID_BODY: &str = "El cuerpo de la petición no es válido";

/// Field name out of a serde "missing field `x`" message.
fn missing_field(detail: &str) -> Option<&str> {
    let rest = detail.split("missing field `").nth(1)?;
    rest.split('`').next().filter(|field| !field.is_empty())
}

fn body_error(detail: String) -> AppError {
    debug!("Rejected request body: {}", detail);
    match missing_field(&detail) {
        Some(field) => AppError::BadRequest(format!("Falta el campo obligatorio: {}", field)),
        None => AppError::BadRequest(INVALID_BODY.to_string()),
    }
}

/// `Json<T>` whose rejections render as `AppError` bodies.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| JsonBody(value))
            .map_err(|rejection: JsonRejection| body_error(rejection.body_text()))
    }
}

/// `Form<T>` whose rejections render as `AppError` bodies.
#[derive(Debug, Clone)]
pub struct FormBody<T>(pub T);

impl<S, T> FromRequest<S> for FormBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        Form::<T>::from_request(req, state)
            .await
            .map(|Form(value)| FormBody(value))
            .map_err(|rejection: FormRejection| body_error(rejection.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use shared_models::auth::User;
    use axum::{http::StatusCode, middleware, routing::get, Extension, Router};
    use tower::ServiceExt;

    use crate::test_utils::{JwtTestUtils, TestConfig, TestUser};

    fn protected_app(config: Arc<AppConfig>) -> Router {
        Router::new()
            .route("/private", get(|Extension(user): Extension<User>| async move { user.id }))
            .layer(middleware::from_fn_with_state(config, auth_middleware))
    }

    #[test]
    fn bearer_prefix_is_required() {
        assert_eq!(bearer_token("Bearer abc").unwrap(), "abc");
        assert_matches!(bearer_token("abc"), Err(AppError::Auth(_)));
        assert_matches!(bearer_token("Bearer "), Err(AppError::Auth(_)));
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let app = protected_app(TestConfig::default().to_arc());

        let response = app
            .oneshot(Request::builder().uri("/private").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn valid_token_reaches_handler() {
        let config = TestConfig::default().to_arc();
        let user = TestUser::admin("admin@clinica.test");
        let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));
        let app = protected_app(config);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/private")
                    .header("Authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn expired_token_is_unauthorized() {
        let config = TestConfig::default().to_arc();
        let token = JwtTestUtils::create_expired_token(&TestUser::default(), &config.jwt_secret);
        let app = protected_app(config);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/private")
                    .header("Authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[derive(Debug, serde::Deserialize)]
    struct Credentials {
        email: String,
        #[allow(dead_code)]
        password: String,
    }

    fn json_app() -> Router {
        Router::new().route(
            "/login",
            axum::routing::post(|JsonBody(body): JsonBody<Credentials>| async move { body.email }),
        )
    }

    async fn post_login(content_type: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let response = json_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/login")
                    .header("Content-Type", content_type)
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
    }

    #[test]
    fn missing_field_name_is_extracted() {
        assert_eq!(
            missing_field("Failed to deserialize the JSON body into the target type: missing field `nombre` at line 1 column 9"),
            Some("nombre")
        );
        assert_eq!(missing_field("expected value at line 1 column 1"), None);
    }

    #[tokio::test]
    async fn missing_json_field_is_a_bad_request() {
        let (status, body) = post_login("application/json", r#"{"email":"a@b.co"}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Falta el campo obligatorio: password");
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let (status, body) = post_login("application/json", "{not json").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], INVALID_BODY);
    }

    #[tokio::test]
    async fn wrong_content_type_is_a_bad_request() {
        let (status, body) = post_login("text/plain", r#"{"email":"a@b.co","password":"x"}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], INVALID_BODY);
    }
}
