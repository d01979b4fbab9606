use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_models::auth::TokenResponse;
use shared_models::error::AppError;
use shared_utils::extractor::JsonBody;
use shared_utils::jwt::validate_token as decode_token;

use crate::models::{AuthError, CreateUserRequest, LoginRequest, LoginResponse, RegisterRequest};
use crate::services::IdentityService;

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => AppError::Auth(err.to_string()),
            AuthError::DuplicateEmail
            | AuthError::InvalidEmail(_)
            | AuthError::MissingField(_)
            | AuthError::InvalidPhoto => AppError::BadRequest(err.to_string()),
            AuthError::Hashing(_) | AuthError::Token(_) => AppError::Internal(err.to_string()),
            AuthError::Store(e) => AppError::Database(e.to_string()),
        }
    }
}

#[axum::debug_handler]
pub async fn register(
    State(state): State<Arc<AppConfig>>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let identity_service = IdentityService::new(&state);

    identity_service
        .register(request)
        .await
        .inspect_err(|e| warn!("Registration rejected: {}", e))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Usuario registrado correctamente" })),
    ))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<Arc<AppConfig>>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let identity_service = IdentityService::new(&state);

    let response = identity_service.authenticate(request).await?;

    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn validate_token(
    State(state): State<Arc<AppConfig>>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let TypedHeader(auth) = bearer
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let user = decode_token(auth.token(), &state.jwt_secret).map_err(AppError::Auth)?;

    Ok(Json(TokenResponse {
        valid: true,
        user_id: user.id,
        email: user.email,
        role: user.role,
    }))
}

#[axum::debug_handler]
pub async fn create_user(
    State(state): State<Arc<AppConfig>>,
    JsonBody(request): JsonBody<CreateUserRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let identity_service = IdentityService::new(&state);

    let user = identity_service
        .create_user(request)
        .await
        .inspect_err(|e| warn!("User creation rejected: {}", e))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Usuario creado correctamente", "user": user })),
    ))
}
