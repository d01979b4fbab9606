use std::sync::LazyLock;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chrono::{Duration, Utc};
use regex::Regex;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{SupabaseClient, SupabaseError};
use shared_models::auth::JwtClaims;
use shared_utils::jwt::create_token;

use crate::models::{AuthError, CreateUserRequest, LoginRequest, LoginResponse, RegisterRequest};
use crate::services::password::{hash_password, verify_password};

pub const PHOTO_BUCKET: &str = "usuarios";

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern compiles")
});

/// Hash checked when the email is unknown, so both login failures cost one Argon2 verify.
static UNKNOWN_USER_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("unknown-user-placeholder").ok());

fn verify_unknown_user(password: &str) -> bool {
    match UNKNOWN_USER_HASH.as_deref() {
        Some(hash) => verify_password(password, hash).unwrap_or(false),
        None => false,
    }
}

pub fn normalize_email(raw: &str) -> Result<String, AuthError> {
    let email = raw.trim().to_lowercase();
    if email.len() > 254 || !EMAIL_PATTERN.is_match(&email) {
        return Err(AuthError::InvalidEmail(raw.trim().to_string()));
    }
    Ok(email)
}

fn non_empty(value: &str, field: &'static str) -> Result<String, AuthError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AuthError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

/// User row as it may leave the service.
fn without_password(mut row: Value) -> Value {
    if let Some(fields) = row.as_object_mut() {
        fields.remove("password");
    }
    row
}

fn store_error(e: anyhow::Error) -> AuthError {
    if SupabaseError::is_conflict(&e) {
        return AuthError::DuplicateEmail;
    }
    AuthError::Store(e)
}

/// Decoded photo upload: bytes plus the MIME type to store them under.
#[derive(Debug, PartialEq, Eq)]
pub struct Photo {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Accepts raw base64 or a `data:<mime>;base64,<payload>` URL.
pub fn decode_photo(encoded: &str, file_name: Option<&str>) -> Result<Photo, AuthError> {
    let (header, payload) = match encoded.split_once(',') {
        Some((header, payload)) if header.starts_with("data:") => (Some(header), payload),
        _ => (None, encoded),
    };

    let bytes = BASE64
        .decode(payload.trim())
        .map_err(|_| AuthError::InvalidPhoto)?;
    if bytes.is_empty() {
        return Err(AuthError::InvalidPhoto);
    }

    let from_header = header
        .and_then(|h| h.strip_prefix("data:"))
        .and_then(|h| h.split(';').next())
        .filter(|mime| !mime.is_empty());

    let from_name = file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| match ext.to_ascii_lowercase().as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "webp" => "image/webp",
            "gif" => "image/gif",
            _ => "application/octet-stream",
        });

    let content_type = from_header.or(from_name).unwrap_or("image/png").to_string();

    Ok(Photo { bytes, content_type })
}

pub struct IdentityService {
    supabase: SupabaseClient,
    jwt_secret: String,
    token_ttl_minutes: i64,
    patient_role_id: String,
}

impl IdentityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            jwt_secret: config.jwt_secret.clone(),
            token_ttl_minutes: config.token_ttl_minutes,
            patient_role_id: config.patient_role_id.clone(),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Value>, AuthError> {
        let path = format!("/rest/v1/usuarios?email=eq.{}&select=*", urlencoding::encode(email));
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(store_error)?;

        Ok(rows.into_iter().next())
    }

    async fn insert_user(&self, row: Value) -> Result<Value, AuthError> {
        let rows = self
            .supabase
            .request_returning(Method::POST, "/rest/v1/usuarios", None, row)
            .await
            .map_err(store_error)?;

        rows.into_iter()
            .next()
            .ok_or_else(|| AuthError::Store(anyhow::anyhow!("Insert into usuarios returned no rows")))
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<(), AuthError> {
        let email = normalize_email(&request.email)?;
        let nombre = non_empty(&request.nombre, "nombre")?;
        non_empty(&request.password, "password")?;

        if self.find_by_email(&email).await?.is_some() {
            return Err(AuthError::DuplicateEmail);
        }

        let hashed = hash_password(&request.password).map_err(|e| AuthError::Hashing(e.to_string()))?;
        let rol_id = request
            .rol
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| self.patient_role_id.clone());

        self.insert_user(json!({
            "nombre": nombre,
            "email": email,
            "password": hashed,
            "rol_id": rol_id,
            "fecha_creacion": Utc::now().to_rfc3339(),
        }))
        .await?;

        info!("Registered user {}", email);
        Ok(())
    }

    /// Unknown email and wrong password fail the same way.
    pub async fn authenticate(&self, request: LoginRequest) -> Result<LoginResponse, AuthError> {
        let email = request.email.trim().to_lowercase();

        let Some(user) = self.find_by_email(&email).await? else {
            debug!("Login for unknown email {}", email);
            verify_unknown_user(&request.password);
            return Err(AuthError::InvalidCredentials);
        };

        let stored = user["password"].as_str().unwrap_or_default();
        let matches = verify_password(&request.password, stored).unwrap_or_else(|e| {
            warn!("Stored password for {} is not a valid hash: {}", email, e);
            false
        });
        if !matches {
            return Err(AuthError::InvalidCredentials);
        }

        let user_id = shared_models::ids::value_to_id(&user["id"])
            .ok_or_else(|| AuthError::Store(anyhow::anyhow!("User row without id")))?;

        let issued = Utc::now();
        let expires = issued + Duration::minutes(self.token_ttl_minutes);
        let claims = JwtClaims {
            sub: user_id.clone(),
            exp: Some(expires.timestamp() as u64),
            email: Some(email.clone()),
            role: shared_models::ids::value_to_id(&user["rol_id"]),
            iat: Some(issued.timestamp() as u64),
        };
        let access_token = create_token(&claims, &self.jwt_secret).map_err(AuthError::Token)?;

        info!("User {} logged in", user_id);

        Ok(LoginResponse {
            message: "Login exitoso".to_string(),
            access_token,
            token_expiration: expires.timestamp_millis(),
            user: without_password(user),
        })
    }

    pub async fn create_user(&self, request: CreateUserRequest) -> Result<Value, AuthError> {
        let email = normalize_email(&request.email)?;
        let nombre = non_empty(&request.nombre, "nombre")?;
        let rol_id = non_empty(&request.rol_id, "rol_id")?;
        let sucursal_id = non_empty(&request.sucursal_id, "sucursal_id")?;
        non_empty(&request.password, "password")?;

        let foto_url = match request.foto.as_deref().filter(|f| !f.trim().is_empty()) {
            Some(encoded) => {
                let photo = decode_photo(encoded, request.foto_nombre.as_deref())?;
                let original_name = request
                    .foto_nombre
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .unwrap_or("foto");
                let object_name = format!("{}_{}", Uuid::new_v4(), urlencoding::encode(original_name));

                let url = self
                    .supabase
                    .upload_object(PHOTO_BUCKET, &object_name, photo.bytes, &photo.content_type, None)
                    .await
                    .map_err(AuthError::Store)?;
                Some(url)
            }
            None => None,
        };

        let hashed = hash_password(&request.password).map_err(|e| AuthError::Hashing(e.to_string()))?;

        let row = self
            .insert_user(json!({
                "nombre": nombre,
                "email": email,
                "password": hashed,
                "rol_id": rol_id,
                "sucursal_id": sucursal_id,
                "telefono": request.telefono.unwrap_or_default(),
                "foto_url": foto_url,
                "fecha_creacion": Utc::now().to_rfc3339(),
            }))
            .await?;

        info!("Created user {} with role {}", email, rol_id);
        Ok(without_password(row))
    }
}
