use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub nombre: String,
    pub email: String,
    pub password: String,
    /// Role id; the patient role when absent.
    #[serde(default)]
    pub rol: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Staff or patient account created from the back office, optionally with a photo.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub nombre: String,
    pub email: String,
    pub password: String,
    pub rol_id: String,
    pub sucursal_id: String,
    #[serde(default)]
    pub telefono: Option<String>,
    /// Base64 image, plain or as a `data:<mime>;base64,` URL.
    #[serde(default)]
    pub foto: Option<String>,
    #[serde(default)]
    pub foto_nombre: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub access_token: String,
    /// Expiry as epoch milliseconds.
    pub token_expiration: i64,
    pub user: Value,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Credenciales no válidas")]
    InvalidCredentials,

    #[error("El usuario ya existe")]
    DuplicateEmail,

    #[error("Correo electrónico inválido: {0}")]
    InvalidEmail(String),

    #[error("Falta el campo obligatorio: {0}")]
    MissingField(&'static str),

    #[error("La foto no es una imagen base64 válida")]
    InvalidPhoto,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Token issue failed: {0}")]
    Token(String),

    #[error("Store error: {0}")]
    Store(#[source] anyhow::Error),
}
