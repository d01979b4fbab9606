use std::sync::Arc;
use chrono::{Datelike, Duration, Local, NaiveDate, Utc, Weekday};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub const DOCTOR_ROLE_ID: &str = "5770e7d5-c449-4094-bbe1-fd52ee6fe75f";
pub const PATIENT_ROLE_ID: &str = "abc856dd-ba5f-41ae-8dea-27aa29f8ab47";

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub slot_minutes: i64,
    pub horizon_days: i64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            slot_minutes: 30,
            horizon_days: 14,
        }
    }
}

impl TestConfig {
    pub fn with_store(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            token_ttl_minutes: 60,
            doctor_role_id: DOCTOR_ROLE_ID.to_string(),
            patient_role_id: PATIENT_ROLE_ID.to_string(),
            slot_minutes: self.slot_minutes,
            horizon_days: self.horizon_days,
            calendar_locale: "es".to_string(),
            cors_origins: vec!["http://localhost:5173".to_string()],
            port: 3000,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: PATIENT_ROLE_ID.to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, DOCTOR_ROLE_ID)
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, PATIENT_ROLE_ID)
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }
}

pub struct DateFixtures;

impl DateFixtures {
    pub fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    /// Next date with the given weekday, strictly after today.
    pub fn next(weekday: Weekday) -> NaiveDate {
        let today = Self::today();
        let ahead = (7 + weekday.num_days_from_monday() as i64
            - today.weekday().num_days_from_monday() as i64) % 7;
        today + Duration::days(if ahead == 0 { 7 } else { ahead })
    }

    pub fn iso(date: NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn usuario_response(id: &str, nombre: &str, email: &str, rol_id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "nombre": nombre,
            "email": email,
            "rol_id": rol_id,
            "sucursal_id": "suc-centro",
            "telefono": "5550000",
            "foto_url": null
        })
    }

    pub fn sucursal_response(id: &str, nombre: &str) -> serde_json::Value {
        json!({
            "id": id,
            "nombre": nombre,
            "direccion": "Av. Principal 123"
        })
    }

    pub fn horario_response(
        medico_id: &str,
        sucursal_id: &str,
        dia_semana: &str,
        hora_inicio: &str,
        hora_fin: &str,
    ) -> serde_json::Value {
        json!({
            "id": format!("hor-{}-{}", dia_semana, hora_inicio),
            "medico_id": medico_id,
            "sucursal_id": sucursal_id,
            "dia_semana": dia_semana,
            "hora_inicio": hora_inicio,
            "hora_fin": hora_fin
        })
    }

    pub fn cita_response(
        id: &str,
        paciente_id: &str,
        medico_id: &str,
        sucursal_id: &str,
        fecha: &str,
        hora: &str,
        estado: &str,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "paciente_id": paciente_id,
            "medico_id": medico_id,
            "sucursal_id": sucursal_id,
            "fecha": fecha,
            "hora": hora,
            "estado": estado,
            "comentarios": ""
        })
    }
}
