use std::env;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_SLOT_MINUTES: i64 = 30;
pub const DEFAULT_HORIZON_DAYS: i64 = 14;
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 60;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    pub doctor_role_id: String,
    pub patient_role_id: String,
    pub slot_minutes: i64,
    pub horizon_days: i64,
    pub calendar_locale: String,
    pub cors_origins: Vec<String>,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            token_ttl_minutes: parse_or("TOKEN_TTL_MINUTES", DEFAULT_TOKEN_TTL_MINUTES),
            doctor_role_id: env::var("DOCTOR_ROLE_ID")
                .unwrap_or_else(|_| {
                    warn!("DOCTOR_ROLE_ID not set, doctor listings will be empty");
                    String::new()
                }),
            patient_role_id: env::var("PATIENT_ROLE_ID")
                .unwrap_or_else(|_| {
                    warn!("PATIENT_ROLE_ID not set, patient listings will be empty");
                    String::new()
                }),
            slot_minutes: positive_or("SLOT_MINUTES", DEFAULT_SLOT_MINUTES),
            horizon_days: positive_or("HORIZON_DAYS", DEFAULT_HORIZON_DAYS),
            calendar_locale: env::var("CALENDAR_LOCALE").unwrap_or_else(|_| "es".to_string()),
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:5173".to_string())
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            port: parse_or("PORT", 3000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.jwt_secret.is_empty()
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

// Slot walks and horizons must advance; zero or negative values fall back.
fn positive_or(key: &str, default: i64) -> i64 {
    let value = parse_or(key, default);
    if value <= 0 {
        warn!("{} must be positive, using default {}", key, default);
        return default;
    }
    value
}
