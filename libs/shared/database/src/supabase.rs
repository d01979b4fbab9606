use anyhow::{Result, anyhow};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

/// Failures reported by the hosted data platform, carried inside `anyhow::Error`
/// so callers can `downcast_ref` when the kind matters (e.g. uniqueness conflicts).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SupabaseError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },
}

impl SupabaseError {
    fn from_status(status: StatusCode, body: String) -> Self {
        match status.as_u16() {
            401 | 403 => SupabaseError::Auth(body),
            404 => SupabaseError::NotFound(body),
            409 => SupabaseError::Conflict(body),
            code => SupabaseError::Api { status: code, body },
        }
    }

    /// True when the error (or anything it wraps) is a uniqueness conflict.
    pub fn is_conflict(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<SupabaseError>(), Some(SupabaseError::Conflict(_)))
    }
}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.anon_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        // Without a user token the project key doubles as the bearer credential.
        let bearer = auth_token.unwrap_or(&self.anon_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", bearer))?,
        );

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            auth_token: Option<&str>, body: Option<Value>)
                            -> Result<T>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(&self, method: Method, path: &str,
                                         auth_token: Option<&str>, body: Option<Value>,
                                         extra_headers: Option<HeaderMap>)
                                         -> Result<T>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);
            return Err(SupabaseError::from_status(status, error_text).into());
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// PostgREST write that echoes the affected rows back.
    pub async fn request_returning(&self, method: Method, path: &str,
                                   auth_token: Option<&str>, body: Value)
                                   -> Result<Vec<Value>> {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        self.request_with_headers(method, path, auth_token, Some(body), Some(headers)).await
    }

    /// Upload raw bytes to a storage bucket and return the object's public URL.
    pub async fn upload_object(&self, bucket: &str, object_name: &str,
                               bytes: Vec<u8>, content_type: &str,
                               auth_token: Option<&str>) -> Result<String> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, object_name);
        debug!("Uploading {} bytes to {}", bytes.len(), url);

        let mut headers = self.get_headers(auth_token)?;
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type)?);

        let response = self.client.post(&url)
            .headers(headers)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("Storage upload failed ({}): {}", status, error_text);
            return Err(anyhow!(SupabaseError::from_status(status, error_text)));
        }

        Ok(self.get_public_url(bucket, object_name))
    }

    pub fn get_public_url(&self, bucket: &str, object_name: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, bucket, object_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use wiremock::{MockServer, Mock, ResponseTemplate};
    use wiremock::matchers::{method, path, header};

    fn config_for(url: &str) -> AppConfig {
        AppConfig {
            supabase_url: url.to_string(),
            supabase_anon_key: "anon-key".to_string(),
            jwt_secret: "secret".to_string(),
            token_ttl_minutes: 60,
            doctor_role_id: String::new(),
            patient_role_id: String::new(),
            slot_minutes: 30,
            horizon_days: 14,
            calendar_locale: "es".to_string(),
            cors_origins: vec![],
            port: 3000,
        }
    }

    #[tokio::test]
    async fn request_sends_project_key_as_bearer_when_no_token_given() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/roles"))
            .and(header("apikey", "anon-key"))
            .and(header("authorization", "Bearer anon-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "r1"}])))
            .mount(&server)
            .await;

        let client = SupabaseClient::new(&config_for(&server.uri()));
        let rows: Vec<Value> = client.request(Method::GET, "/rest/v1/roles", None, None).await.unwrap();

        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn conflict_status_is_downcastable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/citas"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({"code": "23505"})))
            .mount(&server)
            .await;

        let client = SupabaseClient::new(&config_for(&server.uri()));
        let err = client
            .request_returning(Method::POST, "/rest/v1/citas", None, json!({}))
            .await
            .unwrap_err();

        assert!(SupabaseError::is_conflict(&err));
        assert_matches!(err.downcast_ref::<SupabaseError>(), Some(SupabaseError::Conflict(_)));
    }

    #[tokio::test]
    async fn server_errors_keep_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/sucursales"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let client = SupabaseClient::new(&config_for(&server.uri()));
        let err = client
            .request::<Vec<Value>>(Method::GET, "/rest/v1/sucursales", None, None)
            .await
            .unwrap_err();

        assert_eq!(
            err.downcast_ref::<SupabaseError>(),
            Some(&SupabaseError::Api { status: 503, body: "down".to_string() })
        );
    }

    #[test]
    fn public_url_points_at_public_bucket_path() {
        let client = SupabaseClient::new(&config_for("http://store.local/"));
        assert_eq!(
            client.get_public_url("usuarios", "abc_foto.png"),
            "http://store.local/storage/v1/object/public/usuarios/abc_foto.png"
        );
    }
}
