use anyhow::Result;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

/// Reference tables exposed as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogTable {
    Roles,
    Branches,
}

impl CatalogTable {
    pub fn table_name(&self) -> &'static str {
        match self {
            CatalogTable::Roles => "roles",
            CatalogTable::Branches => "sucursales",
        }
    }
}

pub struct CatalogService {
    supabase: SupabaseClient,
}

impl CatalogService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn list(&self, table: CatalogTable) -> Result<Vec<Value>> {
        let path = format!("/rest/v1/{}?select=*", table.table_name());

        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;
        debug!("Loaded {} rows from {}", rows.len(), table.table_name());

        Ok(rows)
    }
}
