use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use anyhow::Result;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use shared_models::ids::value_to_id;

use crate::supabase::SupabaseClient;

/// PostgREST `in.(...)` filter over a set of identifiers.
pub fn in_filter<'a>(ids: impl IntoIterator<Item = &'a String>) -> String {
    let encoded: Vec<String> = ids
        .into_iter()
        .map(|id| urlencoding::encode(id).into_owned())
        .collect();
    format!("in.({})", encoded.join(","))
}

/// Batch id -> row lookups, one query per table per request.
pub struct NameDirectory {
    supabase: Arc<SupabaseClient>,
}

impl NameDirectory {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn rows_by_id(
        &self,
        table: &str,
        columns: &str,
        ids: &BTreeSet<String>,
    ) -> Result<HashMap<String, Value>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        debug!("Resolving {} ids from {}", ids.len(), table);

        let path = format!("/rest/v1/{}?select={}&id={}", table, columns, in_filter(ids));
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| value_to_id(&row["id"]).map(|id| (id, row)))
            .collect())
    }

    pub async fn names(&self, table: &str, ids: &BTreeSet<String>) -> Result<HashMap<String, String>> {
        let rows = self.rows_by_id(table, "id,nombre", ids).await?;

        Ok(rows
            .into_iter()
            .filter_map(|(id, row)| row["nombre"].as_str().map(|name| (id, name.to_string())))
            .collect())
    }

    pub async fn user_names(&self, ids: &BTreeSet<String>) -> Result<HashMap<String, String>> {
        self.names("usuarios", ids).await
    }

    pub async fn branch_names(&self, ids: &BTreeSet<String>) -> Result<HashMap<String, String>> {
        self.names("sucursales", ids).await
    }
}
