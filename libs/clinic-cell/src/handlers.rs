use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::Value;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::services::{CatalogService, CatalogTable};

async fn catalog(config: &AppConfig, table: CatalogTable) -> Result<Json<Vec<Value>>, AppError> {
    let rows = CatalogService::new(config)
        .list(table)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(rows))
}

#[axum::debug_handler]
pub async fn list_roles(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Vec<Value>>, AppError> {
    catalog(&config, CatalogTable::Roles).await
}

#[axum::debug_handler]
pub async fn list_branches(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Vec<Value>>, AppError> {
    catalog(&config, CatalogTable::Branches).await
}
