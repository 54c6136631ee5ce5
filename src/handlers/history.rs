use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;
use tracing::error;

use crate::error::{AppError, Result};
use crate::history::{HistoryError, RecipeLog};
use crate::state::AppState;

/// Runs a store lookup on the blocking pool.
async fn with_log<T, F>(state: &AppState, lookup: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn RecipeLog) -> std::result::Result<T, HistoryError> + Send + 'static,
{
    let log = state.log.clone();
    let outcome = tokio::task::spawn_blocking(move || lookup(log.as_ref()))
        .await
        .map_err(|err| {
            error!("History lookup task failed: {err}");
            AppError::Internal(format!("History lookup failed: {err}"))
        })?;
    outcome.map_err(AppError::from)
}

pub async fn list_dates(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    let dates = with_log(&state, |log| log.list_dates()).await?;
    Ok(Json(dates))
}

pub async fn list_recipes(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<Vec<String>>> {
    let names = with_log(&state, move |log| log.list_entries(&date)).await?;
    Ok(Json(names))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    Path((date, filename)): Path<(String, String)>,
) -> Result<Json<Value>> {
    let content = with_log(&state, move |log| log.get(&date, &filename)).await?;
    Ok(Json(content))
}
