use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::error::{AppError, Result};
use crate::generator::{generate_recipe, GenerateRequest};
use crate::recipe::Recipe;
use crate::state::AppState;
use crate::utils::timing::RequestTimer;

pub async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<Recipe>> {
    let Json(request) = payload?;
    let image_count = request.images.as_ref().map_or(0, Vec::len);
    let mut timer =
        RequestTimer::start("/api/generate", Some(request.prompt.as_str()), image_count);

    match generate_recipe(&state.config, state.log.clone(), request).await {
        Ok(recipe) => {
            timer.complete("success", Some(recipe.vibe_match.as_str()));
            Ok(Json(recipe))
        }
        Err(err) => {
            let err = AppError::from(err);
            timer.complete("error", Some(err.to_string().as_str()));
            Err(err)
        }
    }
}
