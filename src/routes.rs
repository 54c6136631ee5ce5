use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::handlers::generate::generate;
use crate::handlers::health::health;
use crate::handlers::history::{get_recipe, list_dates, list_recipes};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/api/history/dates", get(list_dates))
        .route("/api/history/recipes/:date", get(list_recipes))
        .route("/api/history/recipe/:date/:filename", get(get_recipe))
        .route("/api/generate", post(generate))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
