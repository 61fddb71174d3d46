//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the REST endpoints under `/api`. Handlers decode the
//! request, resolve the bearer session through [`auth::AuthUser`] and hand
//! off to `services`; every failure renders through `ApiError`.

pub mod admin;
pub mod auth;
pub mod chat;
pub mod exercises;
pub mod extract;
pub mod nutrition;
pub mod users;

use axum::Router;
use axum::response::Json;
use axum::routing::{get, post};
use contract::{Health, paths};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The full API router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(paths::REGISTER, post(auth::register))
        .route(paths::LOGIN, post(auth::login))
        .route(paths::LOGOUT, post(auth::logout))
        .route(paths::USER, get(users::get_user).put(users::update_user))
        .route(paths::USER_PROFILE, get(users::get_profile).put(users::update_profile))
        .route(paths::EXERCISES, get(exercises::list).post(exercises::add))
        .route(paths::CHAT, post(chat::chat))
        .route(paths::CHAT_HISTORY, get(chat::history))
        .route(paths::AI_PLAN, post(chat::plan))
        .route(paths::NUTRITION_PLANS, get(nutrition::list).post(nutrition::add))
        .route(paths::ADMIN_CHECK, get(admin::check_admin))
        .route(paths::ADMIN_EXERCISES, get(admin::list_exercises).post(admin::create_exercise))
        .route(paths::ADMIN_EXERCISES_BULK, post(admin::bulk_create))
        .route(
            paths::ADMIN_EXERCISE,
            get(admin::get_exercise).put(admin::update_exercise).delete(admin::delete_exercise),
        )
        .route(paths::HEALTH, get(health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health() -> Json<Health> {
    Json(Health { status: "healthy".into() })
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
