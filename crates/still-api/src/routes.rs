use std::time::Duration;

use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{health, moods, urges, users};

/// Every endpoint, mounted both at the root and under `/api`.
pub fn router(state: AppState) -> Router {
    let api = api_routes();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(86_400));

    Router::new()
        .route("/", get(health::root))
        .merge(api.clone())
        .nest("/api", api)
        .fallback(health::not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/urges", get(urges::get_urges))
        .route("/urges/delay", post(urges::delay_urge))
        .route("/urges/update", post(urges::update_urge_status))
        .route("/urges/stats", get(urges::get_urge_stats))
        .route("/urges/emotion-map", get(urges::get_emotion_map))
        .route("/users", get(users::get_user_by_device_id))
        .route("/users/register", post(users::register_device))
        .route("/moods", post(moods::create_mood).get(moods::get_moods))
        .route("/moods/user/{user_id}", get(moods::get_user_moods))
        .route(
            "/moods/{mood_id}",
            get(moods::get_mood).put(moods::update_mood).delete(moods::delete_mood),
        )
}
