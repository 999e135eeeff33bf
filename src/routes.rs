use axum::{
    http::{HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post, put, MethodRouter},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::Role;
use crate::config::Environment;
use crate::error::ApiError;
use crate::handlers::{auth, bootcamps, courses, health, reviews, users};
use crate::middleware::{authorize, protect, rate_limit, AllowedRoles};
use crate::state::AppState;

const PUBLISHERS: &[Role] = &[Role::Publisher, Role::Admin];
const REVIEWERS: &[Role] = &[Role::User, Role::Admin];
const ADMINS: &[Role] = &[Role::Admin];

/// Full application router with global middleware.
pub fn app(state: AppState) -> Router {
    let router = Router::new()
        // Public
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .nest("/api/v1/auth", auth_routes(&state))
        .nest("/api/v1/bootcamps", bootcamp_routes(&state))
        .nest("/api/v1/courses", course_routes(&state))
        .nest("/api/v1/reviews", review_routes(&state))
        .nest("/api/v1/users", user_routes(&state))
        .fallback(|| async { ApiError::not_found("Route not found") })
        // Global middleware
        .layer(from_fn_with_state(state.clone(), rate_limit))
        .layer(cors_layer(&state));

    let router = if state.config.api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };

    router.with_state(state)
}

/// Requires a valid bearer token.
fn protected(route: MethodRouter<AppState>, state: &AppState) -> MethodRouter<AppState> {
    route.route_layer(from_fn_with_state(state.clone(), protect))
}

/// Requires a valid bearer token and one of `roles`.
fn guarded(route: MethodRouter<AppState>, state: &AppState, roles: &'static [Role]) -> MethodRouter<AppState> {
    protected(route.route_layer(from_fn_with_state(AllowedRoles(roles), authorize)), state)
}

fn auth_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/me", protected(get(auth::me), state))
        .route("/updatedetails", protected(put(auth::update_details), state))
        .route("/updatepassword", protected(put(auth::update_password), state))
        .route("/forgotpassword", post(auth::forgot_password))
        .route("/resetpassword/:resettoken", put(auth::reset_password))
}

fn bootcamp_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/radius/:zipcode/:distance", get(bootcamps::within_radius))
        .route(
            "/",
            get(bootcamps::list).merge(guarded(post(bootcamps::create), state, PUBLISHERS)),
        )
        .route(
            "/:id",
            get(bootcamps::get).merge(guarded(
                put(bootcamps::update).delete(bootcamps::delete),
                state,
                PUBLISHERS,
            )),
        )
        .route(
            "/:id/courses",
            get(courses::list_for_bootcamp).merge(guarded(post(courses::create), state, PUBLISHERS)),
        )
        .route(
            "/:id/reviews",
            get(reviews::list_for_bootcamp).merge(guarded(post(reviews::create), state, REVIEWERS)),
        )
}

fn course_routes(state: &AppState) -> Router<AppState> {
    Router::new().route("/", get(courses::list)).route(
        "/:id",
        get(courses::get).merge(guarded(put(courses::update).delete(courses::delete), state, PUBLISHERS)),
    )
}

fn review_routes(state: &AppState) -> Router<AppState> {
    Router::new().route("/", get(reviews::list)).route(
        "/:id",
        get(reviews::get).merge(guarded(put(reviews::update).delete(reviews::delete), state, REVIEWERS)),
    )
}

fn user_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(users::list).post(users::create))
        .route("/:id", get(users::get).put(users::update).delete(users::delete))
        .route_layer(from_fn_with_state(AllowedRoles(ADMINS), authorize))
        .route_layer(from_fn_with_state(state.clone(), protect))
}

/// Permissive in development, configured origins elsewhere.
fn cors_layer(state: &AppState) -> CorsLayer {
    if state.config.environment == Environment::Development {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = state
        .config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}
