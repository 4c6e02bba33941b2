// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, blog, image, post, site, user},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Public reads and the signup/login endpoints need no session.
/// * Everything else sits behind `auth_middleware`, which answers 401
///   before the handler runs.
/// * Applies global middleware (Trace, CORS, body limit).
pub fn create_router(state: AppState) -> Router {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);
    match state.config.base_url.parse::<HeaderValue>() {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(_) => tracing::warn!("BASE_URL is not a valid origin, CORS stays closed"),
    }

    let require_session = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let public_routes = Router::new()
        .route("/config", get(site::public_config))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/userAvailability", get(auth::user_availability))
        .route("/blog/getAllBlogs", get(blog::list_blogs))
        .route("/blog/exists", post(blog::blog_exists))
        .route("/blog/getData", post(blog::get_blog))
        .route("/blog/posts/getData", post(post::get_post))
        .route("/blog/posts/getPreviews", post(post::get_previews))
        .route("/blog/posts/getRecent", post(post::get_previews))
        .route("/blog/posts/length", post(post::post_count))
        .route("/blog/posts/publishedLength", post(post::published_count))
        .route("/blog/posts/images/get", post(image::get_image))
        .route("/user/getWebsite", get(user::get_website));

    let protected_routes = Router::new()
        .route("/blog/create", post(blog::create_blog))
        .route("/blog/update", post(blog::update_blog))
        .route("/blog/posts/create", post(post::create_post))
        .route("/blog/posts/update", post(post::update_post))
        .route("/blog/posts/delete", post(post::delete_post))
        .route(
            "/blog/posts/getUnpublishedPreviews",
            post(post::get_unpublished_previews),
        )
        .route("/blog/posts/unpublishedLength", post(post::unpublished_count))
        .route("/blog/posts/images/create", post(image::create_image))
        .route("/blog/posts/images/update", post(image::update_image))
        .route("/blog/posts/images/delete", post(image::delete_image))
        .route("/user/update", post(user::update_user))
        .route("/user/delete", post(user::delete_user))
        .route("/admin/getAllUsers", get(admin::list_users))
        .route("/admin/update", post(admin::toggle_admin))
        .route("/admin/updateFrozenStatus", post(admin::toggle_frozen))
        .layer(require_session);

    let body_limit = state.config.max_body_bytes;

    Router::new()
        .nest("/api", public_routes.merge(protected_routes))
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}
