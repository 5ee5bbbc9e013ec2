mod api;
mod error;
mod state;
mod types;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use self::state::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::upload_handler,
        api::list_images_handler,
        api::delete_image_handler,
        api::save_result_handler,
        api::list_results_handler,
        api::track_failure_handler,
        api::swap_handler,
        api::metrics_handler,
    ),
    components(schemas(types::UploadForm, types::SaveResultForm, types::SwapForm,))
)]
pub struct ApiDoc;

/// 构建API服务器，未匹配的路径按静态资源处理
pub fn create_app(state: Arc<AppState>, body_limit: usize) -> Router {
    let public = ServeDir::new(state.store.public_dir());
    Router::new()
        .route("/api/upload", post(api::upload_handler))
        .route("/api/images", get(api::list_images_handler))
        .route("/api/images/{filename}", delete(api::delete_image_handler))
        .route("/api/save-result", post(api::save_result_handler))
        .route("/api/results", get(api::list_results_handler))
        .route("/api/track-failure", post(api::track_failure_handler))
        .route("/api/swap", post(api::swap_handler))
        .route("/metrics", get(api::metrics_handler))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback_service(public)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
