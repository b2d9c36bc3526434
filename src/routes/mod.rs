pub mod accounts;
pub mod orders;
pub mod payments;

use axum::{Router, extract::FromRequest};
use tower_http::trace::TraceLayer;
use utoipa_axum::router::OpenApiRouter;

use crate::{app_error::AppError, app_state::AppState, swagger};

/// JSON body extractor whose rejections use the service error format.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

pub fn routes_with_openapi(state: &AppState) -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/api/v1",
        accounts::routes_with_openapi(state)
            .merge(orders::routes_with_openapi(state))
            .merge(payments::routes_with_openapi(state)),
    )
}

/// Full application: API routes, Swagger UI and HTTP tracing.
pub fn app(state: AppState) -> Router {
    let routes = routes_with_openapi(&state);

    let mut openapi = routes.get_openapi().clone();
    openapi.info = utoipa::openapi::InfoBuilder::new()
        .title("POS OrderService API")
        .version("1.0.0")
        .build();
    let swagger_ui = swagger::create_swagger_ui(openapi);

    Router::new()
        .merge(routes)
        .merge(swagger_ui)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
