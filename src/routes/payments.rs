use axum::{Extension, extract::State, response::IntoResponse};
use utoipa_axum::router::OpenApiRouter;

use super::AppJson;
use crate::{
    app_error::{AppError, ErrorResponse, StdResponse},
    app_state::AppState,
    middleware,
    service::{
        TenantContext,
        payments::{CompletePaymentRequest, CompletionView},
    },
};

pub fn routes_with_openapi(state: &AppState) -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/payments",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(complete_payment))
            .route_layer(axum::middleware::from_fn(middleware::require_take_payments))
            .route_layer(axum::middleware::from_fn_with_state(
                state.clone(),
                middleware::authenticate,
            )),
    )
}

/// Apply the tip, capture the payment and close the order.
#[utoipa::path(
    post,
    path = "/complete",
    tags = ["Payments"],
    security(("bearerAuth" = [])),
    request_body = CompletePaymentRequest,
    responses(
        (status = 200, description = "Payment completed", body = StdResponse<CompletionView, String>),
        (status = 404, description = "Payment not found", body = ErrorResponse),
        (status = 409, description = "Payment already settled", body = ErrorResponse),
        (status = 502, description = "Square could not complete the payment", body = ErrorResponse)
    )
)]
async fn complete_payment(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    AppJson(payload): AppJson<CompletePaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let completion = state.payments.complete(&tenant, payload).await?;

    Ok(StdResponse {
        data: Some(completion),
        message: Some("Payment completed successfully"),
    })
}
