use axum::{
    Extension,
    extract::{Path, State},
    response::IntoResponse,
};
use utoipa_axum::router::OpenApiRouter;

use super::AppJson;
use crate::{
    app_error::{AppError, ErrorResponse, StdResponse},
    app_state::AppState,
    middleware,
    models::{OrderDetail, OrderEntity},
    service::{
        TenantContext,
        orders::CreateOrderRequest,
        payments::{CreatePaymentIntentRequest, PaymentIntentView},
    },
};

pub fn routes_with_openapi(state: &AppState) -> OpenApiRouter<AppState> {
    let reads = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(get_orders_by_table))
        .routes(utoipa_axum::routes!(get_order));

    let writes = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(create_order))
        .routes(utoipa_axum::routes!(cancel_order))
        .route_layer(axum::middleware::from_fn(middleware::require_take_orders));

    let payments = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(create_payment_intent))
        .route_layer(axum::middleware::from_fn(middleware::require_take_payments));

    OpenApiRouter::new().nest(
        "/orders",
        reads
            .merge(writes)
            .merge(payments)
            .route_layer(axum::middleware::from_fn_with_state(
                state.clone(),
                middleware::authenticate,
            )),
    )
}

/// Create an order on Square and mirror it locally.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order created", body = StdResponse<OrderDetail, String>),
        (status = 400, description = "Invalid order", body = ErrorResponse),
        (status = 502, description = "Square rejected the order", body = ErrorResponse)
    )
)]
async fn create_order(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    AppJson(payload): AppJson<CreateOrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.orders.create(&tenant, payload).await?;

    Ok(StdResponse {
        data: Some(order),
        message: Some("Order created successfully"),
    })
}

/// List the orders of a table, newest first.
#[utoipa::path(
    get,
    path = "/table/{table_number}",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(
        ("table_number" = i32, Path, description = "Table number")
    ),
    responses(
        (status = 200, description = "List table orders", body = StdResponse<Vec<OrderEntity>, String>)
    )
)]
async fn get_orders_by_table(
    Path(table_number): Path<i32>,
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
) -> Result<impl IntoResponse, AppError> {
    let orders = state.orders.get_by_table(&tenant, table_number).await?;

    Ok(StdResponse {
        data: Some(orders),
        message: Some("Get table orders successfully"),
    })
}

/// Fetch an order with its items, discounts and modifiers.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Order ID to fetch")
    ),
    responses(
        (status = 200, description = "Get order successfully", body = StdResponse<OrderDetail, String>),
        (status = 404, description = "Order not found", body = ErrorResponse)
    )
)]
async fn get_order(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.orders.get_by_id(&tenant, id).await?;

    Ok(StdResponse {
        data: Some(order),
        message: Some("Get order successfully"),
    })
}

/// Cancel an open order that has no pending payment.
#[utoipa::path(
    post,
    path = "/{id}/cancel",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Order ID to cancel")
    ),
    responses(
        (status = 200, description = "Order cancelled", body = StdResponse<OrderEntity, String>),
        (status = 404, description = "Order not found", body = ErrorResponse),
        (status = 409, description = "Order cannot be cancelled", body = ErrorResponse)
    )
)]
async fn cancel_order(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.orders.cancel(&tenant, id).await?;

    Ok(StdResponse {
        data: Some(order),
        message: Some("Order cancelled successfully"),
    })
}

/// Authorize a payment for an order without capturing it.
#[utoipa::path(
    post,
    path = "/{id}/payment-intent",
    tags = ["Payments"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Order ID to pay")
    ),
    request_body = CreatePaymentIntentRequest,
    responses(
        (status = 200, description = "Payment intent created", body = StdResponse<PaymentIntentView, String>),
        (status = 404, description = "Order not found", body = ErrorResponse),
        (status = 409, description = "Order already has a pending payment", body = ErrorResponse),
        (status = 502, description = "Square rejected the payment", body = ErrorResponse)
    )
)]
async fn create_payment_intent(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    AppJson(payload): AppJson<CreatePaymentIntentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let intent = state.payments.create_intent(&tenant, id, payload).await?;

    Ok(StdResponse {
        data: Some(intent),
        message: Some("Payment intent created on Square, ready for processing"),
    })
}
