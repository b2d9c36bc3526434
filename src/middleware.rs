//! Request gates: bearer token, tenant existence and role allow-lists.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::{
    app_error::AppError, app_state::AppState, models::Permission, service::TenantContext,
};

/// Verifies the bearer token, confirms the tenant and user still exist and
/// stores the resulting `TenantContext` in the request extensions.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid Authorization format".into()))?;

    let claims = state.tokens.verify(token)?;

    let restaurant = state
        .store
        .find_restaurant(claims.restaurant_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Unknown restaurant".into()))?;
    let user = state
        .store
        .find_user(restaurant.id, claims.user_id)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| AppError::Unauthorized("User is not active".into()))?;

    request.extensions_mut().insert(TenantContext {
        restaurant,
        user_id: user.id,
        email: user.email,
        role: user.role,
    });

    Ok(next.run(request).await)
}

async fn require(permission: Permission, request: Request, next: Next) -> Result<Response, AppError> {
    let tenant = request
        .extensions()
        .get::<TenantContext>()
        .ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))?;

    if !tenant.can(permission) {
        tracing::warn!(
            user_id = tenant.user_id,
            role = %tenant.role,
            ?permission,
            "Permission denied"
        );
        return Err(AppError::ForbiddenResource(
            "Insufficient permissions".into(),
        ));
    }

    Ok(next.run(request).await)
}

pub async fn require_manage_users(request: Request, next: Next) -> Result<Response, AppError> {
    require(Permission::ManageUsers, request, next).await
}

pub async fn require_take_orders(request: Request, next: Next) -> Result<Response, AppError> {
    require(Permission::TakeOrders, request, next).await
}

pub async fn require_take_payments(request: Request, next: Next) -> Result<Response, AppError> {
    require(Permission::TakePayments, request, next).await
}
