use axum::{Extension, extract::State, response::IntoResponse};
use utoipa_axum::router::OpenApiRouter;

use super::AppJson;
use crate::{
    app_error::{AppError, ErrorResponse, StdResponse},
    app_state::AppState,
    middleware,
    models::UserEntity,
    service::{
        TenantContext,
        accounts::{
            LoginRequest, LoginView, ProfileView, RegisterRestaurantRequest, RegisterUserRequest,
            RegistrationView,
        },
    },
};

/// Public registration/login, the caller's profile and admin user management.
pub fn routes_with_openapi(state: &AppState) -> OpenApiRouter<AppState> {
    let public = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(register_restaurant))
        .routes(utoipa_axum::routes!(login));

    let profile = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(get_profile))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::authenticate,
        ));

    let admin = OpenApiRouter::new().nest(
        "/admin",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(register_user))
            .route_layer(axum::middleware::from_fn(middleware::require_manage_users))
            .route_layer(axum::middleware::from_fn_with_state(
                state.clone(),
                middleware::authenticate,
            )),
    );

    public.merge(profile).merge(admin)
}

/// Register a restaurant together with its first admin user.
#[utoipa::path(
    post,
    path = "/register-restaurant",
    tags = ["Accounts"],
    request_body = RegisterRestaurantRequest,
    responses(
        (status = 200, description = "Restaurant registered", body = StdResponse<RegistrationView, String>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Square application already registered", body = ErrorResponse),
        (status = 502, description = "Square rejected the credential", body = ErrorResponse)
    )
)]
async fn register_restaurant(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRestaurantRequest>,
) -> Result<impl IntoResponse, AppError> {
    let registration = state.accounts.register_restaurant(payload).await?;

    Ok(StdResponse {
        data: Some(registration),
        message: Some("Restaurant registered successfully"),
    })
}

/// Exchange credentials for a bearer token.
#[utoipa::path(
    post,
    path = "/login",
    tags = ["Accounts"],
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = StdResponse<LoginView, String>),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    )
)]
async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let login = state.accounts.login(payload).await?;

    Ok(StdResponse {
        data: Some(login),
        message: Some("Logged in successfully"),
    })
}

/// Fetch the authenticated user and their restaurant.
#[utoipa::path(
    get,
    path = "/profile",
    tags = ["Accounts"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Get profile successfully", body = StdResponse<ProfileView, String>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
async fn get_profile(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
) -> Result<impl IntoResponse, AppError> {
    let profile = state.accounts.profile(&tenant).await?;

    Ok(StdResponse {
        data: Some(profile),
        message: Some("Get profile successfully"),
    })
}

/// Create a user in the caller's restaurant. Admin only.
#[utoipa::path(
    post,
    path = "/users",
    tags = ["Accounts"],
    security(("bearerAuth" = [])),
    request_body = RegisterUserRequest,
    responses(
        (status = 200, description = "User created", body = StdResponse<UserEntity, String>),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 409, description = "Email already in use", body = ErrorResponse)
    )
)]
async fn register_user(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    AppJson(payload): AppJson<RegisterUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.accounts.register_user(&tenant, payload).await?;

    Ok(StdResponse {
        data: Some(user),
        message: Some("User created successfully"),
    })
}
