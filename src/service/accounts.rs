//! Tenant registration, login and user management.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::TenantContext;
use crate::{
    app_error::AppError,
    auth::{TokenIssuer, hash_password, verify_password},
    gateway::{GatewayCredential, PaymentGateway},
    models::{CreateRestaurantEntity, RestaurantView, Role, UserEntity},
    store::{NewUser, Store, StoreError},
};

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct RegisterRestaurantRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    pub square_app_id: String,
    #[validate(length(min = 1))]
    pub square_access_token: String,
    #[validate(length(min = 3, max = 100))]
    pub admin_username: String,
    #[validate(email)]
    pub admin_email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub admin_password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct LoginRequest {
    pub restaurant_id: i32,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct RegisterUserRequest {
    #[validate(length(min = 3, max = 100))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegistrationView {
    pub restaurant: RestaurantView,
    pub admin: UserEntity,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginView {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub restaurant_name: String,
    pub user: UserEntity,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileView {
    pub user: UserEntity,
    pub restaurant: RestaurantView,
}

pub struct AccountService {
    store: Arc<dyn Store>,
    gateway: Arc<dyn PaymentGateway>,
    tokens: Arc<TokenIssuer>,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Arc<dyn PaymentGateway>,
        tokens: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            store,
            gateway,
            tokens,
        }
    }

    /// Creates a restaurant and its first admin. The credential is checked
    /// against the gateway before anything is written.
    pub async fn register_restaurant(
        &self,
        request: RegisterRestaurantRequest,
    ) -> Result<RegistrationView, AppError> {
        request.validate()?;

        if self
            .store
            .find_restaurant_by_app_id(&request.square_app_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "A restaurant with this Square application id already exists".into(),
            ));
        }

        let credential = GatewayCredential::new(request.square_access_token.clone());
        let location = self.gateway.resolve_location(&credential).await?;

        let restaurant = CreateRestaurantEntity {
            name: request.name,
            square_app_id: request.square_app_id,
            square_token: request.square_access_token,
            location_id: location.id,
            merchant_id: location.merchant_id.unwrap_or_default(),
        };
        let admin = NewUser {
            username: request.admin_username,
            email: request.admin_email.to_lowercase(),
            password_hash: hash_password(&request.admin_password)?,
            role: Role::Admin,
        };

        let (restaurant, admin) = self
            .store
            .create_restaurant_with_admin(restaurant, admin)
            .await
            .map_err(|err| match err {
                StoreError::UniqueViolation(_) => AppError::Conflict(
                    "A restaurant with this Square application id already exists".into(),
                ),
                other => AppError::Persistence(other),
            })?;

        tracing::info!(
            restaurant_id = restaurant.id,
            location_id = %restaurant.location_id,
            "Restaurant registered"
        );
        Ok(RegistrationView {
            restaurant: RestaurantView::from(&restaurant),
            admin,
        })
    }

    /// Unknown email, wrong password and inactive users are indistinguishable.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginView, AppError> {
        request.validate()?;
        let rejected = || AppError::Unauthorized("Invalid credentials".into());

        let restaurant = self
            .store
            .find_restaurant(request.restaurant_id)
            .await?
            .ok_or_else(rejected)?;
        let user = self
            .store
            .find_user_by_email(restaurant.id, &request.email.to_lowercase())
            .await?
            .ok_or_else(rejected)?;

        if !user.is_active || !verify_password(&request.password, &user.password_hash) {
            tracing::warn!(restaurant_id = restaurant.id, "Rejected login attempt");
            return Err(rejected());
        }

        let issued = self.tokens.issue(&user)?;
        tracing::info!(user_id = user.id, restaurant_id = restaurant.id, "User logged in");
        Ok(LoginView {
            token: issued.token,
            expires_at: issued.expires_at,
            restaurant_name: restaurant.name,
            user,
        })
    }

    /// The new user always belongs to the caller's restaurant.
    pub async fn register_user(
        &self,
        tenant: &TenantContext,
        request: RegisterUserRequest,
    ) -> Result<UserEntity, AppError> {
        request.validate()?;

        let email = request.email.to_lowercase();
        if self
            .store
            .find_user_by_email(tenant.restaurant_id(), &email)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "A user with this email already exists".into(),
            ));
        }

        let user = NewUser {
            username: request.username,
            email,
            password_hash: hash_password(&request.password)?,
            role: request.role,
        };
        let user = self
            .store
            .create_user(tenant.restaurant_id(), user)
            .await
            .map_err(|err| match err {
                StoreError::UniqueViolation(_) => {
                    AppError::Conflict("A user with this email already exists".into())
                }
                other => AppError::Persistence(other),
            })?;

        tracing::info!(
            user_id = user.id,
            restaurant_id = user.restaurant_id,
            role = %user.role,
            created_by = tenant.user_id,
            "User registered"
        );
        Ok(user)
    }

    pub async fn profile(&self, tenant: &TenantContext) -> Result<ProfileView, AppError> {
        let user = self
            .store
            .find_user(tenant.restaurant_id(), tenant.user_id)
            .await?
            .ok_or(AppError::NotFound)?;
        Ok(ProfileView {
            user,
            restaurant: RestaurantView::from(&tenant.restaurant),
        })
    }
}
