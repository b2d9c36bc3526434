//! Persistence interface for the local mirror. Every tenant-owned lookup takes
//! the restaurant id, so a row belonging to another tenant is simply absent.

mod postgres;

use async_trait::async_trait;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

use crate::models::{
    CreateOrderEntity, CreatePaymentEntity, CreateRestaurantEntity, NewOrderLine, OrderDetail,
    OrderEntity, PaymentEntity, RestaurantEntity, Role, UpdateOrderEntity, UpdatePaymentEntity,
    UserEntity,
};

pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint '{0}' violated")]
    UniqueViolation(String),
    #[error("database error: {0}")]
    Database(DieselError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                StoreError::UniqueViolation(info.constraint_name().unwrap_or("unknown").to_string())
            }
            other => StoreError::Database(other),
        }
    }
}

impl StoreError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A user to be created inside a known restaurant.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_restaurant(&self, restaurant_id: i32) -> StoreResult<Option<RestaurantEntity>>;

    async fn find_restaurant_by_app_id(
        &self,
        square_app_id: &str,
    ) -> StoreResult<Option<RestaurantEntity>>;

    /// Writes the restaurant and its first admin atomically.
    async fn create_restaurant_with_admin(
        &self,
        restaurant: CreateRestaurantEntity,
        admin: NewUser,
    ) -> StoreResult<(RestaurantEntity, UserEntity)>;

    async fn find_user(
        &self,
        restaurant_id: i32,
        user_id: i32,
    ) -> StoreResult<Option<UserEntity>>;

    async fn find_user_by_email(
        &self,
        restaurant_id: i32,
        email: &str,
    ) -> StoreResult<Option<UserEntity>>;

    async fn create_user(&self, restaurant_id: i32, user: NewUser) -> StoreResult<UserEntity>;

    /// Writes the order, its items and their adjustments in one transaction.
    async fn create_order(
        &self,
        order: CreateOrderEntity,
        lines: Vec<NewOrderLine>,
    ) -> StoreResult<OrderDetail>;

    async fn find_order(
        &self,
        restaurant_id: i32,
        order_id: i32,
    ) -> StoreResult<Option<OrderEntity>>;

    async fn find_order_detail(
        &self,
        restaurant_id: i32,
        order_id: i32,
    ) -> StoreResult<Option<OrderDetail>>;

    async fn list_orders_by_table(
        &self,
        restaurant_id: i32,
        table_number: i32,
    ) -> StoreResult<Vec<OrderEntity>>;

    async fn update_order(
        &self,
        restaurant_id: i32,
        order_id: i32,
        changes: UpdateOrderEntity,
    ) -> StoreResult<Option<OrderEntity>>;

    async fn find_pending_payment(&self, order_id: i32) -> StoreResult<Option<PaymentEntity>>;

    async fn find_payment_by_remote_id(
        &self,
        restaurant_id: i32,
        remote_payment_id: &str,
    ) -> StoreResult<Option<PaymentEntity>>;

    async fn create_payment(&self, payment: CreatePaymentEntity) -> StoreResult<PaymentEntity>;

    /// Applies the changes only while the payment is still pending; terminal
    /// payments yield `None`.
    async fn update_pending_payment(
        &self,
        restaurant_id: i32,
        payment_id: i32,
        changes: UpdatePaymentEntity,
    ) -> StoreResult<Option<PaymentEntity>>;
}
