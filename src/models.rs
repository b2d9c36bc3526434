use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use diesel::{
    AsChangeset, AsExpression, FromSqlRow, Selectable,
    deserialize::{self, FromSql},
    pg::{Pg, PgValue},
    prelude::{Identifiable, Insertable, Queryable},
    serialize::{self, Output, ToSql},
    sql_types::Text,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// Closed enumerations stored as text columns

/// Implements the text column mapping and string conversions for a closed enum.
macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!("unknown {} '{}'", stringify!($ty), other)),
                }
            }
        }

        impl ToSql<Text, Pg> for $ty {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                <str as ToSql<Text, Pg>>::to_sql(self.as_str(), &mut out.reborrow())
            }
        }

        impl FromSql<Text, Pg> for $ty {
            fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
                let raw = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
                raw.parse::<$ty>().map_err(Into::into)
            }
        }
    };
}

/// Staff role within a restaurant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow, ToSchema,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Staff,
}

text_enum!(Role {
    Admin => "admin",
    Manager => "manager",
    Staff => "staff",
});

/// Operations gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ManageUsers,
    TakeOrders,
    TakePayments,
}

impl Role {
    pub fn allows(self, permission: Permission) -> bool {
        match (self, permission) {
            (Role::Admin, _) => true,
            (Role::Manager | Role::Staff, Permission::TakeOrders | Permission::TakePayments) => {
                true
            }
            (Role::Manager | Role::Staff, Permission::ManageUsers) => false,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow, ToSchema,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Cancelled,
}

text_enum!(OrderStatus {
    Pending => "pending",
    Paid => "paid",
    Cancelled => "cancelled",
});

impl OrderStatus {
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        match (self, next) {
            (OrderStatus::Pending, OrderStatus::Pending)
            | (OrderStatus::Pending, OrderStatus::Paid)
            | (OrderStatus::Pending, OrderStatus::Cancelled) => true,
            (OrderStatus::Paid, _) | (OrderStatus::Cancelled, _) => false,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow, ToSchema,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

text_enum!(PaymentStatus {
    Pending => "pending",
    Completed => "completed",
    Failed => "failed",
});

impl PaymentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, PaymentStatus::Completed | PaymentStatus::Failed)
    }
}

/// Tender recorded on a payment.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    AsExpression,
    FromSqlRow,
    ToSchema,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Card,
    Cash,
}

text_enum!(PaymentMethod {
    Card => "card",
    Cash => "cash",
});

// Restaurants

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = crate::schema::restaurants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RestaurantEntity {
    pub id: i32,
    pub name: String,
    pub square_app_id: String,
    pub square_token: String,
    pub location_id: String,
    pub merchant_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::restaurants)]
pub struct CreateRestaurantEntity {
    pub name: String,
    pub square_app_id: String,
    pub square_token: String,
    pub location_id: String,
    pub merchant_id: String,
}

/// Public view of a restaurant; never carries the gateway credential.
#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct RestaurantView {
    pub id: i32,
    pub name: String,
    pub location_id: String,
    pub merchant_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<&RestaurantEntity> for RestaurantView {
    fn from(r: &RestaurantEntity) -> Self {
        Self {
            id: r.id,
            name: r.name.clone(),
            location_id: r.location_id.clone(),
            merchant_id: r.merchant_id.clone(),
            created_at: r.created_at,
        }
    }
}

// Users

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserEntity {
    pub id: i32,
    pub restaurant_id: i32,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::users)]
pub struct CreateUserEntity {
    pub restaurant_id: i32,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

// Orders

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderEntity {
    pub id: i32,
    pub restaurant_id: i32,
    pub user_id: i32,
    pub remote_order_id: String,
    pub table_number: i32,
    pub status: OrderStatus,
    pub currency: String,
    pub total_amount: i64,
    pub paid_amount: i64,
    pub tip_amount: i64,
    pub payment_id: Option<i32>,
    pub location_id: String,
    #[serde(skip)]
    pub raw_gateway_data: String,
    pub opened_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateOrderEntity {
    pub restaurant_id: i32,
    pub user_id: i32,
    pub remote_order_id: String,
    pub table_number: i32,
    pub status: OrderStatus,
    pub currency: String,
    pub total_amount: i64,
    pub location_id: String,
    pub raw_gateway_data: String,
}

/// Mutable part of an order. The remote order id is deliberately absent.
#[derive(AsChangeset, Debug, Clone, Default)]
#[diesel(table_name = crate::schema::orders)]
pub struct UpdateOrderEntity {
    pub status: Option<OrderStatus>,
    pub paid_amount: Option<i64>,
    pub tip_amount: Option<i64>,
    pub payment_id: Option<Option<i32>>,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::order_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemEntity {
    pub id: i32,
    pub order_id: i32,
    pub name: String,
    pub comment: Option<String>,
    pub unit_price: i64,
    pub quantity: i32,
    pub amount: i64,
    pub remote_catalog_id: Option<String>,
    pub remote_uid: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::order_items)]
pub struct CreateOrderItemEntity {
    pub order_id: i32,
    pub name: String,
    pub comment: Option<String>,
    pub unit_price: i64,
    pub quantity: i32,
    pub amount: i64,
    pub remote_catalog_id: Option<String>,
    pub remote_uid: Option<String>,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::order_item_discounts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemDiscountEntity {
    pub id: i32,
    pub order_item_id: i32,
    pub name: String,
    pub is_percentage: bool,
    pub value: i64,
    pub amount: i64,
    pub remote_uid: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::order_item_discounts)]
pub struct CreateOrderItemDiscountEntity {
    pub order_item_id: i32,
    pub name: String,
    pub is_percentage: bool,
    pub value: i64,
    pub amount: i64,
    pub remote_uid: Option<String>,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::order_item_modifiers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemModifierEntity {
    pub id: i32,
    pub order_item_id: i32,
    pub name: String,
    pub unit_price: i64,
    pub quantity: i32,
    pub amount: i64,
    pub remote_uid: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::order_item_modifiers)]
pub struct CreateOrderItemModifierEntity {
    pub order_item_id: i32,
    pub name: String,
    pub unit_price: i64,
    pub quantity: i32,
    pub amount: i64,
    pub remote_uid: Option<String>,
}

/// A line item to be written together with its adjustments. The parent ids
/// are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub name: String,
    pub comment: Option<String>,
    pub unit_price: i64,
    pub quantity: i32,
    pub amount: i64,
    pub remote_catalog_id: Option<String>,
    pub remote_uid: Option<String>,
    pub discounts: Vec<NewLineDiscount>,
    pub modifiers: Vec<NewLineModifier>,
}

#[derive(Debug, Clone)]
pub struct NewLineDiscount {
    pub name: String,
    pub is_percentage: bool,
    pub value: i64,
    pub amount: i64,
    pub remote_uid: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewLineModifier {
    pub name: String,
    pub unit_price: i64,
    pub quantity: i32,
    pub amount: i64,
    pub remote_uid: Option<String>,
}

#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct OrderItemDetail {
    #[serde(flatten)]
    pub item: OrderItemEntity,
    pub discounts: Vec<OrderItemDiscountEntity>,
    pub modifiers: Vec<OrderItemModifierEntity>,
}

#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct OrderDetail {
    pub order: OrderEntity,
    pub items: Vec<OrderItemDetail>,
}

// Payments

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PaymentEntity {
    pub id: i32,
    pub restaurant_id: i32,
    pub order_id: i32,
    pub remote_payment_id: String,
    pub bill_amount: i64,
    pub tip_amount: i64,
    pub total_amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub raw_gateway_data: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreatePaymentEntity {
    pub restaurant_id: i32,
    pub order_id: i32,
    pub remote_payment_id: String,
    pub bill_amount: i64,
    pub total_amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub processed_at: Option<DateTime<Utc>>,
    pub raw_gateway_data: String,
}

#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::payments)]
pub struct UpdatePaymentEntity {
    pub status: PaymentStatus,
    pub bill_amount: i64,
    pub tip_amount: i64,
    pub total_amount: i64,
    pub processed_at: Option<DateTime<Utc>>,
    pub raw_gateway_data: String,
}
