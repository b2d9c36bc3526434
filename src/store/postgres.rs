use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::{
    AsyncConnection, AsyncPgConnection, RunQueryDsl, pooled_connection::bb8::PooledConnection,
};

use super::{NewUser, Store, StoreError, StoreResult};
use crate::{
    db::DbPool,
    models::{
        CreateOrderEntity, CreateOrderItemDiscountEntity, CreateOrderItemEntity,
        CreateOrderItemModifierEntity, CreatePaymentEntity, CreateRestaurantEntity,
        CreateUserEntity, NewOrderLine, OrderDetail, OrderEntity, OrderItemDetail,
        OrderItemDiscountEntity, OrderItemEntity, OrderItemModifierEntity, PaymentEntity,
        PaymentStatus, RestaurantEntity, UpdateOrderEntity, UpdatePaymentEntity, UserEntity,
    },
    schema::{
        order_item_discounts, order_item_modifiers, order_items, orders, payments, restaurants,
        users,
    },
};

/// Diesel-backed store over a bb8 pool of async Postgres connections.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn conn(&self) -> StoreResult<PooledConnection<'_, AsyncPgConnection>> {
        let conn = self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;
        Ok(conn)
    }
}

fn new_user_row(restaurant_id: i32, user: NewUser) -> CreateUserEntity {
    CreateUserEntity {
        restaurant_id,
        username: user.username,
        email: user.email,
        password_hash: user.password_hash,
        role: user.role,
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_restaurant(&self, restaurant_id: i32) -> StoreResult<Option<RestaurantEntity>> {
        let conn = &mut self.conn().await?;
        let restaurant = restaurants::table
            .find(restaurant_id)
            .select(RestaurantEntity::as_select())
            .first(conn)
            .await
            .optional()?;
        Ok(restaurant)
    }

    async fn find_restaurant_by_app_id(
        &self,
        square_app_id: &str,
    ) -> StoreResult<Option<RestaurantEntity>> {
        let conn = &mut self.conn().await?;
        let restaurant = restaurants::table
            .filter(restaurants::square_app_id.eq(square_app_id))
            .select(RestaurantEntity::as_select())
            .first(conn)
            .await
            .optional()?;
        Ok(restaurant)
    }

    async fn create_restaurant_with_admin(
        &self,
        restaurant: CreateRestaurantEntity,
        admin: NewUser,
    ) -> StoreResult<(RestaurantEntity, UserEntity)> {
        let conn = &mut self.conn().await?;

        conn.transaction(move |conn| {
            Box::pin(async move {
                let restaurant: RestaurantEntity = diesel::insert_into(restaurants::table)
                    .values(&restaurant)
                    .returning(RestaurantEntity::as_returning())
                    .get_result(conn)
                    .await?;

                let admin: UserEntity = diesel::insert_into(users::table)
                    .values(&new_user_row(restaurant.id, admin))
                    .returning(UserEntity::as_returning())
                    .get_result(conn)
                    .await?;

                Ok::<(RestaurantEntity, UserEntity), StoreError>((restaurant, admin))
            })
        })
        .await
    }

    async fn find_user(
        &self,
        restaurant_id: i32,
        user_id: i32,
    ) -> StoreResult<Option<UserEntity>> {
        let conn = &mut self.conn().await?;
        let user = users::table
            .filter(users::id.eq(user_id))
            .filter(users::restaurant_id.eq(restaurant_id))
            .select(UserEntity::as_select())
            .first(conn)
            .await
            .optional()?;
        Ok(user)
    }

    async fn find_user_by_email(
        &self,
        restaurant_id: i32,
        email: &str,
    ) -> StoreResult<Option<UserEntity>> {
        let conn = &mut self.conn().await?;
        let user = users::table
            .filter(users::restaurant_id.eq(restaurant_id))
            .filter(users::email.eq(email))
            .select(UserEntity::as_select())
            .first(conn)
            .await
            .optional()?;
        Ok(user)
    }

    async fn create_user(&self, restaurant_id: i32, user: NewUser) -> StoreResult<UserEntity> {
        let conn = &mut self.conn().await?;
        let user = diesel::insert_into(users::table)
            .values(&new_user_row(restaurant_id, user))
            .returning(UserEntity::as_returning())
            .get_result(conn)
            .await?;
        Ok(user)
    }

    async fn create_order(
        &self,
        order: CreateOrderEntity,
        lines: Vec<NewOrderLine>,
    ) -> StoreResult<OrderDetail> {
        let conn = &mut self.conn().await?;

        conn.transaction(move |conn| {
            Box::pin(async move {
                let order: OrderEntity = diesel::insert_into(orders::table)
                    .values(&order)
                    .returning(OrderEntity::as_returning())
                    .get_result(conn)
                    .await?;

                let mut items = Vec::with_capacity(lines.len());
                for line in lines {
                    let item: OrderItemEntity = diesel::insert_into(order_items::table)
                        .values(&CreateOrderItemEntity {
                            order_id: order.id,
                            name: line.name,
                            comment: line.comment,
                            unit_price: line.unit_price,
                            quantity: line.quantity,
                            amount: line.amount,
                            remote_catalog_id: line.remote_catalog_id,
                            remote_uid: line.remote_uid,
                        })
                        .returning(OrderItemEntity::as_returning())
                        .get_result(conn)
                        .await?;

                    let mut discounts = Vec::new();
                    if !line.discounts.is_empty() {
                        let rows: Vec<CreateOrderItemDiscountEntity> = line
                            .discounts
                            .into_iter()
                            .map(|d| CreateOrderItemDiscountEntity {
                                order_item_id: item.id,
                                name: d.name,
                                is_percentage: d.is_percentage,
                                value: d.value,
                                amount: d.amount,
                                remote_uid: d.remote_uid,
                            })
                            .collect();
                        discounts = diesel::insert_into(order_item_discounts::table)
                            .values(&rows)
                            .returning(OrderItemDiscountEntity::as_returning())
                            .get_results(conn)
                            .await?;
                    }

                    let mut modifiers = Vec::new();
                    if !line.modifiers.is_empty() {
                        let rows: Vec<CreateOrderItemModifierEntity> = line
                            .modifiers
                            .into_iter()
                            .map(|m| CreateOrderItemModifierEntity {
                                order_item_id: item.id,
                                name: m.name,
                                unit_price: m.unit_price,
                                quantity: m.quantity,
                                amount: m.amount,
                                remote_uid: m.remote_uid,
                            })
                            .collect();
                        modifiers = diesel::insert_into(order_item_modifiers::table)
                            .values(&rows)
                            .returning(OrderItemModifierEntity::as_returning())
                            .get_results(conn)
                            .await?;
                    }

                    items.push(OrderItemDetail {
                        item,
                        discounts,
                        modifiers,
                    });
                }

                Ok::<OrderDetail, StoreError>(OrderDetail { order, items })
            })
        })
        .await
    }

    async fn find_order(
        &self,
        restaurant_id: i32,
        order_id: i32,
    ) -> StoreResult<Option<OrderEntity>> {
        let conn = &mut self.conn().await?;
        let order = orders::table
            .filter(orders::id.eq(order_id))
            .filter(orders::restaurant_id.eq(restaurant_id))
            .select(OrderEntity::as_select())
            .first(conn)
            .await
            .optional()?;
        Ok(order)
    }

    async fn find_order_detail(
        &self,
        restaurant_id: i32,
        order_id: i32,
    ) -> StoreResult<Option<OrderDetail>> {
        let conn = &mut self.conn().await?;

        let Some(order) = orders::table
            .filter(orders::id.eq(order_id))
            .filter(orders::restaurant_id.eq(restaurant_id))
            .select(OrderEntity::as_select())
            .first(conn)
            .await
            .optional()?
        else {
            return Ok(None);
        };

        let items: Vec<OrderItemEntity> = order_items::table
            .filter(order_items::order_id.eq(order.id))
            .order_by(order_items::id.asc())
            .select(OrderItemEntity::as_select())
            .get_results(conn)
            .await?;

        let item_ids: Vec<i32> = items.iter().map(|item| item.id).collect();
        let discounts: Vec<OrderItemDiscountEntity> = order_item_discounts::table
            .filter(order_item_discounts::order_item_id.eq_any(&item_ids))
            .order_by(order_item_discounts::id.asc())
            .select(OrderItemDiscountEntity::as_select())
            .get_results(conn)
            .await?;
        let modifiers: Vec<OrderItemModifierEntity> = order_item_modifiers::table
            .filter(order_item_modifiers::order_item_id.eq_any(&item_ids))
            .order_by(order_item_modifiers::id.asc())
            .select(OrderItemModifierEntity::as_select())
            .get_results(conn)
            .await?;

        let mut discounts_by_item: HashMap<i32, Vec<OrderItemDiscountEntity>> = HashMap::new();
        for discount in discounts {
            discounts_by_item
                .entry(discount.order_item_id)
                .or_default()
                .push(discount);
        }
        let mut modifiers_by_item: HashMap<i32, Vec<OrderItemModifierEntity>> = HashMap::new();
        for modifier in modifiers {
            modifiers_by_item
                .entry(modifier.order_item_id)
                .or_default()
                .push(modifier);
        }

        let items = items
            .into_iter()
            .map(|item| OrderItemDetail {
                discounts: discounts_by_item.remove(&item.id).unwrap_or_default(),
                modifiers: modifiers_by_item.remove(&item.id).unwrap_or_default(),
                item,
            })
            .collect();

        Ok(Some(OrderDetail { order, items }))
    }

    async fn list_orders_by_table(
        &self,
        restaurant_id: i32,
        table_number: i32,
    ) -> StoreResult<Vec<OrderEntity>> {
        let conn = &mut self.conn().await?;
        let orders = orders::table
            .filter(orders::restaurant_id.eq(restaurant_id))
            .filter(orders::table_number.eq(table_number))
            .order_by(orders::opened_at.desc())
            .select(OrderEntity::as_select())
            .get_results(conn)
            .await?;
        Ok(orders)
    }

    async fn update_order(
        &self,
        restaurant_id: i32,
        order_id: i32,
        changes: UpdateOrderEntity,
    ) -> StoreResult<Option<OrderEntity>> {
        let conn = &mut self.conn().await?;
        let order = diesel::update(
            orders::table
                .filter(orders::id.eq(order_id))
                .filter(orders::restaurant_id.eq(restaurant_id)),
        )
        .set((&changes, orders::updated_at.eq(Utc::now())))
        .returning(OrderEntity::as_returning())
        .get_result(conn)
        .await
        .optional()?;
        Ok(order)
    }

    async fn find_pending_payment(&self, order_id: i32) -> StoreResult<Option<PaymentEntity>> {
        let conn = &mut self.conn().await?;
        let payment = payments::table
            .filter(payments::order_id.eq(order_id))
            .filter(payments::status.eq(PaymentStatus::Pending))
            .select(PaymentEntity::as_select())
            .first(conn)
            .await
            .optional()?;
        Ok(payment)
    }

    async fn find_payment_by_remote_id(
        &self,
        restaurant_id: i32,
        remote_payment_id: &str,
    ) -> StoreResult<Option<PaymentEntity>> {
        let conn = &mut self.conn().await?;
        let payment = payments::table
            .filter(payments::remote_payment_id.eq(remote_payment_id))
            .filter(payments::restaurant_id.eq(restaurant_id))
            .select(PaymentEntity::as_select())
            .first(conn)
            .await
            .optional()?;
        Ok(payment)
    }

    async fn create_payment(&self, payment: CreatePaymentEntity) -> StoreResult<PaymentEntity> {
        let conn = &mut self.conn().await?;
        let payment = diesel::insert_into(payments::table)
            .values(&payment)
            .returning(PaymentEntity::as_returning())
            .get_result(conn)
            .await?;
        Ok(payment)
    }

    async fn update_pending_payment(
        &self,
        restaurant_id: i32,
        payment_id: i32,
        changes: UpdatePaymentEntity,
    ) -> StoreResult<Option<PaymentEntity>> {
        let conn = &mut self.conn().await?;
        let payment = diesel::update(
            payments::table
                .filter(payments::id.eq(payment_id))
                .filter(payments::restaurant_id.eq(restaurant_id))
                .filter(payments::status.eq(PaymentStatus::Pending)),
        )
        .set((&changes, payments::updated_at.eq(Utc::now())))
        .returning(PaymentEntity::as_returning())
        .get_result(conn)
        .await
        .optional()?;
        Ok(payment)
    }
}
