use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::TenantContext;
use crate::{
    app_error::AppError,
    gateway::{
        CreateRemoteOrder, DiscountValue, PaymentGateway, RemoteDiscountInput,
        RemoteLineItemInput, RemoteModifierInput, RemoteOrder, money_amount,
    },
    models::{
        CreateOrderEntity, NewLineDiscount, NewLineModifier, NewOrderLine, OrderDetail,
        OrderEntity, OrderStatus, UpdateOrderEntity,
    },
    store::Store,
};

/// Upper bound for item and modifier prices, in minor units.
pub const MAX_UNIT_PRICE: i64 = 1_000_000_000;

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CreateOrderRequest {
    #[validate(range(min = 1, message = "table_number must be at least 1"))]
    pub table_number: i32,
    #[validate(length(min = 1, message = "an order needs at least one item"), nested)]
    pub items: Vec<CreateOrderItem>,
    /// Defaults to the restaurant's primary location.
    #[validate(length(min = 1))]
    pub location_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct CreateOrderItem {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 500))]
    pub comment: Option<String>,
    /// Minor units.
    #[validate(range(
        min = 0,
        max = MAX_UNIT_PRICE,
        message = "unit_price must be between 0 and 1000000000"
    ))]
    pub unit_price: i64,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: i32,
    pub catalog_object_id: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub discounts: Vec<CreateItemDiscount>,
    #[serde(default)]
    #[validate(nested)]
    pub modifiers: Vec<CreateItemModifier>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct CreateItemDiscount {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(default)]
    pub is_percentage: bool,
    /// Whole percent when `is_percentage`, minor units otherwise.
    #[validate(range(min = 0))]
    pub value: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct CreateItemModifier {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(range(min = 0, max = MAX_UNIT_PRICE))]
    pub unit_price: i64,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

impl CreateItemDiscount {
    fn value(&self) -> DiscountValue {
        if self.is_percentage {
            DiscountValue::Percentage(self.value)
        } else {
            DiscountValue::FixedAmount(self.value)
        }
    }
}

fn check_percentages(request: &CreateOrderRequest) -> Result<(), AppError> {
    let over = request
        .items
        .iter()
        .flat_map(|item| item.discounts.iter())
        .find(|d| d.is_percentage && d.value > 100);
    match over {
        Some(d) => Err(AppError::BadRequest(format!(
            "discount '{}' exceeds 100 percent",
            d.name
        ))),
        None => Ok(()),
    }
}

fn remote_line_items(items: &[CreateOrderItem]) -> Vec<RemoteLineItemInput> {
    items
        .iter()
        .map(|item| RemoteLineItemInput {
            name: item.name.clone(),
            catalog_object_id: item.catalog_object_id.clone(),
            note: item.comment.clone(),
            unit_price: item.unit_price,
            quantity: item.quantity,
            modifiers: item
                .modifiers
                .iter()
                .map(|m| RemoteModifierInput {
                    name: m.name.clone(),
                    unit_price: m.unit_price,
                    quantity: m.quantity,
                })
                .collect(),
            discounts: item
                .discounts
                .iter()
                .map(|d| RemoteDiscountInput {
                    name: d.name.clone(),
                    value: d.value(),
                })
                .collect(),
        })
        .collect()
}

/// Maps the lines returned by the gateway onto local rows. Lines come back in
/// request order, so the request item at the same index fills fields the
/// gateway left out.
pub(crate) fn mirror_lines(items: &[CreateOrderItem], remote: &RemoteOrder) -> Vec<NewOrderLine> {
    remote
        .line_items
        .iter()
        .enumerate()
        .map(|(index, line)| {
            let requested = items.get(index);
            let quantity = line.quantity();
            let unit_price = line
                .base_price_money
                .as_ref()
                .map(|m| m.amount)
                .or(requested.map(|r| r.unit_price))
                .unwrap_or(0);
            let fallback = unit_price.saturating_mul(i64::from(quantity));
            let amount = line.total_money.as_ref().map_or(fallback, |m| m.amount);

            let discounts = line
                .applied_discounts
                .iter()
                .map(|applied| {
                    let discount = remote.discount(&applied.discount_uid);
                    NewLineDiscount {
                        name: discount
                            .and_then(|d| d.name.clone())
                            .unwrap_or_else(|| applied.discount_uid.clone()),
                        is_percentage: discount.is_some_and(|d| d.is_percentage()),
                        value: discount.map_or(0, |d| d.value()),
                        amount: money_amount(&applied.applied_money),
                        remote_uid: Some(applied.discount_uid.clone()),
                    }
                })
                .collect();

            let modifiers = line
                .modifiers
                .iter()
                .map(|m| {
                    let unit_price = money_amount(&m.base_price_money);
                    let quantity = m.quantity();
                    let fallback = unit_price.saturating_mul(i64::from(quantity));
                    NewLineModifier {
                        name: m.name.clone().unwrap_or_default(),
                        unit_price,
                        quantity,
                        amount: m
                            .total_price_money
                            .as_ref()
                            .map_or(fallback, |t| t.amount),
                        remote_uid: m.uid.clone(),
                    }
                })
                .collect();

            NewOrderLine {
                name: line
                    .name
                    .clone()
                    .or(requested.map(|r| r.name.clone()))
                    .unwrap_or_default(),
                comment: line.note.clone().or(requested.and_then(|r| r.comment.clone())),
                unit_price,
                quantity,
                amount,
                remote_catalog_id: line
                    .catalog_object_id
                    .clone()
                    .or(requested.and_then(|r| r.catalog_object_id.clone())),
                remote_uid: line.uid.clone(),
                discounts,
                modifiers,
            }
        })
        .collect()
}

/// The order aggregate: creation through the gateway, local reads and status
/// transitions.
pub struct OrderService {
    store: Arc<dyn Store>,
    gateway: Arc<dyn PaymentGateway>,
    currency: String,
}

impl OrderService {
    pub fn new(store: Arc<dyn Store>, gateway: Arc<dyn PaymentGateway>, currency: String) -> Self {
        Self {
            store,
            gateway,
            currency,
        }
    }

    pub async fn create(
        &self,
        tenant: &TenantContext,
        request: CreateOrderRequest,
    ) -> Result<OrderDetail, AppError> {
        request.validate()?;
        check_percentages(&request)?;

        let location_id = request
            .location_id
            .clone()
            .unwrap_or_else(|| tenant.restaurant.location_id.clone());

        let remote_request = CreateRemoteOrder {
            idempotency_key: Uuid::new_v4().to_string(),
            location_id: location_id.clone(),
            table_number: request.table_number,
            currency: self.currency.clone(),
            line_items: remote_line_items(&request.items),
        };
        let remote = self
            .gateway
            .create_order(&tenant.credential(), &remote_request)
            .await
            .inspect_err(|err| {
                tracing::warn!(
                    restaurant_id = tenant.restaurant_id(),
                    table_number = request.table_number,
                    error = %err,
                    "Remote order creation failed"
                )
            })?;

        let lines = mirror_lines(&request.items, &remote);
        let total_amount = match &remote.total_money {
            Some(total) => total.amount,
            None => lines
                .iter()
                .fold(0i64, |total, line| total.saturating_add(line.amount)),
        };
        let currency = remote
            .total_money
            .as_ref()
            .map_or_else(|| self.currency.clone(), |m| m.currency.clone());

        let order = CreateOrderEntity {
            restaurant_id: tenant.restaurant_id(),
            user_id: tenant.user_id,
            remote_order_id: remote.id.clone(),
            table_number: request.table_number,
            status: OrderStatus::Pending,
            currency,
            total_amount,
            location_id: remote.location_id.clone().unwrap_or(location_id),
            raw_gateway_data: remote.raw.to_string(),
        };

        let detail = self.store.create_order(order, lines).await.map_err(|err| {
            tracing::error!(
                remote_order_id = %remote.id,
                error = ?err,
                "Remote order exists but the local mirror could not be written"
            );
            AppError::Persistence(err)
        })?;

        tracing::info!(
            order_id = detail.order.id,
            remote_order_id = %detail.order.remote_order_id,
            total_amount = detail.order.total_amount,
            "Order created"
        );
        Ok(detail)
    }

    pub async fn get_by_table(
        &self,
        tenant: &TenantContext,
        table_number: i32,
    ) -> Result<Vec<OrderEntity>, AppError> {
        if table_number < 1 {
            return Err(AppError::BadRequest(
                "table_number must be at least 1".into(),
            ));
        }
        Ok(self
            .store
            .list_orders_by_table(tenant.restaurant_id(), table_number)
            .await?)
    }

    /// Orders of other tenants are reported exactly like missing ones.
    pub async fn get_by_id(
        &self,
        tenant: &TenantContext,
        order_id: i32,
    ) -> Result<OrderDetail, AppError> {
        self.store
            .find_order_detail(tenant.restaurant_id(), order_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn cancel(
        &self,
        tenant: &TenantContext,
        order_id: i32,
    ) -> Result<OrderEntity, AppError> {
        let order = self
            .store
            .find_order(tenant.restaurant_id(), order_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if !order.status.can_transition_to(OrderStatus::Cancelled) {
            return Err(AppError::Conflict(format!(
                "Order is {} and can no longer be cancelled",
                order.status
            )));
        }
        if self.store.find_pending_payment(order.id).await?.is_some() {
            return Err(AppError::Conflict(
                "Order has a pending payment".into(),
            ));
        }

        let changes = UpdateOrderEntity {
            status: Some(OrderStatus::Cancelled),
            ..Default::default()
        };
        let order = self
            .store
            .update_order(tenant.restaurant_id(), order.id, changes)
            .await?
            .ok_or(AppError::NotFound)?;

        tracing::info!(order_id = order.id, "Order cancelled");
        Ok(order)
    }
}
