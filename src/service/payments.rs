//! Two-phase payment workflow: authorize an intent, then capture it with an
//! optional tip. The gateway's amounts are authoritative for everything that
//! is written after a capture.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::TenantContext;
use crate::{
    app_error::AppError,
    gateway::{
        CreatePaymentIntent, GatewayError, PaymentGateway, RemoteOrder, RemotePayment,
        money_amount, parse_timestamp,
    },
    models::{
        CreatePaymentEntity, OrderEntity, OrderStatus, PaymentEntity, PaymentMethod,
        PaymentStatus, UpdateOrderEntity, UpdatePaymentEntity,
    },
    money::{to_decimal, to_minor_units},
    store::Store,
};

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CreatePaymentIntentRequest {
    /// Card nonce or other payment source from the client SDK.
    #[validate(length(min = 1))]
    pub source_id: String,
    /// Amount to authorize, in currency units (e.g. `24.00`).
    #[schema(value_type = f64)]
    pub amount: Decimal,
    /// Must match the order currency when given.
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    /// Defaults to the order's location.
    #[validate(length(min = 1))]
    pub location_id: Option<String>,
    #[validate(length(max = 100))]
    pub reference_id: Option<String>,
    #[validate(length(max = 500))]
    pub note: Option<String>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CompletePaymentRequest {
    /// Payment identifier assigned by the gateway at intent creation.
    #[validate(length(min = 1))]
    pub payment_id: String,
    /// Tip in currency units; zero or absent means no tip.
    #[serde(default)]
    #[schema(value_type = f64)]
    pub tip_amount: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentIntentView {
    pub payment: PaymentEntity,
    pub order: OrderEntity,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DiscountView {
    pub name: String,
    pub is_percentage: bool,
    /// Percent for percentage discounts, currency units otherwise.
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub value: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub amount: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ModifierView {
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub unit_price: Decimal,
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub amount: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ItemView {
    pub name: String,
    pub comment: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub unit_price: Decimal,
    pub quantity: i32,
    pub discounts: Vec<DiscountView>,
    pub modifiers: Vec<ModifierView>,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub amount: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TotalsView {
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub discounts: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub due: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub tax: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub service_charge: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub paid: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub tips: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub total: Decimal,
}

/// Receipt-style view of a settled order.
#[derive(Debug, Serialize, ToSchema)]
pub struct CompletionView {
    pub id: i32,
    pub payment_id: String,
    pub opened_at: DateTime<Utc>,
    pub is_closed: bool,
    pub table: i32,
    pub items: Vec<ItemView>,
    pub totals: TotalsView,
}

impl CompletionView {
    /// Builds the view from the remote order snapshot. Money is converted to
    /// currency units only here.
    pub fn build(order: &OrderEntity, payment: &PaymentEntity, remote: &RemoteOrder) -> Self {
        let items = remote
            .line_items
            .iter()
            .map(|line| {
                let quantity = line.quantity();
                let unit_price = money_amount(&line.base_price_money);
                ItemView {
                    name: line.name.clone().unwrap_or_default(),
                    comment: line.note.clone(),
                    unit_price: to_decimal(unit_price),
                    quantity,
                    discounts: line
                        .applied_discounts
                        .iter()
                        .map(|applied| {
                            let discount = remote.discount(&applied.discount_uid);
                            let is_percentage = discount.is_some_and(|d| d.is_percentage());
                            let value = discount.map_or(0, |d| d.value());
                            DiscountView {
                                name: discount
                                    .and_then(|d| d.name.clone())
                                    .unwrap_or_else(|| applied.discount_uid.clone()),
                                is_percentage,
                                value: if is_percentage {
                                    Decimal::from(value)
                                } else {
                                    to_decimal(value)
                                },
                                amount: to_decimal(money_amount(&applied.applied_money)),
                            }
                        })
                        .collect(),
                    modifiers: line
                        .modifiers
                        .iter()
                        .map(|m| ModifierView {
                            name: m.name.clone().unwrap_or_default(),
                            unit_price: to_decimal(money_amount(&m.base_price_money)),
                            quantity: m.quantity(),
                            amount: to_decimal(money_amount(&m.total_price_money)),
                        })
                        .collect(),
                    amount: to_decimal(line.total_money.as_ref().map_or(
                        unit_price.saturating_mul(i64::from(quantity)),
                        |m| m.amount,
                    )),
                }
            })
            .collect();

        let total = remote
            .total_money
            .as_ref()
            .map_or(order.total_amount, |m| m.amount);
        let paid = payment.bill_amount;

        Self {
            id: order.id,
            payment_id: payment.remote_payment_id.clone(),
            opened_at: order.opened_at,
            is_closed: order.status == OrderStatus::Paid,
            table: order.table_number,
            items,
            totals: TotalsView {
                discounts: to_decimal(money_amount(&remote.total_discount_money)),
                due: to_decimal((total - paid).max(0)),
                tax: to_decimal(money_amount(&remote.total_tax_money)),
                service_charge: to_decimal(money_amount(&remote.total_service_charge_money)),
                paid: to_decimal(paid),
                tips: to_decimal(payment.tip_amount),
                total: to_decimal(total),
            },
        }
    }
}

/// Local status for a remote payment status; `None` when the payment is
/// still in flight on the remote side.
pub(crate) fn settle_status(remote_status: &str) -> Option<PaymentStatus> {
    match remote_status {
        "COMPLETED" => Some(PaymentStatus::Completed),
        "FAILED" | "CANCELED" => Some(PaymentStatus::Failed),
        _ => None,
    }
}

/// Decodes the order stored in a raw create-order response body.
fn snapshot_order(raw: &str) -> Option<RemoteOrder> {
    let body: serde_json::Value = serde_json::from_str(raw).ok()?;
    serde_json::from_value(body.get("order")?.clone()).ok()
}

pub struct PaymentService {
    store: Arc<dyn Store>,
    gateway: Arc<dyn PaymentGateway>,
}

impl PaymentService {
    pub fn new(store: Arc<dyn Store>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { store, gateway }
    }

    /// Phase one: authorize without capturing. At most one intent may be
    /// pending per order; a second attempt is refused before the gateway is
    /// contacted.
    pub async fn create_intent(
        &self,
        tenant: &TenantContext,
        order_id: i32,
        request: CreatePaymentIntentRequest,
    ) -> Result<PaymentIntentView, AppError> {
        request.validate()?;
        let amount = to_minor_units(request.amount)?;
        if amount == 0 {
            return Err(AppError::BadRequest(
                "amount must be greater than zero".into(),
            ));
        }

        let order = self
            .store
            .find_order(tenant.restaurant_id(), order_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if order.status != OrderStatus::Pending {
            return Err(AppError::Conflict(format!(
                "Order is {} and cannot take a payment",
                order.status
            )));
        }
        if let Some(currency) = &request.currency {
            if !currency.eq_ignore_ascii_case(&order.currency) {
                return Err(AppError::BadRequest(format!(
                    "currency {currency} does not match order currency {}",
                    order.currency
                )));
            }
        }
        if amount > order.total_amount {
            return Err(AppError::BadRequest(format!(
                "amount {} exceeds the order total {}",
                to_decimal(amount),
                to_decimal(order.total_amount)
            )));
        }
        if let Some(pending) = self.store.find_pending_payment(order.id).await? {
            tracing::warn!(
                order_id = order.id,
                payment_id = pending.id,
                "Rejected payment intent while another is pending"
            );
            return Err(AppError::Conflict(
                "Order already has a pending payment".into(),
            ));
        }

        let intent = CreatePaymentIntent {
            idempotency_key: Uuid::new_v4().to_string(),
            remote_order_id: order.remote_order_id.clone(),
            amount,
            currency: order.currency.clone(),
            source_id: request.source_id.clone(),
            location_id: request
                .location_id
                .clone()
                .unwrap_or_else(|| order.location_id.clone()),
            reference_id: request.reference_id.clone(),
            note: request.note.clone(),
        };
        let remote = self
            .gateway
            .create_payment_intent(&tenant.credential(), &intent)
            .await?;

        let bill_amount = remote.amount_money.as_ref().map_or(amount, |m| m.amount);
        let new_payment = CreatePaymentEntity {
            restaurant_id: tenant.restaurant_id(),
            order_id: order.id,
            remote_payment_id: remote.id.clone(),
            bill_amount,
            total_amount: remote.total_money.as_ref().map_or(bill_amount, |m| m.amount),
            currency: remote
                .amount_money
                .as_ref()
                .map_or_else(|| order.currency.clone(), |m| m.currency.clone()),
            status: PaymentStatus::Pending,
            payment_method: request.payment_method,
            processed_at: parse_timestamp(&remote.created_at),
            raw_gateway_data: remote.raw.to_string(),
        };
        let payment = self
            .store
            .create_payment(new_payment)
            .await
            .map_err(|err| persistence_after_remote(&remote, err))?;

        let link = UpdateOrderEntity {
            status: Some(OrderStatus::Pending),
            payment_id: Some(Some(payment.id)),
            ..Default::default()
        };
        let order = self
            .store
            .update_order(tenant.restaurant_id(), order.id, link)
            .await
            .map_err(|err| persistence_after_remote(&remote, err))?
            .ok_or(AppError::NotFound)?;

        tracing::info!(
            order_id = order.id,
            payment_id = payment.id,
            remote_payment_id = %payment.remote_payment_id,
            amount = payment.bill_amount,
            "Payment intent created"
        );
        Ok(PaymentIntentView { payment, order })
    }

    /// Phase two: attach the tip, capture, and settle the local records.
    pub async fn complete(
        &self,
        tenant: &TenantContext,
        request: CompletePaymentRequest,
    ) -> Result<CompletionView, AppError> {
        request.validate()?;
        let tip_amount = to_minor_units(request.tip_amount)?;

        let payment = self
            .store
            .find_payment_by_remote_id(tenant.restaurant_id(), &request.payment_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if payment.status.is_terminal() {
            return Err(AppError::Conflict(format!(
                "Payment is already {}",
                payment.status
            )));
        }
        let order = self
            .store
            .find_order(tenant.restaurant_id(), payment.order_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let credential = tenant.credential();
        let remote = self
            .gateway
            .complete_payment(
                &credential,
                &payment.remote_payment_id,
                tip_amount,
                &payment.currency,
            )
            .await
            .inspect_err(|err| {
                tracing::warn!(
                    payment_id = payment.id,
                    error = %err,
                    "Payment completion failed; payment stays pending"
                )
            })?;

        let Some(status) = settle_status(&remote.status) else {
            tracing::warn!(
                payment_id = payment.id,
                remote_status = %remote.status,
                "Capture returned a non-final status; payment stays pending"
            );
            return Err(GatewayError::PaymentNotCompleted(remote.status).into());
        };

        let captured = remote
            .amount_money
            .as_ref()
            .map_or(payment.bill_amount, |m| m.amount);
        let applied_tip = remote.tip_money.as_ref().map_or(tip_amount, |m| m.amount);
        let changes = UpdatePaymentEntity {
            status,
            bill_amount: captured,
            tip_amount: applied_tip,
            total_amount: remote
                .total_money
                .as_ref()
                .map_or(captured.saturating_add(applied_tip), |m| m.amount),
            processed_at: parse_timestamp(&remote.updated_at).or_else(|| Some(Utc::now())),
            raw_gateway_data: remote.raw.to_string(),
        };
        let payment = self
            .store
            .update_pending_payment(tenant.restaurant_id(), payment.id, changes)
            .await
            .map_err(|err| persistence_after_remote(&remote, err))?
            .ok_or_else(|| AppError::Conflict("Payment was settled concurrently".into()))?;

        if status == PaymentStatus::Failed {
            tracing::warn!(payment_id = payment.id, "Payment failed on capture");
            return Err(GatewayError::PaymentNotCompleted(remote.status).into());
        }

        if captured > order.total_amount.saturating_add(applied_tip) {
            tracing::warn!(
                order_id = order.id,
                payment_id = payment.id,
                captured,
                total_amount = order.total_amount,
                tip_amount = applied_tip,
                "Captured amount exceeds order total plus tip; order left open"
            );
            return Err(AppError::Conflict(
                "Captured amount exceeds the order total".into(),
            ));
        }
        if !order.status.can_transition_to(OrderStatus::Paid) {
            return Err(AppError::Conflict(format!(
                "Order is {} and cannot be marked paid",
                order.status
            )));
        }

        let settle = UpdateOrderEntity {
            status: Some(OrderStatus::Paid),
            paid_amount: Some(captured),
            tip_amount: Some(applied_tip),
            payment_id: Some(Some(payment.id)),
        };
        let order = self
            .store
            .update_order(tenant.restaurant_id(), order.id, settle)
            .await
            .map_err(|err| persistence_after_remote(&remote, err))?
            .ok_or(AppError::NotFound)?;

        tracing::info!(
            order_id = order.id,
            payment_id = payment.id,
            paid_amount = order.paid_amount,
            tip_amount = order.tip_amount,
            "Payment completed"
        );

        let remote_order = match self
            .gateway
            .fetch_order(&credential, &order.remote_order_id)
            .await
        {
            Ok(remote_order) => remote_order,
            Err(err) => {
                tracing::warn!(
                    order_id = order.id,
                    error = %err,
                    "Could not fetch remote order; rendering from stored snapshot"
                );
                snapshot_order(&order.raw_gateway_data).unwrap_or_default()
            }
        };

        Ok(CompletionView::build(&order, &payment, &remote_order))
    }
}

fn persistence_after_remote(remote: &RemotePayment, err: crate::store::StoreError) -> AppError {
    tracing::error!(
        remote_payment_id = %remote.id,
        error = ?err,
        "Remote payment changed but the local record could not be written"
    );
    AppError::Persistence(err)
}
