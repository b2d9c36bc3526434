//! In-memory store, scripted gateway and app wiring shared by the integration tests.
#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::Utc;
use http_body_util::BodyExt;
use pos_orderservice::{
    app_state::AppState,
    config::AppConfig,
    gateway::{
        CreatePaymentIntent, CreateRemoteOrder, DiscountValue, GatewayCredential, GatewayError,
        GatewayResult, PaymentGateway, RemoteAppliedDiscount, RemoteDiscount, RemoteLineItem,
        RemoteLocation, RemoteModifier, RemoteMoney, RemoteOrder, RemotePayment,
    },
    models::{
        CreateOrderEntity, CreatePaymentEntity, CreateRestaurantEntity, NewOrderLine, OrderDetail,
        OrderEntity, OrderItemDetail, OrderItemDiscountEntity, OrderItemEntity,
        OrderItemModifierEntity, PaymentEntity, PaymentStatus, RestaurantEntity, Role,
        UpdateOrderEntity, UpdatePaymentEntity, UserEntity,
    },
    routes,
    service::TenantContext,
    store::{NewUser, Store, StoreError, StoreResult},
};
use serde_json::{Value, json};
use tower::ServiceExt;

// ===== In-memory store =====

#[derive(Default)]
struct Tables {
    next_id: i32,
    restaurants: Vec<RestaurantEntity>,
    users: Vec<UserEntity>,
    orders: Vec<OrderEntity>,
    items: Vec<OrderItemEntity>,
    discounts: Vec<OrderItemDiscountEntity>,
    modifiers: Vec<OrderItemModifierEntity>,
    payments: Vec<PaymentEntity>,
}

impl Tables {
    fn id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn insert_user(&mut self, restaurant_id: i32, user: NewUser) -> StoreResult<UserEntity> {
        if self
            .users
            .iter()
            .any(|u| u.restaurant_id == restaurant_id && u.email == user.email)
        {
            return Err(StoreError::UniqueViolation("unique_email_restaurant".into()));
        }
        let now = Utc::now();
        let user = UserEntity {
            id: self.id(),
            restaurant_id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.users.push(user.clone());
        Ok(user)
    }

    fn detail(&self, order: &OrderEntity) -> OrderDetail {
        let items = self
            .items
            .iter()
            .filter(|item| item.order_id == order.id)
            .map(|item| OrderItemDetail {
                item: item.clone(),
                discounts: self
                    .discounts
                    .iter()
                    .filter(|d| d.order_item_id == item.id)
                    .cloned()
                    .collect(),
                modifiers: self
                    .modifiers
                    .iter()
                    .filter(|m| m.order_item_id == item.id)
                    .cloned()
                    .collect(),
            })
            .collect();
        OrderDetail {
            order: order.clone(),
            items,
        }
    }
}

/// Mirrors the Postgres constraints that the workflows rely on.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail like a lost database connection.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Other(anyhow::anyhow!("connection reset by peer")));
        }
        Ok(())
    }

    pub fn restaurant_count(&self) -> usize {
        self.tables.lock().unwrap().restaurants.len()
    }

    pub fn user_count(&self) -> usize {
        self.tables.lock().unwrap().users.len()
    }

    pub fn order_count(&self) -> usize {
        self.tables.lock().unwrap().orders.len()
    }

    pub fn item_count(&self) -> usize {
        self.tables.lock().unwrap().items.len()
    }

    pub fn payments(&self) -> Vec<PaymentEntity> {
        self.tables.lock().unwrap().payments.clone()
    }

    pub fn order(&self, id: i32) -> Option<OrderEntity> {
        self.tables
            .lock()
            .unwrap()
            .orders
            .iter()
            .find(|o| o.id == id)
            .cloned()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_restaurant(&self, restaurant_id: i32) -> StoreResult<Option<RestaurantEntity>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .restaurants
            .iter()
            .find(|r| r.id == restaurant_id)
            .cloned())
    }

    async fn find_restaurant_by_app_id(
        &self,
        square_app_id: &str,
    ) -> StoreResult<Option<RestaurantEntity>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .restaurants
            .iter()
            .find(|r| r.square_app_id == square_app_id)
            .cloned())
    }

    async fn create_restaurant_with_admin(
        &self,
        restaurant: CreateRestaurantEntity,
        admin: NewUser,
    ) -> StoreResult<(RestaurantEntity, UserEntity)> {
        self.check_writable()?;
        let mut tables = self.tables.lock().unwrap();
        if tables
            .restaurants
            .iter()
            .any(|r| r.square_app_id == restaurant.square_app_id)
        {
            return Err(StoreError::UniqueViolation("unique_square_app_id".into()));
        }
        let now = Utc::now();
        let restaurant = RestaurantEntity {
            id: tables.id(),
            name: restaurant.name,
            square_app_id: restaurant.square_app_id,
            square_token: restaurant.square_token,
            location_id: restaurant.location_id,
            merchant_id: restaurant.merchant_id,
            created_at: now,
            updated_at: now,
        };
        tables.restaurants.push(restaurant.clone());
        let admin = tables.insert_user(restaurant.id, admin)?;
        Ok((restaurant, admin))
    }

    async fn find_user(
        &self,
        restaurant_id: i32,
        user_id: i32,
    ) -> StoreResult<Option<UserEntity>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .users
            .iter()
            .find(|u| u.id == user_id && u.restaurant_id == restaurant_id)
            .cloned())
    }

    async fn find_user_by_email(
        &self,
        restaurant_id: i32,
        email: &str,
    ) -> StoreResult<Option<UserEntity>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .users
            .iter()
            .find(|u| u.email == email && u.restaurant_id == restaurant_id)
            .cloned())
    }

    async fn create_user(&self, restaurant_id: i32, user: NewUser) -> StoreResult<UserEntity> {
        self.check_writable()?;
        self.tables.lock().unwrap().insert_user(restaurant_id, user)
    }

    async fn create_order(
        &self,
        order: CreateOrderEntity,
        lines: Vec<NewOrderLine>,
    ) -> StoreResult<OrderDetail> {
        self.check_writable()?;
        let mut tables = self.tables.lock().unwrap();
        if tables
            .orders
            .iter()
            .any(|o| o.remote_order_id == order.remote_order_id)
        {
            return Err(StoreError::UniqueViolation("unique_remote_order_id".into()));
        }
        let now = Utc::now();
        let order = OrderEntity {
            id: tables.id(),
            restaurant_id: order.restaurant_id,
            user_id: order.user_id,
            remote_order_id: order.remote_order_id,
            table_number: order.table_number,
            status: order.status,
            currency: order.currency,
            total_amount: order.total_amount,
            paid_amount: 0,
            tip_amount: 0,
            payment_id: None,
            location_id: order.location_id,
            raw_gateway_data: order.raw_gateway_data,
            opened_at: now,
            created_at: now,
            updated_at: now,
        };
        tables.orders.push(order.clone());

        for line in lines {
            let item = OrderItemEntity {
                id: tables.id(),
                order_id: order.id,
                name: line.name,
                comment: line.comment,
                unit_price: line.unit_price,
                quantity: line.quantity,
                amount: line.amount,
                remote_catalog_id: line.remote_catalog_id,
                remote_uid: line.remote_uid,
                created_at: now,
            };
            for d in line.discounts {
                let discount = OrderItemDiscountEntity {
                    id: tables.id(),
                    order_item_id: item.id,
                    name: d.name,
                    is_percentage: d.is_percentage,
                    value: d.value,
                    amount: d.amount,
                    remote_uid: d.remote_uid,
                    created_at: now,
                };
                tables.discounts.push(discount);
            }
            for m in line.modifiers {
                let modifier = OrderItemModifierEntity {
                    id: tables.id(),
                    order_item_id: item.id,
                    name: m.name,
                    unit_price: m.unit_price,
                    quantity: m.quantity,
                    amount: m.amount,
                    remote_uid: m.remote_uid,
                    created_at: now,
                };
                tables.modifiers.push(modifier);
            }
            tables.items.push(item);
        }

        Ok(tables.detail(&order))
    }

    async fn find_order(
        &self,
        restaurant_id: i32,
        order_id: i32,
    ) -> StoreResult<Option<OrderEntity>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .orders
            .iter()
            .find(|o| o.id == order_id && o.restaurant_id == restaurant_id)
            .cloned())
    }

    async fn find_order_detail(
        &self,
        restaurant_id: i32,
        order_id: i32,
    ) -> StoreResult<Option<OrderDetail>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .orders
            .iter()
            .find(|o| o.id == order_id && o.restaurant_id == restaurant_id)
            .map(|o| tables.detail(o)))
    }

    async fn list_orders_by_table(
        &self,
        restaurant_id: i32,
        table_number: i32,
    ) -> StoreResult<Vec<OrderEntity>> {
        let tables = self.tables.lock().unwrap();
        let mut orders: Vec<OrderEntity> = tables
            .orders
            .iter()
            .filter(|o| o.restaurant_id == restaurant_id && o.table_number == table_number)
            .cloned()
            .collect();
        orders.reverse();
        Ok(orders)
    }

    async fn update_order(
        &self,
        restaurant_id: i32,
        order_id: i32,
        changes: UpdateOrderEntity,
    ) -> StoreResult<Option<OrderEntity>> {
        self.check_writable()?;
        let mut tables = self.tables.lock().unwrap();
        let Some(order) = tables
            .orders
            .iter_mut()
            .find(|o| o.id == order_id && o.restaurant_id == restaurant_id)
        else {
            return Ok(None);
        };
        if let Some(status) = changes.status {
            order.status = status;
        }
        if let Some(paid_amount) = changes.paid_amount {
            order.paid_amount = paid_amount;
        }
        if let Some(tip_amount) = changes.tip_amount {
            order.tip_amount = tip_amount;
        }
        if let Some(payment_id) = changes.payment_id {
            order.payment_id = payment_id;
        }
        order.updated_at = Utc::now();
        Ok(Some(order.clone()))
    }

    async fn find_pending_payment(&self, order_id: i32) -> StoreResult<Option<PaymentEntity>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .payments
            .iter()
            .find(|p| p.order_id == order_id && p.status == PaymentStatus::Pending)
            .cloned())
    }

    async fn find_payment_by_remote_id(
        &self,
        restaurant_id: i32,
        remote_payment_id: &str,
    ) -> StoreResult<Option<PaymentEntity>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .payments
            .iter()
            .find(|p| p.remote_payment_id == remote_payment_id && p.restaurant_id == restaurant_id)
            .cloned())
    }

    async fn create_payment(&self, payment: CreatePaymentEntity) -> StoreResult<PaymentEntity> {
        self.check_writable()?;
        let mut tables = self.tables.lock().unwrap();
        if payment.status == PaymentStatus::Pending
            && tables
                .payments
                .iter()
                .any(|p| p.order_id == payment.order_id && p.status == PaymentStatus::Pending)
        {
            return Err(StoreError::UniqueViolation(
                "unique_pending_payment_per_order".into(),
            ));
        }
        let now = Utc::now();
        let payment = PaymentEntity {
            id: tables.id(),
            restaurant_id: payment.restaurant_id,
            order_id: payment.order_id,
            remote_payment_id: payment.remote_payment_id,
            bill_amount: payment.bill_amount,
            tip_amount: 0,
            total_amount: payment.total_amount,
            currency: payment.currency,
            status: payment.status,
            payment_method: payment.payment_method,
            processed_at: payment.processed_at,
            raw_gateway_data: payment.raw_gateway_data,
            created_at: now,
            updated_at: now,
        };
        tables.payments.push(payment.clone());
        Ok(payment)
    }

    async fn update_pending_payment(
        &self,
        restaurant_id: i32,
        payment_id: i32,
        changes: UpdatePaymentEntity,
    ) -> StoreResult<Option<PaymentEntity>> {
        self.check_writable()?;
        let mut tables = self.tables.lock().unwrap();
        let Some(payment) = tables.payments.iter_mut().find(|p| {
            p.id == payment_id
                && p.restaurant_id == restaurant_id
                && p.status == PaymentStatus::Pending
        }) else {
            return Ok(None);
        };
        payment.status = changes.status;
        payment.bill_amount = changes.bill_amount;
        payment.tip_amount = changes.tip_amount;
        payment.total_amount = changes.total_amount;
        if changes.processed_at.is_some() {
            payment.processed_at = changes.processed_at;
        }
        payment.raw_gateway_data = changes.raw_gateway_data;
        payment.updated_at = Utc::now();
        Ok(Some(payment.clone()))
    }
}

// ===== Scripted gateway =====

#[derive(Default)]
struct RemoteState {
    order_seq: u32,
    payment_seq: u32,
    orders: HashMap<String, RemoteOrder>,
    payments: HashMap<String, RemotePayment>,
}

/// Behaves like a cooperative Square account and records every call made.
pub struct FakeGateway {
    calls: Mutex<Vec<&'static str>>,
    failing: Mutex<HashSet<&'static str>>,
    capture_status: Mutex<String>,
    capture_amount: Mutex<Option<i64>>,
    no_locations: AtomicBool,
    state: Mutex<RemoteState>,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            capture_status: Mutex::new("COMPLETED".into()),
            capture_amount: Mutex::new(None),
            no_locations: AtomicBool::new(false),
            state: Mutex::new(RemoteState::default()),
        }
    }
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the named operation return an API error.
    pub fn fail(&self, operation: &'static str) {
        self.failing.lock().unwrap().insert(operation);
    }

    pub fn recover(&self, operation: &'static str) {
        self.failing.lock().unwrap().remove(operation);
    }

    pub fn set_capture_status(&self, status: &str) {
        *self.capture_status.lock().unwrap() = status.to_string();
    }

    /// Overrides the amount reported as captured.
    pub fn set_capture_amount(&self, amount: i64) {
        *self.capture_amount.lock().unwrap() = Some(amount);
    }

    pub fn without_locations(&self) {
        self.no_locations.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls().iter().filter(|c| **c == operation).count()
    }

    pub fn remote_payment(&self, id: &str) -> Option<RemotePayment> {
        self.state.lock().unwrap().payments.get(id).cloned()
    }

    fn record(&self, operation: &'static str) -> GatewayResult<()> {
        self.calls.lock().unwrap().push(operation);
        if self.failing.lock().unwrap().contains(operation) {
            return Err(GatewayError::Api {
                status: 400,
                detail: format!("{operation} rejected"),
            });
        }
        Ok(())
    }
}

fn money(amount: i64, currency: &str) -> Option<RemoteMoney> {
    Some(RemoteMoney::new(amount, currency))
}

fn with_raw_order(mut order: RemoteOrder) -> RemoteOrder {
    order.raw = json!({ "order": serde_json::to_value(&order).unwrap() });
    order
}

fn with_raw_payment(mut payment: RemotePayment) -> RemotePayment {
    payment.raw = json!({ "payment": serde_json::to_value(&payment).unwrap() });
    payment
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_order(
        &self,
        _credential: &GatewayCredential,
        request: &CreateRemoteOrder,
    ) -> GatewayResult<RemoteOrder> {
        self.record("create_order")?;
        let currency = request.currency.as_str();
        let mut state = self.state.lock().unwrap();
        state.order_seq += 1;
        let id = format!("O-{}", state.order_seq);

        let mut discounts = Vec::new();
        let mut line_items = Vec::new();
        let mut total = 0;
        let mut total_discount = 0;

        for (i, line) in request.line_items.iter().enumerate() {
            let modifiers: Vec<RemoteModifier> = line
                .modifiers
                .iter()
                .enumerate()
                .map(|(j, m)| RemoteModifier {
                    uid: Some(format!("{id}-li-{i}-mod-{j}")),
                    name: Some(m.name.clone()),
                    quantity: Some(m.quantity.to_string()),
                    base_price_money: money(m.unit_price, currency),
                    total_price_money: money(
                        m.unit_price * i64::from(m.quantity) * i64::from(line.quantity),
                        currency,
                    ),
                })
                .collect();
            let gross = line.unit_price * i64::from(line.quantity)
                + modifiers
                    .iter()
                    .map(|m| m.total_price_money.as_ref().map_or(0, |t| t.amount))
                    .sum::<i64>();

            let mut applied_discounts = Vec::new();
            let mut line_discount = 0;
            for (j, d) in line.discounts.iter().enumerate() {
                let uid = format!("line-{i}-discount-{j}");
                let (discount_type, percentage, amount_money, applied) = match d.value {
                    DiscountValue::Percentage(p) => (
                        "FIXED_PERCENTAGE",
                        Some(p.to_string()),
                        None,
                        gross * p / 100,
                    ),
                    DiscountValue::FixedAmount(a) => ("FIXED_AMOUNT", None, money(a, currency), a),
                };
                line_discount += applied;
                discounts.push(RemoteDiscount {
                    uid: Some(uid.clone()),
                    name: Some(d.name.clone()),
                    discount_type: Some(discount_type.into()),
                    percentage,
                    amount_money,
                    applied_money: money(applied, currency),
                    scope: Some("LINE_ITEM".into()),
                });
                applied_discounts.push(RemoteAppliedDiscount {
                    uid: Some(format!("{uid}-applied")),
                    discount_uid: uid,
                    applied_money: money(applied, currency),
                });
            }

            let line_total = gross - line_discount;
            total += line_total;
            total_discount += line_discount;
            line_items.push(RemoteLineItem {
                uid: Some(format!("{id}-li-{i}")),
                name: Some(line.name.clone()),
                quantity: line.quantity.to_string(),
                catalog_object_id: line.catalog_object_id.clone(),
                note: line.note.clone(),
                base_price_money: money(line.unit_price, currency),
                total_money: money(line_total, currency),
                total_discount_money: money(line_discount, currency),
                modifiers,
                applied_discounts,
            });
        }

        let order = with_raw_order(RemoteOrder {
            id: id.clone(),
            location_id: Some(request.location_id.clone()),
            reference_id: Some(format!("table-{}", request.table_number)),
            state: Some("OPEN".into()),
            line_items,
            discounts,
            total_money: money(total, currency),
            total_tax_money: money(0, currency),
            total_discount_money: money(total_discount, currency),
            total_service_charge_money: money(0, currency),
            total_tip_money: None,
            created_at: Some(Utc::now().to_rfc3339()),
            updated_at: None,
            raw: Value::Null,
        });
        state.orders.insert(id, order.clone());
        Ok(order)
    }

    async fn create_payment_intent(
        &self,
        _credential: &GatewayCredential,
        request: &CreatePaymentIntent,
    ) -> GatewayResult<RemotePayment> {
        self.record("create_payment_intent")?;
        let mut state = self.state.lock().unwrap();
        state.payment_seq += 1;
        let id = format!("P-{}", state.payment_seq);
        let payment = with_raw_payment(RemotePayment {
            id: id.clone(),
            status: "APPROVED".into(),
            order_id: Some(request.remote_order_id.clone()),
            amount_money: money(request.amount, &request.currency),
            tip_money: None,
            total_money: money(request.amount, &request.currency),
            created_at: Some(Utc::now().to_rfc3339()),
            updated_at: None,
            raw: Value::Null,
        });
        state.payments.insert(id, payment.clone());
        Ok(payment)
    }

    async fn update_payment_tip(
        &self,
        _credential: &GatewayCredential,
        remote_payment_id: &str,
        tip: &RemoteMoney,
        _idempotency_key: &str,
    ) -> GatewayResult<RemotePayment> {
        self.record("update_payment_tip")?;
        let mut state = self.state.lock().unwrap();
        let payment = state
            .payments
            .get_mut(remote_payment_id)
            .ok_or_else(|| GatewayError::Api {
                status: 404,
                detail: "payment not found".into(),
            })?;
        payment.tip_money = Some(tip.clone());
        Ok(with_raw_payment(payment.clone()))
    }

    async fn capture_payment(
        &self,
        _credential: &GatewayCredential,
        remote_payment_id: &str,
    ) -> GatewayResult<RemotePayment> {
        self.record("capture_payment")?;
        let status = self.capture_status.lock().unwrap().clone();
        let captured = *self.capture_amount.lock().unwrap();
        let mut state = self.state.lock().unwrap();
        let payment = state
            .payments
            .get_mut(remote_payment_id)
            .ok_or_else(|| GatewayError::Api {
                status: 404,
                detail: "payment not found".into(),
            })?;

        let currency = payment
            .amount_money
            .as_ref()
            .map_or_else(|| "USD".to_string(), |m| m.currency.clone());
        if let Some(amount) = captured {
            payment.amount_money = money(amount, &currency);
        }
        let amount = payment.amount_money.as_ref().map_or(0, |m| m.amount);
        let tip = payment.tip_money.as_ref().map_or(0, |m| m.amount);
        payment.status = status;
        payment.total_money = money(amount + tip, &currency);
        payment.updated_at = Some(Utc::now().to_rfc3339());
        Ok(with_raw_payment(payment.clone()))
    }

    async fn fetch_order(
        &self,
        _credential: &GatewayCredential,
        remote_order_id: &str,
    ) -> GatewayResult<RemoteOrder> {
        self.record("fetch_order")?;
        self.state
            .lock()
            .unwrap()
            .orders
            .get(remote_order_id)
            .cloned()
            .ok_or_else(|| GatewayError::Api {
                status: 404,
                detail: "order not found".into(),
            })
    }

    async fn resolve_location(
        &self,
        _credential: &GatewayCredential,
    ) -> GatewayResult<RemoteLocation> {
        self.record("resolve_location")?;
        if self.no_locations.load(Ordering::SeqCst) {
            return Err(GatewayError::NoLocations);
        }
        Ok(RemoteLocation {
            id: "L1".into(),
            merchant_id: Some("M1".into()),
        })
    }
}

// ===== App wiring =====

pub fn test_config() -> AppConfig {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("DATABASE_URL", "postgres://unused/pos"),
        ("JWT_SECRET", "test-secret"),
    ]);
    AppConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap()
}

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<FakeGateway>,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(FakeGateway::new());
        let state = AppState::new(config, store.clone(), gateway.clone());
        Self {
            store,
            gateway,
            state,
        }
    }

    pub fn router(&self) -> Router {
        routes::app(self.state.clone())
    }

    /// Seeds a restaurant with an admin and returns the admin's context.
    pub async fn tenant(&self, app_id: &str) -> TenantContext {
        let (restaurant, admin) = self
            .store
            .create_restaurant_with_admin(
                CreateRestaurantEntity {
                    name: format!("Restaurant {app_id}"),
                    square_app_id: app_id.into(),
                    square_token: format!("token-{app_id}"),
                    location_id: "L1".into(),
                    merchant_id: "M1".into(),
                },
                NewUser {
                    username: "owner".into(),
                    email: format!("owner@{app_id}.test"),
                    password_hash: "not-a-real-hash".into(),
                    role: Role::Admin,
                },
            )
            .await
            .unwrap();
        TenantContext {
            restaurant,
            user_id: admin.id,
            email: admin.email,
            role: admin.role,
        }
    }

    /// Adds a user with `role` to the tenant and returns that user's context.
    pub async fn member(&self, tenant: &TenantContext, role: Role) -> TenantContext {
        let user = self
            .store
            .create_user(
                tenant.restaurant_id(),
                NewUser {
                    username: role.to_string(),
                    email: format!("{role}@{}.test", tenant.restaurant.square_app_id),
                    password_hash: "not-a-real-hash".into(),
                    role,
                },
            )
            .await
            .unwrap();
        TenantContext {
            restaurant: tenant.restaurant.clone(),
            user_id: user.id,
            email: user.email,
            role: user.role,
        }
    }

    pub async fn token(&self, tenant: &TenantContext) -> String {
        let user = self
            .store
            .find_user(tenant.restaurant_id(), tenant.user_id)
            .await
            .unwrap()
            .unwrap();
        self.state.tokens.issue(&user).unwrap().token
    }

    /// Sends a request through the full router and returns status and JSON body.
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }
}

pub fn burger_order() -> Value {
    json!({
        "table_number": 5,
        "location_id": "L1",
        "items": [{ "name": "Burger", "unit_price": 1200, "quantity": 2 }]
    })
}
