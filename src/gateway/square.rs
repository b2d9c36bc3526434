//! Square Connect v2 adapter over plain REST.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::{
    CreatePaymentIntent, CreateRemoteOrder, DiscountValue, GatewayCredential, GatewayError,
    GatewayResult, PaymentGateway, RemoteLocation, RemoteMoney, RemoteOrder, RemotePayment,
};
use crate::config::GatewayConfig;

pub struct SquareGateway {
    http_client: Client,
    base_url: String,
    api_version: String,
}

impl SquareGateway {
    pub fn new(config: &GatewayConfig) -> GatewayResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends an authenticated request and returns the parsed JSON body.
    async fn send(
        &self,
        request: RequestBuilder,
        credential: &GatewayCredential,
    ) -> GatewayResult<Value> {
        let response = request
            .bearer_auth(credential.token())
            .header("Square-Version", &self.api_version)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        parse_response(status.as_u16(), &text)
    }
}

/// Maps a raw response to its JSON body. Non-2xx statuses always become
/// `Api` errors, even when the body is not JSON (e.g. a proxy error page).
fn parse_response(status: u16, text: &str) -> GatewayResult<Value> {
    let body = serde_json::from_str::<Value>(text);

    if !(200..300).contains(&status) {
        let detail = match &body {
            Ok(body) => error_detail(body),
            Err(_) if text.trim().is_empty() => "empty response body".to_string(),
            Err(_) => text.trim().chars().take(200).collect(),
        };
        return Err(GatewayError::Api { status, detail });
    }

    body.map_err(|e| GatewayError::Decode(e.to_string()))
}

/// Extracts the envelope field and keeps the full body as the raw snapshot.
fn take<T: DeserializeOwned>(body: &Value, key: &str) -> GatewayResult<T> {
    let field = body
        .get(key)
        .cloned()
        .ok_or_else(|| GatewayError::Decode(format!("response has no '{key}' field")))?;
    serde_json::from_value(field).map_err(|e| GatewayError::Decode(e.to_string()))
}

fn take_order(body: Value) -> GatewayResult<RemoteOrder> {
    let mut order: RemoteOrder = take(&body, "order")?;
    order.raw = body;
    Ok(order)
}

fn take_payment(body: Value) -> GatewayResult<RemotePayment> {
    let mut payment: RemotePayment = take(&body, "payment")?;
    payment.raw = body;
    Ok(payment)
}

fn error_detail(body: &Value) -> String {
    let details: Vec<String> = body
        .get("errors")
        .and_then(Value::as_array)
        .map(|errors| {
            errors
                .iter()
                .map(|e| {
                    let code = e.get("code").and_then(Value::as_str).unwrap_or("UNKNOWN");
                    match e.get("detail").and_then(Value::as_str) {
                        Some(detail) => format!("{code}: {detail}"),
                        None => code.to_string(),
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    if details.is_empty() {
        "unknown gateway error".to_string()
    } else {
        details.join("; ")
    }
}

fn money(amount: i64, currency: &str) -> Value {
    json!({ "amount": amount, "currency": currency })
}

/// Builds the create-order body. Line discounts become order-level discounts
/// scoped to their line and referenced by a uid unique within the request.
pub(crate) fn create_order_body(request: &CreateRemoteOrder) -> Value {
    let currency = request.currency.as_str();
    let mut discounts = Vec::new();

    let line_items: Vec<Value> = request
        .line_items
        .iter()
        .enumerate()
        .map(|(line_index, item)| {
            let applied_discounts: Vec<Value> = item
                .discounts
                .iter()
                .enumerate()
                .map(|(discount_index, discount)| {
                    let uid = format!("line-{line_index}-discount-{discount_index}");
                    let mut body = json!({
                        "uid": uid,
                        "name": discount.name,
                        "scope": "LINE_ITEM",
                    });
                    match discount.value {
                        DiscountValue::Percentage(percent) => {
                            body["type"] = json!("FIXED_PERCENTAGE");
                            body["percentage"] = json!(percent.to_string());
                        }
                        DiscountValue::FixedAmount(amount) => {
                            body["type"] = json!("FIXED_AMOUNT");
                            body["amount_money"] = money(amount, currency);
                        }
                    }
                    discounts.push(body);
                    json!({ "discount_uid": uid })
                })
                .collect();

            let modifiers: Vec<Value> = item
                .modifiers
                .iter()
                .map(|m| {
                    json!({
                        "name": m.name,
                        "quantity": m.quantity.to_string(),
                        "base_price_money": money(m.unit_price, currency),
                    })
                })
                .collect();

            let mut line = json!({
                "name": item.name,
                "quantity": item.quantity.to_string(),
                "base_price_money": money(item.unit_price, currency),
            });
            if let Some(catalog_object_id) = &item.catalog_object_id {
                line["catalog_object_id"] = json!(catalog_object_id);
            }
            if let Some(note) = &item.note {
                line["note"] = json!(note);
            }
            if !modifiers.is_empty() {
                line["modifiers"] = json!(modifiers);
            }
            if !applied_discounts.is_empty() {
                line["applied_discounts"] = json!(applied_discounts);
            }
            line
        })
        .collect();

    let mut order = json!({
        "location_id": request.location_id,
        "reference_id": format!("table-{}", request.table_number),
        "line_items": line_items,
    });
    if !discounts.is_empty() {
        order["discounts"] = json!(discounts);
    }

    json!({
        "idempotency_key": request.idempotency_key,
        "order": order,
    })
}

pub(crate) fn create_payment_body(request: &CreatePaymentIntent) -> Value {
    let mut body = json!({
        "idempotency_key": request.idempotency_key,
        "source_id": request.source_id,
        "amount_money": money(request.amount, &request.currency),
        "order_id": request.remote_order_id,
        "location_id": request.location_id,
        "autocomplete": false,
    });
    if let Some(reference_id) = &request.reference_id {
        body["reference_id"] = json!(reference_id);
    }
    if let Some(note) = &request.note {
        body["note"] = json!(note);
    }
    body
}

#[async_trait]
impl PaymentGateway for SquareGateway {
    async fn create_order(
        &self,
        credential: &GatewayCredential,
        request: &CreateRemoteOrder,
    ) -> GatewayResult<RemoteOrder> {
        let body = self
            .send(
                self.http_client
                    .post(self.url("/v2/orders"))
                    .json(&create_order_body(request)),
                credential,
            )
            .await?;
        take_order(body)
    }

    async fn create_payment_intent(
        &self,
        credential: &GatewayCredential,
        request: &CreatePaymentIntent,
    ) -> GatewayResult<RemotePayment> {
        let body = self
            .send(
                self.http_client
                    .post(self.url("/v2/payments"))
                    .json(&create_payment_body(request)),
                credential,
            )
            .await?;
        take_payment(body)
    }

    async fn update_payment_tip(
        &self,
        credential: &GatewayCredential,
        remote_payment_id: &str,
        tip: &RemoteMoney,
        idempotency_key: &str,
    ) -> GatewayResult<RemotePayment> {
        let body = self
            .send(
                self.http_client
                    .put(self.url(&format!("/v2/payments/{remote_payment_id}")))
                    .json(&json!({
                        "idempotency_key": idempotency_key,
                        "payment": { "tip_money": tip },
                    })),
                credential,
            )
            .await?;
        take_payment(body)
    }

    async fn capture_payment(
        &self,
        credential: &GatewayCredential,
        remote_payment_id: &str,
    ) -> GatewayResult<RemotePayment> {
        let body = self
            .send(
                self.http_client
                    .post(self.url(&format!("/v2/payments/{remote_payment_id}/complete")))
                    .json(&json!({})),
                credential,
            )
            .await?;
        take_payment(body)
    }

    async fn fetch_order(
        &self,
        credential: &GatewayCredential,
        remote_order_id: &str,
    ) -> GatewayResult<RemoteOrder> {
        let body = self
            .send(
                self.http_client
                    .get(self.url(&format!("/v2/orders/{remote_order_id}"))),
                credential,
            )
            .await?;
        take_order(body)
    }

    async fn resolve_location(
        &self,
        credential: &GatewayCredential,
    ) -> GatewayResult<RemoteLocation> {
        let body = self
            .send(self.http_client.get(self.url("/v2/locations")), credential)
            .await?;
        let locations: Vec<RemoteLocation> = match body.get("locations") {
            Some(_) => take(&body, "locations")?,
            None => Vec::new(),
        };
        locations.into_iter().next().ok_or(GatewayError::NoLocations)
    }
}
