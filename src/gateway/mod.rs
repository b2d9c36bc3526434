//! Capability interface over the remote payments platform.
//!
//! The gateway is stateless with respect to tenants: every call receives the
//! tenant's credential explicitly. Amounts crossing this boundary are always
//! minor units tagged with a currency.

mod square;
mod wire;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub use square::SquareGateway;
pub use wire::{
    RemoteAppliedDiscount, RemoteDiscount, RemoteLineItem, RemoteLocation, RemoteModifier,
    RemoteMoney, RemoteOrder, RemotePayment, money_amount, parse_timestamp,
};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("gateway returned status {status}: {detail}")]
    Api { status: u16, detail: String },
    #[error("unexpected gateway response: {0}")]
    Decode(String),
    #[error("credential does not grant access to any location")]
    NoLocations,
    #[error("payment ended in status {0}")]
    PaymentNotCompleted(String),
}

impl GatewayError {
    /// Message from the remote platform that may be shown to operators.
    pub fn detail(&self) -> Option<String> {
        match self {
            GatewayError::Api { detail, .. } => Some(detail.clone()),
            GatewayError::NoLocations | GatewayError::PaymentNotCompleted(_) => {
                Some(self.to_string())
            }
            GatewayError::Transport(_) | GatewayError::Decode(_) => None,
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// A tenant's access token for the payments platform.
#[derive(Clone)]
pub struct GatewayCredential(String);

impl GatewayCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for GatewayCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GatewayCredential(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscountValue {
    /// Whole percent, e.g. `10` for 10%.
    Percentage(i64),
    /// Minor units.
    FixedAmount(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDiscountInput {
    pub name: String,
    pub value: DiscountValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteModifierInput {
    pub name: String,
    pub unit_price: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLineItemInput {
    pub name: String,
    pub catalog_object_id: Option<String>,
    pub note: Option<String>,
    pub unit_price: i64,
    pub quantity: i32,
    pub modifiers: Vec<RemoteModifierInput>,
    pub discounts: Vec<RemoteDiscountInput>,
}

#[derive(Debug, Clone)]
pub struct CreateRemoteOrder {
    pub idempotency_key: String,
    pub location_id: String,
    pub table_number: i32,
    pub currency: String,
    pub line_items: Vec<RemoteLineItemInput>,
}

#[derive(Debug, Clone)]
pub struct CreatePaymentIntent {
    pub idempotency_key: String,
    pub remote_order_id: String,
    pub amount: i64,
    pub currency: String,
    pub source_id: String,
    pub location_id: String,
    pub reference_id: Option<String>,
    pub note: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(
        &self,
        credential: &GatewayCredential,
        request: &CreateRemoteOrder,
    ) -> GatewayResult<RemoteOrder>;

    /// Authorizes a charge without capturing it.
    async fn create_payment_intent(
        &self,
        credential: &GatewayCredential,
        request: &CreatePaymentIntent,
    ) -> GatewayResult<RemotePayment>;

    async fn update_payment_tip(
        &self,
        credential: &GatewayCredential,
        remote_payment_id: &str,
        tip: &RemoteMoney,
        idempotency_key: &str,
    ) -> GatewayResult<RemotePayment>;

    async fn capture_payment(
        &self,
        credential: &GatewayCredential,
        remote_payment_id: &str,
    ) -> GatewayResult<RemotePayment>;

    async fn fetch_order(
        &self,
        credential: &GatewayCredential,
        remote_order_id: &str,
    ) -> GatewayResult<RemoteOrder>;

    /// Validates a credential and returns its primary location.
    async fn resolve_location(
        &self,
        credential: &GatewayCredential,
    ) -> GatewayResult<RemoteLocation>;

    /// Attaches the tip (if any) and then captures. The capture is never
    /// attempted when the tip update fails.
    async fn complete_payment(
        &self,
        credential: &GatewayCredential,
        remote_payment_id: &str,
        tip_amount: i64,
        currency: &str,
    ) -> GatewayResult<RemotePayment> {
        if tip_amount > 0 {
            let tip = RemoteMoney::new(tip_amount, currency);
            let idempotency_key = Uuid::new_v4().to_string();
            self.update_payment_tip(credential, remote_payment_id, &tip, &idempotency_key)
                .await?;
        }

        self.capture_payment(credential, remote_payment_id).await
    }
}
