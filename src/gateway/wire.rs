//! Subset of the Square v2 object model the workflows depend on. Everything
//! else stays in the raw snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMoney {
    pub amount: i64,
    pub currency: String,
}

impl RemoteMoney {
    pub fn new(amount: i64, currency: &str) -> Self {
        Self {
            amount,
            currency: currency.to_string(),
        }
    }
}

/// Amount of an optional money field, zero when absent.
pub fn money_amount(money: &Option<RemoteMoney>) -> i64 {
    money.as_ref().map_or(0, |m| m.amount)
}

pub fn parse_timestamp(value: &Option<String>) -> Option<DateTime<Utc>> {
    value
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteOrder {
    pub id: String,
    #[serde(default)]
    pub location_id: Option<String>,
    #[serde(default)]
    pub reference_id: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub line_items: Vec<RemoteLineItem>,
    #[serde(default)]
    pub discounts: Vec<RemoteDiscount>,
    #[serde(default)]
    pub total_money: Option<RemoteMoney>,
    #[serde(default)]
    pub total_tax_money: Option<RemoteMoney>,
    #[serde(default)]
    pub total_discount_money: Option<RemoteMoney>,
    #[serde(default)]
    pub total_service_charge_money: Option<RemoteMoney>,
    #[serde(default)]
    pub total_tip_money: Option<RemoteMoney>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Verbatim response body.
    #[serde(skip)]
    pub raw: Value,
}

impl RemoteOrder {
    pub fn discount(&self, uid: &str) -> Option<&RemoteDiscount> {
        self.discounts.iter().find(|d| d.uid.as_deref() == Some(uid))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteLineItem {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub quantity: String,
    #[serde(default)]
    pub catalog_object_id: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub base_price_money: Option<RemoteMoney>,
    #[serde(default)]
    pub total_money: Option<RemoteMoney>,
    #[serde(default)]
    pub total_discount_money: Option<RemoteMoney>,
    #[serde(default)]
    pub modifiers: Vec<RemoteModifier>,
    #[serde(default)]
    pub applied_discounts: Vec<RemoteAppliedDiscount>,
}

impl RemoteLineItem {
    /// Quantities travel as decimal strings; fractional quantities are truncated.
    pub fn quantity(&self) -> i32 {
        let raw = self.quantity.trim();
        raw.parse::<i32>()
            .ok()
            .or_else(|| raw.split('.').next().and_then(|whole| whole.parse().ok()))
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteModifier {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub quantity: Option<String>,
    #[serde(default)]
    pub base_price_money: Option<RemoteMoney>,
    #[serde(default)]
    pub total_price_money: Option<RemoteMoney>,
}

impl RemoteModifier {
    pub fn quantity(&self) -> i32 {
        self.quantity
            .as_deref()
            .and_then(|q| q.trim().parse().ok())
            .unwrap_or(1)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteAppliedDiscount {
    #[serde(default)]
    pub uid: Option<String>,
    pub discount_uid: String,
    #[serde(default)]
    pub applied_money: Option<RemoteMoney>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteDiscount {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub discount_type: Option<String>,
    #[serde(default)]
    pub percentage: Option<String>,
    #[serde(default)]
    pub amount_money: Option<RemoteMoney>,
    #[serde(default)]
    pub applied_money: Option<RemoteMoney>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl RemoteDiscount {
    pub fn is_percentage(&self) -> bool {
        self.discount_type
            .as_deref()
            .is_some_and(|t| t.ends_with("PERCENTAGE"))
    }

    /// Percent for percentage discounts, minor units otherwise.
    pub fn value(&self) -> i64 {
        if self.is_percentage() {
            self.percentage
                .as_deref()
                .and_then(|p| p.split('.').next())
                .and_then(|p| p.parse().ok())
                .unwrap_or(0)
        } else {
            money_amount(&self.amount_money)
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemotePayment {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub amount_money: Option<RemoteMoney>,
    #[serde(default)]
    pub tip_money: Option<RemoteMoney>,
    #[serde(default)]
    pub total_money: Option<RemoteMoney>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Verbatim response body.
    #[serde(skip)]
    pub raw: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteLocation {
    pub id: String,
    #[serde(default)]
    pub merchant_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_an_order_with_nested_adjustments() {
        let order: RemoteOrder = serde_json::from_value(json!({
            "id": "O-1",
            "location_id": "L1",
            "state": "OPEN",
            "line_items": [{
                "uid": "li-1",
                "name": "Burger",
                "quantity": "2",
                "base_price_money": { "amount": 1200, "currency": "USD" },
                "total_money": { "amount": 2160, "currency": "USD" },
                "modifiers": [{
                    "uid": "m-1",
                    "name": "Cheese",
                    "base_price_money": { "amount": 100, "currency": "USD" },
                    "total_price_money": { "amount": 200, "currency": "USD" }
                }],
                "applied_discounts": [{
                    "uid": "ad-1",
                    "discount_uid": "line-0-discount-0",
                    "applied_money": { "amount": 240, "currency": "USD" }
                }]
            }],
            "discounts": [{
                "uid": "line-0-discount-0",
                "name": "Happy hour",
                "type": "FIXED_PERCENTAGE",
                "percentage": "10",
                "scope": "LINE_ITEM"
            }],
            "total_money": { "amount": 2160, "currency": "USD" },
            "unknown_field": true
        }))
        .unwrap();

        let line = &order.line_items[0];
        assert_eq!(line.quantity(), 2);
        assert_eq!(line.modifiers[0].quantity(), 1);
        assert_eq!(money_amount(&line.modifiers[0].total_price_money), 200);

        let discount = order.discount("line-0-discount-0").unwrap();
        assert!(discount.is_percentage());
        assert_eq!(discount.value(), 10);
        assert_eq!(money_amount(&order.total_tax_money), 0);
    }

    #[test]
    fn fractional_quantities_truncate() {
        let line = RemoteLineItem {
            quantity: "3.0".into(),
            ..Default::default()
        };
        assert_eq!(line.quantity(), 3);
    }

    #[test]
    fn timestamps_parse_as_utc() {
        let ts = parse_timestamp(&Some("2025-06-01T12:30:00.000Z".into())).unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-06-01T12:30:00+00:00");
        assert!(parse_timestamp(&Some("yesterday".into())).is_none());
        assert!(parse_timestamp(&None).is_none());
    }
}
