//! Order Aggregate
//!
//! Orders are created by the backend at checkout. The admin client only reads
//! them and requests bulk status changes, so the interesting part of this
//! module is the status state machine and the bucket table built on it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    pub shipping_address: ShippingAddress,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub items: Vec<LineItem>,
    /// Total before discounts.
    pub total_price: Money,
    /// Amount payable after discounts.
    pub final_price: Money,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress { pub address: String, pub phone: String }

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: String,
    pub product_name: String,
    pub price: Money,
    pub size: String,
    pub color: String,
    pub quantity: u32,
}

impl LineItem {
    pub fn line_total(&self) -> Money { self.price.multiply(self.quantity) }
}

impl Order {
    pub fn is_paid(&self) -> bool { self.payment_status == PaymentStatus::Paid }
    pub fn discount(&self) -> Money { self.total_price - self.final_price }
    pub fn item_count(&self) -> u32 { self.items.iter().map(|i| i.quantity).sum() }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    ReadyForPickup,
    Shipping,
    Delivered,
    Completed,
    Canceled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::ReadyForPickup,
        OrderStatus::Shipping,
        OrderStatus::Delivered,
        OrderStatus::Completed,
        OrderStatus::Canceled,
    ];

    /// Name used on the wire and in route paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::ReadyForPickup => "ready_for_pickup",
            Self::Shipping => "shipping",
            Self::Delivered => "delivered",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending confirmation",
            Self::ReadyForPickup => "Ready for pickup",
            Self::Shipping => "Shipping",
            Self::Delivered => "Delivered",
            Self::Completed => "Completed",
            Self::Canceled => "Canceled",
        }
    }

    pub fn is_terminal(&self) -> bool { allowed_transitions(*self).is_empty() }
    pub fn can_transition_to(&self, next: OrderStatus) -> bool { allowed_transitions(*self).contains(&next) }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        OrderStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == normalized)
            .ok_or_else(|| OrderError::UnknownStatus(s.to_string()))
    }
}

/// Statuses an order in `status` may move to.
///
/// Cancellation is reachable from the two pre-dispatch states but no bucket
/// exposes it; it is initiated by the customer or the backend.
pub fn allowed_transitions(status: OrderStatus) -> &'static [OrderStatus] {
    use OrderStatus::*;
    match status {
        Pending => &[ReadyForPickup, Canceled],
        ReadyForPickup => &[Shipping, Canceled],
        Shipping => &[Delivered],
        Delivered => &[Completed],
        Completed | Canceled => &[],
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
}

/// One row of the order bucket table: which status a list screen shows and
/// which bulk action it offers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BucketSpec {
    pub status: OrderStatus,
    pub next: Option<OrderStatus>,
    pub title: &'static str,
    pub action_label: Option<&'static str>,
    /// Pending orders are split into paid and unpaid tabs.
    pub split_by_payment: bool,
}

pub static ORDER_BUCKETS: [BucketSpec; 6] = [
    BucketSpec { status: OrderStatus::Pending, next: Some(OrderStatus::ReadyForPickup), title: "Pending confirmation", action_label: Some("Confirm orders"), split_by_payment: true },
    BucketSpec { status: OrderStatus::ReadyForPickup, next: Some(OrderStatus::Shipping), title: "Ready for pickup", action_label: Some("Hand over to carrier"), split_by_payment: false },
    BucketSpec { status: OrderStatus::Shipping, next: Some(OrderStatus::Delivered), title: "Shipping", action_label: Some("Mark delivered"), split_by_payment: false },
    BucketSpec { status: OrderStatus::Delivered, next: None, title: "Delivered", action_label: None, split_by_payment: false },
    BucketSpec { status: OrderStatus::Completed, next: None, title: "Completed", action_label: None, split_by_payment: false },
    BucketSpec { status: OrderStatus::Canceled, next: None, title: "Canceled", action_label: None, split_by_payment: false },
];

pub fn bucket(status: OrderStatus) -> &'static BucketSpec {
    // ORDER_BUCKETS is ordered like OrderStatus::ALL
    &ORDER_BUCKETS[status as usize]
}

/// Body of the shared bulk status-change endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    pub order_ids: Vec<String>,
    pub status: OrderStatus,
}

impl StatusChange {
    /// Builds a request moving `order_ids` out of `from`. The backend applies
    /// it to all ids or fails as a whole.
    pub fn new(from: OrderStatus, order_ids: Vec<String>, to: OrderStatus) -> Result<Self, OrderError> {
        if order_ids.is_empty() { return Err(OrderError::EmptySelection); }
        if !from.can_transition_to(to) { return Err(OrderError::IllegalTransition { from, to }); }
        Ok(Self { order_ids, status: to })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError { EmptySelection, IllegalTransition { from: OrderStatus, to: OrderStatus }, UnknownStatus(String) }
impl std::error::Error for OrderError {}
impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySelection => write!(f, "No orders selected"),
            Self::IllegalTransition { from, to } => write!(f, "Orders cannot move from {} to {}", from.label(), to.label()),
            Self::UnknownStatus(s) => write!(f, "Unknown order status '{s}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Order {
        serde_json::from_value(serde_json::json!({
            "id": "o1",
            "user_id": "u1",
            "shipping_address": { "address": "12 Le Loi, District 1", "phone": "0901234567" },
            "status": "pending",
            "payment_status": "paid",
            "items": [
                { "product_id": "p1", "product_name": "Linen shirt", "price": 250000, "size": "M", "color": "white", "quantity": 2 },
                { "product_id": "p2", "product_name": "Cap", "price": 90000, "size": "F", "color": "black", "quantity": 1 }
            ],
            "total_price": 590000,
            "final_price": 531000
        }))
        .unwrap()
    }

    #[test]
    fn test_order_decodes_from_backend_shape() {
        let order = sample();
        assert!(order.is_paid());
        assert_eq!(order.item_count(), 3);
        assert_eq!(order.items[0].line_total(), Money::dong(500_000));
        assert_eq!(order.discount(), Money::dong(59_000));
        assert_eq!(order.created_at, None);
    }

    #[test]
    fn test_order_workflow() {
        let mut status = OrderStatus::Pending;
        for next in [OrderStatus::ReadyForPickup, OrderStatus::Shipping, OrderStatus::Delivered, OrderStatus::Completed] {
            assert!(status.can_transition_to(next));
            status = next;
        }
        assert!(status.is_terminal());
        assert!(OrderStatus::Canceled.is_terminal());
        assert!(!OrderStatus::Shipping.can_transition_to(OrderStatus::Canceled));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn test_bucket_table_follows_state_machine() {
        for (spec, status) in ORDER_BUCKETS.iter().zip(OrderStatus::ALL) {
            assert_eq!(spec.status, status);
            assert_eq!(bucket(status), spec);
            if let Some(next) = spec.next {
                assert!(status.can_transition_to(next), "{status} -> {next}");
                assert!(spec.action_label.is_some());
            }
        }
        let actionable: Vec<_> = ORDER_BUCKETS.iter().filter(|b| b.next.is_some()).map(|b| b.status).collect();
        assert_eq!(actionable, vec![OrderStatus::Pending, OrderStatus::ReadyForPickup, OrderStatus::Shipping]);
        assert_eq!(ORDER_BUCKETS.iter().filter(|b| b.split_by_payment).count(), 1);
    }

    #[test]
    fn test_status_change_requires_selection_and_legal_target() {
        assert_eq!(StatusChange::new(OrderStatus::Pending, vec![], OrderStatus::ReadyForPickup), Err(OrderError::EmptySelection));
        assert!(matches!(
            StatusChange::new(OrderStatus::Delivered, vec!["o1".into()], OrderStatus::Shipping),
            Err(OrderError::IllegalTransition { .. })
        ));
        let change = StatusChange::new(OrderStatus::Shipping, vec!["o1".into(), "o2".into()], OrderStatus::Delivered).unwrap();
        assert_eq!(
            serde_json::to_value(&change).unwrap(),
            serde_json::json!({ "order_ids": ["o1", "o2"], "status": "delivered" })
        );
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("ready-for-pickup".parse::<OrderStatus>().unwrap(), OrderStatus::ReadyForPickup);
        assert_eq!("Canceled".parse::<OrderStatus>().unwrap(), OrderStatus::Canceled);
        assert!("lost".parse::<OrderStatus>().is_err());
    }
}
