//! Order lifecycle view
//!
//! One view parametrized by a row of [`ORDER_BUCKETS`] serves every status
//! list. The bulk action posts all selected ids at once; the backend applies
//! the change to all of them or rejects the whole call.

use std::collections::BTreeSet;

use crate::api::{paths, Envelope};
use crate::data::{DataLayer, ViewScope};
use crate::domain::{bucket, AdminEvent, BucketSpec, Order, OrderStatus, StatusChange};
use crate::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PaymentTab {
    #[default]
    All,
    Paid,
    Unpaid,
}

impl std::str::FromStr for PaymentTab {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "paid" => Ok(Self::Paid),
            "unpaid" => Ok(Self::Unpaid),
            other => Err(format!("unknown payment tab '{other}'")),
        }
    }
}

/// Display-ready order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCard {
    pub id: String,
    pub customer: String,
    pub address: String,
    pub phone: String,
    pub lines: Vec<String>,
    pub total: String,
    pub payable: String,
    pub paid: bool,
    pub selected: bool,
}

pub struct OrderBucketView {
    data: DataLayer,
    scope: ViewScope,
    spec: &'static BucketSpec,
    orders: Vec<Order>,
    tab: PaymentTab,
    selected: BTreeSet<String>,
    stale: bool,
}

impl std::fmt::Debug for OrderBucketView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderBucketView")
            .field("status", &self.spec.status)
            .field("orders", &self.orders.len())
            .field("selected", &self.selected)
            .field("stale", &self.stale)
            .finish()
    }
}

impl OrderBucketView {
    pub fn new(data: &DataLayer, status: OrderStatus) -> Self {
        Self {
            data: data.clone(),
            scope: data.scope("orders"),
            spec: bucket(status),
            orders: Vec::new(),
            tab: PaymentTab::All,
            selected: BTreeSet::new(),
            stale: false,
        }
    }

    pub fn spec(&self) -> &'static BucketSpec { self.spec }
    pub fn orders(&self) -> &[Order] { &self.orders }
    pub fn tab(&self) -> PaymentTab { self.tab }
    /// Set when the last re-fetch after a transition failed.
    pub fn is_stale(&self) -> bool { self.stale }

    /// Fetches the bucket's orders, filtered server-side by status.
    pub async fn load(&mut self) -> Result<()> {
        let env: Envelope<Vec<Order>> = self.data.fetch(&self.scope, &paths::orders(self.spec.status)).await?;
        self.orders = env.data.unwrap_or_default();
        let loaded: BTreeSet<&str> = self.orders.iter().map(|o| o.id.as_str()).collect();
        self.selected.retain(|id| loaded.contains(id.as_str()));
        self.stale = false;
        tracing::debug!(status = %self.spec.status, count = self.orders.len(), "Orders loaded");
        Ok(())
    }

    /// Tabs only apply to buckets split by payment status.
    pub fn set_tab(&mut self, tab: PaymentTab) {
        self.tab = if self.spec.split_by_payment { tab } else { PaymentTab::All };
    }

    pub fn visible(&self) -> impl Iterator<Item = &Order> {
        let tab = self.tab;
        self.orders.iter().filter(move |o| match tab {
            PaymentTab::All => true,
            PaymentTab::Paid => o.is_paid(),
            PaymentTab::Unpaid => !o.is_paid(),
        })
    }

    pub fn cards(&self) -> Vec<OrderCard> {
        self.visible()
            .map(|o| OrderCard {
                id: o.id.clone(),
                customer: o.customer_name.clone().unwrap_or_else(|| o.user_id.clone()),
                address: o.shipping_address.address.clone(),
                phone: o.shipping_address.phone.clone(),
                lines: o
                    .items
                    .iter()
                    .map(|i| format!("{} - {}/{} x{} @ {}", i.product_name, i.size, i.color, i.quantity, i.price))
                    .collect(),
                total: o.total_price.format(),
                payable: o.final_price.format(),
                paid: o.is_paid(),
                selected: self.selected.contains(&o.id),
            })
            .collect()
    }

    /// Toggles a visible order; returns whether it is selected afterwards.
    pub fn toggle(&mut self, id: &str) -> bool {
        if !self.visible().any(|o| o.id == id) {
            return false;
        }
        if self.selected.remove(id) {
            false
        } else {
            self.selected.insert(id.to_string());
            true
        }
    }

    pub fn select_all_visible(&mut self) {
        let ids: Vec<String> = self.visible().map(|o| o.id.clone()).collect();
        self.selected.extend(ids);
    }

    pub fn clear_selection(&mut self) { self.selected.clear(); }
    pub fn selected(&self) -> Vec<String> { self.selected.iter().cloned().collect() }

    /// Whether the bulk action button is enabled.
    pub fn can_submit(&self) -> bool { self.spec.next.is_some() && !self.selected.is_empty() }

    /// Moves every selected order to the bucket's next status.
    ///
    /// An empty selection (or a bucket without a forward action) is a no-op
    /// and sends nothing. Once the backend accepts the change the event is
    /// returned even if the following reload fails.
    pub async fn submit_transition(&mut self) -> Result<Option<AdminEvent>> {
        let Some(next) = self.spec.next else { return Ok(None) };
        if self.selected.is_empty() {
            return Ok(None);
        }
        let change = StatusChange::new(self.spec.status, self.selected(), next)?;
        let message = self.data.api().change_order_status(&change).await?;
        tracing::info!(from = %self.spec.status, to = %next, count = change.order_ids.len(), message = message.as_deref().unwrap_or(""), "Order status changed");

        self.selected.clear();
        // the change moved orders between buckets
        self.data.invalidate(paths::ORDERS);
        let reloaded = self.load().await;
        self.stale = super::reload_failed(self.scope.name(), reloaded);
        Ok(Some(AdminEvent::OrdersTransitioned { order_ids: change.order_ids, from: self.spec.status, to: next }))
    }
}
