//! Outcome events raised by admin actions
//!
//! Views return one of these after a successful mutation. The binary prints
//! [`AdminEvent::notice`] where the web screens showed an alert.

use crate::domain::aggregates::{OrderStatus, Role};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdminEvent {
    SignedIn { email: String },
    SignedOut,
    OrdersTransitioned { order_ids: Vec<String>, from: OrderStatus, to: OrderStatus },
    ProductSaved { product_id: String, name: String, created: bool },
    CategorySaved { name: String },
    DiscountSaved { code: String },
    DiscountDeleted { id: String },
    NotificationSent { title: String },
    StaffCreated { email: String },
    StaffDeleted { id: String },
}

impl AdminEvent {
    pub fn notice(&self) -> String {
        match self {
            Self::SignedIn { email } => format!("Signed in as {email}"),
            Self::SignedOut => "Signed out".to_string(),
            Self::OrdersTransitioned { order_ids, from, to } => {
                format!("{} order(s) moved from {} to {}", order_ids.len(), from.label(), to.label())
            }
            Self::ProductSaved { product_id, name, created: true } => format!("Product '{name}' ({product_id}) created"),
            Self::ProductSaved { product_id, name, created: false } => format!("Product '{name}' ({product_id}) saved"),
            Self::CategorySaved { name } => format!("Category '{name}' saved"),
            Self::DiscountSaved { code } => format!("Discount code {code} saved"),
            Self::DiscountDeleted { id } => format!("Discount code {id} deleted"),
            Self::NotificationSent { title } => format!("Notification '{title}' sent"),
            Self::StaffCreated { email } => format!("Staff account {email} created ({} role)", Role::Staff),
            Self::StaffDeleted { id } => format!("Staff account {id} deleted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_notice() {
        let event = AdminEvent::OrdersTransitioned {
            order_ids: vec!["a".into(), "b".into()],
            from: OrderStatus::Pending,
            to: OrderStatus::ReadyForPickup,
        };
        assert_eq!(event.notice(), "2 order(s) moved from Pending confirmation to Ready for pickup");
    }

    #[test]
    fn test_product_notice_tells_create_from_edit() {
        let created = AdminEvent::ProductSaved { product_id: "p9".into(), name: "Scarf".into(), created: true };
        assert_eq!(created.notice(), "Product 'Scarf' (p9) created");
        let edited = AdminEvent::ProductSaved { product_id: "p9".into(), name: "Scarf".into(), created: false };
        assert_eq!(edited.notice(), "Product 'Scarf' (p9) saved");
    }
}
