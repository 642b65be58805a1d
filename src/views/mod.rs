//! Screen state
//!
//! Each view loads its data through the shared [`crate::data::DataLayer`]
//! with its own scope, keeps the screen state (filters, selection, forms)
//! and returns an [`crate::AdminEvent`] after a successful mutation.
//!
//! A mutation that went through is reported even when the list cannot be
//! re-fetched afterwards; the view is then marked stale.

pub mod catalog;
pub mod marketing;
pub mod orders;
pub mod reports;
pub mod staff;

pub use catalog::{CategoryView, ProductDetail, ProductEditor, ProductFilter, ProductListView, ProductRow};
pub use marketing::{DiscountRow, DiscountView, NotificationView};
pub use orders::{OrderBucketView, OrderCard, PaymentTab};
pub use reports::{DashboardView, StatisticsView};
pub use staff::{RoleTab, UsersView};

/// Answers a destructive-action prompt.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Accepts every prompt, e.g. for `--yes` runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&self, _prompt: &str) -> bool { true }
}

impl<F: Fn(&str) -> bool> Confirm for F {
    fn confirm(&self, prompt: &str) -> bool { self(prompt) }
}

/// Outcome of the re-fetch that follows a mutation; `true` when the list is
/// now stale.
pub(crate) fn reload_failed(view: &'static str, result: crate::Result<()>) -> bool {
    match result {
        Ok(()) => false,
        Err(e) => {
            tracing::warn!(view, error = %e, "Change applied but the list could not be reloaded");
            true
        }
    }
}
