//! Discount codes and broadcast notifications

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use super::Confirm;
use crate::api::{paths, Envelope};
use crate::data::{DataLayer, ViewScope};
use crate::domain::{validation, AdminEvent, DiscountCode, DiscountUpdate, NewDiscountCode, Notification, NotificationForm};
use crate::{AdminError, Result};

const DISPLAY_FORMAT: &str = "%d/%m/%Y %H:%M";

fn local(at: DateTime<Utc>, tz: Tz) -> String { at.with_timezone(&tz).format(DISPLAY_FORMAT).to_string() }

// =============================================================================
// Discount codes
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscountRow {
    pub id: String,
    pub code: String,
    pub percentage: i64,
    pub min_order_value: String,
    pub usage: String,
    pub expires_at: String,
    pub created_at: String,
    pub editable: bool,
    pub expired: bool,
}

#[derive(Debug)]
pub struct DiscountView {
    data: DataLayer,
    scope: ViewScope,
    tz: Tz,
    codes: Vec<DiscountCode>,
    stale: bool,
}

impl DiscountView {
    pub fn new(data: &DataLayer) -> Self {
        let tz = data.api().config().timezone;
        Self { data: data.clone(), scope: data.scope("discounts"), tz, codes: Vec::new(), stale: false }
    }

    pub async fn load(&mut self) -> Result<()> {
        let env: Envelope<Vec<DiscountCode>> = self.data.fetch(&self.scope, paths::DISCOUNTS).await?;
        self.codes = env.data.unwrap_or_default();
        self.stale = false;
        Ok(())
    }

    async fn reload(&mut self) {
        self.data.invalidate(paths::DISCOUNTS);
        let result = self.load().await;
        self.stale = super::reload_failed(self.scope.name(), result);
    }

    pub fn codes(&self) -> &[DiscountCode] { &self.codes }
    pub fn is_stale(&self) -> bool { self.stale }

    pub fn find(&self, id: &str) -> Option<&DiscountCode> { self.codes.iter().find(|c| c.id == id || c.code == id) }

    pub fn rows(&self, now: DateTime<Utc>) -> Vec<DiscountRow> {
        self.codes
            .iter()
            .map(|c| DiscountRow {
                id: c.id.clone(),
                code: c.code.clone(),
                percentage: c.percentage,
                min_order_value: c.min_order_value.format(),
                usage: format!("{}/{}", c.used_count, c.usage_limit),
                expires_at: local(c.expires_at, self.tz),
                created_at: local(c.created_at, self.tz),
                editable: c.is_editable(now, self.tz),
                expired: c.is_expired(now),
            })
            .collect()
    }

    pub async fn create(&mut self, form: &NewDiscountCode, now: DateTime<Utc>) -> Result<AdminEvent> {
        form.check(now)?;
        let created = self.data.api().create_discount(form).await?;
        tracing::info!(code = %created.code, "Discount code created");
        self.reload().await;
        Ok(AdminEvent::DiscountSaved { code: created.code })
    }

    /// Updates are accepted only on the local calendar day of creation.
    pub async fn update(&mut self, id: &str, update: &DiscountUpdate, now: DateTime<Utc>) -> Result<AdminEvent> {
        let code = self
            .find(id)
            .ok_or_else(|| AdminError::Rejected { status: 404, message: format!("Discount code {id} not found") })?;
        if !code.is_editable(now, self.tz) {
            return Err(AdminError::Locked(format!(
                "Discount code {} could only be edited until {}",
                code.code,
                local(code.edit_deadline(self.tz), self.tz)
            )));
        }
        let id = code.id.clone();
        update.check()?;
        let saved = self.data.api().update_discount(&id, update).await?;
        self.reload().await;
        Ok(AdminEvent::DiscountSaved { code: saved.code })
    }

    /// Deletes after confirmation; `Ok(None)` when the prompt is declined.
    pub async fn delete(&mut self, id: &str, confirm: &dyn Confirm) -> Result<Option<AdminEvent>> {
        let label = self.find(id).map_or_else(|| id.to_string(), |c| c.code.clone());
        if !confirm.confirm(&format!("Delete discount code {label}?")) {
            return Ok(None);
        }
        let id = self.find(id).map_or_else(|| id.to_string(), |c| c.id.clone());
        self.data.api().delete_discount(&id).await?;
        self.reload().await;
        Ok(Some(AdminEvent::DiscountDeleted { id }))
    }
}

// =============================================================================
// Notifications
// =============================================================================

#[derive(Debug)]
pub struct NotificationView {
    data: DataLayer,
    scope: ViewScope,
    tz: Tz,
    notifications: Vec<Notification>,
    stale: bool,
}

impl NotificationView {
    pub fn new(data: &DataLayer) -> Self {
        let tz = data.api().config().timezone;
        Self { data: data.clone(), scope: data.scope("notifications"), tz, notifications: Vec::new(), stale: false }
    }

    pub async fn load(&mut self) -> Result<()> {
        let env: Envelope<Vec<Notification>> = self.data.fetch(&self.scope, paths::NOTIFICATIONS).await?;
        self.notifications = env.data.unwrap_or_default();
        self.stale = false;
        Ok(())
    }

    pub fn notifications(&self) -> &[Notification] { &self.notifications }
    pub fn is_stale(&self) -> bool { self.stale }

    /// `[time] title: message` per notification.
    pub fn lines(&self) -> Vec<String> {
        self.notifications.iter().map(|n| format!("[{}] {}: {}", local(n.created_at, self.tz), n.title, n.message)).collect()
    }

    pub async fn broadcast(&mut self, form: &NotificationForm) -> Result<AdminEvent> {
        let form = NotificationForm { title: form.title.trim().to_string(), message: form.message.trim().to_string() };
        validation::check(&form).into_result()?;
        let sent = self.data.api().send_notification(&form).await?;
        self.data.invalidate(paths::NOTIFICATIONS);
        let result = self.load().await;
        self.stale = super::reload_failed(self.scope.name(), result);
        Ok(AdminEvent::NotificationSent { title: sent.title })
    }
}
