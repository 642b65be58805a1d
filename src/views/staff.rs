//! Users and staff accounts

use super::Confirm;
use crate::api::{paths, Envelope};
use crate::data::{DataLayer, ViewScope};
use crate::domain::{validation, AdminEvent, NewStaff, Role, User};
use crate::{AdminError, Result};

/// One tab per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleTab(pub Role);

impl Default for RoleTab {
    fn default() -> Self { Self(Role::Staff) }
}

#[derive(Debug)]
pub struct UsersView {
    data: DataLayer,
    scope: ViewScope,
    users: Vec<User>,
    tab: RoleTab,
    stale: bool,
}

impl UsersView {
    pub fn new(data: &DataLayer) -> Self {
        Self { data: data.clone(), scope: data.scope("users"), users: Vec::new(), tab: RoleTab::default(), stale: false }
    }

    pub async fn load(&mut self) -> Result<()> {
        let env: Envelope<Vec<User>> = self.data.fetch(&self.scope, paths::USERS).await?;
        self.users = env.data.unwrap_or_default();
        self.stale = false;
        Ok(())
    }

    async fn reload(&mut self) {
        self.data.invalidate(paths::USERS);
        let result = self.load().await;
        self.stale = super::reload_failed(self.scope.name(), result);
    }

    pub fn set_tab(&mut self, tab: RoleTab) { self.tab = tab; }
    pub fn current_tab(&self) -> RoleTab { self.tab }
    pub fn users(&self) -> &[User] { &self.users }
    pub fn is_stale(&self) -> bool { self.stale }

    pub fn tab(&self, tab: RoleTab) -> impl Iterator<Item = &User> {
        self.users.iter().filter(move |u| u.role == tab.0)
    }

    pub fn visible(&self) -> impl Iterator<Item = &User> { self.tab(self.tab) }

    /// Staff actions are only offered on the staff tab.
    pub fn staff_actions_enabled(&self) -> bool { self.tab.0 == Role::Staff }

    pub async fn create_staff(&mut self, staff: &NewStaff, confirm: &dyn Confirm) -> Result<Option<AdminEvent>> {
        if !self.staff_actions_enabled() {
            return Err(AdminError::Locked(format!("Staff accounts are created from the {} tab", Role::Staff.tab_label())));
        }
        let staff = NewStaff { email: staff.email.trim().to_string(), full_name: staff.full_name.trim().to_string() };
        validation::check(&staff).into_result()?;
        if !confirm.confirm(&format!("Create staff account for {} ({})?", staff.full_name, staff.email)) {
            return Ok(None);
        }
        let created = self.data.api().create_staff(&staff).await?;
        tracing::info!(user_id = %created.id, "Staff account created");
        self.reload().await;
        Ok(Some(AdminEvent::StaffCreated { email: created.email }))
    }

    /// Refuses ids that are not loaded staff accounts.
    pub async fn delete_staff(&mut self, id: &str, confirm: &dyn Confirm) -> Result<Option<AdminEvent>> {
        let user = self
            .users
            .iter()
            .find(|u| u.id == id)
            .ok_or_else(|| AdminError::Rejected { status: 404, message: format!("User {id} not found") })?;
        if user.role != Role::Staff {
            return Err(AdminError::Locked(format!("{} is not a staff account", user.email)));
        }
        if !confirm.confirm(&format!("Delete staff account {}?", user.email)) {
            return Ok(None);
        }
        self.data.api().delete_staff(id).await?;
        tracing::info!(user_id = id, "Staff account deleted");
        self.reload().await;
        Ok(Some(AdminEvent::StaffDeleted { id: id.to_string() }))
    }
}
