//! Category Aggregate

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
}

impl Category {
    /// Active categories are visible in the shop and frozen for editing.
    pub fn is_editable(&self) -> bool { !self.is_active }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Validate)]
pub struct CategoryForm {
    #[validate(length(min = 1, max = 50, message = "Name must be between 1 and 50 characters"))]
    pub name: String,
    pub is_active: bool,
}

impl CategoryForm {
    pub fn from_category(category: &Category) -> Self {
        Self { name: category.name.clone(), is_active: category.is_active }
    }
}
