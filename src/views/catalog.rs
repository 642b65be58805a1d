//! Products and categories

use reqwest::multipart::{Form, Part};

use crate::api::{paths, Envelope};
use crate::data::{DataLayer, ViewScope};
use crate::domain::{validation, AdminEvent, Category, CategoryForm, ImageSlot, Product, ProductForm, ProductStatus};
use crate::{AdminError, Result};

// =============================================================================
// Product list
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub query: Option<String>,
    pub category_id: Option<String>,
    pub status: Option<ProductStatus>,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        let query_ok = self
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map_or(true, |q| product.name.to_lowercase().contains(&q.to_lowercase()));
        let category_ok = self.category_id.as_deref().map_or(true, |c| product.category_id == c);
        let status_ok = self.status.map_or(true, |s| product.status == s);
        query_ok && category_ok && status_ok
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRow {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: String,
    pub stock: i64,
    pub status: ProductStatus,
    pub discount_percent: u8,
    pub thumbnail: Option<String>,
}

#[derive(Debug)]
pub struct ProductListView {
    data: DataLayer,
    scope: ViewScope,
    products: Vec<Product>,
    pub filter: ProductFilter,
}

impl ProductListView {
    pub fn new(data: &DataLayer) -> Self {
        Self { data: data.clone(), scope: data.scope("products"), products: Vec::new(), filter: ProductFilter::default() }
    }

    /// Fetches the whole catalog; filtering happens locally.
    pub async fn load(&mut self) -> Result<()> {
        let env: Envelope<Vec<Product>> = self.data.fetch(&self.scope, paths::PRODUCTS).await?;
        self.products = env.data.unwrap_or_default();
        Ok(())
    }

    pub fn products(&self) -> &[Product] { &self.products }

    pub fn rows(&self) -> Vec<ProductRow> {
        self.products
            .iter()
            .filter(|p| self.filter.matches(p))
            .map(|p| ProductRow {
                id: p.id.clone(),
                name: p.name.clone(),
                category: p.category_name.clone().unwrap_or_else(|| p.category_id.clone()),
                price: p.price_range().to_string(),
                stock: p.stock(),
                status: p.status,
                discount_percent: p.discount_percent,
                thumbnail: p.images.first().cloned(),
            })
            .collect()
    }
}

// =============================================================================
// Product detail and editor
// =============================================================================

#[derive(Debug)]
pub struct ProductDetail {
    pub product: Product,
}

impl ProductDetail {
    pub async fn load(data: &DataLayer, id: &str) -> Result<Self> {
        let scope = data.scope("product-detail");
        let env: Envelope<Product> = data.fetch(&scope, &paths::product(id)).await?;
        Ok(Self { product: env.into_data()? })
    }

    /// Variant lines as `size/color: quantity @ price`.
    pub fn variant_lines(&self) -> Vec<String> {
        self.product.variants.iter().map(|v| format!("{}/{}: {} @ {}", v.size, v.color, v.quantity, v.price)).collect()
    }
}

const LOCK_WARNING: &str = "This product is part of a running discount and cannot be edited until it ends";

/// Create or edit screen for one product.
#[derive(Debug)]
pub struct ProductEditor {
    data: DataLayer,
    product_id: Option<String>,
    locked: bool,
    pub form: ProductForm,
}

impl ProductEditor {
    pub fn create(data: &DataLayer) -> Self {
        Self { data: data.clone(), product_id: None, locked: false, form: ProductForm::default() }
    }

    /// Loads an existing product into the form.
    pub async fn open(data: &DataLayer, id: &str) -> Result<Self> {
        let detail = ProductDetail::load(data, id).await?;
        let product = detail.product;
        Ok(Self {
            data: data.clone(),
            product_id: Some(product.id.clone()),
            locked: !product.is_editable(),
            form: ProductForm::from_product(&product),
        })
    }

    pub fn product_id(&self) -> Option<&str> { self.product_id.as_deref() }

    pub fn lock_warning(&self) -> Option<&'static str> { self.locked.then_some(LOCK_WARNING) }

    /// Validates, then creates or updates the product with one multipart
    /// request.
    pub async fn submit(&self) -> Result<AdminEvent> {
        if let Some(warning) = self.lock_warning() {
            return Err(AdminError::Locked(warning.to_string()));
        }
        self.form.check()?;
        let saved = self.data.api().save_product(self.product_id.as_deref(), multipart_form(&self.form)?).await?;
        let created = self.product_id.is_none();
        tracing::info!(product_id = %saved.id, created, "Product saved");
        self.data.invalidate(paths::PRODUCTS);
        Ok(AdminEvent::ProductSaved { product_id: saved.id, name: saved.name, created })
    }
}

/// Scalar fields as text parts, variants and kept images as JSON parts, and
/// one `images` file part per upload.
pub fn multipart_form(form: &ProductForm) -> Result<Form> {
    let payload = form.payload();
    let mut multipart = Form::new()
        .text("name", payload.name)
        .text("description", payload.description)
        .text("category_id", payload.category_id)
        .text("input_cost", payload.input_cost.amount().to_string())
        .text("price", payload.price.amount().to_string())
        .text("status", payload.status.as_str())
        .text("variants", serde_json::to_string(&payload.variants)?)
        .text("existing_images", serde_json::to_string(&payload.existing_images)?);

    for slot in form.images.iter() {
        if let ImageSlot::Upload { file_name, content_type, bytes } = slot {
            let part = Part::bytes(bytes.clone()).file_name(file_name.clone()).mime_str(content_type)?;
            multipart = multipart.part("images", part);
        }
    }
    Ok(multipart)
}

// =============================================================================
// Categories
// =============================================================================

#[derive(Debug)]
pub struct CategoryView {
    data: DataLayer,
    scope: ViewScope,
    categories: Vec<Category>,
    stale: bool,
}

impl CategoryView {
    pub fn new(data: &DataLayer) -> Self {
        Self { data: data.clone(), scope: data.scope("categories"), categories: Vec::new(), stale: false }
    }

    pub async fn load(&mut self) -> Result<()> {
        let env: Envelope<Vec<Category>> = self.data.fetch(&self.scope, paths::CATEGORIES).await?;
        self.categories = env.data.unwrap_or_default();
        self.stale = false;
        Ok(())
    }

    async fn reload(&mut self) {
        self.data.invalidate(paths::CATEGORIES);
        let result = self.load().await;
        self.stale = super::reload_failed(self.scope.name(), result);
    }

    pub fn categories(&self) -> &[Category] { &self.categories }
    pub fn is_stale(&self) -> bool { self.stale }

    pub fn find(&self, id: &str) -> Option<&Category> { self.categories.iter().find(|c| c.id == id) }

    /// New categories start inactive.
    pub async fn create(&mut self, name: &str) -> Result<AdminEvent> {
        let form = CategoryForm { name: name.trim().to_string(), is_active: false };
        validation::check(&form).into_result()?;
        let created = self.data.api().create_category(&form).await?;
        self.reload().await;
        Ok(AdminEvent::CategorySaved { name: created.name })
    }

    /// Only inactive categories can be renamed or toggled.
    pub async fn update(&mut self, id: &str, form: CategoryForm) -> Result<AdminEvent> {
        let current = self
            .find(id)
            .ok_or_else(|| AdminError::Rejected { status: 404, message: format!("Category {id} not found") })?;
        if !current.is_editable() {
            return Err(AdminError::Locked(format!("Category '{}' is active; deactivate it before editing", current.name)));
        }
        let form = CategoryForm { name: form.name.trim().to_string(), ..form };
        validation::check(&form).into_result()?;
        let saved = self.data.api().update_category(id, &form).await?;
        self.reload().await;
        Ok(AdminEvent::CategorySaved { name: saved.name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Money;

    fn product(name: &str, category: &str, status: ProductStatus) -> Product {
        Product {
            id: name.to_lowercase(),
            name: name.into(),
            description: String::new(),
            category_id: category.into(),
            category_name: None,
            price: Money::dong(100_000),
            input_cost: Money::zero(),
            status,
            discount_percent: 0,
            has_active_discount: false,
            variants: Vec::new(),
            images: Vec::new(),
            stock: Some(3),
        }
    }

    #[test]
    fn test_product_filter() {
        let shirt = product("Linen Shirt", "c1", ProductStatus::Selling);
        let mut filter = ProductFilter { query: Some("  shirt ".into()), ..Default::default() };
        assert!(filter.matches(&shirt));
        filter.query = Some("pants".into());
        assert!(!filter.matches(&shirt));
        filter.query = Some(String::new());
        filter.category_id = Some("c2".into());
        assert!(!filter.matches(&shirt));
        filter.category_id = Some("c1".into());
        filter.status = Some(ProductStatus::Discontinued);
        assert!(!filter.matches(&shirt));
        filter.status = Some(ProductStatus::Selling);
        assert!(filter.matches(&shirt));
    }

    #[test]
    fn test_multipart_rejects_bad_content_type() {
        let mut form = ProductForm::default();
        form.images
            .push(ImageSlot::Upload { file_name: "a.png".into(), content_type: "not a mime".into(), bytes: vec![1, 2] })
            .unwrap();
        assert!(multipart_form(&form).is_err());
        form.images.clear(0);
        form.images.push(ImageSlot::Upload { file_name: "a.png".into(), content_type: "image/png".into(), bytes: vec![1] }).unwrap();
        assert!(multipart_form(&form).is_ok());
    }
}
