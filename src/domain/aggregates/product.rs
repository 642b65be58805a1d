//! Product Aggregate

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use validator::{Validate, ValidationError};
use crate::domain::validation;
use crate::domain::value_objects::{Money, PriceRange};

/// Number of image slots on the product form.
pub const MAX_IMAGES: usize = 6;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category_id: String,
    #[serde(default)]
    pub category_name: Option<String>,
    pub price: Money,
    #[serde(default)]
    pub input_cost: Money,
    pub status: ProductStatus,
    #[serde(default)]
    pub discount_percent: u8,
    /// Set by the backend while the product takes part in a running discount.
    #[serde(default)]
    pub has_active_discount: bool,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub images: Vec<String>,
    /// Aggregate stock when the backend reports it without variants.
    #[serde(default)]
    pub stock: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant { pub size: String, pub color: String, pub quantity: i64, pub price: Money }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[default]
    Selling,
    Discontinued,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Selling => "selling", Self::Discontinued => "discontinued" }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for ProductStatus {
    type Err = ProductError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "selling" => Ok(Self::Selling),
            "discontinued" => Ok(Self::Discontinued),
            other => Err(ProductError::UnknownStatus(other.to_string())),
        }
    }
}

impl Product {
    pub fn stock(&self) -> i64 {
        if self.variants.is_empty() { self.stock.unwrap_or(0) } else { self.variants.iter().map(|v| v.quantity).sum() }
    }

    /// Single price, or the min/max over variants when they differ.
    pub fn price_range(&self) -> PriceRange {
        PriceRange::of(self.variants.iter().map(|v| v.price)).unwrap_or_else(|| PriceRange::single(self.price))
    }

    pub fn is_editable(&self) -> bool { !self.has_active_discount }
}

/// Quantity and price of one size/color combination.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VariantCell { pub quantity: i64, pub price: Money }

/// Size and color tag sets and the grid of their cross product.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VariantMatrix {
    sizes: Vec<String>,
    colors: Vec<String>,
    cells: BTreeMap<(String, String), VariantCell>,
}

fn push_tag(tags: &mut Vec<String>, tag: &str) -> bool {
    let tag = tag.trim();
    if tag.is_empty() || tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) { return false; }
    tags.push(tag.to_string());
    true
}

impl VariantMatrix {
    pub fn from_variants(variants: &[Variant]) -> Self {
        let mut matrix = Self::default();
        for v in variants {
            matrix.add_size(&v.size);
            matrix.add_color(&v.color);
            matrix.set(&v.size, &v.color, VariantCell { quantity: v.quantity, price: v.price });
        }
        matrix
    }

    pub fn sizes(&self) -> &[String] { &self.sizes }
    pub fn colors(&self) -> &[String] { &self.colors }

    pub fn add_size(&mut self, size: &str) -> bool { push_tag(&mut self.sizes, size) }
    pub fn add_color(&mut self, color: &str) -> bool { push_tag(&mut self.colors, color) }

    pub fn remove_size(&mut self, size: &str) {
        self.sizes.retain(|s| s != size);
        self.cells.retain(|(s, _), _| s != size);
    }

    pub fn remove_color(&mut self, color: &str) {
        self.colors.retain(|c| c != color);
        self.cells.retain(|(_, c), _| c != color);
    }

    /// Sets a cell; ignored unless both tags are present.
    pub fn set(&mut self, size: &str, color: &str, cell: VariantCell) -> bool {
        let known = self.sizes.iter().any(|s| s == size) && self.colors.iter().any(|c| c == color);
        if known { self.cells.insert((size.to_string(), color.to_string()), cell); }
        known
    }

    pub fn cell(&self, size: &str, color: &str) -> VariantCell {
        self.cells.get(&(size.to_string(), color.to_string())).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize { self.sizes.len() * self.colors.len() }
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Every size/color combination in size-major order.
    pub fn variants(&self) -> Vec<Variant> {
        self.sizes
            .iter()
            .flat_map(|size| self.colors.iter().map(move |color| (size, color)))
            .map(|(size, color)| {
                let cell = self.cell(size, color);
                Variant { size: size.clone(), color: color.clone(), quantity: cell.quantity, price: cell.price }
            })
            .collect()
    }
}

/// Content of one image slot on the product form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageSlot {
    /// Already stored by the backend.
    Existing(String),
    Upload { file_name: String, content_type: String, bytes: Vec<u8> },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImageSlots([Option<ImageSlot>; MAX_IMAGES]);

impl ImageSlots {
    pub fn from_urls(urls: &[String]) -> Self {
        let mut slots = Self::default();
        for url in urls.iter().take(MAX_IMAGES) {
            let _ = slots.push(ImageSlot::Existing(url.clone()));
        }
        slots
    }

    /// Fills the first free slot.
    pub fn push(&mut self, image: ImageSlot) -> Result<usize, ProductError> {
        let index = self.0.iter().position(Option::is_none).ok_or(ProductError::TooManyImages)?;
        self.0[index] = Some(image);
        Ok(index)
    }

    pub fn set(&mut self, index: usize, image: ImageSlot) -> Result<(), ProductError> {
        let slot = self.0.get_mut(index).ok_or(ProductError::NoSuchSlot(index))?;
        *slot = Some(image);
        Ok(())
    }

    pub fn clear(&mut self, index: usize) {
        if let Some(slot) = self.0.get_mut(index) { *slot = None; }
    }

    pub fn count(&self) -> usize { self.0.iter().flatten().count() }
    pub fn iter(&self) -> impl Iterator<Item = &ImageSlot> { self.0.iter().flatten() }

    pub fn existing_urls(&self) -> Vec<String> {
        self.iter().filter_map(|s| match s { ImageSlot::Existing(url) => Some(url.clone()), _ => None }).collect()
    }
}

fn non_negative(value: &Money) -> Result<(), ValidationError> {
    if value.is_negative() {
        let mut err = ValidationError::new("non_negative");
        err.message = Some("Must not be negative".into());
        return Err(err);
    }
    Ok(())
}

/// Create/edit form for a product.
#[derive(Clone, Debug, Default, Validate)]
pub struct ProductForm {
    #[validate(length(min = 3, message = "Name must be at least 3 characters"))]
    pub name: String,
    #[validate(length(min = 10, message = "Description must be at least 10 characters"))]
    pub description: String,
    #[validate(length(min = 1, message = "Choose a category"))]
    pub category_id: String,
    #[validate(custom = "non_negative")]
    pub input_cost: Money,
    #[validate(custom = "non_negative")]
    pub price: Money,
    pub status: ProductStatus,
    pub matrix: VariantMatrix,
    pub images: ImageSlots,
}

/// Scalar part of a product submission; images travel as separate parts.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProductPayload {
    pub name: String,
    pub description: String,
    pub category_id: String,
    pub input_cost: Money,
    pub price: Money,
    pub status: ProductStatus,
    pub variants: Vec<Variant>,
    pub existing_images: Vec<String>,
}

impl ProductForm {
    pub fn from_product(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            category_id: product.category_id.clone(),
            input_cost: product.input_cost,
            price: product.price,
            status: product.status,
            matrix: VariantMatrix::from_variants(&product.variants),
            images: ImageSlots::from_urls(&product.images),
        }
    }

    /// Full client-side check run before any submission.
    pub fn check(&self) -> Result<(), crate::AdminError> {
        let mut errors = validation::check(self);
        if self.name.trim().is_empty() && !errors.has("name") {
            errors.add("name", "Name is required");
        }
        let variants = self.matrix.variants();
        if variants.is_empty() {
            errors.add("variants", "Add at least one size and one color");
        }
        for v in &variants {
            if v.price < self.input_cost {
                errors.add("variants", format!("Variant {}/{}: price {} is below the input cost {}", v.size, v.color, v.price, self.input_cost));
            }
            if v.quantity < 0 {
                errors.add("variants", format!("Variant {}/{}: quantity must not be negative", v.size, v.color));
            }
        }
        if self.images.count() == 0 {
            errors.add("images", "At least one product image is required");
        }
        errors.into_result()
    }

    pub fn payload(&self) -> ProductPayload {
        ProductPayload {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            category_id: self.category_id.clone(),
            input_cost: self.input_cost,
            price: self.price,
            status: self.status,
            variants: self.matrix.variants(),
            existing_images: self.images.existing_urls(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductError { TooManyImages, NoSuchSlot(usize), UnknownStatus(String) }
impl std::error::Error for ProductError {}
impl fmt::Display for ProductError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyImages => write!(f, "A product can have at most {MAX_IMAGES} images"),
            Self::NoSuchSlot(i) => write!(f, "Image slot {i} does not exist"),
            Self::UnknownStatus(s) => write!(f, "Unknown product status '{s}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::validation::FormErrors;
    use crate::AdminError;

    fn filled_form() -> ProductForm {
        let mut form = ProductForm {
            name: "Linen shirt".into(),
            description: "Breathable linen shirt for summer".into(),
            category_id: "c1".into(),
            input_cost: Money::dong(150_000),
            price: Money::dong(250_000),
            ..Default::default()
        };
        form.matrix.add_size("M");
        form.matrix.add_color("white");
        form.matrix.set("M", "white", VariantCell { quantity: 5, price: Money::dong(250_000) });
        form.images.push(ImageSlot::Existing("https://cdn.example/shirt.jpg".into())).unwrap();
        form
    }

    fn errors_of(form: &ProductForm) -> FormErrors {
        match form.check() {
            Err(AdminError::Validation(errors)) => errors,
            other => panic!("expected validation errors, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_form_passes() {
        assert!(filled_form().check().is_ok());
    }

    #[test]
    fn test_missing_images_rejected() {
        let mut form = filled_form();
        form.images.clear(0);
        let errors = errors_of(&form);
        assert!(errors.has("images"));
        assert_eq!(errors.fields().count(), 1);
    }

    #[test]
    fn test_variant_below_input_cost_rejected() {
        let mut form = filled_form();
        form.matrix.add_size("L");
        form.matrix.set("L", "white", VariantCell { quantity: 2, price: Money::dong(149_999) });
        let errors = errors_of(&form);
        assert_eq!(errors.field("variants").len(), 1);
        assert!(errors.field("variants")[0].contains("L/white"));
    }

    #[test]
    fn test_scalar_rules() {
        let mut form = filled_form();
        form.name = "ab".into();
        form.description = "short".into();
        form.price = Money::dong(-1);
        form.category_id.clear();
        let errors = errors_of(&form);
        for field in ["name", "description", "price", "category_id"] {
            assert!(errors.has(field), "missing error for {field}");
        }
    }

    #[test]
    fn test_no_variants_rejected() {
        let mut form = filled_form();
        form.matrix.remove_color("white");
        assert!(errors_of(&form).has("variants"));
    }

    #[test]
    fn test_matrix_cross_product_preserves_cells() {
        let mut m = VariantMatrix::default();
        assert!(m.add_size("S"));
        assert!(m.add_size("M"));
        assert!(!m.add_size(" s "));
        assert!(m.add_color("red"));
        assert!(m.set("M", "red", VariantCell { quantity: 3, price: Money::dong(100) }));
        assert!(!m.set("XL", "red", VariantCell::default()));
        m.add_color("blue");
        assert_eq!(m.len(), 4);
        let variants = m.variants();
        let labels: Vec<_> = variants.iter().map(|v| format!("{}/{}", v.size, v.color)).collect();
        assert_eq!(labels, ["S/red", "S/blue", "M/red", "M/blue"]);
        assert_eq!(m.cell("M", "red").quantity, 3);
        m.remove_size("M");
        assert_eq!(m.cell("M", "red"), VariantCell::default());
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn test_image_slots_limit() {
        let mut slots = ImageSlots::default();
        for i in 0..MAX_IMAGES {
            assert_eq!(slots.push(ImageSlot::Existing(format!("u{i}"))).unwrap(), i);
        }
        assert_eq!(slots.push(ImageSlot::Existing("extra".into())), Err(ProductError::TooManyImages));
        slots.clear(2);
        assert_eq!(slots.count(), MAX_IMAGES - 1);
        assert_eq!(slots.push(ImageSlot::Existing("again".into())).unwrap(), 2);
        assert!(slots.set(MAX_IMAGES, ImageSlot::Existing("x".into())).is_err());
    }

    #[test]
    fn test_product_summary_values() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "id": "p1", "name": "Shirt", "category_id": "c1", "price": 200000, "status": "selling",
            "has_active_discount": true,
            "variants": [
                { "size": "M", "color": "red", "quantity": 4, "price": 200000 },
                { "size": "L", "color": "red", "quantity": 6, "price": 220000 }
            ]
        }))
        .unwrap();
        assert_eq!(product.stock(), 10);
        assert_eq!(product.price_range().to_string(), "200.000 ₫ - 220.000 ₫");
        assert!(!product.is_editable());
        let form = ProductForm::from_product(&product);
        assert_eq!(form.matrix.variants().len(), 2);
        assert_eq!(form.payload().variants, product.variants);
    }
}
