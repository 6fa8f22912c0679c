//! Catalog types: categories, products and their child rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use clayhouse_core::{CategoryId, OptionId, ProductId, Won};

use super::review::ReviewView;

/// A product category.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub slug: String,
    pub name: String,
    pub sort_order: i32,
}

/// A product row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub category_id: CategoryId,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Won,
    pub is_active: bool,
    /// Shown before purchase (handmade variance, lead times).
    pub purchase_notice: Option<String>,
    /// Care instructions (dishwasher, microwave, kiln marks).
    pub handling_notice: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A gallery or detail image. Both tables share this shape.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductImage {
    pub id: Uuid,
    pub product_id: ProductId,
    pub url: String,
    pub alt: Option<String>,
    pub sort_order: i32,
}

/// A purchasable variant such as "glaze: celadon".
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductOption {
    pub id: OptionId,
    pub product_id: ProductId,
    pub name: String,
    pub value: String,
    pub sort_order: i32,
}

impl ProductOption {
    /// Label stored on order lines, e.g. `"size: large"`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}: {}", self.name, self.value)
    }
}

/// Listing entry: product with its category and first image.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    #[serde(flatten)]
    pub product: Product,
    pub category: Category,
    pub images: Vec<ProductImage>,
}

/// Full product page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub category: Category,
    pub images: Vec<ProductImage>,
    pub options: Vec<ProductOption>,
    pub detail_images: Vec<ProductImage>,
    pub reviews: Vec<ReviewView>,
}

/// Image in an admin product payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInput {
    pub url: String,
    pub alt: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

/// Option in an admin product payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionInput {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub sort_order: i32,
}

/// Body of `POST /shop/admin/products`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub category_id: CategoryId,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Won,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub purchase_notice: Option<String>,
    pub handling_notice: Option<String>,
    #[serde(default)]
    pub images: Vec<ImageInput>,
    #[serde(default)]
    pub options: Vec<OptionInput>,
    #[serde(default)]
    pub detail_images: Vec<ImageInput>,
}

const fn default_active() -> bool {
    true
}

/// Body of `PATCH /shop/admin/products/{id}`.
///
/// Scalar fields that are absent stay unchanged. A child list that is present
/// replaces the stored list entirely; an empty list clears it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub category_id: Option<CategoryId>,
    pub slug: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Won>,
    pub is_active: Option<bool>,
    pub purchase_notice: Option<String>,
    pub handling_notice: Option<String>,
    pub images: Option<Vec<ImageInput>>,
    pub options: Option<Vec<OptionInput>>,
    pub detail_images: Option<Vec<ImageInput>>,
}

impl ProductPatch {
    /// Whether any scalar column would change.
    #[must_use]
    pub const fn has_scalar_changes(&self) -> bool {
        self.category_id.is_some()
            || self.slug.is_some()
            || self.name.is_some()
            || self.description.is_some()
            || self.price.is_some()
            || self.is_active.is_some()
            || self.purchase_notice.is_some()
            || self.handling_notice.is_some()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_input_defaults() {
        let input: ProductInput = serde_json::from_str(
            r#"{
                "categoryId": "6f1c1f5e-9a55-4f0e-9d43-2b0f3f0d8a11",
                "slug": "moon-jar-small",
                "name": "Moon jar (small)",
                "price": 68000
            }"#,
        )
        .unwrap();
        assert!(input.is_active);
        assert!(input.images.is_empty());
        assert_eq!(input.price, Won::new(68_000));
    }

    #[test]
    fn test_patch_distinguishes_absent_and_empty_lists() {
        let patch: ProductPatch = serde_json::from_str(r#"{"images": []}"#).unwrap();
        assert!(patch.images.as_ref().is_some_and(Vec::is_empty));
        assert!(patch.options.is_none());
        assert!(!patch.has_scalar_changes());
    }

    #[test]
    fn test_option_label() {
        let option = ProductOption {
            id: OptionId::new(),
            product_id: ProductId::new(),
            name: "glaze".to_string(),
            value: "celadon".to_string(),
            sort_order: 1,
        };
        assert_eq!(option.label(), "glaze: celadon");
    }
}
