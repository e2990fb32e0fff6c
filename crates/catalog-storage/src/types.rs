//! Storage types for the catalog storage abstraction layer.
//!
//! Entities mirror the JSON shape of the public API (snake_case fields).
//! Identifiers are allocated by the backend and are always positive.

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Identifier type shared by every table in the catalog.
pub type EntityId = i64;

/// Default stock level for products created without one.
pub const DEFAULT_STOCK: i32 = 10;

// ==================== Associations ====================

/// Describes a many-to-many join table.
///
/// Backends use the descriptor to address the table; the reconciler only uses
/// it for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssociationTable {
    /// Table name.
    pub name: &'static str,
    /// Column referencing the owning entity.
    pub owner_column: &'static str,
    /// Column referencing the related entity.
    pub related_column: &'static str,
}

impl AssociationTable {
    /// The product/tag join table.
    pub const PRODUCT_TAG: Self = Self::new("product_tag", "product_id", "tag_id");

    #[must_use]
    pub const fn new(
        name: &'static str,
        owner_column: &'static str,
        related_column: &'static str,
    ) -> Self {
        Self {
            name,
            owner_column,
            related_column,
        }
    }
}

/// A persisted join row.
///
/// Several records may link the same owner and related entity; the pair is not
/// unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssociationRecord {
    /// The row's own identifier.
    pub id: EntityId,
    /// Owning entity (e.g. a product).
    pub owner: EntityId,
    /// Related entity (e.g. a tag).
    pub related: EntityId,
}

/// A join row that has not been persisted yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NewAssociation {
    pub owner: EntityId,
    pub related: EntityId,
}

impl NewAssociation {
    #[must_use]
    pub fn new(owner: EntityId, related: EntityId) -> Self {
        Self { owner, related }
    }
}

// ==================== Entities ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: EntityId,
    pub category_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: EntityId,
    pub product_name: String,
    pub price: f64,
    pub stock: i32,
    pub category_id: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: EntityId,
    pub tag_name: String,
}

/// Input for creating a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCategory {
    pub category_name: String,
}

impl NewCategory {
    /// Checks that the category name is present.
    pub fn validate(&self) -> Result<(), StorageError> {
        validate_name("category_name", &self.category_name)
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub product_name: String,
    pub price: f64,
    #[serde(default = "default_stock")]
    pub stock: i32,
    #[serde(default)]
    pub category_id: Option<EntityId>,
}

impl NewProduct {
    /// Checks name, price and stock.
    pub fn validate(&self) -> Result<(), StorageError> {
        validate_name("product_name", &self.product_name)?;
        validate_price(self.price)?;
        validate_stock(self.stock)?;
        if let Some(category_id) = self.category_id {
            validate_id("category_id", category_id)?;
        }
        Ok(())
    }
}

/// Input for creating a tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTag {
    pub tag_name: String,
}

impl NewTag {
    pub fn validate(&self) -> Result<(), StorageError> {
        validate_name("tag_name", &self.tag_name)
    }
}

/// Partial update of a category. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryPatch {
    #[serde(default)]
    pub category_name: Option<String>,
}

impl CategoryPatch {
    pub fn validate(&self) -> Result<(), StorageError> {
        match &self.category_name {
            Some(name) => validate_name("category_name", name),
            None => Ok(()),
        }
    }

    /// Applies the patch to an existing category.
    pub fn apply_to(&self, category: &mut Category) {
        if let Some(name) = &self.category_name {
            category.category_name = name.clone();
        }
    }
}

/// Partial update of a product. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub stock: Option<i32>,
    #[serde(default)]
    pub category_id: Option<EntityId>,
}

impl ProductPatch {
    pub fn validate(&self) -> Result<(), StorageError> {
        if let Some(name) = &self.product_name {
            validate_name("product_name", name)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        if let Some(stock) = self.stock {
            validate_stock(stock)?;
        }
        if let Some(category_id) = self.category_id {
            validate_id("category_id", category_id)?;
        }
        Ok(())
    }

    /// Applies the patch to an existing product.
    pub fn apply_to(&self, product: &mut Product) {
        if let Some(name) = &self.product_name {
            product.product_name = name.clone();
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if let Some(category_id) = self.category_id {
            product.category_id = Some(category_id);
        }
    }
}

/// Partial update of a tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagPatch {
    #[serde(default)]
    pub tag_name: Option<String>,
}

impl TagPatch {
    pub fn validate(&self) -> Result<(), StorageError> {
        match &self.tag_name {
            Some(name) => validate_name("tag_name", name),
            None => Ok(()),
        }
    }

    pub fn apply_to(&self, tag: &mut Tag) {
        if let Some(name) = &self.tag_name {
            tag.tag_name = name.clone();
        }
    }
}

fn default_stock() -> i32 {
    DEFAULT_STOCK
}

/// Checks that an identifier could have been allocated by a backend.
pub fn validate_id(field: &str, id: EntityId) -> Result<(), StorageError> {
    if id <= 0 {
        return Err(StorageError::invalid_input(format!(
            "{field} must be a positive integer, got {id}"
        )));
    }
    Ok(())
}

fn validate_name(field: &str, value: &str) -> Result<(), StorageError> {
    if value.trim().is_empty() {
        return Err(StorageError::invalid_input(format!("{field} must not be empty")));
    }
    Ok(())
}

fn validate_price(price: f64) -> Result<(), StorageError> {
    if !price.is_finite() || price < 0.0 {
        return Err(StorageError::invalid_input(format!(
            "price must be a non-negative number, got {price}"
        )));
    }
    Ok(())
}

fn validate_stock(stock: i32) -> Result<(), StorageError> {
    if stock < 0 {
        return Err(StorageError::invalid_input(format!(
            "stock must be >= 0, got {stock}"
        )));
    }
    Ok(())
}
