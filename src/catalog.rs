//! Product catalog records and embedding text composition.
//!
//! [`Product`] and [`ProductAttribute`] mirror the relational store's rows.
//! [`compose`] turns a product plus its attributes into the single string fed
//! to the embedding model.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A product row from the relational store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    /// Unique business key; attributes reference products by code.
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub gross_weight: Option<f64>,
}

impl Product {
    /// Minimal product with only the required fields populated.
    pub fn new(id: impl Into<String>, code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            name: name.into(),
            description: None,
            brand: None,
            category: None,
            gross_weight: None,
        }
    }

    /// Gross weight with NaN normalized to `0.0`.
    pub fn gross_weight(&self) -> Option<f64> {
        self.gross_weight
            .map(|w| if w.is_nan() { 0.0 } else { w })
    }

    /// Name followed by each non-empty descriptive field, space-joined.
    pub fn text_for_embedding(&self) -> String {
        let mut parts: Vec<&str> = vec![self.name.as_str()];
        for field in [&self.description, &self.brand, &self.category] {
            if let Some(value) = field.as_deref().filter(|v| !v.is_empty()) {
                parts.push(value);
            }
        }
        parts.join(" ")
    }
}

/// A single attribute attached to a product by code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductAttribute {
    pub id: i64,
    pub product_code: String,
    pub name: String,
    pub value: String,
}

impl ProductAttribute {
    pub fn text_for_embedding(&self) -> String {
        format!("{} {}", self.name, self.value)
    }
}

/// Product code → attributes in load order.
pub type AttributeMapping = HashMap<String, Vec<ProductAttribute>>;

/// Products loaded for one write request, together with their attributes.
#[derive(Debug, Clone, Default)]
pub struct ProductBatch {
    pub products: Vec<Product>,
    pub attribute_mapping: AttributeMapping,
}

impl ProductBatch {
    /// Attributes for a product, empty when it has none.
    pub fn attributes_for(&self, product: &Product) -> &[ProductAttribute] {
        self.attribute_mapping
            .get(&product.code)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Group attribute rows by their product code, preserving row order within each group.
pub fn group_attributes(attributes: impl IntoIterator<Item = ProductAttribute>) -> AttributeMapping {
    let mut mapping = AttributeMapping::new();
    for attr in attributes {
        mapping
            .entry(attr.product_code.clone())
            .or_default()
            .push(attr);
    }
    mapping
}

/// Build the embedding input for a product.
///
/// Product text comes first, then every attribute's text in the order given.
/// With no attributes the result is exactly the product text.
pub fn compose(product: &Product, attributes: &[ProductAttribute]) -> String {
    let product_text = product.text_for_embedding();
    if attributes.is_empty() {
        return product_text;
    }
    let attr_text = attributes
        .iter()
        .map(ProductAttribute::text_for_embedding)
        .collect::<Vec<_>>()
        .join(" ");
    format!("{product_text} {attr_text}")
}
