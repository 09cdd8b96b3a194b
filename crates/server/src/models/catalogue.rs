//! Catalogue models: products, tags, images.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tradewind_core::{ImageId, ProductId, TagId};

/// A catalogue product.
///
/// `stock` is the physically held quantity; `available` is what remains
/// sellable after reservations. The database enforces
/// `0 <= available <= stock`.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    pub available: i32,
    pub discontinued: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Image {
    pub id: ImageId,
    pub url: String,
    pub alt_text: Option<String>,
}
