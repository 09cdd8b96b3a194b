//! Trolley and order models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tradewind_core::{
    AccountId, AddressId, InvoiceId, LineItemId, OrderId, ProductId, ReceiptId, ReportId,
};

/// A line item sitting in an account's trolley.
#[derive(Debug, Clone, Serialize)]
pub struct TrolleyLine {
    pub line_item_id: LineItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    /// Current catalogue price. Not frozen until checkout.
    pub unit_price: Decimal,
}

/// A line item attached to a placed order, with its frozen price.
#[derive(Debug, Clone, Serialize)]
pub struct OrderLine {
    pub line_item_id: LineItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    pub price_at_sale: Decimal,
}

/// A placed order with its lines.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub account_id: AccountId,
    pub address_id: AddressId,
    pub placed_at: DateTime<Utc>,
    pub lines: Vec<OrderLine>,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Invoice {
    pub id: InvoiceId,
    pub order_id: OrderId,
    pub account_id: AccountId,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Receipt {
    pub id: ReceiptId,
    pub order_id: OrderId,
    pub account_id: AccountId,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Report {
    pub id: ReportId,
    pub creator_id: AccountId,
    pub kind: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
