//! Order history repository and the Postgres checkout transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tradewind_core::checkout::{CartLine, CheckoutTx};
use tradewind_core::{
    AccountId, AddressId, InvoiceId, LineItemId, OrderId, ProductId, ReceiptId, ReportId,
};

use super::RepositoryError;
use crate::models::{Invoice, Order, OrderLine, Receipt, Report};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i32,
    account_id: i32,
    address_id: i32,
    placed_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderLineRow {
    order_id: i32,
    line_item_id: i32,
    product_id: i32,
    product_name: String,
    quantity: i32,
    price_at_sale: Option<Decimal>,
}

impl OrderLineRow {
    fn into_line(self) -> Result<OrderLine, RepositoryError> {
        // price_at_sale is frozen at placement; a NULL on an ordered line
        // means the row skipped the workflow.
        let price_at_sale = self.price_at_sale.ok_or_else(|| {
            RepositoryError::DataCorruption(format!(
                "line item {} on order {} has no frozen price",
                self.line_item_id, self.order_id
            ))
        })?;
        Ok(OrderLine {
            line_item_id: LineItemId::new(self.line_item_id),
            product_id: ProductId::new(self.product_id),
            product_name: self.product_name,
            quantity: self.quantity,
            price_at_sale,
        })
    }
}

const SELECT_LINES: &str = "SELECT oi.order_id, li.id AS line_item_id, p.id AS product_id,
            p.name AS product_name, li.quantity, li.price_at_sale
     FROM order_item oi
     JOIN line_item li ON li.id = oi.line_item_id
     JOIN product p ON p.id = li.product_id";

/// Repository for order history database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List an account's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_account(
        &self,
        account: AccountId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            "SELECT id, account_id, address_id, placed_at FROM \"order\"
             WHERE account_id = $1 ORDER BY placed_at DESC",
        )
        .bind(account)
        .fetch_all(self.pool)
        .await?;

        self.hydrate(rows).await
    }

    /// List every order in the system, newest first. Staff view.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            "SELECT id, account_id, address_id, placed_at FROM \"order\"
             ORDER BY placed_at DESC",
        )
        .fetch_all(self.pool)
        .await?;

        self.hydrate(rows).await
    }

    /// Get one order with its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            "SELECT id, account_id, address_id, placed_at FROM \"order\" WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(self.hydrate(vec![row]).await?.into_iter().next())
    }

    /// Attach lines and totals to bare order rows.
    async fn hydrate(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let line_rows = sqlx::query_as::<_, OrderLineRow>(&format!(
            "{SELECT_LINES} WHERE oi.order_id = ANY($1) ORDER BY li.id"
        ))
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut orders: Vec<Order> = rows
            .into_iter()
            .map(|r| Order {
                id: OrderId::new(r.id),
                account_id: AccountId::new(r.account_id),
                address_id: AddressId::new(r.address_id),
                placed_at: r.placed_at,
                lines: Vec::new(),
                total: Decimal::ZERO,
            })
            .collect();

        for line_row in line_rows {
            let order_id = OrderId::new(line_row.order_id);
            let line = line_row.into_line()?;
            if let Some(order) = orders.iter_mut().find(|o| o.id == order_id) {
                order.total += line.price_at_sale * Decimal::from(line.quantity);
                order.lines.push(line);
            }
        }

        Ok(orders)
    }

    /// Get the invoice emitted for an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn invoice_for_order(
        &self,
        order: OrderId,
    ) -> Result<Option<Invoice>, RepositoryError> {
        let invoice = sqlx::query_as::<_, Invoice>(
            "SELECT id, order_id, account_id, payload, created_at
             FROM invoice WHERE order_id = $1",
        )
        .bind(order)
        .fetch_optional(self.pool)
        .await?;
        Ok(invoice)
    }

    /// Get the receipt emitted for an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn receipt_for_order(
        &self,
        order: OrderId,
    ) -> Result<Option<Receipt>, RepositoryError> {
        let receipt = sqlx::query_as::<_, Receipt>(
            "SELECT id, order_id, account_id, payload, created_at
             FROM receipt WHERE order_id = $1",
        )
        .bind(order)
        .fetch_optional(self.pool)
        .await?;
        Ok(receipt)
    }

    /// Store a staff report.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn insert_report(
        &self,
        creator: AccountId,
        kind: &str,
        payload: &serde_json::Value,
    ) -> Result<Report, RepositoryError> {
        let report = sqlx::query_as::<_, Report>(
            "INSERT INTO report (creator_id, kind, payload) VALUES ($1, $2, $3)
             RETURNING id, creator_id, kind, payload, created_at",
        )
        .bind(creator)
        .bind(kind)
        .bind(payload)
        .fetch_one(self.pool)
        .await?;
        Ok(report)
    }

    /// List stored reports, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_reports(&self) -> Result<Vec<Report>, RepositoryError> {
        let reports = sqlx::query_as::<_, Report>(
            "SELECT id, creator_id, kind, payload, created_at
             FROM report ORDER BY created_at DESC",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(reports)
    }

    /// Aggregate order count and revenue for a sales report.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn sales_summary(&self) -> Result<(i64, Decimal), RepositoryError> {
        let row = sqlx::query_as::<_, (i64, Option<Decimal>)>(
            "SELECT COUNT(DISTINCT oi.order_id),
                    SUM(li.quantity * li.price_at_sale)
             FROM order_item oi
             JOIN line_item li ON li.id = oi.line_item_id",
        )
        .fetch_one(self.pool)
        .await?;

        Ok((row.0, row.1.unwrap_or(Decimal::ZERO)))
    }

    /// Delete a report.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the report does not exist.
    pub async fn delete_report(&self, id: ReportId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM report WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// One Postgres transaction backing a single order placement.
///
/// Dropping without [`commit`](Self::commit) rolls everything back, which
/// is exactly the all-or-nothing contract the workflow relies on.
pub struct PgCheckout<'t> {
    tx: Transaction<'t, Postgres>,
}

impl<'t> PgCheckout<'t> {
    /// Open a checkout transaction on the pool.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` if a connection cannot be acquired.
    pub async fn begin(pool: &'t PgPool) -> Result<Self, sqlx::Error> {
        Ok(PgCheckout {
            tx: pool.begin().await?,
        })
    }

    /// Commit the placement.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` if the commit fails.
    pub async fn commit(self) -> Result<(), sqlx::Error> {
        self.tx.commit().await
    }
}

impl CheckoutTx for PgCheckout<'_> {
    type Error = sqlx::Error;

    async fn trolley_lines(&mut self, account: AccountId) -> Result<Vec<CartLine>, sqlx::Error> {
        let rows = sqlx::query_as::<_, (i32, i32, i32)>(
            "SELECT li.id, li.product_id, li.quantity
             FROM trolley t
             JOIN line_item li ON li.id = t.line_item_id
             WHERE t.account_id = $1
             ORDER BY li.id",
        )
        .bind(account)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(line_item, product, quantity)| CartLine {
                line_item: LineItemId::new(line_item),
                product: ProductId::new(product),
                quantity,
            })
            .collect())
    }

    async fn address_owner(
        &mut self,
        address: AddressId,
    ) -> Result<Option<AccountId>, sqlx::Error> {
        sqlx::query_scalar::<_, AccountId>("SELECT account_id FROM address WHERE id = $1")
            .bind(address)
            .fetch_optional(&mut *self.tx)
            .await
    }

    async fn reserve_stock(
        &mut self,
        product: ProductId,
        quantity: i32,
    ) -> Result<Option<Decimal>, sqlx::Error> {
        // The guard serializes racing reservations: the row lock taken by
        // UPDATE makes the loser re-evaluate `available >= $2` against the
        // winner's committed value, so `available` never goes negative.
        sqlx::query_scalar::<_, Decimal>(
            "UPDATE product
             SET available = available - $2
             WHERE id = $1 AND NOT discontinued AND available >= $2
             RETURNING price",
        )
        .bind(product)
        .bind(quantity)
        .fetch_optional(&mut *self.tx)
        .await
    }

    async fn create_order(
        &mut self,
        account: AccountId,
        address: AddressId,
        placed_at: DateTime<Utc>,
    ) -> Result<OrderId, sqlx::Error> {
        sqlx::query_scalar::<_, OrderId>(
            "INSERT INTO \"order\" (account_id, address_id, placed_at)
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(account)
        .bind(address)
        .bind(placed_at)
        .fetch_one(&mut *self.tx)
        .await
    }

    async fn attach_line(
        &mut self,
        order: OrderId,
        line_item: LineItemId,
        unit_price: Decimal,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE line_item SET price_at_sale = $2 WHERE id = $1")
            .bind(line_item)
            .bind(unit_price)
            .execute(&mut *self.tx)
            .await?;

        sqlx::query("INSERT INTO order_item (order_id, line_item_id) VALUES ($1, $2)")
            .bind(order)
            .bind(line_item)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn remove_from_trolley(
        &mut self,
        account: AccountId,
        line_item: LineItemId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM trolley WHERE account_id = $1 AND line_item_id = $2")
            .bind(account)
            .bind(line_item)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn create_invoice(
        &mut self,
        order: OrderId,
        account: AccountId,
        placed_at: DateTime<Utc>,
    ) -> Result<InvoiceId, sqlx::Error> {
        let payload = self.document_payload(order, account, placed_at).await?;
        sqlx::query_scalar::<_, InvoiceId>(
            "INSERT INTO invoice (order_id, account_id, payload)
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(order)
        .bind(account)
        .bind(payload)
        .fetch_one(&mut *self.tx)
        .await
    }

    async fn create_receipt(
        &mut self,
        order: OrderId,
        account: AccountId,
        placed_at: DateTime<Utc>,
    ) -> Result<ReceiptId, sqlx::Error> {
        let payload = self.document_payload(order, account, placed_at).await?;
        sqlx::query_scalar::<_, ReceiptId>(
            "INSERT INTO receipt (order_id, account_id, payload)
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(order)
        .bind(account)
        .bind(payload)
        .fetch_one(&mut *self.tx)
        .await
    }
}

impl PgCheckout<'_> {
    /// Snapshot the order's lines into a document payload. Called after
    /// the lines are attached, so frozen prices are already in place.
    async fn document_payload(
        &mut self,
        order: OrderId,
        account: AccountId,
        placed_at: DateTime<Utc>,
    ) -> Result<serde_json::Value, sqlx::Error> {
        let lines = sqlx::query_as::<_, (i32, String, i32, Option<Decimal>)>(
            "SELECT p.id, p.name, li.quantity, li.price_at_sale
             FROM order_item oi
             JOIN line_item li ON li.id = oi.line_item_id
             JOIN product p ON p.id = li.product_id
             WHERE oi.order_id = $1
             ORDER BY li.id",
        )
        .bind(order)
        .fetch_all(&mut *self.tx)
        .await?;

        let mut total = Decimal::ZERO;
        let line_values: Vec<serde_json::Value> = lines
            .into_iter()
            .map(|(product_id, name, quantity, price)| {
                let price = price.unwrap_or(Decimal::ZERO);
                total += price * Decimal::from(quantity);
                serde_json::json!({
                    "product_id": product_id,
                    "product": name,
                    "quantity": quantity,
                    "unit_price": price.to_string(),
                })
            })
            .collect();

        Ok(serde_json::json!({
            "order_id": order,
            "account_id": account,
            "placed_at": placed_at,
            "lines": line_values,
            "total": total.to_string(),
        }))
    }
}
