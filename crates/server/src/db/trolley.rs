//! Trolley repository.
//!
//! Trolley contents live in `line_item` rows joined to the account through
//! the `trolley` junction. Lines are keyed by product here: one product, one
//! line, with quantities merged on repeat adds. Nothing is reserved while a
//! line sits in a trolley; stock is only decremented at checkout.

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tradewind_core::{AccountId, LineItemId, ProductId};

use super::RepositoryError;
use crate::models::TrolleyLine;

#[derive(sqlx::FromRow)]
struct TrolleyRow {
    line_item_id: i32,
    product_id: i32,
    product_name: String,
    quantity: i32,
    unit_price: Decimal,
}

impl TrolleyRow {
    fn into_line(self) -> TrolleyLine {
        TrolleyLine {
            line_item_id: LineItemId::new(self.line_item_id),
            product_id: ProductId::new(self.product_id),
            product_name: self.product_name,
            quantity: self.quantity,
            unit_price: self.unit_price,
        }
    }
}

const SELECT_LINES: &str = "SELECT li.id AS line_item_id, p.id AS product_id,
            p.name AS product_name, li.quantity, p.price AS unit_price
     FROM trolley t
     JOIN line_item li ON li.id = t.line_item_id
     JOIN product p ON p.id = li.product_id
     WHERE t.account_id = $1
     ORDER BY li.id";

/// Repository for trolley database operations.
pub struct TrolleyRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TrolleyRepository<'a> {
    /// Create a new trolley repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List the account's trolley contents.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, account: AccountId) -> Result<Vec<TrolleyLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, TrolleyRow>(SELECT_LINES)
            .bind(account)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(TrolleyRow::into_line).collect())
    }

    /// Add `quantity` of a product, merging into an existing line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist or
    /// is discontinued.
    pub async fn add(
        &self,
        account: AccountId,
        product: ProductId,
        quantity: i32,
    ) -> Result<TrolleyLine, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let sellable = sqlx::query_scalar::<_, bool>(
            "SELECT NOT discontinued FROM product WHERE id = $1",
        )
        .bind(product)
        .fetch_optional(&mut *tx)
        .await?;

        if sellable != Some(true) {
            return Err(RepositoryError::NotFound);
        }

        let existing = Self::line_for_product(&mut tx, account, product).await?;

        let line_item_id = if let Some(line_item_id) = existing {
            sqlx::query("UPDATE line_item SET quantity = quantity + $2 WHERE id = $1")
                .bind(line_item_id)
                .bind(quantity)
                .execute(&mut *tx)
                .await?;
            line_item_id
        } else {
            let id = sqlx::query_scalar::<_, i32>(
                "INSERT INTO line_item (product_id, quantity) VALUES ($1, $2) RETURNING id",
            )
            .bind(product)
            .bind(quantity)
            .fetch_one(&mut *tx)
            .await?;
            let line_item_id = LineItemId::new(id);

            sqlx::query("INSERT INTO trolley (account_id, line_item_id) VALUES ($1, $2)")
                .bind(account)
                .bind(line_item_id)
                .execute(&mut *tx)
                .await?;
            line_item_id
        };

        let line = sqlx::query_as::<_, TrolleyRow>(
            "SELECT li.id AS line_item_id, p.id AS product_id,
                    p.name AS product_name, li.quantity, p.price AS unit_price
             FROM line_item li
             JOIN product p ON p.id = li.product_id
             WHERE li.id = $1",
        )
        .bind(line_item_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(line.into_line())
    }

    /// Set the quantity of a product's line. Zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product has no line in
    /// this trolley.
    pub async fn set_quantity(
        &self,
        account: AccountId,
        product: ProductId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        if quantity == 0 {
            return self.remove(account, product).await;
        }

        let mut tx = self.pool.begin().await?;
        let line_item_id = Self::line_for_product(&mut tx, account, product)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        sqlx::query("UPDATE line_item SET quantity = $2 WHERE id = $1")
            .bind(line_item_id)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Remove a product's line from the trolley.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product has no line in
    /// this trolley.
    pub async fn remove(
        &self,
        account: AccountId,
        product: ProductId,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let line_item_id = Self::line_for_product(&mut tx, account, product)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        // Deleting the line item cascades the trolley membership away.
        sqlx::query("DELETE FROM line_item WHERE id = $1")
            .bind(line_item_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Empty the trolley.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, account: AccountId) -> Result<(), RepositoryError> {
        sqlx::query(
            "DELETE FROM line_item
             WHERE id IN (SELECT line_item_id FROM trolley WHERE account_id = $1)",
        )
        .bind(account)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    async fn line_for_product(
        tx: &mut Transaction<'_, Postgres>,
        account: AccountId,
        product: ProductId,
    ) -> Result<Option<LineItemId>, RepositoryError> {
        let id = sqlx::query_scalar::<_, i32>(
            "SELECT li.id FROM trolley t
             JOIN line_item li ON li.id = t.line_item_id
             WHERE t.account_id = $1 AND li.product_id = $2",
        )
        .bind(account)
        .bind(product)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(id.map(LineItemId::new))
    }
}
