//! Catalogue repository: products, tags, images.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tradewind_core::{ImageId, ProductId, TagId};

use super::RepositoryError;
use crate::models::{Image, Product, Tag};

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    description: String,
    price: Decimal,
    stock: i32,
    available: i32,
    discontinued: bool,
    created_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(self, tags: Vec<Tag>, images: Vec<Image>) -> Product {
        Product {
            id: ProductId::new(self.id),
            name: self.name,
            description: self.description,
            price: self.price,
            stock: self.stock,
            available: self.available,
            discontinued: self.discontinued,
            created_at: self.created_at,
            tags,
            images,
        }
    }
}

/// Price sort direction for catalogue listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PriceSort {
    /// Newest first (default).
    #[default]
    Newest,
    PriceAscending,
    PriceDescending,
}

/// Catalogue listing filters.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Case-insensitive substring match on name and description.
    pub search: Option<String>,
    /// Restrict to products carrying this tag.
    pub tag: Option<String>,
    /// Only show products with at least one sellable unit.
    pub in_stock_only: bool,
    /// Include discontinued products (staff views).
    pub include_discontinued: bool,
    pub sort: PriceSort,
}

/// New or updated product fields.
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
}

/// Repository for catalogue database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products matching `filter`. Tags and images are not loaded for
    /// listings; fetch a single product for the full view.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT p.id, p.name, p.description, p.price, p.stock, p.available,
                    p.discontinued, p.created_at
             FROM product p WHERE TRUE",
        );

        if !filter.include_discontinued {
            builder.push(" AND p.discontinued = FALSE");
        }
        if filter.in_stock_only {
            builder.push(" AND p.available > 0");
        }
        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search.replace(['%', '_'], ""));
            builder.push(" AND (p.name ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR p.description ILIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }
        if let Some(tag) = &filter.tag {
            builder.push(
                " AND EXISTS (SELECT 1 FROM product_tag pt
                              JOIN tag t ON t.id = pt.tag_id
                              WHERE pt.product_id = p.id AND t.name = ",
            );
            builder.push_bind(tag.clone());
            builder.push(")");
        }

        builder.push(match filter.sort {
            PriceSort::Newest => " ORDER BY p.created_at DESC",
            PriceSort::PriceAscending => " ORDER BY p.price ASC, p.id",
            PriceSort::PriceDescending => " ORDER BY p.price DESC, p.id",
        });

        let rows = builder
            .build_query_as::<ProductRow>()
            .fetch_all(self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| r.into_product(Vec::new(), Vec::new()))
            .collect())
    }

    /// Get a product with its tags and images.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, description, price, stock, available, discontinued, created_at
             FROM product WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let tags = sqlx::query_as::<_, Tag>(
            "SELECT t.id, t.name FROM tag t
             JOIN product_tag pt ON pt.tag_id = t.id
             WHERE pt.product_id = $1 ORDER BY t.name",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        let images = sqlx::query_as::<_, Image>(
            "SELECT i.id, i.url, i.alt_text FROM image i
             JOIN product_image pi ON pi.image_id = i.id
             WHERE pi.product_id = $1 ORDER BY i.id",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(Some(row.into_product(tags, images)))
    }

    /// Insert a new product. `available` starts equal to `stock`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn insert(&self, input: &ProductInput) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            "INSERT INTO product (name, description, price, stock, available)
             VALUES ($1, $2, $3, $4, $4)
             RETURNING id, name, description, price, stock, available, discontinued, created_at",
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price)
        .bind(input.stock)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into_product(Vec::new(), Vec::new()))
    }

    /// Update a product. Restocking raises `stock` and `available` by the
    /// same delta so reserved units stay reserved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist and
    /// `RepositoryError::Conflict` if the new stock level would drop below
    /// the number of already-reserved units.
    pub async fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            "UPDATE product
             SET name = $2, description = $3, price = $4,
                 available = available + ($5 - stock),
                 stock = $5
             WHERE id = $1
             RETURNING id, name, description, price, stock, available, discontinued, created_at",
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price)
        .bind(input.stock)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| {
            RepositoryError::from_sqlx(e, "stock cannot drop below reserved units")
        })?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into_product(Vec::new(), Vec::new()))
    }

    /// Mark a product discontinued. It stays resolvable for order history
    /// but disappears from public listings.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn discontinue(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE product SET discontinued = TRUE WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// List all tags.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_tags(&self) -> Result<Vec<Tag>, RepositoryError> {
        let tags = sqlx::query_as::<_, Tag>("SELECT id, name FROM tag ORDER BY name")
            .fetch_all(self.pool)
            .await?;
        Ok(tags)
    }

    /// Create a tag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken.
    pub async fn insert_tag(&self, name: &str) -> Result<Tag, RepositoryError> {
        let tag = sqlx::query_as::<_, Tag>("INSERT INTO tag (name) VALUES ($1) RETURNING id, name")
            .bind(name)
            .fetch_one(self.pool)
            .await
            .map_err(|e| RepositoryError::from_sqlx(e, "tag already exists"))?;
        Ok(tag)
    }

    /// Delete a tag, detaching it from all products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the tag does not exist.
    pub async fn delete_tag(&self, id: TagId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM tag WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Attach a tag to a product. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if either side does not exist.
    pub async fn assign_tag(&self, product: ProductId, tag: TagId) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO product_tag (product_id, tag_id) VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(product)
        .bind(tag)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_sqlx(e, "product or tag not found"))?;
        Ok(())
    }

    /// Detach a tag from a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the assignment does not exist.
    pub async fn remove_tag(&self, product: ProductId, tag: TagId) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("DELETE FROM product_tag WHERE product_id = $1 AND tag_id = $2")
                .bind(product)
                .bind(tag)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Attach a new image to a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the product does not exist.
    pub async fn add_image(
        &self,
        product: ProductId,
        url: &str,
        alt_text: Option<&str>,
    ) -> Result<Image, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let image = sqlx::query_as::<_, Image>(
            "INSERT INTO image (url, alt_text) VALUES ($1, $2) RETURNING id, url, alt_text",
        )
        .bind(url)
        .bind(alt_text)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO product_image (product_id, image_id) VALUES ($1, $2)")
            .bind(product)
            .bind(image.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::from_sqlx(e, "product not found"))?;

        tx.commit().await?;
        Ok(image)
    }

    /// Remove an image from a product and delete the image row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the image is not attached to
    /// the product.
    pub async fn remove_image(
        &self,
        product: ProductId,
        image: ImageId,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result =
            sqlx::query("DELETE FROM product_image WHERE product_id = $1 AND image_id = $2")
                .bind(product)
                .bind(image)
                .execute(&mut *tx)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query("DELETE FROM image WHERE id = $1")
            .bind(image)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
