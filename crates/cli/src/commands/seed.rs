//! Demo catalogue seeding.

use rust_decimal::Decimal;
use sqlx::PgPool;
use tradewind_core::ProductId;

use super::{CommandError, connect};

struct SeedProduct {
    name: &'static str,
    description: &'static str,
    /// Price in cents.
    price_cents: i64,
    stock: i32,
    tags: &'static [&'static str],
    image: &'static str,
}

const CATALOGUE: &[SeedProduct] = &[
    SeedProduct {
        name: "Drift 65 Keyboard",
        description: "Hot-swappable 65% mechanical keyboard, aluminium case.",
        price_cents: 11999,
        stock: 140,
        tags: &["peripherals", "keyboards"],
        image: "https://cdn.tradewind.example/img/drift-65.jpg",
    },
    SeedProduct {
        name: "Ballast Desk Mat",
        description: "900x400mm stitched-edge desk mat.",
        price_cents: 2450,
        stock: 300,
        tags: &["peripherals", "desk"],
        image: "https://cdn.tradewind.example/img/ballast-mat.jpg",
    },
    SeedProduct {
        name: "Halyard USB-C Dock",
        description: "Dual-display dock with 96W passthrough.",
        price_cents: 18900,
        stock: 55,
        tags: &["desk", "power"],
        image: "https://cdn.tradewind.example/img/halyard-dock.jpg",
    },
    SeedProduct {
        name: "Jib Travel Mouse",
        description: "Compact low-profile wireless mouse.",
        price_cents: 4999,
        stock: 210,
        tags: &["peripherals"],
        image: "https://cdn.tradewind.example/img/jib-mouse.jpg",
    },
];

/// Insert the demo catalogue. Safe to re-run; products are matched by name.
///
/// # Errors
///
/// Returns an error if a query fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    for product in CATALOGUE {
        seed_product(&pool, product).await?;
    }

    tracing::info!(products = CATALOGUE.len(), "Seeding complete");
    Ok(())
}

async fn seed_product(pool: &PgPool, product: &SeedProduct) -> Result<(), CommandError> {
    let existing = sqlx::query_scalar::<_, i32>("SELECT id FROM product WHERE name = $1")
        .bind(product.name)
        .fetch_optional(pool)
        .await?;

    if existing.is_some() {
        tracing::info!(name = product.name, "already seeded, skipping");
        return Ok(());
    }

    let price = Decimal::new(product.price_cents, 2);
    let product_id = sqlx::query_scalar::<_, ProductId>(
        "INSERT INTO product (name, description, price, stock, available)
         VALUES ($1, $2, $3, $4, $4) RETURNING id",
    )
    .bind(product.name)
    .bind(product.description)
    .bind(price)
    .bind(product.stock)
    .fetch_one(pool)
    .await?;

    for tag in product.tags {
        let tag_id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO tag (name) VALUES ($1)
             ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
             RETURNING id",
        )
        .bind(tag)
        .fetch_one(pool)
        .await?;

        sqlx::query(
            "INSERT INTO product_tag (product_id, tag_id) VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(product_id)
        .bind(tag_id)
        .execute(pool)
        .await?;
    }

    let image_id = sqlx::query_scalar::<_, i32>(
        "INSERT INTO image (url, alt_text) VALUES ($1, $2) RETURNING id",
    )
    .bind(product.image)
    .bind(product.name)
    .fetch_one(pool)
    .await?;

    sqlx::query("INSERT INTO product_image (product_id, image_id) VALUES ($1, $2)")
        .bind(product_id)
        .bind(image_id)
        .execute(pool)
        .await?;

    tracing::info!(name = product.name, id = %product_id, "seeded");
    Ok(())
}
