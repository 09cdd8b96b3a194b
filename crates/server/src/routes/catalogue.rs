//! Catalogue endpoints: public browsing plus staff management.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tradewind_core::gate::Capability;
use tradewind_core::{ImageId, ProductId, Role, TagId};

use crate::db::products::{PriceSort, ProductFilter, ProductInput};
use crate::db::{OrderRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::middleware::Bearer;
use crate::middleware::auth::require;
use crate::models::{Image, Order, Product, Tag};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    pub search: Option<String>,
    pub tag: Option<String>,
    #[serde(default)]
    pub in_stock: bool,
    /// `price_asc` or `price_desc`; anything else sorts by newest.
    pub sort: Option<String>,
}

impl ListingQuery {
    fn into_filter(self) -> ProductFilter {
        ProductFilter {
            search: self.search.filter(|s| !s.trim().is_empty()),
            tag: self.tag,
            in_stock_only: self.in_stock,
            include_discontinued: false,
            sort: match self.sort.as_deref() {
                Some("price_asc") => PriceSort::PriceAscending,
                Some("price_desc") => PriceSort::PriceDescending,
                _ => PriceSort::Newest,
            },
        }
    }
}

/// `GET /api/products` - public listing.
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> Result<Json<Vec<Product>>> {
    let products = ProductRepository::new(state.pool())
        .list(&query.into_filter())
        .await?;
    Ok(Json(products))
}

/// `GET /api/products/{id}` - public detail, discontinued products hidden.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    let product = ProductRepository::new(state.pool())
        .get(id)
        .await?
        .filter(|p| !p.discontinued)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
    Ok(Json(product))
}

#[derive(Debug, Deserialize)]
pub struct ProductBody {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
}

impl ProductBody {
    fn into_input(self) -> Result<ProductInput> {
        if self.name.trim().is_empty() {
            return Err(AppError::InvalidInput("name must not be empty".to_string()));
        }
        if self.price < Decimal::ZERO {
            return Err(AppError::InvalidInput("price must not be negative".to_string()));
        }
        if self.stock < 0 {
            return Err(AppError::InvalidInput("stock must not be negative".to_string()));
        }
        Ok(ProductInput {
            name: self.name.trim().to_string(),
            description: self.description,
            price: self.price,
            stock: self.stock,
        })
    }
}

/// `POST /api/catalogue/products`
pub async fn create(
    State(state): State<AppState>,
    bearer: Bearer,
    Json(body): Json<ProductBody>,
) -> Result<(StatusCode, Json<Product>)> {
    require(&state, &bearer, Capability::min_role(Role::Employee)).await?;
    let product = ProductRepository::new(state.pool())
        .insert(&body.into_input()?)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// `PATCH /api/catalogue/products/{id}`
pub async fn update(
    State(state): State<AppState>,
    bearer: Bearer,
    Path(id): Path<ProductId>,
    Json(body): Json<ProductBody>,
) -> Result<Json<Product>> {
    require(&state, &bearer, Capability::min_role(Role::Employee)).await?;
    let product = ProductRepository::new(state.pool())
        .update(id, &body.into_input()?)
        .await?;
    Ok(Json(product))
}

/// `DELETE /api/catalogue/products/{id}` - discontinue, keep for history.
pub async fn discontinue(
    State(state): State<AppState>,
    bearer: Bearer,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    require(&state, &bearer, Capability::min_role(Role::Employee)).await?;
    ProductRepository::new(state.pool()).discontinue(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct TagBody {
    pub name: String,
}

/// `GET /api/catalogue/tags`
pub async fn tags(State(state): State<AppState>, bearer: Bearer) -> Result<Json<Vec<Tag>>> {
    require(&state, &bearer, Capability::min_role(Role::Employee)).await?;
    let tags = ProductRepository::new(state.pool()).list_tags().await?;
    Ok(Json(tags))
}

/// `POST /api/catalogue/tags`
pub async fn create_tag(
    State(state): State<AppState>,
    bearer: Bearer,
    Json(body): Json<TagBody>,
) -> Result<(StatusCode, Json<Tag>)> {
    require(&state, &bearer, Capability::min_role(Role::Employee)).await?;
    if body.name.trim().is_empty() {
        return Err(AppError::InvalidInput("name must not be empty".to_string()));
    }
    let tag = ProductRepository::new(state.pool())
        .insert_tag(body.name.trim())
        .await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

/// `DELETE /api/catalogue/tags/{id}`
pub async fn delete_tag(
    State(state): State<AppState>,
    bearer: Bearer,
    Path(id): Path<TagId>,
) -> Result<StatusCode> {
    require(&state, &bearer, Capability::min_role(Role::Employee)).await?;
    ProductRepository::new(state.pool()).delete_tag(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /api/catalogue/products/{id}/tags/{tag_id}`
pub async fn assign_tag(
    State(state): State<AppState>,
    bearer: Bearer,
    Path((id, tag_id)): Path<(ProductId, TagId)>,
) -> Result<StatusCode> {
    require(&state, &bearer, Capability::min_role(Role::Employee)).await?;
    ProductRepository::new(state.pool()).assign_tag(id, tag_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/catalogue/products/{id}/tags/{tag_id}`
pub async fn remove_tag(
    State(state): State<AppState>,
    bearer: Bearer,
    Path((id, tag_id)): Path<(ProductId, TagId)>,
) -> Result<StatusCode> {
    require(&state, &bearer, Capability::min_role(Role::Employee)).await?;
    ProductRepository::new(state.pool()).remove_tag(id, tag_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ImageBody {
    pub url: String,
    pub alt_text: Option<String>,
}

/// `POST /api/catalogue/products/{id}/images`
pub async fn add_image(
    State(state): State<AppState>,
    bearer: Bearer,
    Path(id): Path<ProductId>,
    Json(body): Json<ImageBody>,
) -> Result<(StatusCode, Json<Image>)> {
    require(&state, &bearer, Capability::min_role(Role::Employee)).await?;
    if body.url.trim().is_empty() {
        return Err(AppError::InvalidInput("url must not be empty".to_string()));
    }
    let image = ProductRepository::new(state.pool())
        .add_image(id, body.url.trim(), body.alt_text.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(image)))
}

/// `DELETE /api/catalogue/products/{id}/images/{image_id}`
pub async fn remove_image(
    State(state): State<AppState>,
    bearer: Bearer,
    Path((id, image_id)): Path<(ProductId, ImageId)>,
) -> Result<StatusCode> {
    require(&state, &bearer, Capability::min_role(Role::Employee)).await?;
    ProductRepository::new(state.pool()).remove_image(id, image_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/catalogue/orders` - every order in the system.
pub async fn all_orders(State(state): State<AppState>, bearer: Bearer) -> Result<Json<Vec<Order>>> {
    require(&state, &bearer, Capability::min_role(Role::Employee)).await?;
    let orders = OrderRepository::new(state.pool()).list_all().await?;
    Ok(Json(orders))
}
