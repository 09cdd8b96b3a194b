//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Liveness check
//! GET  /health/ready               - Readiness check (database ping)
//!
//! # Auth (public)
//! POST /api/auth/register          - Register a customer account
//! POST /api/auth/login             - Issue a bearer token
//! POST /api/auth/guest             - Mint a guest account + short token
//!
//! # Catalogue (public)
//! GET  /api/products               - Listing with search/tag/stock filters
//! GET  /api/products/{id}          - Product detail with tags and images
//!
//! # Account (any valid token)
//! GET    /api/account              - Own profile (unverified ok)
//! PATCH  /api/account              - Update profile fields
//! POST   /api/account/password     - Change own password
//! GET    /api/account/addresses    - List addresses
//! POST   /api/account/addresses    - Add an address
//! DELETE /api/account/addresses/{id}
//!
//! # Trolley (any valid token)
//! GET    /api/trolley              - Current contents
//! POST   /api/trolley/items        - Add a product
//! PATCH  /api/trolley/items/{product_id} - Set quantity (0 removes)
//! DELETE /api/trolley/items/{product_id}
//! DELETE /api/trolley              - Empty the trolley
//!
//! # Orders (any valid token)
//! POST /api/orders                 - Place order from trolley
//! GET  /api/orders                 - Own order history
//! GET  /api/orders/{id}            - One own order
//! GET  /api/orders/{id}/invoice
//! GET  /api/orders/{id}/receipt
//!
//! # Catalogue management (employee+)
//! POST   /api/catalogue/products
//! PATCH  /api/catalogue/products/{id}
//! DELETE /api/catalogue/products/{id}       - Discontinue
//! GET    /api/catalogue/tags
//! POST   /api/catalogue/tags
//! DELETE /api/catalogue/tags/{id}
//! PUT    /api/catalogue/products/{id}/tags/{tag_id}
//! DELETE /api/catalogue/products/{id}/tags/{tag_id}
//! POST   /api/catalogue/products/{id}/images
//! DELETE /api/catalogue/products/{id}/images/{image_id}
//! GET    /api/catalogue/orders     - All orders
//!
//! # Administration (admin+)
//! GET    /api/admin/accounts
//! POST   /api/admin/accounts
//! PATCH  /api/admin/accounts/{id}/status
//! POST   /api/admin/accounts/{id}/password
//! DELETE /api/admin/accounts/{id} - Admin or Owner only
//! POST   /api/admin/reports        - Generate a sales report
//! GET    /api/admin/reports
//! DELETE /api/admin/reports/{id}
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod catalogue;
pub mod orders;
pub mod trolley;

use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/guest", post(auth::guest))
}

/// Create the public catalogue routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(catalogue::index))
        .route("/{id}", get(catalogue::show))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::show).patch(account::update))
        .route("/password", post(account::change_password))
        .route(
            "/addresses",
            get(account::addresses).post(account::create_address),
        )
        .route("/addresses/{id}", delete(account::delete_address))
}

/// Create the trolley routes router.
pub fn trolley_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(trolley::show).delete(trolley::clear))
        .route("/items", post(trolley::add))
        .route(
            "/items/{product_id}",
            patch(trolley::set_quantity).delete(trolley::remove),
        )
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(orders::place).get(orders::index))
        .route("/{id}", get(orders::show))
        .route("/{id}/invoice", get(orders::invoice))
        .route("/{id}/receipt", get(orders::receipt))
}

/// Create the staff catalogue management router.
pub fn catalogue_routes() -> Router<AppState> {
    Router::new()
        .route("/products", post(catalogue::create))
        .route(
            "/products/{id}",
            patch(catalogue::update).delete(catalogue::discontinue),
        )
        .route("/tags", get(catalogue::tags).post(catalogue::create_tag))
        .route("/tags/{id}", delete(catalogue::delete_tag))
        .route(
            "/products/{id}/tags/{tag_id}",
            put(catalogue::assign_tag).delete(catalogue::remove_tag),
        )
        .route("/products/{id}/images", post(catalogue::add_image))
        .route(
            "/products/{id}/images/{image_id}",
            delete(catalogue::remove_image),
        )
        .route("/orders", get(catalogue::all_orders))
}

/// Create the administration router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(admin::accounts).post(admin::create_account))
        .route("/accounts/{id}/status", patch(admin::set_status))
        .route("/accounts/{id}/password", post(admin::set_password))
        .route("/accounts/{id}", delete(admin::delete_account))
        .route("/reports", post(admin::create_report).get(admin::reports))
        .route("/reports/{id}", delete(admin::delete_report))
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/auth", auth_routes())
        .nest("/api/products", product_routes())
        .nest("/api/account", account_routes())
        .nest("/api/trolley", trolley_routes())
        .nest("/api/orders", order_routes())
        .nest("/api/catalogue", catalogue_routes())
        .nest("/api/admin", admin_routes())
}
