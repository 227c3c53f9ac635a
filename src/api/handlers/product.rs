//! Product catalog endpoint handlers.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{ProductListQuery, ProductResponse};
use crate::app_state::AppState;
use crate::domain::ProductId;
use crate::error::{ErrorResponse, MarketError};
use crate::persistence::store::ProductCatalog;

/// `GET /products` — Active product catalog.
///
/// # Errors
///
/// Returns [`MarketError::Persistence`] on store failure.
#[utoipa::path(
    get,
    path = "/api/v1/products",
    tag = "Products",
    summary = "List active products",
    description = "Returns the active catalog, optionally filtered to products accepting a \
                   given payment method.",
    params(
        ("payment_method" = Option<String>, Query, description = "jestcoin, money, or hybrid"),
    ),
    responses(
        (status = 200, description = "Active products", body = Vec<ProductResponse>),
    )
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<impl IntoResponse, MarketError> {
    let products = state
        .store
        .list_active_products(query.payment_method)
        .await?;
    let products: Vec<ProductResponse> =
        products.into_iter().map(ProductResponse::from).collect();
    Ok(Json(products))
}

/// `GET /products/:id` — One product.
///
/// # Errors
///
/// Returns [`MarketError::ProductNotFound`] for unknown or inactive
/// products and [`MarketError::Persistence`] on store failure.
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    tag = "Products",
    summary = "Get a product",
    description = "Returns one active product by ID. Inactive products are not visible.",
    params(
        ("id" = uuid::Uuid, Path, description = "Product UUID"),
    ),
    responses(
        (status = 200, description = "Product", body = ProductResponse),
        (status = 404, description = "Product not found", body = ErrorResponse),
    )
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, MarketError> {
    let product = state
        .store
        .get_active_product(ProductId::from_uuid(id))
        .await?
        .ok_or(MarketError::ProductNotFound(id))?;
    Ok(Json(ProductResponse::from(product)))
}

/// Product routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/{id}", get(get_product))
}
