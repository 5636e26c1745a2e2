//! Cart store: one row per (user, product), qty adjusted in place.

use axum::extract::State;
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::Identity;
use crate::domain::cart::CartAction;
use crate::error::{ApiError, ApiResult};
use crate::models::CartLine;
use crate::state::AppState;

const CART_QUERY: &str = "SELECT c.id, c.product_id, c.qty, p.name, p.company_name, \
        p.final_price, p.image_urls \
     FROM cart_items c JOIN products p ON p.id = c.product_id \
     WHERE c.user_id = $1 ORDER BY c.created_at";

async fn load_cart(db: &sqlx::PgPool, user_id: Uuid) -> ApiResult<Vec<CartLine>> {
    Ok(sqlx::query_as::<_, CartLine>(CART_QUERY)
        .bind(user_id)
        .fetch_all(db)
        .await?)
}

pub async fn get_cart(State(s): State<AppState>, identity: Identity) -> ApiResult<Json<Value>> {
    let cart = load_cart(&s.db, identity.id).await?;
    Ok(Json(json!({ "cart": cart })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: Uuid,
}

/// Upsert: an already-present product gains quantity instead of a second
/// row, the merge rule of [`crate::domain::cart::Cart::add`] done
/// atomically in the store.
pub async fn add_to_cart(
    State(s): State<AppState>,
    identity: Identity,
    Json(req): Json<AddToCartRequest>,
) -> ApiResult<Json<Value>> {
    let product: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM products WHERE id = $1 AND is_active = TRUE")
            .bind(req.product_id)
            .fetch_optional(&s.db)
            .await?;
    if product.is_none() {
        return Err(ApiError::NotFound("Product not found".into()));
    }

    sqlx::query(
        "INSERT INTO cart_items (id, user_id, product_id, qty) VALUES ($1, $2, $3, 1) \
         ON CONFLICT (user_id, product_id) DO UPDATE SET qty = cart_items.qty + 1",
    )
    .bind(Uuid::now_v7())
    .bind(identity.id)
    .bind(req.product_id)
    .execute(&s.db)
    .await?;

    let cart = load_cart(&s.db, identity.id).await?;
    Ok(Json(json!({ "message": "Added to cart", "cart": cart })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartRequest {
    pub cart_item_id: Uuid,
    pub action: CartAction,
}

pub async fn update_cart(
    State(s): State<AppState>,
    identity: Identity,
    Json(req): Json<UpdateCartRequest>,
) -> ApiResult<Json<Value>> {
    let item: Option<(i32,)> =
        sqlx::query_as("SELECT qty FROM cart_items WHERE id = $1 AND user_id = $2")
            .bind(req.cart_item_id)
            .bind(identity.id)
            .fetch_optional(&s.db)
            .await?;
    let (qty,) = item.ok_or_else(|| ApiError::NotFound("Cart item not found".into()))?;

    match req.action.apply(qty) {
        Some(new_qty) if new_qty != qty => {
            sqlx::query("UPDATE cart_items SET qty = $2 WHERE id = $1")
                .bind(req.cart_item_id)
                .bind(new_qty)
                .execute(&s.db)
                .await?;
        }
        Some(_) => {}
        None => {
            sqlx::query("DELETE FROM cart_items WHERE id = $1")
                .bind(req.cart_item_id)
                .execute(&s.db)
                .await?;
        }
    }

    let cart = load_cart(&s.db, identity.id).await?;
    Ok(Json(json!({ "cart": cart })))
}

/// Anonymous browsing stays non-fatal: no session means a zero total, not
/// a 401.
pub async fn cart_total(
    State(s): State<AppState>,
    identity: Option<Identity>,
) -> ApiResult<Json<Value>> {
    let Some(identity) = identity else {
        return Ok(Json(json!({ "total": Decimal::ZERO })));
    };

    let total: (Option<Decimal>,) = sqlx::query_as(
        "SELECT SUM(p.final_price * c.qty) \
         FROM cart_items c JOIN products p ON p.id = c.product_id \
         WHERE c.user_id = $1",
    )
    .bind(identity.id)
    .fetch_one(&s.db)
    .await?;

    Ok(Json(json!({ "total": total.0.unwrap_or(Decimal::ZERO) })))
}
