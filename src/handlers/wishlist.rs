//! Wishlist: a flat per-user product set with a toggle.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::Identity;
use crate::error::{ApiError, ApiResult};
use crate::models::Product;
use crate::state::AppState;

pub async fn get_wishlist(State(s): State<AppState>, identity: Identity) -> ApiResult<Json<Value>> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT p.* FROM wishlist_items w JOIN products p ON p.id = w.product_id \
         WHERE w.user_id = $1 ORDER BY w.created_at DESC",
    )
    .bind(identity.id)
    .fetch_all(&s.db)
    .await?;
    Ok(Json(json!({ "wishlist": products })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRequest {
    pub product_id: Uuid,
}

pub async fn toggle_wishlist(
    State(s): State<AppState>,
    identity: Identity,
    Json(req): Json<ToggleRequest>,
) -> ApiResult<Json<Value>> {
    let removed = sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1 AND product_id = $2")
        .bind(identity.id)
        .bind(req.product_id)
        .execute(&s.db)
        .await?;
    if removed.rows_affected() > 0 {
        return Ok(Json(json!({ "wishlisted": false })));
    }

    let product: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
        .bind(req.product_id)
        .fetch_optional(&s.db)
        .await?;
    if product.is_none() {
        return Err(ApiError::NotFound("Product not found".into()));
    }

    sqlx::query(
        "INSERT INTO wishlist_items (id, user_id, product_id) VALUES ($1, $2, $3) \
         ON CONFLICT (user_id, product_id) DO NOTHING",
    )
        .bind(Uuid::now_v7())
        .bind(identity.id)
        .bind(req.product_id)
        .execute(&s.db)
        .await?;
    Ok(Json(json!({ "wishlisted": true })))
}
