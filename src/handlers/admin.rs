//! Admin surface: platform-wide listings, order status management, and
//! dashboard aggregates.
//!
//! Admin item updates go through the same one-step transition function as
//! the seller path; the order-level status stays derived.

use axum::extract::{Path, State};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::{self, verify_password, Identity, Role};
use crate::error::{ApiError, ApiResult};
use crate::handlers::auth::session_cookie;
use crate::handlers::orders;
use crate::models::{Admin, OrderRow, Product, User};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn admin_login(
    State(s): State<AppState>,
    jar: CookieJar,
    Json(req): Json<AdminLoginRequest>,
) -> ApiResult<(CookieJar, Json<Value>)> {
    let admin: Admin = sqlx::query_as("SELECT * FROM admins WHERE email = $1")
        .bind(&req.email)
        .fetch_optional(&s.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Admin not found".into()))?;

    if !verify_password(&req.password, &admin.password_hash) {
        return Err(ApiError::Unauthorized);
    }

    let token = auth::sign(
        Identity {
            id: admin.id,
            role: Role::Admin,
        },
        &s.auth,
    )
    .map_err(|_| ApiError::InvalidState("Could not issue session".into()))?;

    Ok((
        jar.add(session_cookie(token)),
        Json(json!({ "success": true })),
    ))
}

pub async fn list_users(State(s): State<AppState>, identity: Identity) -> ApiResult<Json<Value>> {
    identity.require(Role::Admin)?;
    let users = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE role = 'customer' ORDER BY created_at DESC",
    )
    .fetch_all(&s.db)
    .await?;
    Ok(Json(json!({ "users": users })))
}

pub async fn delete_user(
    State(s): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    identity.require(Role::Admin)?;
    let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&s.db)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(ApiError::NotFound("User not found".into()));
    }
    Ok(Json(json!({ "success": true })))
}

pub async fn list_sellers(State(s): State<AppState>, identity: Identity) -> ApiResult<Json<Value>> {
    identity.require(Role::Admin)?;
    let sellers = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE role = 'seller' ORDER BY created_at DESC",
    )
    .fetch_all(&s.db)
    .await?;
    Ok(Json(json!({ "sellers": sellers })))
}

pub async fn list_all_products(
    State(s): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<Value>> {
    identity.require(Role::Admin)?;
    let products =
        sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY created_at DESC")
            .fetch_all(&s.db)
            .await?;
    Ok(Json(json!({ "products": products })))
}

pub async fn delete_product(
    State(s): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    identity.require(Role::Admin)?;
    let deleted = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&s.db)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(ApiError::NotFound("Product not found".into()));
    }
    Ok(Json(json!({ "success": true })))
}

pub async fn list_all_orders(
    State(s): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<Value>> {
    identity.require(Role::Admin)?;
    let order_rows =
        sqlx::query_as::<_, OrderRow>("SELECT * FROM orders ORDER BY created_at DESC")
            .fetch_all(&s.db)
            .await?;
    let docs = orders::load_order_docs(&s.db, order_rows).await?;
    Ok(Json(json!({ "success": true, "orders": docs })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemStatusUpdate {
    pub item_id: Uuid,
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    pub status: Option<String>,
    pub item_statuses: Option<Vec<ItemStatusUpdate>>,
}

pub async fn update_order(
    State(s): State<AppState>,
    identity: Identity,
    Path(order_id): Path<Uuid>,
    Json(req): Json<UpdateOrderRequest>,
) -> ApiResult<Json<Value>> {
    identity.require(Role::Admin)?;

    let mut tx = s.db.begin().await?;

    let order: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?;
    if order.is_none() {
        return Err(ApiError::NotFound("Order not found".into()));
    }

    if let Some(updates) = &req.item_statuses {
        for update in updates {
            let item: Option<(String,)> =
                sqlx::query_as("SELECT status FROM order_items WHERE id = $1 AND order_id = $2")
                    .bind(update.item_id)
                    .bind(order_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            let (current,) =
                item.ok_or_else(|| ApiError::NotFound("Item not found in order".into()))?;
            let current = orders::parse_item_status(&current)?;
            let target = orders::parse_item_status(&update.status)?;
            orders::transition_item(&mut tx, update.item_id, current, target).await?;
        }
    }

    // A whole-order target walks every item toward it, one legal step at a
    // time; items already at or past the target are left untouched.
    if let Some(status) = &req.status {
        let target = orders::parse_item_status(status)?;
        let items: Vec<(Uuid, String)> =
            sqlx::query_as("SELECT id, status FROM order_items WHERE order_id = $1")
                .bind(order_id)
                .fetch_all(&mut *tx)
                .await?;
        for (item_id, current) in items {
            let current = orders::parse_item_status(&current)?;
            let updated = current.advance_toward(target);
            if updated != current {
                orders::apply_item_status(&mut tx, item_id, updated).await?;
            }
        }
    }

    orders::recompute_order_status(&mut tx, order_id).await?;

    let order = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await?;
    tx.commit().await?;

    let doc = orders::load_order_docs(&s.db, vec![order])
        .await?
        .remove(0);
    Ok(Json(json!({
        "success": true,
        "message": "Order updated",
        "order": doc,
    })))
}

pub async fn admin_dashboard(
    State(s): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<Value>> {
    identity.require(Role::Admin)?;

    let counts: (i64, i64, i64, i64) = sqlx::query_as(
        "SELECT (SELECT COUNT(*) FROM users WHERE role = 'customer'), \
                (SELECT COUNT(*) FROM users WHERE role = 'seller'), \
                (SELECT COUNT(*) FROM products), \
                (SELECT COUNT(*) FROM orders)",
    )
    .fetch_one(&s.db)
    .await?;

    let revenue: (Option<Decimal>,) = sqlx::query_as("SELECT SUM(total) FROM orders")
        .fetch_one(&s.db)
        .await?;

    let monthly: Vec<(i32, Decimal)> = sqlx::query_as(
        "SELECT EXTRACT(MONTH FROM created_at)::int, SUM(total) \
         FROM orders GROUP BY 1 ORDER BY 1",
    )
    .fetch_all(&s.db)
    .await?;

    let yearly: Vec<(i32, Decimal)> = sqlx::query_as(
        "SELECT EXTRACT(YEAR FROM created_at)::int, SUM(total) \
         FROM orders GROUP BY 1 ORDER BY 1",
    )
    .fetch_all(&s.db)
    .await?;

    let monthly_sales: Vec<Value> = monthly
        .into_iter()
        .map(|(month, sales)| json!({ "name": format!("M{month}"), "sales": sales }))
        .collect();
    let yearly_sales: Vec<Value> = yearly
        .into_iter()
        .map(|(year, sales)| json!({ "name": year.to_string(), "sales": sales }))
        .collect();

    Ok(Json(json!({
        "totalUsers": counts.0,
        "totalSellers": counts.1,
        "totalProducts": counts.2,
        "totalOrders": counts.3,
        "totalRevenue": revenue.0.unwrap_or(Decimal::ZERO),
        "monthlySales": monthly_sales,
        "yearlySales": yearly_sales,
    })))
}
