//! Seller surface: own-catalog CRUD, the per-seller order queue, item
//! fulfillment, and the seller dashboard aggregates.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{Identity, Role};
use crate::domain::pricing;
use crate::error::{ApiError, ApiResult};
use crate::events::{self, DomainEvent};
use crate::models::{OrderItemView, OrderRow, Product};
use crate::state::AppState;

use super::orders;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub item_info: String,
    #[validate(length(min = 1))]
    pub company_name: String,
    pub category: Option<String>,
    pub current_price: Decimal,
    #[serde(default)]
    pub discount_percent: i32,
    #[serde(default)]
    pub image_urls: Vec<String>,
    pub attributes: Option<Value>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl ProductRequest {
    fn check(&self) -> ApiResult<()> {
        self.validate()?;
        if self.current_price < Decimal::ZERO {
            return Err(ApiError::InvalidState("Price cannot be negative".into()));
        }
        if !(0..=100).contains(&self.discount_percent) {
            return Err(ApiError::InvalidState(
                "Discount must be between 0 and 100".into(),
            ));
        }
        Ok(())
    }
}

pub async fn my_products(State(s): State<AppState>, identity: Identity) -> ApiResult<Json<Value>> {
    identity.require(Role::Seller)?;
    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE seller_id = $1 ORDER BY created_at DESC",
    )
    .bind(identity.id)
    .fetch_all(&s.db)
    .await?;
    Ok(Json(json!({ "products": products })))
}

pub async fn create_product(
    State(s): State<AppState>,
    identity: Identity,
    Json(req): Json<ProductRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    identity.require(Role::Seller)?;
    req.check()?;

    let final_price = pricing::final_price(req.current_price, req.discount_percent);
    let product = sqlx::query_as::<_, Product>(
        "INSERT INTO products (id, seller_id, name, item_info, company_name, category, \
            current_price, discount_percent, final_price, image_urls, attributes, stock, is_active) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(identity.id)
    .bind(&req.name)
    .bind(&req.item_info)
    .bind(&req.company_name)
    .bind(&req.category)
    .bind(req.current_price)
    .bind(req.discount_percent)
    .bind(final_price)
    .bind(&req.image_urls)
    .bind(req.attributes.unwrap_or_else(|| json!({})))
    .bind(req.stock)
    .bind(req.is_active)
    .fetch_one(&s.db)
    .await?;

    events::publish(
        &s.nats,
        DomainEvent::ProductCreated {
            product_id: product.id,
            seller_id: identity.id,
        },
    )
    .await;

    Ok((StatusCode::CREATED, Json(json!({ "product": product }))))
}

pub async fn get_my_product(
    State(s): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    identity.require(Role::Seller)?;
    let product =
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 AND seller_id = $2")
            .bind(id)
            .bind(identity.id)
            .fetch_optional(&s.db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Product not found".into()))?;
    Ok(Json(json!({ "product": product })))
}

pub async fn update_my_product(
    State(s): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(req): Json<ProductRequest>,
) -> ApiResult<Json<Value>> {
    identity.require(Role::Seller)?;
    req.check()?;

    let final_price = pricing::final_price(req.current_price, req.discount_percent);
    let product = sqlx::query_as::<_, Product>(
        "UPDATE products SET name = $3, item_info = $4, company_name = $5, category = $6, \
            current_price = $7, discount_percent = $8, final_price = $9, image_urls = $10, \
            attributes = $11, stock = $12, is_active = $13, updated_at = NOW() \
         WHERE id = $1 AND seller_id = $2 RETURNING *",
    )
    .bind(id)
    .bind(identity.id)
    .bind(&req.name)
    .bind(&req.item_info)
    .bind(&req.company_name)
    .bind(&req.category)
    .bind(req.current_price)
    .bind(req.discount_percent)
    .bind(final_price)
    .bind(&req.image_urls)
    .bind(req.attributes.unwrap_or_else(|| json!({})))
    .bind(req.stock)
    .bind(req.is_active)
    .fetch_optional(&s.db)
    .await?
    .ok_or_else(|| ApiError::NotFound("Product not found".into()))?;

    Ok(Json(json!({ "product": product })))
}

pub async fn delete_my_product(
    State(s): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    identity.require(Role::Seller)?;
    let deleted = sqlx::query("DELETE FROM products WHERE id = $1 AND seller_id = $2")
        .bind(id)
        .bind(identity.id)
        .execute(&s.db)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(ApiError::NotFound("Product not found".into()));
    }
    Ok(Json(json!({ "success": true })))
}

/// Orders that contain at least one of this seller's products, each
/// narrowed to only the seller's own line items.
pub async fn seller_orders(State(s): State<AppState>, identity: Identity) -> ApiResult<Json<Value>> {
    identity.require(Role::Seller)?;

    let order_rows = sqlx::query_as::<_, OrderRow>(
        "SELECT DISTINCT o.* FROM orders o \
         JOIN order_items i ON i.order_id = o.id \
         JOIN products p ON p.id = i.product_id \
         WHERE p.seller_id = $1 ORDER BY o.created_at DESC",
    )
    .bind(identity.id)
    .fetch_all(&s.db)
    .await?;

    let mut views = Vec::with_capacity(order_rows.len());
    for order in order_rows {
        let items = sqlx::query_as::<_, OrderItemView>(
            "SELECT i.id, i.order_id, i.product_id, p.name AS product_name, p.image_urls, \
                i.qty, i.price, i.status, i.is_delivered, i.delivery_date \
             FROM order_items i JOIN products p ON p.id = i.product_id \
             WHERE i.order_id = $1 AND p.seller_id = $2",
        )
        .bind(order.id)
        .bind(identity.id)
        .fetch_all(&s.db)
        .await?;

        let buyer: Option<(String, String)> =
            sqlx::query_as("SELECT name, email FROM users WHERE id = $1")
                .bind(order.user_id)
                .fetch_optional(&s.db)
                .await?;

        views.push(json!({
            "id": order.id,
            "user": buyer.map(|(name, email)| json!({ "name": name, "email": email })),
            "createdAt": order.created_at,
            "items": items,
        }));
    }

    Ok(Json(json!({ "orders": views })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceItemRequest {
    pub order_id: Uuid,
    pub product_id: Uuid,
}

/// Advance one owned line item a single step through
/// Placed -> Shipped -> Delivered.
pub async fn advance_order_item(
    State(s): State<AppState>,
    identity: Identity,
    Json(req): Json<AdvanceItemRequest>,
) -> ApiResult<Json<Value>> {
    identity.require(Role::Seller)?;

    let mut tx = s.db.begin().await?;
    let (item_status, order_status) =
        orders::advance_item(&mut tx, req.order_id, req.product_id, Some(identity.id)).await?;
    tx.commit().await?;

    events::publish(
        &s.nats,
        DomainEvent::OrderItemAdvanced {
            order_id: req.order_id,
            product_id: req.product_id,
            status: item_status,
            order_status,
        },
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "message": format!("Item marked as {}", item_status),
    })))
}

pub async fn seller_dashboard(
    State(s): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<Value>> {
    identity.require(Role::Seller)?;

    let summary: (Option<Decimal>, i64, Option<i64>, i64, i64) = sqlx::query_as(
        "SELECT SUM(i.price * i.qty), \
                COUNT(DISTINCT i.order_id), \
                SUM(i.qty)::bigint, \
                COUNT(*) FILTER (WHERE i.status = 'Delivered'), \
                COUNT(*) FILTER (WHERE i.status IN ('Placed', 'Shipped')) \
         FROM order_items i JOIN products p ON p.id = i.product_id \
         WHERE p.seller_id = $1",
    )
    .bind(identity.id)
    .fetch_one(&s.db)
    .await?;

    let monthly: Vec<(i32, i32, Decimal)> = sqlx::query_as(
        "SELECT EXTRACT(YEAR FROM o.created_at)::int, EXTRACT(MONTH FROM o.created_at)::int, \
                SUM(i.price * i.qty) \
         FROM order_items i \
         JOIN products p ON p.id = i.product_id \
         JOIN orders o ON o.id = i.order_id \
         WHERE p.seller_id = $1 GROUP BY 1, 2 ORDER BY 1, 2",
    )
    .bind(identity.id)
    .fetch_all(&s.db)
    .await?;

    let yearly: Vec<(i32, Decimal)> = sqlx::query_as(
        "SELECT EXTRACT(YEAR FROM o.created_at)::int, SUM(i.price * i.qty) \
         FROM order_items i \
         JOIN products p ON p.id = i.product_id \
         JOIN orders o ON o.id = i.order_id \
         WHERE p.seller_id = $1 GROUP BY 1 ORDER BY 1",
    )
    .bind(identity.id)
    .fetch_all(&s.db)
    .await?;

    let top_products: Vec<(String, i64)> = sqlx::query_as(
        "SELECT p.name, SUM(i.qty)::bigint AS sold \
         FROM order_items i JOIN products p ON p.id = i.product_id \
         WHERE p.seller_id = $1 GROUP BY p.id, p.name ORDER BY sold DESC LIMIT 5",
    )
    .bind(identity.id)
    .fetch_all(&s.db)
    .await?;

    let monthly_sales: Vec<Value> = monthly
        .into_iter()
        .map(|(_, month, sales)| json!({ "name": month_name(month), "sales": sales }))
        .collect();
    let yearly_sales: Vec<Value> = yearly
        .into_iter()
        .map(|(year, sales)| json!({ "name": year.to_string(), "sales": sales }))
        .collect();
    let top_products: Vec<Value> = top_products
        .into_iter()
        .map(|(name, sold)| json!({ "name": name, "sold": sold }))
        .collect();

    Ok(Json(json!({
        "totalRevenue": summary.0.unwrap_or(Decimal::ZERO),
        "totalOrders": summary.1,
        "totalProductsSold": summary.2.unwrap_or(0),
        "deliveredOrders": summary.3,
        "pendingOrders": summary.4,
        "monthlySales": monthly_sales,
        "yearlySales": yearly_sales,
        "topProducts": top_products,
    })))
}

fn month_name(month: i32) -> &'static str {
    match month {
        1 => "Jan",
        2 => "Feb",
        3 => "Mar",
        4 => "Apr",
        5 => "May",
        6 => "Jun",
        7 => "Jul",
        8 => "Aug",
        9 => "Sep",
        10 => "Oct",
        11 => "Nov",
        12 => "Dec",
        _ => "?",
    }
}
