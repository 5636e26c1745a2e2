//! The order engine: checkout, order history, coupon evaluation, and the
//! shared per-item delivery transition used by both the seller and the
//! admin mutation paths.
//!
//! Checkout snapshots cart prices into line items and clears the cart in
//! the same transaction as the order insert, so a partially-committed
//! checkout can never drain a cart without producing an order. Item
//! advances recompute the order-level status inside their own transaction;
//! the aggregate is always derived from item states, never set directly.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use uuid::Uuid;

use crate::auth::Identity;
use crate::domain::cart::Cart;
use crate::domain::coupon::Coupon;
use crate::domain::{pricing, ItemStatus, OrderStatus, StatusError};
use crate::error::{ApiError, ApiResult};
use crate::events::{self, DomainEvent};
use crate::models::{OrderDoc, OrderItemView, OrderRow};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub address_id: Uuid,
    pub coupon: Option<String>,
}

pub async fn place_order(
    State(s): State<AppState>,
    identity: Identity,
    Json(req): Json<PlaceOrderRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut tx = s.db.begin().await?;

    let address: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM addresses WHERE id = $1 AND user_id = $2")
            .bind(req.address_id)
            .bind(identity.id)
            .fetch_optional(&mut *tx)
            .await?;
    if address.is_none() {
        return Err(ApiError::NotFound("Invalid address".into()));
    }

    // Point-in-time read of the cart against current catalog prices; the
    // snapshot below is what the order keeps.
    let lines: Vec<pricing::PricedLine> = sqlx::query_as(
        "SELECT c.product_id, c.qty, p.final_price AS price \
         FROM cart_items c JOIN products p ON p.id = c.product_id \
         WHERE c.user_id = $1",
    )
    .bind(identity.id)
    .fetch_all(&mut *tx)
    .await?;

    // Hard validation: an invalid or inapplicable coupon fails checkout
    // instead of silently dropping the discount.
    let coupon = match &req.coupon {
        Some(code) => Some(fetch_coupon(&mut *tx, code).await?),
        None => None,
    };
    let quote = Cart::new(lines)
        .checkout(coupon.as_ref())
        .map_err(|e| ApiError::InvalidState(e.to_string()))?;

    let order = sqlx::query_as::<_, OrderRow>(
        "INSERT INTO orders (id, user_id, address_id, subtotal, discount, coupon_code, total, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, 'Placed') RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(identity.id)
    .bind(req.address_id)
    .bind(quote.subtotal)
    .bind(quote.discount)
    .bind(&quote.coupon_code)
    .bind(quote.total)
    .fetch_one(&mut *tx)
    .await?;

    for line in &quote.lines {
        sqlx::query(
            "INSERT INTO order_items (id, order_id, product_id, qty, price, status, is_delivered) \
             VALUES ($1, $2, $3, $4, $5, 'Placed', FALSE)",
        )
        .bind(Uuid::now_v7())
        .bind(order.id)
        .bind(line.product_id)
        .bind(line.qty)
        .bind(line.price)
        .execute(&mut *tx)
        .await?;
    }

    // Stock is intentionally not decremented here.
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(identity.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    events::publish(
        &s.nats,
        DomainEvent::OrderPlaced {
            order_id: order.id,
            user_id: identity.id,
            total: quote.total,
        },
    )
    .await;

    let doc = load_order_doc(&s.db, order).await?;
    Ok((StatusCode::CREATED, Json(json!({ "order": doc }))))
}

pub async fn my_orders(State(s): State<AppState>, identity: Identity) -> ApiResult<Json<Value>> {
    let orders = sqlx::query_as::<_, OrderRow>(
        "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(identity.id)
    .fetch_all(&s.db)
    .await?;

    let docs = load_order_docs(&s.db, orders).await?;
    Ok(Json(json!({ "success": true, "count": docs.len(), "orders": docs })))
}

#[derive(Debug, Deserialize)]
pub struct EvaluateCouponRequest {
    pub code: String,
    pub subtotal: rust_decimal::Decimal,
}

pub async fn evaluate_coupon(
    State(s): State<AppState>,
    _identity: Identity,
    Json(req): Json<EvaluateCouponRequest>,
) -> ApiResult<Json<Value>> {
    let coupon = fetch_coupon(&s.db, &req.code).await?;
    let discount = coupon
        .evaluate(req.subtotal)
        .map_err(|e| ApiError::InvalidState(e.to_string()))?;
    Ok(Json(json!({ "discountAmount": discount, "code": coupon.code })))
}

async fn fetch_coupon<'e, E>(executor: E, code: &str) -> ApiResult<Coupon>
where
    E: sqlx::PgExecutor<'e>,
{
    let row: Option<crate::models::CouponRow> = sqlx::query_as(
        "SELECT code, kind, value, min_purchase FROM coupons \
         WHERE code = UPPER($1) AND is_active = TRUE",
    )
    .bind(code)
    .fetch_optional(executor)
    .await?;
    row.and_then(crate::models::CouponRow::into_domain)
        .ok_or_else(|| ApiError::NotFound("Invalid coupon".into()))
}

/// Advance one line item a single step and rederive the order status, all
/// inside `tx`. `acting_seller` restricts the mutation to items whose
/// product belongs to that seller; the admin path passes `None`.
pub async fn advance_item(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    order_id: Uuid,
    product_id: Uuid,
    acting_seller: Option<Uuid>,
) -> ApiResult<(ItemStatus, OrderStatus)> {
    let order: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_optional(&mut **tx)
        .await?;
    if order.is_none() {
        return Err(ApiError::NotFound("Order not found".into()));
    }

    let item: Option<(Uuid, String, Uuid)> = sqlx::query_as(
        "SELECT i.id, i.status, p.seller_id \
         FROM order_items i JOIN products p ON p.id = i.product_id \
         WHERE i.order_id = $1 AND i.product_id = $2",
    )
    .bind(order_id)
    .bind(product_id)
    .fetch_optional(&mut **tx)
    .await?;
    let (item_id, status, seller_id) =
        item.ok_or_else(|| ApiError::NotFound("Item not found in order".into()))?;

    authorize_item_actor(seller_id, acting_seller)?;

    let current = parse_item_status(&status)?;
    let next = current.advance().map_err(status_error)?;
    apply_item_status(tx, item_id, next).await?;

    let order_status = recompute_order_status(tx, order_id).await?;
    Ok((next, order_status))
}

/// Move one line item to an explicitly requested state, validating the
/// transition against the state machine.
pub async fn transition_item(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    item_id: Uuid,
    current: ItemStatus,
    target: ItemStatus,
) -> ApiResult<ItemStatus> {
    let next = current.transition_to(target).map_err(status_error)?;
    apply_item_status(tx, item_id, next).await?;
    Ok(next)
}

pub(crate) async fn apply_item_status(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    item_id: Uuid,
    next: ItemStatus,
) -> ApiResult<()> {
    sqlx::query(
        "UPDATE order_items SET status = $2, is_delivered = $3, \
            delivery_date = CASE WHEN $3 THEN NOW() ELSE delivery_date END \
         WHERE id = $1",
    )
    .bind(item_id)
    .bind(next.as_str())
    .bind(next.is_delivered())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Order status as a pure function of the current item statuses.
pub async fn recompute_order_status(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    order_id: Uuid,
) -> ApiResult<OrderStatus> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT status FROM order_items WHERE order_id = $1")
        .bind(order_id)
        .fetch_all(&mut **tx)
        .await?;
    let statuses = rows
        .iter()
        .map(|(s,)| parse_item_status(s))
        .collect::<ApiResult<Vec<_>>>()?;
    let aggregate = OrderStatus::aggregate(&statuses);

    sqlx::query("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1")
        .bind(order_id)
        .bind(aggregate.as_str())
        .execute(&mut **tx)
        .await?;
    Ok(aggregate)
}

/// Sellers may only touch items whose product they own; the admin path
/// passes `None` and is unrestricted.
fn authorize_item_actor(owner: Uuid, acting_seller: Option<Uuid>) -> ApiResult<()> {
    match acting_seller {
        Some(acting) if acting != owner => Err(ApiError::Forbidden(
            "Seller does not own this product".into(),
        )),
        _ => Ok(()),
    }
}

pub fn parse_item_status(s: &str) -> ApiResult<ItemStatus> {
    ItemStatus::parse(s)
        .ok_or_else(|| ApiError::InvalidState(format!("Unknown item status '{s}'")))
}

fn status_error(e: StatusError) -> ApiError {
    ApiError::InvalidState(e.to_string())
}

async fn load_order_doc(db: &sqlx::PgPool, order: OrderRow) -> ApiResult<OrderDoc> {
    let mut docs = load_order_docs(db, vec![order]).await?;
    Ok(docs.remove(0))
}

/// Join every order's items with the catalog display fields, preserving
/// the given order ordering.
pub async fn load_order_docs(
    db: &sqlx::PgPool,
    orders: Vec<OrderRow>,
) -> ApiResult<Vec<OrderDoc>> {
    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let items = sqlx::query_as::<_, OrderItemView>(
        "SELECT i.id, i.order_id, i.product_id, p.name AS product_name, p.image_urls, \
            i.qty, i.price, i.status, i.is_delivered, i.delivery_date \
         FROM order_items i JOIN products p ON p.id = i.product_id \
         WHERE i.order_id = ANY($1)",
    )
    .bind(&ids)
    .fetch_all(db)
    .await?;

    let mut by_order: HashMap<Uuid, Vec<OrderItemView>> = HashMap::new();
    for item in items {
        by_order.entry(item.order_id).or_default().push(item);
    }

    Ok(orders
        .into_iter()
        .map(|o| {
            let items = by_order.remove(&o.id).unwrap_or_default();
            OrderDoc::assemble(o, items)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreign_seller_is_rejected() {
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();
        assert!(matches!(
            authorize_item_actor(owner, Some(intruder)),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn owner_and_admin_may_act() {
        let owner = Uuid::new_v4();
        assert!(authorize_item_actor(owner, Some(owner)).is_ok());
        assert!(authorize_item_actor(owner, None).is_ok());
    }
}
