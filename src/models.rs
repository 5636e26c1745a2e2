//! Persistence rows and the JSON document shapes they serialize to.
//!
//! Status columns are stored as TEXT and parsed into the domain enums at
//! the edge of the order engine; everything else maps 1:1.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::coupon::{Coupon, CouponKind};

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub user_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub name: String,
    pub item_info: String,
    pub company_name: String,
    pub category: Option<String>,
    pub current_price: Decimal,
    pub discount_percent: i32,
    pub final_price: Decimal,
    pub image_urls: Vec<String>,
    pub attributes: serde_json::Value,
    pub stock: i32,
    pub is_active: bool,
    pub review_count: i32,
    pub average_rating: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub name: String,
    pub phone: String,
    pub pincode: String,
    pub state: String,
    pub city: String,
    pub house: String,
    pub area: String,
    pub landmark: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

/// One cart row joined with the catalog fields the UI renders.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub qty: i32,
    pub name: String,
    pub company_name: String,
    pub final_price: Decimal,
    pub image_urls: Vec<String>,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct CouponRow {
    pub code: String,
    pub kind: String,
    pub value: Decimal,
    pub min_purchase: Decimal,
}

impl CouponRow {
    /// Rows pass the CHECK constraint on `kind`, so the parse only fails on
    /// hand-edited data; treat that as an inactive coupon.
    pub fn into_domain(self) -> Option<Coupon> {
        Some(Coupon {
            code: self.code,
            kind: CouponKind::parse(&self.kind)?,
            value: self.value,
            min_purchase: self.min_purchase,
        })
    }
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub address_id: Uuid,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub coupon_code: Option<String>,
    pub total: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order item joined with catalog display fields.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemView {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub image_urls: Vec<String>,
    pub qty: i32,
    pub price: Decimal,
    pub status: String,
    pub is_delivered: bool,
    pub delivery_date: Option<DateTime<Utc>>,
}

/// The persisted order document shape exposed over the API.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDoc {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<OrderItemView>,
    pub address_id: Uuid,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub coupon_code: Option<String>,
    pub total: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderDoc {
    pub fn assemble(order: OrderRow, items: Vec<OrderItemView>) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            items,
            address_id: order.address_id,
            subtotal: order.subtotal,
            discount: order.discount,
            coupon_code: order.coupon_code,
            total: order.total,
            status: order.status,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn coupon_row_parses_kind() {
        let row = CouponRow {
            code: "SAVE10".into(),
            kind: "percent".into(),
            value: Decimal::new(10, 0),
            min_purchase: Decimal::new(20, 0),
        };
        let coupon = row.into_domain().unwrap();
        assert_eq!(coupon.kind, CouponKind::Percent);
        assert_eq!(coupon.code, "SAVE10");
    }

    #[test]
    fn coupon_row_rejects_unknown_kind() {
        let row = CouponRow {
            code: "BAD".into(),
            kind: "bogo".into(),
            value: Decimal::ONE,
            min_purchase: Decimal::ZERO,
        };
        assert!(row.into_domain().is_none());
    }

    #[test]
    fn order_doc_keeps_frozen_totals() {
        let now = Utc::now();
        let row = OrderRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            address_id: Uuid::new_v4(),
            subtotal: Decimal::new(25, 0),
            discount: Decimal::new(25, 1),
            coupon_code: Some("SAVE10".into()),
            total: Decimal::new(225, 1),
            status: "Placed".into(),
            created_at: now,
            updated_at: now,
        };
        let doc = OrderDoc::assemble(row, vec![]);
        assert_eq!(doc.total, doc.subtotal - doc.discount);
        assert!(doc.total >= Decimal::ZERO);
    }
}
