//! Public catalog: listing, substring search and filters, reviews.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::auth::Identity;
use crate::error::{ApiError, ApiResult};
use crate::models::{PaginatedResponse, Product, Review};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub company: Option<String>,
}

pub async fn list_products(
    State(s): State<AppState>,
    Query(p): Query<ListParams>,
) -> ApiResult<Json<PaginatedResponse<Product>>> {
    let page = p.page.unwrap_or(1).max(1);
    let per_page = p.per_page.unwrap_or(20).min(100);
    let search = p.search.map(|t| format!("%{}%", t));

    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products \
         WHERE is_active = TRUE \
           AND ($1::text IS NULL OR name ILIKE $1 OR item_info ILIKE $1) \
           AND ($2::text IS NULL OR category = $2) \
           AND ($3::text IS NULL OR company_name = $3) \
         ORDER BY created_at DESC LIMIT $4 OFFSET $5",
    )
    .bind(&search)
    .bind(&p.category)
    .bind(&p.company)
    .bind(per_page as i64)
    .bind(((page - 1) * per_page) as i64)
    .fetch_all(&s.db)
    .await?;

    let total: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM products \
         WHERE is_active = TRUE \
           AND ($1::text IS NULL OR name ILIKE $1 OR item_info ILIKE $1) \
           AND ($2::text IS NULL OR category = $2) \
           AND ($3::text IS NULL OR company_name = $3)",
    )
    .bind(&search)
    .bind(&p.category)
    .bind(&p.company)
    .fetch_one(&s.db)
    .await?;

    Ok(Json(PaginatedResponse {
        data: products,
        total: total.0,
        page,
    }))
}

pub async fn get_product(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".into()))?;

    let reviews = sqlx::query_as::<_, Review>(
        "SELECT * FROM reviews WHERE product_id = $1 ORDER BY created_at DESC",
    )
    .bind(id)
    .fetch_all(&s.db)
    .await?;

    Ok(Json(json!({ "product": product, "reviews": reviews })))
}

pub async fn similar_products(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".into()))?;

    let similar = sqlx::query_as::<_, Product>(
        "SELECT * FROM products \
         WHERE is_active = TRUE AND id <> $1 AND category IS NOT DISTINCT FROM $2 \
         ORDER BY created_at DESC LIMIT 8",
    )
    .bind(id)
    .bind(&product.category)
    .fetch_all(&s.db)
    .await?;

    Ok(Json(json!({ "products": similar })))
}

pub async fn list_brands(State(s): State<AppState>) -> ApiResult<Json<Value>> {
    let brands: Vec<(String,)> = sqlx::query_as(
        "SELECT DISTINCT company_name FROM products WHERE is_active = TRUE ORDER BY company_name",
    )
    .fetch_all(&s.db)
    .await?;
    let brands: Vec<String> = brands.into_iter().map(|(b,)| b).collect();
    Ok(Json(json!({ "brands": brands })))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    pub rating: i32,
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
}

/// Adds a review and recomputes the product's denormalized rating columns
/// in the same transaction, so the average can never drift from the review
/// rows.
pub async fn create_review(
    State(s): State<AppState>,
    identity: Identity,
    Path(product_id): Path<Uuid>,
    Json(req): Json<CreateReviewRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    req.validate()?;
    if !(1..=5).contains(&req.rating) {
        return Err(ApiError::InvalidState(
            "Rating must be between 1 and 5".into(),
        ));
    }

    let mut tx = s.db.begin().await?;

    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Err(ApiError::NotFound("Product not found".into()));
    }

    let user_name: (String,) = sqlx::query_as("SELECT name FROM users WHERE id = $1")
        .bind(identity.id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let review = sqlx::query_as::<_, Review>(
        "INSERT INTO reviews (id, product_id, user_id, user_name, rating, comment) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(product_id)
    .bind(identity.id)
    .bind(&user_name.0)
    .bind(req.rating)
    .bind(&req.comment)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE products SET \
            review_count = (SELECT COUNT(*) FROM reviews WHERE product_id = $1), \
            average_rating = (SELECT COALESCE(AVG(rating), 0) FROM reviews WHERE product_id = $1), \
            updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(product_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(json!({ "review": review }))))
}
