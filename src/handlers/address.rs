//! Per-user address book.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::auth::Identity;
use crate::error::{ApiError, ApiResult};
use crate::models::Address;
use crate::state::AppState;

const KINDS: [&str; 3] = ["home", "work", "other"];

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddressRequest {
    pub kind: String,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 4))]
    pub phone: String,
    #[validate(length(min = 4))]
    pub pincode: String,
    pub state: String,
    pub city: String,
    pub house: String,
    pub area: String,
    pub landmark: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl AddressRequest {
    fn check(&self) -> ApiResult<()> {
        self.validate()?;
        if !KINDS.contains(&self.kind.as_str()) {
            return Err(ApiError::InvalidState(
                "Address kind must be home, work or other".into(),
            ));
        }
        Ok(())
    }
}

pub async fn list_addresses(
    State(s): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<Value>> {
    let addresses = sqlx::query_as::<_, Address>(
        "SELECT * FROM addresses WHERE user_id = $1 ORDER BY is_default DESC, created_at",
    )
    .bind(identity.id)
    .fetch_all(&s.db)
    .await?;
    Ok(Json(json!({ "addresses": addresses })))
}

pub async fn create_address(
    State(s): State<AppState>,
    identity: Identity,
    Json(req): Json<AddressRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    req.check()?;

    let mut tx = s.db.begin().await?;
    if req.is_default {
        sqlx::query("UPDATE addresses SET is_default = FALSE WHERE user_id = $1")
            .bind(identity.id)
            .execute(&mut *tx)
            .await?;
    }
    let address = sqlx::query_as::<_, Address>(
        "INSERT INTO addresses \
            (id, user_id, kind, name, phone, pincode, state, city, house, area, landmark, is_default) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(identity.id)
    .bind(&req.kind)
    .bind(&req.name)
    .bind(&req.phone)
    .bind(&req.pincode)
    .bind(&req.state)
    .bind(&req.city)
    .bind(&req.house)
    .bind(&req.area)
    .bind(&req.landmark)
    .bind(req.is_default)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(json!({ "address": address }))))
}

pub async fn update_address(
    State(s): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(req): Json<AddressRequest>,
) -> ApiResult<Json<Value>> {
    req.check()?;

    let mut tx = s.db.begin().await?;
    if req.is_default {
        sqlx::query("UPDATE addresses SET is_default = FALSE WHERE user_id = $1")
            .bind(identity.id)
            .execute(&mut *tx)
            .await?;
    }
    let address = sqlx::query_as::<_, Address>(
        "UPDATE addresses SET kind = $3, name = $4, phone = $5, pincode = $6, state = $7, \
            city = $8, house = $9, area = $10, landmark = $11, is_default = $12 \
         WHERE id = $1 AND user_id = $2 RETURNING *",
    )
    .bind(id)
    .bind(identity.id)
    .bind(&req.kind)
    .bind(&req.name)
    .bind(&req.phone)
    .bind(&req.pincode)
    .bind(&req.state)
    .bind(&req.city)
    .bind(&req.house)
    .bind(&req.area)
    .bind(&req.landmark)
    .bind(req.is_default)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| ApiError::NotFound("Address not found".into()))?;
    tx.commit().await?;

    Ok(Json(json!({ "address": address })))
}

pub async fn delete_address(
    State(s): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let deleted = sqlx::query("DELETE FROM addresses WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(identity.id)
        .execute(&s.db)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(ApiError::NotFound("Address not found".into()));
    }
    Ok(Json(json!({ "success": true })))
}
