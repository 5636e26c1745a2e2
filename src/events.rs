//! Domain events, published to NATS when a client is configured.
//!
//! Event publication is best-effort: a failed publish is logged and never
//! fails the request that raised it.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{ItemStatus, OrderStatus};

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    OrderPlaced {
        order_id: Uuid,
        user_id: Uuid,
        total: Decimal,
    },
    OrderItemAdvanced {
        order_id: Uuid,
        product_id: Uuid,
        status: ItemStatus,
        order_status: OrderStatus,
    },
    ProductCreated {
        product_id: Uuid,
        seller_id: Uuid,
    },
    UserRegistered {
        user_id: Uuid,
        role: String,
    },
}

impl DomainEvent {
    fn subject(&self) -> &'static str {
        match self {
            Self::OrderPlaced { .. } => "storefront.order.placed",
            Self::OrderItemAdvanced { .. } => "storefront.order.item_advanced",
            Self::ProductCreated { .. } => "storefront.product.created",
            Self::UserRegistered { .. } => "storefront.user.registered",
        }
    }
}

pub async fn publish(nats: &Option<async_nats::Client>, event: DomainEvent) {
    let Some(client) = nats else { return };
    let payload = match serde_json::to_vec(&event) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "failed to serialize domain event");
            return;
        }
    };
    if let Err(e) = client.publish(event.subject(), payload.into()).await {
        tracing::warn!(error = %e, subject = event.subject(), "event publish failed");
    }
}
