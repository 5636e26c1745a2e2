//! Bazaarline - self-hosted multi-seller storefront service.
//!
//! Customers browse and purchase, sellers manage their own catalog and
//! fulfillment, admins oversee the platform. The order engine converts a
//! cart plus address plus optional coupon into an immutable order snapshot
//! and tracks delivery per line item, since a single order can span
//! multiple sellers.
//!
//! ## Layout
//! - [`domain`]: pure logic (delivery state machine, coupon math, pricing)
//! - [`handlers`]: JSON-over-HTTP surface backed by sqlx/Postgres
//! - [`auth`]: signed session cookie decoded to an explicit identity
//! - [`events`]: best-effort NATS domain events

pub mod auth;
pub mod domain;
pub mod error;
pub mod events;
pub mod handlers;
pub mod models;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;
