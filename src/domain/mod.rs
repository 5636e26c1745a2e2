//! Domain logic with no I/O: delivery state machine, cart semantics,
//! coupon math, pricing.
pub mod cart;
pub mod coupon;
pub mod pricing;
pub mod status;

pub use coupon::{Coupon, CouponError, CouponKind};
pub use status::{ItemStatus, OrderStatus, StatusError};
