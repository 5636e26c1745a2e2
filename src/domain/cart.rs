//! Cart semantics independent of storage.
//!
//! [`Cart`] models one user's cart rows: adding a product that is already
//! present merges into the existing line, and checkout prices the lines,
//! applies an optional coupon, and drains the cart so the same lines
//! cannot be ordered twice.

use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use super::coupon::{Coupon, CouponError};
use super::pricing::{self, PricedLine};

#[derive(Clone, Debug, Default)]
pub struct Cart {
    lines: Vec<PricedLine>,
}

impl Cart {
    pub fn new(lines: Vec<PricedLine>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[PricedLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Adding a product already in the cart bumps its quantity instead of
    /// creating a second line.
    pub fn add(&mut self, product_id: Uuid, price: Decimal) {
        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            line.qty += 1;
        } else {
            self.lines.push(PricedLine {
                product_id,
                qty: 1,
                price,
            });
        }
    }

    /// Price the cart and drain it. An empty cart cannot be checked out;
    /// afterwards the quote owns the lines and the cart holds nothing.
    pub fn checkout(&mut self, coupon: Option<&Coupon>) -> Result<CheckoutQuote, CheckoutError> {
        if self.lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let subtotal = pricing::subtotal(&self.lines);
        let (discount, coupon_code) = match coupon {
            Some(c) => (c.evaluate(subtotal)?, Some(c.code.clone())),
            None => (Decimal::ZERO, None),
        };
        let total = pricing::grand_total(subtotal, discount);
        Ok(CheckoutQuote {
            lines: std::mem::take(&mut self.lines),
            subtotal,
            discount,
            coupon_code,
            total,
        })
    }
}

/// The frozen result of a checkout: snapshotted lines and totals, exactly
/// what the order keeps.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckoutQuote {
    pub lines: Vec<PricedLine>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub coupon_code: Option<String>,
    pub total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutError {
    #[error("Cart is empty")]
    EmptyCart,
    #[error(transparent)]
    Coupon(#[from] CouponError),
}

/// What a cart mutation does to one line's quantity; `None` removes the
/// line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CartAction {
    Increase,
    Decrease,
    Remove,
}

impl CartAction {
    /// Decrease floors at one unit; dropping the last unit requires an
    /// explicit remove.
    pub fn apply(&self, qty: i32) -> Option<i32> {
        match self {
            Self::Increase => Some(qty + 1),
            Self::Decrease => Some((qty - 1).max(1)),
            Self::Remove => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::coupon::CouponKind;

    fn stocked(qty: i32, price: i64) -> Cart {
        Cart::new(vec![PricedLine {
            product_id: Uuid::new_v4(),
            qty,
            price: Decimal::new(price, 0),
        }])
    }

    #[test]
    fn repeat_add_merges_into_one_line() {
        let mut cart = Cart::new(vec![]);
        let widget = Uuid::new_v4();
        cart.add(widget, Decimal::new(10, 0));
        cart.add(widget, Decimal::new(10, 0));
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].qty, 2);

        cart.add(Uuid::new_v4(), Decimal::new(5, 0));
        assert_eq!(cart.lines().len(), 2);
    }

    #[test]
    fn empty_cart_cannot_check_out() {
        let mut cart = Cart::new(vec![]);
        assert_eq!(cart.checkout(None), Err(CheckoutError::EmptyCart));
    }

    #[test]
    fn checkout_drains_the_cart() {
        let mut cart = stocked(2, 10);
        let quote = cart.checkout(None).unwrap();
        assert_eq!(quote.lines.len(), 1);
        assert_eq!(quote.subtotal, Decimal::new(20, 0));
        assert!(cart.is_empty());
        assert_eq!(cart.checkout(None), Err(CheckoutError::EmptyCart));
    }

    #[test]
    fn checkout_applies_the_coupon() {
        // 25 with 10% off quotes a 2.5 discount and a 22.5 total.
        let mut cart = stocked(1, 25);
        let coupon = Coupon {
            code: "SAVE10".into(),
            kind: CouponKind::Percent,
            value: Decimal::new(10, 0),
            min_purchase: Decimal::ZERO,
        };
        let quote = cart.checkout(Some(&coupon)).unwrap();
        assert_eq!(quote.discount, Decimal::new(25, 1));
        assert_eq!(quote.total, Decimal::new(225, 1));
        assert_eq!(quote.coupon_code.as_deref(), Some("SAVE10"));
    }

    #[test]
    fn inapplicable_coupon_fails_the_checkout() {
        let mut cart = stocked(1, 25);
        let coupon = Coupon {
            code: "BIGSPENDER".into(),
            kind: CouponKind::Percent,
            value: Decimal::new(10, 0),
            min_purchase: Decimal::new(100, 0),
        };
        assert!(cart.checkout(Some(&coupon)).is_err());
        // A failed checkout leaves the cart intact.
        assert!(!cart.is_empty());
    }

    #[test]
    fn decrease_floors_at_one_unit() {
        assert_eq!(CartAction::Decrease.apply(3), Some(2));
        assert_eq!(CartAction::Decrease.apply(1), Some(1));
        assert_eq!(CartAction::Increase.apply(1), Some(2));
        assert_eq!(CartAction::Remove.apply(4), None);
    }
}
