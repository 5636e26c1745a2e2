//! Coupon evaluation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouponKind {
    Percent,
    Fixed,
}

impl CouponKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "percent" => Some(Self::Percent),
            "fixed" => Some(Self::Fixed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Percent => "percent",
            Self::Fixed => "fixed",
        }
    }
}

/// A promotional rule, loaded from the store with its code already
/// normalized to uppercase.
#[derive(Clone, Debug)]
pub struct Coupon {
    pub code: String,
    pub kind: CouponKind,
    pub value: Decimal,
    pub min_purchase: Decimal,
}

impl Coupon {
    /// Compute the discount this coupon grants against `subtotal`.
    ///
    /// A fixed discount is deliberately not clamped to the subtotal; the
    /// order total is floored at zero by the caller instead.
    pub fn evaluate(&self, subtotal: Decimal) -> Result<Decimal, CouponError> {
        if subtotal < self.min_purchase {
            return Err(CouponError::MinPurchaseNotMet {
                required: self.min_purchase,
            });
        }
        Ok(match self.kind {
            CouponKind::Percent => subtotal * self.value / Decimal::ONE_HUNDRED,
            CouponKind::Fixed => self.value,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CouponError {
    #[error("Spend at least {required} to use this coupon")]
    MinPurchaseNotMet { required: Decimal },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn percent(value: i64, min: i64) -> Coupon {
        Coupon {
            code: "SAVE".into(),
            kind: CouponKind::Percent,
            value: Decimal::new(value, 0),
            min_purchase: Decimal::new(min, 0),
        }
    }

    #[test]
    fn percent_discount() {
        // 10% off 25 with a minimum purchase of 20.
        let c = percent(10, 20);
        let d = c.evaluate(Decimal::new(25, 0)).unwrap();
        assert_eq!(d, Decimal::new(25, 1)); // 2.5
    }

    #[test]
    fn fixed_discount_may_exceed_subtotal() {
        let c = Coupon {
            code: "FLAT50".into(),
            kind: CouponKind::Fixed,
            value: Decimal::new(50, 0),
            min_purchase: Decimal::ZERO,
        };
        assert_eq!(c.evaluate(Decimal::new(30, 0)).unwrap(), Decimal::new(50, 0));
    }

    #[test]
    fn rejects_below_minimum() {
        let c = percent(10, 100);
        assert_eq!(
            c.evaluate(Decimal::new(99, 0)),
            Err(CouponError::MinPurchaseNotMet {
                required: Decimal::new(100, 0)
            })
        );
    }

    #[test]
    fn subtotal_at_minimum_is_accepted() {
        let c = percent(10, 100);
        assert!(c.evaluate(Decimal::new(100, 0)).is_ok());
    }
}
