//! Price math for carts and orders.

use rust_decimal::Decimal;
use uuid::Uuid;

/// A cart line resolved against the catalog: the unit price is the
/// product's final price at the moment of resolution, snapshotted into the
/// order and never re-read.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub qty: i32,
    pub price: Decimal,
}

impl PricedLine {
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.qty)
    }
}

pub fn subtotal(lines: &[PricedLine]) -> Decimal {
    lines.iter().map(PricedLine::line_total).sum()
}

/// Grand total, floored at zero so a fixed coupon larger than the subtotal
/// never produces a negative order.
pub fn grand_total(subtotal: Decimal, discount: Decimal) -> Decimal {
    (subtotal - discount).max(Decimal::ZERO)
}

/// A product's selling price: the current price reduced by its discount
/// percentage.
pub fn final_price(current_price: Decimal, discount_percent: i32) -> Decimal {
    let pct = Decimal::from(100 - discount_percent.clamp(0, 100));
    current_price * pct / Decimal::ONE_HUNDRED
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(qty: i32, price: i64) -> PricedLine {
        PricedLine {
            product_id: Uuid::new_v4(),
            qty,
            price: Decimal::new(price, 0),
        }
    }

    #[test]
    fn subtotal_sums_price_times_qty() {
        // A(qty=2, price=10) + B(qty=1, price=5) = 25
        let lines = [line(2, 10), line(1, 5)];
        assert_eq!(subtotal(&lines), Decimal::new(25, 0));
    }

    #[test]
    fn grand_total_subtracts_discount() {
        assert_eq!(
            grand_total(Decimal::new(25, 0), Decimal::new(25, 1)),
            Decimal::new(225, 1) // 22.5
        );
    }

    #[test]
    fn grand_total_floors_at_zero() {
        assert_eq!(
            grand_total(Decimal::new(30, 0), Decimal::new(50, 0)),
            Decimal::ZERO
        );
    }

    #[test]
    fn final_price_applies_discount_percent() {
        assert_eq!(
            final_price(Decimal::new(200, 0), 25),
            Decimal::new(150, 0)
        );
        assert_eq!(final_price(Decimal::new(99, 0), 0), Decimal::new(99, 0));
    }

    #[test]
    fn final_price_clamps_out_of_range_percent() {
        assert_eq!(final_price(Decimal::new(10, 0), 150), Decimal::ZERO);
        assert_eq!(final_price(Decimal::new(10, 0), -5), Decimal::new(10, 0));
    }
}
