//! Delivery state machine.
//!
//! Each line item moves `Placed -> Shipped -> Delivered`, one step at a time,
//! never backwards. The order-level status is a pure function of its item
//! statuses and is recomputed after every item mutation. Both the seller
//! and the admin mutation paths go through [`ItemStatus::transition_to`].

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    #[default]
    Placed,
    Shipped,
    Delivered,
}

impl ItemStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Placed" => Some(Self::Placed),
            "Shipped" => Some(Self::Shipped),
            "Delivered" => Some(Self::Delivered),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Placed => "Placed",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
        }
    }

    /// The single legal successor state, if any. `Delivered` is terminal.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Placed => Some(Self::Shipped),
            Self::Shipped => Some(Self::Delivered),
            Self::Delivered => None,
        }
    }

    /// Advance one step. Rejects advancing a terminal item.
    pub fn advance(&self) -> Result<Self, StatusError> {
        self.next().ok_or(StatusError::AlreadyDelivered)
    }

    /// Validate a requested transition: exactly one step forward, no skips,
    /// no reversal.
    pub fn transition_to(&self, target: Self) -> Result<Self, StatusError> {
        if self.next() == Some(target) {
            Ok(target)
        } else if *self == Self::Delivered {
            Err(StatusError::AlreadyDelivered)
        } else {
            Err(StatusError::IllegalTransition {
                from: *self,
                to: target,
            })
        }
    }

    pub fn is_delivered(&self) -> bool {
        *self == Self::Delivered
    }

    fn rank(self) -> u8 {
        match self {
            Self::Placed => 0,
            Self::Shipped => 1,
            Self::Delivered => 2,
        }
    }

    /// Walk toward `target` one legal step at a time. An item already at or
    /// past `target` is left where it is; nothing ever moves backwards.
    pub fn advance_toward(self, target: Self) -> Self {
        let mut current = self;
        while current.rank() < target.rank() {
            match current.next() {
                Some(next) => current = next,
                None => break,
            }
        }
        current
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    #[default]
    Placed,
    Shipped,
    Delivered,
    PartiallyDelivered,
}

impl OrderStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Placed" => Some(Self::Placed),
            "Shipped" => Some(Self::Shipped),
            "Delivered" => Some(Self::Delivered),
            "PartiallyDelivered" => Some(Self::PartiallyDelivered),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Placed => "Placed",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::PartiallyDelivered => "PartiallyDelivered",
        }
    }

    /// Aggregate status over the item statuses of one order: all items in
    /// the same state map to that state, anything mixed is
    /// `PartiallyDelivered`.
    pub fn aggregate(items: &[ItemStatus]) -> Self {
        let Some(first) = items.first() else {
            return Self::Placed;
        };
        if items.iter().all(|s| s == first) {
            match first {
                ItemStatus::Placed => Self::Placed,
                ItemStatus::Shipped => Self::Shipped,
                ItemStatus::Delivered => Self::Delivered,
            }
        } else {
            Self::PartiallyDelivered
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StatusError {
    #[error("item is already delivered")]
    AlreadyDelivered,
    #[error("illegal status transition {from} -> {to}")]
    IllegalTransition { from: ItemStatus, to: ItemStatus },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_one_step_at_a_time() {
        assert_eq!(ItemStatus::Placed.advance().unwrap(), ItemStatus::Shipped);
        assert_eq!(
            ItemStatus::Shipped.advance().unwrap(),
            ItemStatus::Delivered
        );
        assert_eq!(
            ItemStatus::Delivered.advance(),
            Err(StatusError::AlreadyDelivered)
        );
    }

    #[test]
    fn rejects_skipping_and_reversal() {
        assert!(ItemStatus::Placed
            .transition_to(ItemStatus::Delivered)
            .is_err());
        assert!(ItemStatus::Shipped.transition_to(ItemStatus::Placed).is_err());
        assert!(ItemStatus::Delivered
            .transition_to(ItemStatus::Shipped)
            .is_err());
        assert_eq!(
            ItemStatus::Placed.transition_to(ItemStatus::Shipped).unwrap(),
            ItemStatus::Shipped
        );
    }

    #[test]
    fn walks_toward_a_distant_target() {
        assert_eq!(
            ItemStatus::Placed.advance_toward(ItemStatus::Delivered),
            ItemStatus::Delivered
        );
        assert_eq!(
            ItemStatus::Placed.advance_toward(ItemStatus::Shipped),
            ItemStatus::Shipped
        );
        assert_eq!(
            ItemStatus::Shipped.advance_toward(ItemStatus::Shipped),
            ItemStatus::Shipped
        );
    }

    #[test]
    fn never_walks_backwards() {
        assert_eq!(
            ItemStatus::Delivered.advance_toward(ItemStatus::Shipped),
            ItemStatus::Delivered
        );
        assert_eq!(
            ItemStatus::Shipped.advance_toward(ItemStatus::Placed),
            ItemStatus::Shipped
        );
    }

    #[test]
    fn whole_order_target_reaches_every_item() {
        // Delivering a freshly placed order moves both items two steps.
        let after: Vec<_> = [ItemStatus::Placed, ItemStatus::Placed]
            .iter()
            .map(|s| s.advance_toward(ItemStatus::Delivered))
            .collect();
        assert_eq!(after, [ItemStatus::Delivered, ItemStatus::Delivered]);
        assert_eq!(OrderStatus::aggregate(&after), OrderStatus::Delivered);
    }

    #[test]
    fn whole_order_target_leaves_delivered_items_alone() {
        // Shipping a mixed order must not touch the item that already
        // arrived, and must not fail because of it.
        let after: Vec<_> = [ItemStatus::Placed, ItemStatus::Delivered]
            .iter()
            .map(|s| s.advance_toward(ItemStatus::Shipped))
            .collect();
        assert_eq!(after, [ItemStatus::Shipped, ItemStatus::Delivered]);
        assert_eq!(
            OrderStatus::aggregate(&after),
            OrderStatus::PartiallyDelivered
        );
    }

    #[test]
    fn aggregate_all_delivered() {
        let items = [ItemStatus::Delivered, ItemStatus::Delivered];
        assert_eq!(OrderStatus::aggregate(&items), OrderStatus::Delivered);
    }

    #[test]
    fn aggregate_uniform_non_delivered() {
        assert_eq!(
            OrderStatus::aggregate(&[ItemStatus::Placed, ItemStatus::Placed]),
            OrderStatus::Placed
        );
        assert_eq!(
            OrderStatus::aggregate(&[ItemStatus::Shipped, ItemStatus::Shipped]),
            OrderStatus::Shipped
        );
    }

    #[test]
    fn aggregate_mixed_is_partially_delivered() {
        assert_eq!(
            OrderStatus::aggregate(&[ItemStatus::Delivered, ItemStatus::Placed]),
            OrderStatus::PartiallyDelivered
        );
        assert_eq!(
            OrderStatus::aggregate(&[ItemStatus::Placed, ItemStatus::Shipped]),
            OrderStatus::PartiallyDelivered
        );
    }

    #[test]
    fn round_trips_through_strings() {
        for s in [ItemStatus::Placed, ItemStatus::Shipped, ItemStatus::Delivered] {
            assert_eq!(ItemStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(ItemStatus::parse("Lost"), None);
    }
}
