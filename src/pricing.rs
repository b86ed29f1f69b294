//! Order pricing.
//!
//! Line items are priced without intermediate rounding; only the order total
//! is rounded, half-up, to two decimal places.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::LineItem;

/// Scale of every persisted monetary amount.
pub const MONEY_SCALE: u32 = 2;

/// `unit_price * quantity * (1 - discount_percent / 100)`, unrounded.
pub fn discounted_subtotal(item: &LineItem) -> Decimal {
    let subtotal = item.unit_price * Decimal::from(item.quantity);
    subtotal * (Decimal::ONE - item.discount_percent / Decimal::ONE_HUNDRED)
}

/// Order total. An empty slice prices to `0.00`.
pub fn price_order(items: &[LineItem]) -> Decimal {
    let sum: Decimal = items.iter().map(discounted_subtotal).sum();
    to_money(sum)
}

/// Round half-up to cents and pin the scale so totals always print as `x.yy`.
pub fn to_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn item(price: Decimal, quantity: i32, discount: Decimal) -> LineItem {
        LineItem {
            catalog_item_id: Uuid::new_v4(),
            name: "Crispy Bucket".into(),
            unit_price: price,
            discount_percent: discount,
            quantity,
            notes: String::new(),
        }
    }

    #[test]
    fn totals_discounted_lines() {
        let items = vec![
            item(Decimal::new(1000, 2), 2, Decimal::ZERO),
            item(Decimal::new(500, 2), 3, Decimal::from(10)),
        ];
        let total = price_order(&items);
        assert_eq!(total, Decimal::new(3350, 2));
        assert_eq!(total.to_string(), "33.50");
    }

    #[test]
    fn empty_order_prices_to_zero() {
        let total = price_order(&[]);
        assert_eq!(total, Decimal::ZERO);
        assert_eq!(total.to_string(), "0.00");
    }

    #[test]
    fn rounds_only_the_final_sum() {
        // 0.335 + 0.335 = 0.67; rounding each line first would give 0.68.
        let items = vec![
            item(Decimal::new(67, 2), 1, Decimal::from(50)),
            item(Decimal::new(67, 2), 1, Decimal::from(50)),
        ];
        assert_eq!(price_order(&items), Decimal::new(67, 2));
    }

    #[test]
    fn rounds_half_up() {
        // 0.125 -> 0.13
        let items = vec![item(Decimal::new(25, 2), 1, Decimal::from(50))];
        assert_eq!(price_order(&items), Decimal::new(13, 2));
    }

    #[test]
    fn full_discount_is_free() {
        let items = vec![item(Decimal::new(899, 2), 4, Decimal::ONE_HUNDRED)];
        assert_eq!(price_order(&items), Decimal::ZERO);
    }

    #[test]
    fn fractional_discount_percent() {
        // 19.99 * 3 * (1 - 0.125) = 52.47375
        let items = vec![item(Decimal::new(1999, 2), 3, Decimal::new(125, 1))];
        assert_eq!(price_order(&items), Decimal::new(5247, 2));
    }
}
