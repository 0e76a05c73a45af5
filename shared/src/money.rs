use bigdecimal::{BigDecimal, RoundingMode, Zero};
use serde::{Deserialize, Serialize};

use crate::error::OrderError;

/// Every stored amount carries two decimal places.
pub const MONEY_SCALE: i64 = 2;

pub fn round_money(value: &BigDecimal) -> BigDecimal {
    value.with_scale_round(MONEY_SCALE, RoundingMode::HalfUp)
}

/// Amounts of one line item, frozen at purchase time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineAmounts {
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub discount: BigDecimal,
    pub total: BigDecimal,
}

impl LineAmounts {
    /// `discount_percentage` is the listing's percentage off (0..=100) applied
    /// to the gross line amount.
    pub fn new(quantity: i32, unit_price: &BigDecimal, discount_percentage: &BigDecimal) -> Result<Self, OrderError> {
        if quantity <= 0 {
            return Err(OrderError::validation(format!("Invalid item quantity: {}", quantity)));
        }
        if unit_price < &BigDecimal::zero() {
            return Err(OrderError::validation("Unit price cannot be negative"));
        }
        if discount_percentage < &BigDecimal::zero() || discount_percentage > &BigDecimal::from(100) {
            return Err(OrderError::validation("Discount percentage must be between 0 and 100"));
        }

        let unit_price = round_money(unit_price);
        let gross = &unit_price * &BigDecimal::from(quantity);
        let discount = round_money(&(&gross * discount_percentage / BigDecimal::from(100)));
        let total = round_money(&(&gross - &discount));

        Ok(Self { quantity, unit_price, discount, total })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: BigDecimal,
    pub shipping_cost: BigDecimal,
    pub discount: BigDecimal,
    pub total: BigDecimal,
}

impl OrderTotals {
    pub fn from_lines(lines: &[LineAmounts], shipping_cost: &BigDecimal, discount: &BigDecimal) -> Result<Self, OrderError> {
        if shipping_cost < &BigDecimal::zero() || discount < &BigDecimal::zero() {
            return Err(OrderError::validation("Shipping cost and discount cannot be negative"));
        }

        let subtotal = lines
            .iter()
            .fold(BigDecimal::zero(), |acc, line| acc + &line.total);
        if discount > &subtotal {
            return Err(OrderError::validation("Order discount exceeds subtotal"));
        }

        let subtotal = round_money(&subtotal);
        let shipping_cost = round_money(shipping_cost);
        let discount = round_money(discount);
        let total = round_money(&(&subtotal - &discount + &shipping_cost));

        let totals = Self { subtotal, shipping_cost, discount, total };
        debug_assert!(totals.is_consistent());
        Ok(totals)
    }

    /// `total = subtotal - discount + shipping_cost`
    pub fn is_consistent(&self) -> bool {
        self.total == &self.subtotal - &self.discount + &self.shipping_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_line_without_discount() {
        let line = LineAmounts::new(2, &dec("10.00"), &BigDecimal::zero()).unwrap();
        assert_eq!(line.total, dec("20.00"));
        assert_eq!(line.discount, dec("0"));
    }

    #[test]
    fn test_line_discount_rounds_half_up() {
        // 3 * 3.33 = 9.99, 12.5% of that is 1.24875
        let line = LineAmounts::new(3, &dec("3.33"), &dec("12.5")).unwrap();
        assert_eq!(line.discount, dec("1.25"));
        assert_eq!(line.total, dec("8.74"));
    }

    #[test]
    fn test_line_rejects_zero_quantity() {
        let err = LineAmounts::new(0, &dec("1.00"), &BigDecimal::zero()).unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)));
    }

    #[test]
    fn test_line_rejects_discount_over_hundred() {
        assert!(LineAmounts::new(1, &dec("1.00"), &dec("100.01")).is_err());
    }

    #[test]
    fn test_totals_sum_lines() {
        let lines = vec![
            LineAmounts::new(2, &dec("10.00"), &BigDecimal::zero()).unwrap(),
            LineAmounts::new(1, &dec("0.10"), &BigDecimal::zero()).unwrap(),
            LineAmounts::new(1, &dec("0.20"), &BigDecimal::zero()).unwrap(),
        ];
        let totals = OrderTotals::from_lines(&lines, &dec("5.00"), &dec("1.00")).unwrap();

        assert_eq!(totals.subtotal, dec("20.30"));
        assert_eq!(totals.total, dec("24.30"));
        assert!(totals.is_consistent());
    }

    #[test]
    fn test_totals_reject_discount_over_subtotal() {
        let lines = vec![LineAmounts::new(1, &dec("1.00"), &BigDecimal::zero()).unwrap()];
        assert!(OrderTotals::from_lines(&lines, &BigDecimal::zero(), &dec("2.00")).is_err());
    }

    #[test]
    fn test_inconsistent_totals_detected() {
        let totals = OrderTotals {
            subtotal: dec("10.00"),
            shipping_cost: dec("0"),
            discount: dec("0"),
            total: dec("11.00"),
        };
        assert!(!totals.is_consistent());
    }
}
