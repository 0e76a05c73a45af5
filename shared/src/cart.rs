use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

use crate::error::OrderError;
use crate::money::{LineAmounts, OrderTotals};
use crate::status::PartStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub spare_part_id: Uuid,
    pub quantity: i32,
}

/// What the catalog knows about a spare part when the order is priced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartSnapshot {
    pub id: Uuid,
    pub business_id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub discount_percentage: BigDecimal,
    pub stock: i32,
    pub status: PartStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub spare_part_id: Uuid,
    pub business_id: Uuid,
    pub amounts: LineAmounts,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricedCart {
    pub lines: Vec<PricedLine>,
    pub totals: OrderTotals,
}

impl PricedCart {
    pub fn business_ids(&self) -> BTreeSet<Uuid> {
        self.lines.iter().map(|line| line.business_id).collect()
    }
}

/// Rejects empty carts and non-positive quantities, and folds repeated
/// spare parts into one line. First-seen order is kept.
pub fn normalize_cart(items: &[CartItem]) -> Result<Vec<CartItem>, OrderError> {
    if items.is_empty() {
        return Err(OrderError::validation("Please add at least one item to the order"));
    }

    let mut merged: Vec<CartItem> = Vec::with_capacity(items.len());
    for item in items {
        if item.quantity <= 0 {
            return Err(OrderError::validation(format!(
                "Invalid quantity {} for spare part {}",
                item.quantity, item.spare_part_id
            )));
        }
        match merged.iter_mut().find(|m| m.spare_part_id == item.spare_part_id) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(item.quantity)
                    .ok_or_else(|| OrderError::validation("Quantity too large"))?;
            }
            None => merged.push(item.clone()),
        }
    }

    Ok(merged)
}

/// Prices a normalized cart against catalog snapshots.
///
/// Stock is only pre-checked here; the authoritative check is the ledger's
/// conditional decrement.
pub fn price_cart(
    items: &[CartItem],
    parts: &HashMap<Uuid, PartSnapshot>,
    shipping_cost: &BigDecimal,
) -> Result<PricedCart, OrderError> {
    let mut lines = Vec::with_capacity(items.len());

    for item in items {
        let part = parts
            .get(&item.spare_part_id)
            .ok_or_else(|| OrderError::not_found(format!("Spare part {}", item.spare_part_id)))?;

        if part.status != PartStatus::Active {
            return Err(OrderError::Unavailable(part.id));
        }
        if part.stock < item.quantity {
            return Err(OrderError::InsufficientStock {
                spare_part_id: part.id,
                requested: item.quantity,
                available: part.stock,
            });
        }

        lines.push(PricedLine {
            spare_part_id: part.id,
            business_id: part.business_id,
            amounts: LineAmounts::new(item.quantity, &part.price, &part.discount_percentage)?,
        });
    }

    let amounts: Vec<LineAmounts> = lines.iter().map(|l| l.amounts.clone()).collect();
    let totals = OrderTotals::from_lines(&amounts, shipping_cost, &BigDecimal::zero())?;

    Ok(PricedCart { lines, totals })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn part(price: &str, stock: i32) -> PartSnapshot {
        PartSnapshot {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            name: "Brake pad".to_string(),
            price: dec(price),
            discount_percentage: BigDecimal::zero(),
            stock,
            status: PartStatus::Active,
        }
    }

    fn catalog(parts: &[PartSnapshot]) -> HashMap<Uuid, PartSnapshot> {
        parts.iter().map(|p| (p.id, p.clone())).collect()
    }

    #[test]
    fn test_empty_cart_rejected() {
        let err = normalize_cart(&[]).unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)));
    }

    #[test]
    fn test_negative_quantity_rejected() {
        let items = vec![CartItem { spare_part_id: Uuid::new_v4(), quantity: -1 }];
        assert!(normalize_cart(&items).is_err());
    }

    #[test]
    fn test_duplicate_parts_merged() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let items = vec![
            CartItem { spare_part_id: a, quantity: 1 },
            CartItem { spare_part_id: b, quantity: 4 },
            CartItem { spare_part_id: a, quantity: 2 },
        ];

        let merged = normalize_cart(&items).unwrap();
        assert_eq!(
            merged,
            vec![
                CartItem { spare_part_id: a, quantity: 3 },
                CartItem { spare_part_id: b, quantity: 4 },
            ]
        );
    }

    #[test]
    fn test_single_line_cart_total() {
        let a = part("10.00", 5);
        let items = vec![CartItem { spare_part_id: a.id, quantity: 2 }];

        let priced = price_cart(&items, &catalog(&[a.clone()]), &BigDecimal::zero()).unwrap();
        assert_eq!(priced.totals.total, dec("20.00"));
        assert_eq!(priced.lines[0].amounts.unit_price, dec("10.00"));
        assert_eq!(priced.business_ids().into_iter().collect::<Vec<_>>(), vec![a.business_id]);
    }

    #[test]
    fn test_total_matches_line_formula() {
        let mut a = part("19.99", 10);
        a.discount_percentage = dec("10");
        let b = part("4.50", 3);
        let items = vec![
            CartItem { spare_part_id: a.id, quantity: 3 },
            CartItem { spare_part_id: b.id, quantity: 2 },
        ];

        let priced = price_cart(&items, &catalog(&[a, b]), &dec("7.25")).unwrap();

        let expected_lines = priced.lines.iter().fold(BigDecimal::zero(), |acc, l| {
            acc + &l.amounts.unit_price * &BigDecimal::from(l.amounts.quantity) - &l.amounts.discount
        });
        assert_eq!(priced.totals.total, expected_lines - &priced.totals.discount + &priced.totals.shipping_cost);
        assert_eq!(priced.totals.total, dec("70.22"));
        assert_eq!(priced.business_ids().len(), 2);
    }

    #[test]
    fn test_unknown_part_not_found() {
        let items = vec![CartItem { spare_part_id: Uuid::new_v4(), quantity: 1 }];
        let err = price_cart(&items, &HashMap::new(), &BigDecimal::zero()).unwrap_err();
        assert!(matches!(err, OrderError::NotFound(_)));
    }

    #[test]
    fn test_insufficient_stock_reports_availability() {
        let a = part("10.00", 1);
        let items = vec![CartItem { spare_part_id: a.id, quantity: 2 }];

        let err = price_cart(&items, &catalog(&[a.clone()]), &BigDecimal::zero()).unwrap_err();
        assert_eq!(
            err,
            OrderError::InsufficientStock { spare_part_id: a.id, requested: 2, available: 1 }
        );
    }

    #[test]
    fn test_inactive_and_out_of_stock_unavailable() {
        let mut inactive = part("1.00", 5);
        inactive.status = PartStatus::Inactive;
        let mut sold_out = part("1.00", 0);
        sold_out.status = PartStatus::OutOfStock;

        for p in [inactive, sold_out] {
            let items = vec![CartItem { spare_part_id: p.id, quantity: 1 }];
            let err = price_cart(&items, &catalog(&[p.clone()]), &BigDecimal::zero()).unwrap_err();
            assert_eq!(err, OrderError::Unavailable(p.id));
        }
    }
}
