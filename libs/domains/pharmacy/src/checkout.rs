//! First-expiring-first-out allocation of cart lines over lots.
//!
//! Both repositories run [`plan_checkout`] against lot rows they hold locked,
//! then apply the plan in the same transaction.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::error::{PharmacyError, PharmacyResult};
use crate::models::{CartLine, LineAmounts, Lot};
use crate::validation::MAX_MONEY;

/// Quantity taken from one lot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub lot_id: i64,
    pub quantity: i32,
}

/// A sale line before it has an id
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedLine {
    pub article_id: i64,
    pub lot_id: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub tax_rate: Decimal,
    pub amounts: LineAmounts,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutPlan {
    pub lines: Vec<PlannedLine>,
    pub subtotal: Decimal,
    pub tax_total: Decimal,
    pub total: Decimal,
}

impl CheckoutPlan {
    /// Total quantity to take from each lot.
    pub fn decrements(&self) -> Vec<Allocation> {
        let mut per_lot: Vec<Allocation> = Vec::new();
        for line in &self.lines {
            match per_lot.iter_mut().find(|a| a.lot_id == line.lot_id) {
                Some(existing) => existing.quantity += line.quantity,
                None => per_lot.push(Allocation {
                    lot_id: line.lot_id,
                    quantity: line.quantity,
                }),
            }
        }
        per_lot
    }
}

/// Sellable lots of `article_id`, soonest expiry first, undated lots last.
fn fefo_order<'a>(lots: &'a [Lot], article_id: i64, today: NaiveDate) -> Vec<&'a Lot> {
    let mut eligible: Vec<&Lot> = lots
        .iter()
        .filter(|lot| lot.article_id == article_id && !lot.is_expired(today))
        .collect();
    eligible.sort_by_key(|lot| (lot.expires_at.is_none(), lot.expires_at, lot.id));
    eligible
}

/// Allocate `requested` units of one article.
///
/// `remaining` tracks what earlier lines of the same checkout already took.
pub fn allocate_fefo(
    lots: &[Lot],
    article_id: i64,
    requested: i32,
    today: NaiveDate,
    remaining: &mut HashMap<i64, i32>,
) -> PharmacyResult<Vec<Allocation>> {
    let ordered = fefo_order(lots, article_id, today);

    let available: i64 = ordered
        .iter()
        .map(|lot| i64::from(*remaining.get(&lot.id).unwrap_or(&lot.quantity)))
        .sum();
    if available < i64::from(requested) {
        return Err(PharmacyError::InsufficientStock {
            article_id,
            requested: i64::from(requested),
            available,
        });
    }

    let mut allocations = Vec::new();
    let mut outstanding = requested;
    for lot in ordered {
        if outstanding == 0 {
            break;
        }
        let left = remaining.entry(lot.id).or_insert(lot.quantity);
        let take = (*left).min(outstanding);
        if take > 0 {
            *left -= take;
            outstanding -= take;
            allocations.push(Allocation {
                lot_id: lot.id,
                quantity: take,
            });
        }
    }

    Ok(allocations)
}

/// Plan a checkout of `lines` against `lots`. Nothing is mutated: on error
/// the caller has nothing to roll back.
pub fn plan_checkout(
    lines: &[CartLine],
    lots: &[Lot],
    today: NaiveDate,
) -> PharmacyResult<CheckoutPlan> {
    if lines.is_empty() {
        return Err(PharmacyError::EmptyCart);
    }

    let mut remaining = HashMap::new();
    let mut planned = Vec::new();

    for line in lines {
        for allocation in allocate_fefo(lots, line.article_id, line.quantity, today, &mut remaining)? {
            planned.push(PlannedLine {
                article_id: line.article_id,
                lot_id: allocation.lot_id,
                quantity: allocation.quantity,
                unit_price: line.unit_price,
                tax_rate: line.tax_rate,
                amounts: LineAmounts::compute(line.unit_price, line.tax_rate, allocation.quantity)
                    .ok_or(PharmacyError::AmountTooLarge)?,
            });
        }
    }

    let subtotal: Decimal = planned.iter().map(|l| l.amounts.subtotal).sum();
    let tax_total: Decimal = planned.iter().map(|l| l.amounts.tax).sum();
    let total = subtotal + tax_total;
    if total > MAX_MONEY {
        return Err(PharmacyError::AmountTooLarge);
    }

    Ok(CheckoutPlan {
        lines: planned,
        subtotal,
        tax_total,
        total,
    })
}
