//! Decisions about orders and stock that need no I/O.
//!
//! The processors read rows under lock, ask these functions what to do, then
//! write the result in the same transaction.

use std::collections::HashMap;

use gonggoo_sdk::objects::{PaymentStatus, StockRestoration};

use crate::entities::OrderStatus;
use crate::entities::ordered_products::OrderedProduct;
use crate::entities::orders::OrderRecord;
use crate::entities::payments::PaymentRecord;
use crate::entities::products::{ProductUnit, StockUpdate};

/// Find the unit a line item was bought from.
///
/// Items carrying a unit id match on it. Legacy items, and items whose unit id
/// no longer exists, fall back to the unit label.
pub fn match_unit<'a>(units: &'a [ProductUnit], item: &OrderedProduct) -> Option<&'a ProductUnit> {
    let same_product = || units.iter().filter(|u| u.product_id == item.product_id);
    if let Some(unit_id) = item.unit_id.as_deref() {
        if let Some(unit) = same_product().find(|u| u.unit_id.as_deref() == Some(unit_id)) {
            return Some(unit);
        }
    }
    let label = item.unit_label.as_deref()?;
    same_product().find(|u| u.label == label)
}

/// Stock writes and their audit trail for releasing a set of line items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockPlan {
    pub updates: Vec<StockUpdate>,
    pub restorations: Vec<StockRestoration>,
    /// Line items whose unit could not be found. Their stock is not restored.
    pub unmatched: Vec<i64>,
}

/// Add every line item's quantity back onto its unit.
///
/// Several items on the same unit accumulate, so each restoration's
/// `stock_before` is the value left by the previous one.
pub fn plan_stock_restoration(items: &[OrderedProduct], units: &[ProductUnit]) -> StockPlan {
    let mut plan = StockPlan::default();
    let mut running: HashMap<i64, i32> = HashMap::new();
    let mut order: Vec<i64> = Vec::new();

    for item in items {
        let Some(unit) = match_unit(units, item) else {
            plan.unmatched.push(item.id);
            continue;
        };
        let before = *running.entry(unit.id).or_insert_with(|| {
            order.push(unit.id);
            unit.stock
        });
        let after = before.saturating_add(item.quantity.max(0));
        running.insert(unit.id, after);
        plan.restorations.push(StockRestoration {
            product_id: unit.product_id.clone(),
            product_name: unit.product_name.clone(),
            unit_id: unit.unit_id.clone(),
            unit_label: Some(unit.label.clone()),
            quantity: item.quantity,
            stock_before: before,
            stock_after: after,
        });
    }

    plan.updates = order
        .into_iter()
        .filter_map(|id| {
            running.get(&id).map(|&new_stock| StockUpdate {
                unit_row_id: id,
                new_stock,
            })
        })
        .collect();
    plan
}

/// Why a pending-order release did nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupSkip {
    OrderNotFound,
    AlreadyDeleted,
    NotPending(OrderStatus),
    PaymentCompleted,
}

impl std::fmt::Display for CleanupSkip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CleanupSkip::OrderNotFound => write!(f, "order not found"),
            CleanupSkip::AlreadyDeleted => write!(f, "order already deleted"),
            CleanupSkip::NotPending(status) => write!(f, "order is not pending ({status})"),
            CleanupSkip::PaymentCompleted => write!(f, "payment already completed"),
        }
    }
}

/// Only a live pending order whose payment never completed may be released.
///
/// A payment counts as completed when either the order or any payment row
/// recorded for it says `DONE`. The payment row is written before the order
/// is confirmed, so it can be ahead of the order.
pub fn cleanup_eligibility<'a>(
    order: Option<&'a OrderRecord>,
    payments: &[PaymentRecord],
) -> Result<&'a OrderRecord, CleanupSkip> {
    let order = order.ok_or(CleanupSkip::OrderNotFound)?;
    if order.is_deleted {
        return Err(CleanupSkip::AlreadyDeleted);
    }
    if order.status != OrderStatus::Pending {
        return Err(CleanupSkip::NotPending(order.status));
    }
    let done = PaymentStatus::Done.as_str();
    if order.payment_status.as_deref() == Some(done) || payments.iter().any(|p| p.status == done) {
        return Err(CleanupSkip::PaymentCompleted);
    }
    Ok(order)
}

/// Why a confirmed payment did not move its order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmSkip {
    OrderNotFound,
    NotPending(OrderStatus),
}

impl std::fmt::Display for ConfirmSkip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfirmSkip::OrderNotFound => write!(f, "order not found"),
            ConfirmSkip::NotPending(status) => write!(f, "order is not pending ({status})"),
        }
    }
}

pub fn confirm_eligibility(order: Option<&OrderRecord>) -> Result<(), ConfirmSkip> {
    let order = order.ok_or(ConfirmSkip::OrderNotFound)?;
    if order.status != OrderStatus::Pending {
        return Err(ConfirmSkip::NotPending(order.status));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelRejection {
    NotOwner,
    /// The payment key is not the one recorded on the order.
    PaymentMismatch,
    AlreadyCancelled,
    NotPaid(OrderStatus),
}

/// A caller may cancel only their own paid or confirmed order, only with the
/// payment that order was settled by, and only once.
pub fn check_cancellable(
    order: &OrderRecord,
    caller: &str,
    payment_key: &str,
) -> Result<(), CancelRejection> {
    if order.user_id != caller {
        return Err(CancelRejection::NotOwner);
    }
    if order
        .payment_key
        .as_deref()
        .is_some_and(|recorded| recorded != payment_key)
    {
        return Err(CancelRejection::PaymentMismatch);
    }
    match order.status {
        OrderStatus::Cancelled => Err(CancelRejection::AlreadyCancelled),
        OrderStatus::Paid | OrderStatus::Confirmed => Ok(()),
        other => Err(CancelRejection::NotPaid(other)),
    }
}

/// A refund without an amount, or for the whole order total, is full.
///
/// Without a known order a refund with an explicit amount counts as partial.
pub fn is_full_refund(cancel_amount: Option<i64>, order_total: Option<i64>) -> bool {
    match cancel_amount {
        None => true,
        Some(amount) => order_total == Some(amount),
    }
}

/// What a successful refund does to the local order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderRefundEffect {
    /// Cancel the order and put its stock back.
    CancelOrder,
    /// Record a partial refund on the order.
    AppendHistory,
    /// Full refund of an order that is already cancelled. Stock was restored before.
    AlreadyCancelled,
    /// No local order is linked to the payment.
    NoOrder,
}

pub fn refund_effect(order: Option<&OrderRecord>, full_refund: bool) -> OrderRefundEffect {
    match order {
        None => OrderRefundEffect::NoOrder,
        Some(order) if full_refund && order.status == OrderStatus::Cancelled => {
            OrderRefundEffect::AlreadyCancelled
        }
        Some(_) if full_refund => OrderRefundEffect::CancelOrder,
        Some(_) => OrderRefundEffect::AppendHistory,
    }
}
