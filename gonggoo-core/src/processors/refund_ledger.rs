//! Local bookkeeping for a refund the gateway has already executed.

use gonggoo_sdk::objects::{RefundReceiveAccount, StockRestoration};
use itertools::Itertools;
use kanau::processor::Processor;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{info, warn};

use crate::entities::ordered_products::OrderedProduct;
use crate::entities::orders::{OrderCancellation, OrderRecord};
use crate::entities::payments::PaymentRecord;
use crate::entities::products::ProductUnit;
use crate::entities::refunds::{REFUND_STATUS_COMPLETED, RefundRecord};
use crate::framework::DatabaseProcessor;
use crate::gateway::GatewayPayment;
use crate::reconcile::{self, OrderRefundEffect};

#[derive(Debug, Clone)]
pub struct RecordRefund {
    pub payment_key: String,
    pub order_id: Option<String>,
    pub user_id: String,
    pub cancel_reason: String,
    pub cancel_amount: Option<i64>,
    pub refund_receive_account: Option<RefundReceiveAccount>,
    pub idempotency_key: Option<String>,
    pub gateway_result: GatewayPayment,
    pub is_full_refund: bool,
}

#[derive(Debug, Clone)]
pub struct RefundLedgerOutcome {
    pub refund: RefundRecord,
    pub order_effect: OrderRefundEffect,
    pub restorations: Vec<StockRestoration>,
}

fn encode_err(e: serde_json::Error) -> sqlx::Error {
    sqlx::Error::Encode(Box::new(e))
}

/// Partial refund entry appended to the order.
fn partial_refund_entry(
    entry: &RecordRefund,
    refunded_at: OffsetDateTime,
) -> Result<serde_json::Value, sqlx::Error> {
    let refunded_at = refunded_at
        .format(&Rfc3339)
        .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
    Ok(serde_json::json!({
        "refundAmount": entry.cancel_amount,
        "refundReason": entry.cancel_reason,
        "refundedAt": refunded_at,
        "refundResult": entry.gateway_result.raw,
    }))
}

impl Processor<RecordRefund> for DatabaseProcessor {
    type Output = RefundLedgerOutcome;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:RecordRefund", fields(payment_key = %entry.payment_key))]
    async fn process(&self, entry: RecordRefund) -> Result<RefundLedgerOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let order = match entry.order_id.as_deref() {
            Some(order_id) => OrderRecord::lock_tx(&mut tx, order_id).await?,
            None => None,
        };
        let effect = reconcile::refund_effect(order.as_ref(), entry.is_full_refund);
        let (items, units) = match (&order, effect) {
            (Some(order), OrderRefundEffect::CancelOrder) => {
                let items = OrderedProduct::list_for_order_tx(&mut tx, &order.order_id).await?;
                let product_ids = items
                    .iter()
                    .map(|item| item.product_id.clone())
                    .unique()
                    .collect_vec();
                let units = ProductUnit::lock_for_products_tx(&mut tx, &product_ids).await?;
                (items, units)
            }
            _ => (Vec::new(), Vec::new()),
        };
        let payment = PaymentRecord::lock_tx(&mut tx, &entry.payment_key).await?;

        let now = OffsetDateTime::now_utc();
        let plan = reconcile::plan_stock_restoration(&items, &units);
        let refund = RefundRecord {
            refund_id: RefundRecord::make_id(&entry.payment_key, now),
            payment_key: entry.payment_key.clone(),
            order_id: entry.order_id.clone(),
            user_id: entry.user_id.clone(),
            cancel_reason: entry.cancel_reason.clone(),
            cancel_amount: entry.cancel_amount,
            refund_receive_account: entry
                .refund_receive_account
                .as_ref()
                .map(serde_json::to_value)
                .transpose()
                .map_err(encode_err)?,
            idempotency_key: entry.idempotency_key.clone(),
            refund_result: entry.gateway_result.raw.clone(),
            is_full_refund: entry.is_full_refund,
            refunded_at: now,
            status: REFUND_STATUS_COMPLETED.to_string(),
        };
        let refund_json = serde_json::to_value(&refund).map_err(encode_err)?;

        RefundRecord::insert_tx(&mut tx, &refund).await?;
        if payment.is_some() {
            PaymentRecord::record_refund_tx(
                &mut tx,
                &entry.payment_key,
                entry.gateway_result.status.as_str(),
                &refund_json,
            )
            .await?;
        } else {
            warn!("Refunded payment has no local payment record");
        }

        match (&order, effect) {
            (Some(order), OrderRefundEffect::CancelOrder) => {
                OrderRecord::mark_cancelled_tx(
                    &mut tx,
                    &order.order_id,
                    &OrderCancellation {
                        cancel_reason: &entry.cancel_reason,
                        cancel_amount: entry.cancel_amount.unwrap_or(order.total_amount),
                        gateway_result: &entry.gateway_result.raw,
                    },
                )
                .await?;
                ProductUnit::apply_stock_tx(&mut tx, &plan.updates).await?;
                if !plan.unmatched.is_empty() {
                    warn!(
                        order_id = %order.order_id,
                        line_items = ?plan.unmatched,
                        "No matching unit for line items, stock not restored"
                    );
                }
            }
            (Some(order), OrderRefundEffect::AppendHistory) => {
                OrderRecord::append_refund_history_tx(
                    &mut tx,
                    &order.order_id,
                    &partial_refund_entry(&entry, now)?,
                )
                .await?;
            }
            (Some(order), OrderRefundEffect::AlreadyCancelled) => {
                info!(order_id = %order.order_id, "Order already cancelled, stock left as is");
            }
            _ => {}
        }

        tx.commit().await?;

        info!(
            refund_id = %refund.refund_id,
            full = entry.is_full_refund,
            effect = ?effect,
            "Refund recorded"
        );
        Ok(RefundLedgerOutcome {
            refund,
            order_effect: effect,
            restorations: plan.restorations,
        })
    }
}
