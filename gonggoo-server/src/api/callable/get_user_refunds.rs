use axum::{Json, extract::State};
use gonggoo_core::entities::refunds::{ListUserRefunds, RefundRecord};
use gonggoo_core::framework::DatabaseProcessor;
use gonggoo_sdk::objects::{GetUserRefundsRequest, GetUserRefundsResponse, clamp_refund_limit};
use kanau::processor::Processor;

use crate::api::error::ApiError;
use crate::api::extractors::{AuthenticatedUser, CallableJson};
use crate::state::AppState;

/// `POST /getUserRefunds`
///
/// Newest first. Pass the last returned id as `startAfter` for the next page.
pub(super) async fn get_user_refunds(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    CallableJson(req): CallableJson<GetUserRefundsRequest>,
) -> Result<Json<GetUserRefundsResponse>, ApiError> {
    let limit = clamp_refund_limit(req.limit);
    let processor = DatabaseProcessor::new(state.db.clone());

    let records = processor
        .process(ListUserRefunds {
            user_id: user.user_id,
            limit,
            start_after: req.start_after.filter(|s| !s.is_empty()),
        })
        .await?;

    let (page, has_more) = split_page(records, limit);
    Ok(Json(GetUserRefundsResponse {
        success: true,
        refunds: page.iter().map(RefundRecord::to_view).collect(),
        has_more,
    }))
}

/// The query reads one row past the page; its presence means another page.
fn split_page(mut records: Vec<RefundRecord>, limit: i64) -> (Vec<RefundRecord>, bool) {
    let limit = usize::try_from(limit).unwrap_or(0);
    let has_more = records.len() > limit;
    records.truncate(limit);
    (records, has_more)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn records(n: usize) -> Vec<RefundRecord> {
        (0..n)
            .map(|i| RefundRecord {
                refund_id: format!("pk_{i}_1700000000000"),
                payment_key: format!("pk_{i}"),
                order_id: None,
                user_id: "user-1".to_string(),
                cancel_reason: "changed mind".to_string(),
                cancel_amount: None,
                refund_receive_account: None,
                idempotency_key: None,
                refund_result: serde_json::json!({}),
                is_full_refund: true,
                refunded_at: OffsetDateTime::UNIX_EPOCH,
                status: "COMPLETED".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_extra_row_means_more() {
        let (page, has_more) = split_page(records(3), 2);
        assert_eq!(page.len(), 2);
        assert!(has_more);
        assert_eq!(page[1].refund_id, "pk_1_1700000000000");
    }

    #[test]
    fn test_exact_page_has_no_more() {
        let (page, has_more) = split_page(records(2), 2);
        assert_eq!(page.len(), 2);
        assert!(!has_more);

        let (page, has_more) = split_page(records(0), 20);
        assert!(page.is_empty());
        assert!(!has_more);
    }
}
