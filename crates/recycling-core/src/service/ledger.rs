//! 积分账本服务
//!
//! 余额始终由积分流水推导，不单独存储

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use crate::error::Result;
use crate::models::UserPoints;
use crate::repository::TransactionRepositoryTrait;

/// 投放重量对应的积分，向下取整
pub fn points_for_weight(weight_kg: f64, points_per_kg: f64) -> i64 {
    if !weight_kg.is_finite() || weight_kg <= 0.0 {
        return 0;
    }
    (weight_kg * points_per_kg).floor() as i64
}

/// 积分账本服务
pub struct LedgerService<TR>
where
    TR: TransactionRepositoryTrait,
{
    transaction_repo: Arc<TR>,
}

impl<TR> LedgerService<TR>
where
    TR: TransactionRepositoryTrait,
{
    pub fn new(transaction_repo: Arc<TR>) -> Self {
        Self { transaction_repo }
    }

    /// 查询用户积分余额
    #[instrument(skip(self))]
    pub async fn user_points(&self, user_id: i64) -> Result<UserPoints> {
        let transactions = self.transaction_repo.list_by_user(user_id).await?;
        Ok(UserPoints::from_transactions(
            user_id,
            &transactions,
            Utc::now(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::reward::fixtures::transaction;
    use crate::models::{TransactionStatus, TransactionType};
    use crate::repository::MockTransactionRepositoryTrait;

    #[test]
    fn test_points_for_weight() {
        assert_eq!(points_for_weight(1.0, 20.0), 20);
        assert_eq!(points_for_weight(2.37, 20.0), 47);
        assert_eq!(points_for_weight(0.04, 20.0), 0);
        assert_eq!(points_for_weight(0.0, 20.0), 0);
        assert_eq!(points_for_weight(-3.0, 20.0), 0);
        assert_eq!(points_for_weight(f64::NAN, 20.0), 0);
    }

    #[tokio::test]
    async fn test_user_points_from_repository() {
        let mut repo = MockTransactionRepositoryTrait::new();
        repo.expect_list_by_user()
            .withf(|id| *id == 5)
            .returning(|_| {
                Ok(vec![
                    transaction(1, 5, TransactionType::Earned, 200, TransactionStatus::Completed),
                    transaction(2, 5, TransactionType::Redeemed, -150, TransactionStatus::Completed),
                    transaction(3, 5, TransactionType::Redeemed, -100, TransactionStatus::Cancelled),
                ])
            });

        let service = LedgerService::new(Arc::new(repo));
        let points = service.user_points(5).await.unwrap();
        assert_eq!(points.user_id, 5);
        assert_eq!(points.total_points, 200);
        assert_eq!(points.redeemed_points, 150);
        assert_eq!(points.available_points, 50);
    }

    #[test]
    fn test_empty_ledger_is_zero() {
        let mut repo = MockTransactionRepositoryTrait::new();
        repo.expect_list_by_user().returning(|_| Ok(vec![]));

        let service = LedgerService::new(Arc::new(repo));
        let points = tokio_test::block_on(service.user_points(9)).unwrap();
        assert_eq!(points.total_points, 0);
        assert_eq!(points.available_points, 0);
        assert_eq!(points.redeemed_points, 0);
    }
}
