//! 用户身份识别服务
//!
//! 用户档案、RFID 卡发放与停用、卡号查询和用户动态

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use crate::error::{RecyclingError, Result};
use crate::models::{CollectionFilter, RfidCard, UserPoints};
use crate::repository::{
    CollectionRepositoryTrait, RfidCardRepositoryTrait, TransactionRepositoryTrait,
    UserRepositoryTrait,
};
use crate::service::dto::{ActivityItem, ActivityKind, UserProfile};
use crate::service::stats::summarize_collections;

pub const DEFAULT_ACTIVITY_LIMIT: usize = 10;
pub const MAX_ACTIVITY_LIMIT: usize = 100;

/// 用户身份识别服务
pub struct IdentificationService<UR, CoR, TR, RfR>
where
    UR: UserRepositoryTrait,
    CoR: CollectionRepositoryTrait,
    TR: TransactionRepositoryTrait,
    RfR: RfidCardRepositoryTrait,
{
    user_repo: Arc<UR>,
    collection_repo: Arc<CoR>,
    transaction_repo: Arc<TR>,
    rfid_repo: Arc<RfR>,
}

impl<UR, CoR, TR, RfR> IdentificationService<UR, CoR, TR, RfR>
where
    UR: UserRepositoryTrait,
    CoR: CollectionRepositoryTrait,
    TR: TransactionRepositoryTrait,
    RfR: RfidCardRepositoryTrait,
{
    pub fn new(
        user_repo: Arc<UR>,
        collection_repo: Arc<CoR>,
        transaction_repo: Arc<TR>,
        rfid_repo: Arc<RfR>,
    ) -> Self {
        Self {
            user_repo,
            collection_repo,
            transaction_repo,
            rfid_repo,
        }
    }

    /// 用户档案：基本信息、当前有效卡和投放汇总
    #[instrument(skip(self))]
    pub async fn profile(&self, user_id: i64) -> Result<UserProfile> {
        let user = self
            .user_repo
            .get(user_id)
            .await?
            .ok_or(RecyclingError::UserNotFound(user_id))?;

        let filter = CollectionFilter {
            user_id: Some(user_id),
            ..Default::default()
        };
        let (card, collections, transactions) = futures::try_join!(
            self.rfid_repo.find_active_by_user(user_id),
            self.collection_repo.list_all(&filter),
            self.transaction_repo.list_by_user(user_id),
        )?;

        let summary = summarize_collections(&collections);
        let points = UserPoints::from_transactions(user_id, &transactions, Utc::now());
        let last_collection = collections.iter().map(|c| c.created_at).max();

        let mut profile = UserProfile::new(user, card);
        profile.total_collections = summary.total_collections;
        profile.total_weight = summary.total_weight;
        profile.total_points = points.available_points;
        profile.last_activity = profile.last_activity.max(last_collection);
        Ok(profile)
    }

    /// 为用户发放新卡，原有效卡同时停用
    #[instrument(skip(self))]
    pub async fn issue_card(&self, user_id: i64) -> Result<RfidCard> {
        let user = self
            .user_repo
            .get(user_id)
            .await?
            .ok_or(RecyclingError::UserNotFound(user_id))?;
        if !user.is_citizen() {
            return Err(RecyclingError::NotACitizen(user_id));
        }

        let issued = self.rfid_repo.count_by_user(user_id).await?;
        let card_number = RfidCard::number_for(user_id, issued + 1);
        let card = self.rfid_repo.issue(user_id, &card_number).await?;

        info!(user_id, card_number = %card.card_number, "RFID 卡已发放");
        Ok(card)
    }

    #[instrument(skip(self))]
    pub async fn deactivate_card(&self, card_id: i64) -> Result<RfidCard> {
        let card = self
            .rfid_repo
            .deactivate(card_id)
            .await?
            .ok_or_else(|| RecyclingError::RfidCardNotFound(card_id.to_string()))?;
        info!(card_id, "RFID 卡已停用");
        Ok(card)
    }

    pub async fn lookup(&self, card_number: &str) -> Result<RfidCard> {
        self.rfid_repo
            .find_by_number(card_number)
            .await?
            .ok_or_else(|| RecyclingError::RfidCardNotFound(card_number.to_string()))
    }

    /// 用户动态：投放和积分流水合并，新的在前
    #[instrument(skip(self))]
    pub async fn activity(&self, user_id: i64, limit: Option<usize>) -> Result<Vec<ActivityItem>> {
        let limit = limit
            .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
            .clamp(1, MAX_ACTIVITY_LIMIT);
        let filter = CollectionFilter {
            user_id: Some(user_id),
            ..Default::default()
        };
        let (collections, transactions) = futures::try_join!(
            self.collection_repo.list_all(&filter),
            self.transaction_repo.list_by_user(user_id),
        )?;

        let mut items: Vec<ActivityItem> = collections
            .into_iter()
            .map(|c| ActivityItem {
                kind: ActivityKind::Collection,
                id: c.id,
                description: format!("投放 {:.2} kg {}", c.weight, c.recyclable_type.as_str()),
                points: c.points,
                weight: Some(c.weight),
                timestamp: c.created_at,
            })
            .chain(transactions.into_iter().map(|t| ActivityItem {
                kind: ActivityKind::Transaction,
                id: t.id,
                description: t.description,
                points: t.points,
                weight: None,
                timestamp: t.created_at,
            }))
            .collect();

        items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        items.truncate(limit);
        Ok(items)
    }
}
