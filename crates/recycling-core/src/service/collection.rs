//! 回收投放服务
//!
//! 校验投放人与回收点，按重量计算积分并入账，投放后检查满载告警

use std::sync::Arc;

use metalix_shared::cache::{Cache, CacheKey};
use metalix_shared::config::RewardsConfig;
use metalix_shared::observability::metrics;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::error::{RecyclingError, Result};
use crate::models::{
    Alert, AlertSeverity, AlertSource, AlertType, NewAlert, NewDeposit, User, VerificationMethod,
    WasteCollection, WasteCollector,
};
use crate::repository::{
    CollectionRepositoryTrait, CollectorRepositoryTrait, MonitoringRepositoryTrait,
    RfidCardRepositoryTrait, UserRepositoryTrait,
};
use crate::service::dto::{DepositReceipt, DepositRequest};
use crate::service::ledger::points_for_weight;

/// 根据装载率确定满载告警级别，未达阈值时返回 None
pub fn fill_alert_severity(fill_ratio: f64, threshold: f64) -> Option<AlertSeverity> {
    if fill_ratio >= 1.0 {
        Some(AlertSeverity::Critical)
    } else if fill_ratio >= threshold {
        Some(AlertSeverity::High)
    } else {
        None
    }
}

/// 回收投放服务
pub struct CollectionService<UR, CR, CoR, RfR, MR>
where
    UR: UserRepositoryTrait,
    CR: CollectorRepositoryTrait,
    CoR: CollectionRepositoryTrait,
    RfR: RfidCardRepositoryTrait,
    MR: MonitoringRepositoryTrait,
{
    user_repo: Arc<UR>,
    collector_repo: Arc<CR>,
    collection_repo: Arc<CoR>,
    rfid_repo: Arc<RfR>,
    monitoring_repo: Arc<MR>,
    cache: Arc<Cache>,
    rewards: RewardsConfig,
}

impl<UR, CR, CoR, RfR, MR> CollectionService<UR, CR, CoR, RfR, MR>
where
    UR: UserRepositoryTrait,
    CR: CollectorRepositoryTrait,
    CoR: CollectionRepositoryTrait,
    RfR: RfidCardRepositoryTrait,
    MR: MonitoringRepositoryTrait,
{
    pub fn new(
        user_repo: Arc<UR>,
        collector_repo: Arc<CR>,
        collection_repo: Arc<CoR>,
        rfid_repo: Arc<RfR>,
        monitoring_repo: Arc<MR>,
        cache: Arc<Cache>,
        rewards: RewardsConfig,
    ) -> Self {
        Self {
            user_repo,
            collector_repo,
            collection_repo,
            rfid_repo,
            monitoring_repo,
            cache,
            rewards,
        }
    }

    /// 记录一次投放
    ///
    /// `municipality_scope` 为管理员所属市政，回收点必须在该市政下
    #[instrument(skip(self, request), fields(collector_id = request.collector_id, weight = request.weight))]
    pub async fn deposit(
        &self,
        request: DepositRequest,
        municipality_scope: Option<i64>,
    ) -> Result<DepositReceipt> {
        let material = request.recyclable_type.as_str();
        let result = self.execute_deposit(&request, municipality_scope).await;

        match &result {
            Ok(receipt) => {
                metrics::record_deposit(material, "success", request.weight, receipt.points_earned);
            }
            Err(e) => {
                metrics::record_deposit(material, e.error_code(), request.weight, 0);
                if e.is_business_error() {
                    warn!(error = %e, "投放被拒绝");
                }
            }
        }

        result
    }

    async fn execute_deposit(
        &self,
        request: &DepositRequest,
        municipality_scope: Option<i64>,
    ) -> Result<DepositReceipt> {
        if !request.weight.is_finite() || request.weight <= 0.0 {
            return Err(RecyclingError::InvalidWeight(request.weight));
        }

        let user = self.resolve_depositor(request).await?;
        let collector = self.validate_collector(request, municipality_scope).await?;

        let points = points_for_weight(request.weight, self.rewards.points_per_kg);
        let verification_method = if request.rfid_card.is_some() {
            Some(VerificationMethod::Rfid)
        } else {
            request.verification_method
        };

        let deposit = NewDeposit {
            user_id: user.id,
            collector_id: collector.id,
            municipality_id: collector.municipality_id,
            weight: request.weight,
            recyclable_type: request.recyclable_type,
            points,
            verification_method,
            rfid_card: request.rfid_card.clone(),
            description: format!(
                "投放 {:.2} kg {} @ {}",
                request.weight,
                request.recyclable_type.as_str(),
                collector.name
            ),
        };
        let outcome = self.collection_repo.record_deposit(&deposit).await?;

        let fill_ratio = outcome.collector.fill_ratio();
        metrics::set_collector_fill(outcome.collector.id, fill_ratio);

        info!(
            collection_id = outcome.collection.id,
            user_id = user.id,
            points,
            fill_ratio,
            "投放已记录"
        );

        let alert = self.raise_fill_alert(&outcome.collector).await;
        self.cache
            .invalidate(&CacheKey::municipality_keys(collector.municipality_id))
            .await;

        Ok(DepositReceipt {
            collection: outcome.collection,
            transaction: outcome.transaction,
            points_earned: points,
            collector_fill_ratio: fill_ratio,
            alert,
        })
    }

    /// 确定投放人：RFID 卡优先，卡与 user_id 同时提供时必须一致
    async fn resolve_depositor(&self, request: &DepositRequest) -> Result<User> {
        let user_id = match (&request.rfid_card, request.user_id) {
            (Some(card_number), claimed) => {
                let card = self
                    .rfid_repo
                    .find_by_number(card_number)
                    .await?
                    .ok_or_else(|| RecyclingError::RfidCardNotFound(card_number.clone()))?;
                let owner = match card.user_id {
                    Some(owner) if card.is_active => owner,
                    _ => return Err(RecyclingError::RfidCardInactive(card_number.clone())),
                };
                if claimed.is_some_and(|id| id != owner) {
                    return Err(RecyclingError::Validation(
                        "RFID 卡不属于该用户".to_string(),
                    ));
                }
                owner
            }
            (None, Some(user_id)) => user_id,
            (None, None) => {
                return Err(RecyclingError::Validation(
                    "必须提供 userId 或 rfidCard".to_string(),
                ));
            }
        };

        let user = self
            .user_repo
            .get(user_id)
            .await?
            .ok_or(RecyclingError::UserNotFound(user_id))?;
        if !user.is_active {
            return Err(RecyclingError::UserInactive(user_id));
        }
        if !user.is_citizen() {
            return Err(RecyclingError::NotACitizen(user_id));
        }
        Ok(user)
    }

    async fn validate_collector(
        &self,
        request: &DepositRequest,
        municipality_scope: Option<i64>,
    ) -> Result<WasteCollector> {
        let collector = self
            .collector_repo
            .get(request.collector_id)
            .await?
            .ok_or(RecyclingError::CollectorNotFound(request.collector_id))?;

        if let Some(scope) = municipality_scope
            && scope != collector.municipality_id
        {
            return Err(RecyclingError::MunicipalityMismatch {
                expected: scope,
                actual: collector.municipality_id,
            });
        }
        if !collector.accepts_deposits() {
            return Err(RecyclingError::CollectorUnavailable {
                collector_id: collector.id,
                status: collector.status.as_str().to_string(),
            });
        }
        if !collector.can_accept(request.weight) {
            return Err(RecyclingError::CollectorFull {
                collector_id: collector.id,
                remaining: collector.remaining_capacity(),
            });
        }
        Ok(collector)
    }

    /// 满载告警，同一回收点未解决的告警只保留一条
    ///
    /// 投放已提交，告警失败只记录日志
    async fn raise_fill_alert(&self, collector: &WasteCollector) -> Option<Alert> {
        let ratio = collector.fill_ratio();
        let severity = fill_alert_severity(ratio, self.rewards.alert_threshold)?;

        match self.create_fill_alert(collector, severity).await {
            Ok(Some(alert)) => {
                metrics::record_alert_raised(alert.alert_type.as_str(), alert.severity.as_str());
                warn!(
                    collector_id = collector.id,
                    ratio,
                    severity = alert.severity.as_str(),
                    "回收点满载告警"
                );
                Some(alert)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(collector_id = collector.id, error = %e, "创建满载告警失败");
                None
            }
        }
    }

    async fn create_fill_alert(
        &self,
        collector: &WasteCollector,
        severity: AlertSeverity,
    ) -> Result<Option<Alert>> {
        if self
            .monitoring_repo
            .has_open_alert(collector.id, AlertType::CollectorFull)
            .await?
        {
            return Ok(None);
        }

        let ratio = collector.fill_ratio();
        let alert = NewAlert {
            alert_type: AlertType::CollectorFull,
            severity,
            message: format!(
                "回收点 {} 装载率 {:.0}%，请安排清运",
                collector.name,
                ratio * 100.0
            ),
            source: AlertSource::WasteCollector,
            municipality_id: Some(collector.municipality_id),
            collector_id: Some(collector.id),
            metadata: Some(json!({
                "fillRatio": ratio,
                "currentWeight": collector.current_weight,
                "capacity": collector.capacity,
            })),
        };
        self.monitoring_repo.create_alert(&alert).await.map(Some)
    }

    /// 管理员核验投放
    #[instrument(skip(self))]
    pub async fn verify(&self, id: i64, method: VerificationMethod) -> Result<WasteCollection> {
        self.collection_repo
            .verify(id, method)
            .await?
            .ok_or(RecyclingError::CollectionNotFound(id))
    }
}
