//! 仓储 Trait 定义
//!
//! 服务层依赖这些抽象而非具体实现，便于 mock 测试。
//! 需要原子性的写操作（兑换、取消兑换、投放、发卡）整体作为一个方法暴露，
//! 事务在实现内部开启和提交。

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{
    Alert, AlertFilter, AlertType, CancellationOutcome, CollectionFilter, CollectorChanges,
    CollectorFilter, CollectorStatus, DepositOutcome, Metric, MetricFilter, Municipality,
    MunicipalityChanges, NewAlert, NewCollector, NewDeposit, NewMetric, NewMunicipality,
    NewReport, NewReward, NewSensorReading, NewUser, NewZone, RedemptionOutcome, Report, Reward,
    RewardChanges, RewardFilter, RewardTransaction, RfidCard, RfidCardFilter, SensorReading,
    TransactionFilter, User, UserChanges, UserFilter, UserRole, VerificationMethod,
    WasteCollection, WasteCollector, Zone, ZoneChanges,
};

/// 用户仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepositoryTrait: Send + Sync {
    async fn get(&self, id: i64) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn create(&self, user: &NewUser) -> Result<User>;
    async fn update(&self, id: i64, changes: &UserChanges) -> Result<Option<User>>;
    async fn list(&self, filter: &UserFilter, limit: i64, offset: i64) -> Result<(Vec<User>, i64)>;
    /// 指定市政（None 表示全部）的所有市民
    async fn list_citizens(&self, municipality_id: Option<i64>) -> Result<Vec<User>>;
    async fn count_by_role(&self, role: UserRole) -> Result<i64>;

    // 登录状态
    async fn record_login_failure(
        &self,
        id: i64,
        max_attempts: i32,
        lock_until: DateTime<Utc>,
    ) -> Result<()>;
    async fn record_login_success(&self, id: i64) -> Result<()>;
}

/// 市政与区域仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MunicipalityRepositoryTrait: Send + Sync {
    async fn get(&self, id: i64) -> Result<Option<Municipality>>;
    async fn list(&self, active_only: bool) -> Result<Vec<Municipality>>;
    async fn create(&self, municipality: &NewMunicipality) -> Result<Municipality>;
    async fn update(&self, id: i64, changes: &MunicipalityChanges)
    -> Result<Option<Municipality>>;

    // 区域
    async fn get_zone(&self, id: i64) -> Result<Option<Zone>>;
    async fn list_zones(&self, municipality_id: Option<i64>) -> Result<Vec<Zone>>;
    async fn create_zone(&self, zone: &NewZone) -> Result<Zone>;
    async fn update_zone(&self, id: i64, changes: &ZoneChanges) -> Result<Option<Zone>>;
    async fn delete_zone(&self, id: i64) -> Result<bool>;
}

/// 回收点仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CollectorRepositoryTrait: Send + Sync {
    async fn get(&self, id: i64) -> Result<Option<WasteCollector>>;
    async fn list(&self, filter: &CollectorFilter) -> Result<Vec<WasteCollector>>;
    async fn create(&self, collector: &NewCollector) -> Result<WasteCollector>;
    async fn update(&self, id: i64, changes: &CollectorChanges)
    -> Result<Option<WasteCollector>>;
    async fn update_status(
        &self,
        id: i64,
        status: CollectorStatus,
    ) -> Result<Option<WasteCollector>>;
    /// 清空回收点并设置下次维护时间，状态恢复为 ACTIVE
    async fn record_maintenance(
        &self,
        id: i64,
        next_maintenance: DateTime<Utc>,
    ) -> Result<Option<WasteCollector>>;

    // 传感器
    async fn insert_sensor_reading(&self, reading: &NewSensorReading) -> Result<SensorReading>;
    async fn list_sensor_readings(
        &self,
        collector_id: Option<i64>,
        municipality_id: Option<i64>,
        limit: i64,
    ) -> Result<Vec<SensorReading>>;
}

/// 回收投放仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CollectionRepositoryTrait: Send + Sync {
    async fn get(&self, id: i64) -> Result<Option<WasteCollection>>;
    async fn list(
        &self,
        filter: &CollectionFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<WasteCollection>, i64)>;
    /// 不分页，供统计聚合使用
    async fn list_all(&self, filter: &CollectionFilter) -> Result<Vec<WasteCollection>>;
    /// 原子写入投放、EARNED 流水、回收点重量和 RFID 使用记录
    async fn record_deposit(&self, deposit: &NewDeposit) -> Result<DepositOutcome>;
    async fn verify(
        &self,
        id: i64,
        method: VerificationMethod,
    ) -> Result<Option<WasteCollection>>;
}

/// 奖励仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RewardRepositoryTrait: Send + Sync {
    async fn get(&self, id: i64) -> Result<Option<Reward>>;
    async fn list(
        &self,
        filter: &RewardFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Reward>, i64)>;
    async fn create(&self, reward: &NewReward) -> Result<Reward>;
    async fn update(&self, id: i64, changes: &RewardChanges) -> Result<Option<Reward>>;
    async fn deactivate(&self, id: i64) -> Result<Option<Reward>>;

    /// 原子兑换：锁定用户行、重算余额、扣减库存、写入 REDEEMED 流水
    async fn redeem(
        &self,
        user_id: i64,
        reward_id: i64,
        now: DateTime<Utc>,
    ) -> Result<RedemptionOutcome>;
    /// 原子取消兑换：原流水置为 CANCELLED、恢复库存、写入 REFUNDED 记录
    async fn cancel_redemption(&self, transaction_id: i64) -> Result<CancellationOutcome>;
}

/// 积分流水仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionRepositoryTrait: Send + Sync {
    async fn get(&self, id: i64) -> Result<Option<RewardTransaction>>;
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<RewardTransaction>>;
    async fn list(
        &self,
        filter: &TransactionFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<RewardTransaction>, i64)>;
    /// 不分页，供统计聚合使用
    async fn list_all(&self, filter: &TransactionFilter) -> Result<Vec<RewardTransaction>>;
}

/// RFID 卡仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RfidCardRepositoryTrait: Send + Sync {
    async fn get(&self, id: i64) -> Result<Option<RfidCard>>;
    async fn find_by_number(&self, card_number: &str) -> Result<Option<RfidCard>>;
    async fn find_active_by_user(&self, user_id: i64) -> Result<Option<RfidCard>>;
    /// 用户历史上发过的卡数量（含已停用）
    async fn count_by_user(&self, user_id: i64) -> Result<i64>;
    async fn list(
        &self,
        filter: &RfidCardFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<RfidCard>, i64)>;
    /// 停用用户当前有效卡并发放新卡
    async fn issue(&self, user_id: i64, card_number: &str) -> Result<RfidCard>;
    async fn deactivate(&self, id: i64) -> Result<Option<RfidCard>>;
}

/// 监控仓储接口（报表、指标、告警）
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MonitoringRepositoryTrait: Send + Sync {
    // 报表
    async fn create_report(&self, report: &NewReport) -> Result<Report>;
    async fn get_report(&self, id: i64) -> Result<Option<Report>>;
    async fn list_reports(
        &self,
        municipality_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Report>, i64)>;

    // 指标
    async fn record_metric(&self, metric: &NewMetric) -> Result<Metric>;
    async fn list_metrics(&self, filter: &MetricFilter, limit: i64) -> Result<Vec<Metric>>;

    // 告警
    async fn create_alert(&self, alert: &NewAlert) -> Result<Alert>;
    async fn get_alert(&self, id: i64) -> Result<Option<Alert>>;
    async fn list_alerts(
        &self,
        filter: &AlertFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Alert>, i64)>;
    async fn has_open_alert(&self, collector_id: i64, alert_type: AlertType) -> Result<bool>;
    async fn resolve_alert(&self, id: i64) -> Result<Option<Alert>>;
    async fn resolve_collector_alerts(&self, collector_id: i64, alert_type: AlertType)
    -> Result<u64>;
    async fn count_open_alerts(&self, municipality_id: Option<i64>) -> Result<i64>;
}
