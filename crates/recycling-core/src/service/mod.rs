//! 服务层
//!
//! 实现回收积分业务逻辑，协调仓储层和缓存层。
//!
//! ## 模块结构
//!
//! - `dto`: 数据传输对象定义
//! - `ledger`: 积分余额推导
//! - `redemption`: 奖励兑换与取消
//! - `collection`: 回收投放
//! - `collector`: 回收点维护与传感器读数
//! - `identification`: 用户档案与 RFID 卡
//! - `dashboard`: 统计看板
//! - `monitoring`: 报表、指标与告警
//! - `stats`: 聚合用的纯函数

pub mod collection;
pub mod collector;
pub mod dashboard;
pub mod dto;
pub mod identification;
pub mod ledger;
pub mod monitoring;
pub mod redemption;
pub mod stats;

pub use collection::CollectionService;
pub use collector::CollectorService;
pub use dashboard::DashboardService;
pub use dto::*;
pub use identification::IdentificationService;
pub use ledger::{LedgerService, points_for_weight};
pub use monitoring::MonitoringService;
pub use redemption::RedemptionService;

use crate::repository::{
    CollectionRepository, CollectorRepository, MonitoringRepository, MunicipalityRepository,
    RewardRepository, RfidCardRepository, TransactionRepository, UserRepository,
};

// PostgreSQL 实现的具体服务类型
pub type PgLedgerService = LedgerService<TransactionRepository>;
pub type PgRedemptionService =
    RedemptionService<UserRepository, RewardRepository, TransactionRepository>;
pub type PgCollectionService = CollectionService<
    UserRepository,
    CollectorRepository,
    CollectionRepository,
    RfidCardRepository,
    MonitoringRepository,
>;
pub type PgCollectorService = CollectorService<CollectorRepository, MonitoringRepository>;
pub type PgIdentificationService = IdentificationService<
    UserRepository,
    CollectionRepository,
    TransactionRepository,
    RfidCardRepository,
>;
pub type PgDashboardService = DashboardService<
    MunicipalityRepository,
    UserRepository,
    CollectorRepository,
    CollectionRepository,
    TransactionRepository,
    MonitoringRepository,
>;
pub type PgMonitoringService = MonitoringService<
    UserRepository,
    CollectorRepository,
    CollectionRepository,
    TransactionRepository,
    MonitoringRepository,
>;
