//! Metalix 回收积分核心库
//!
//! 市民在回收点投放可回收物获得积分，并用积分兑换市政提供的奖励。
//!
//! ## 核心功能
//!
//! - **积分账本**：余额由积分流水推导，不单独存储
//! - **奖励兑换**：行锁加事务保证同一用户的并发兑换不会透支
//! - **回收投放**：按重量计分，投放后检查回收点满载告警
//! - **统计看板**：市政、系统和用户维度的聚合统计
//! - **身份识别**：RFID 卡发放、停用和查询
//! - **监控报表**：报表生成、运行指标和告警
//!
//! ## 模块结构
//!
//! - `models`: 领域模型定义
//! - `error`: 错误类型定义
//! - `repository`: 数据库仓储层
//! - `service`: 业务服务层

pub mod error;
pub mod models;
pub mod repository;
pub mod service;

pub use error::{RecyclingError, Result};
pub use models::*;
pub use repository::{
    CollectionRepository, CollectorRepository, MonitoringRepository, MunicipalityRepository,
    RewardRepository, RfidCardRepository, TransactionRepository, UserRepository,
};
pub use service::{
    CollectionService, CollectorService, DashboardService, IdentificationService, LedgerService,
    MonitoringService, PgCollectionService, PgCollectorService, PgDashboardService,
    PgIdentificationService, PgLedgerService, PgMonitoringService, PgRedemptionService,
    RedemptionService, dto,
};
