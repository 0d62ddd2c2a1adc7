//! 回收积分领域模型
//!
//! 包含平台的所有核心实体定义

pub mod collection;
pub mod collector;
pub mod enums;
pub mod monitoring;
pub mod municipality;
pub mod reward;
pub mod rfid;
pub mod user;

// 重新导出常用类型
pub use collection::{CollectionFilter, DepositOutcome, NewDeposit, WasteCollection};
pub use collector::{
    CollectorChanges, CollectorFilter, Location, NewCollector, NewSensorReading, SensorReading,
    WasteCollector,
};
pub use enums::{
    AlertSeverity, AlertSource, AlertType, CollectorStatus, MetricSource, RecyclableType,
    ReportStatus, ReportType, RewardCategory, SensorStatus, SensorType, TransactionStatus,
    TransactionType, UserRole, VerificationMethod, ZoneType,
};
pub use monitoring::{
    Alert, AlertFilter, Metric, MetricFilter, NewAlert, NewMetric, NewReport, Report,
};
pub use municipality::{
    Boundaries, ContactInfo, Municipality, MunicipalityChanges, NewMunicipality, NewZone, Zone,
    ZoneChanges,
};
pub use reward::{
    CancellationOutcome, NewReward, RedemptionOutcome, Reward, RewardChanges, RewardFilter,
    RewardTransaction, TransactionFilter, UserPoints,
};
pub use rfid::{RfidCard, RfidCardFilter};
pub use user::{NewUser, User, UserChanges, UserFilter};
