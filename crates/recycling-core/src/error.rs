//! 回收积分领域错误类型
//!
//! 定义服务层的业务错误和系统错误

use metalix_shared::error::SharedError;
use thiserror::Error;

/// 回收积分领域错误
#[derive(Debug, Error)]
pub enum RecyclingError {
    // === 资源不存在 ===
    #[error("用户不存在: {0}")]
    UserNotFound(i64),

    #[error("市政不存在: {0}")]
    MunicipalityNotFound(i64),

    #[error("区域不存在: {0}")]
    ZoneNotFound(i64),

    #[error("回收点不存在: {0}")]
    CollectorNotFound(i64),

    #[error("投放记录不存在: {0}")]
    CollectionNotFound(i64),

    #[error("奖励不存在: {0}")]
    RewardNotFound(i64),

    #[error("积分流水不存在: {0}")]
    TransactionNotFound(i64),

    #[error("RFID 卡不存在: {0}")]
    RfidCardNotFound(String),

    #[error("报表不存在: {0}")]
    ReportNotFound(i64),

    #[error("告警不存在: {0}")]
    AlertNotFound(i64),

    // === 用户相关 ===
    #[error("用户已停用: {0}")]
    UserInactive(i64),

    #[error("仅市民账户可执行该操作: user_id={0}")]
    NotACitizen(i64),

    #[error("RFID 卡已停用: {0}")]
    RfidCardInactive(String),

    #[error("超出管理范围: 资源属于市政 {actual}, 当前市政 {expected}")]
    MunicipalityMismatch { expected: i64, actual: i64 },

    // === 积分与兑换 ===
    #[error("可用积分不足: 需要 {required}, 可用 {available}")]
    InsufficientPoints { required: i64, available: i64 },

    #[error("奖励库存不足: reward_id={0}")]
    RewardOutOfStock(i64),

    #[error("奖励已下架: reward_id={0}")]
    RewardInactive(i64),

    #[error("奖励已过期: reward_id={0}")]
    RewardExpired(i64),

    #[error("奖励不属于用户所在市政: reward_id={reward_id}, municipality_id={municipality_id}")]
    RewardNotInMunicipality { reward_id: i64, municipality_id: i64 },

    #[error("积分流水状态不允许此操作: transaction_id={transaction_id}, {reason}")]
    InvalidTransactionState { transaction_id: i64, reason: String },

    // === 回收投放 ===
    #[error("回收点不可用: collector_id={collector_id}, status={status}")]
    CollectorUnavailable { collector_id: i64, status: String },

    #[error("回收点容量不足: collector_id={collector_id}, 剩余 {remaining:.2} kg")]
    CollectorFull { collector_id: i64, remaining: f64 },

    #[error("投放重量无效: {0}")]
    InvalidWeight(f64),

    // === 通用 ===
    #[error("参数校验失败: {0}")]
    Validation(String),

    #[error("数据冲突: {0}")]
    Conflict(String),

    // === 系统错误 ===
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Redis 错误: {0}")]
    Redis(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 领域 Result 类型别名
pub type Result<T> = std::result::Result<T, RecyclingError>;

impl RecyclingError {
    /// 唯一约束冲突转为 Conflict，其余数据库错误原样保留
    pub fn from_unique_violation(err: sqlx::Error, message: impl Into<String>) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                Self::Conflict(message.into())
            }
            _ => Self::Database(err),
        }
    }

    /// 检查是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        !matches!(
            self,
            Self::Database(_) | Self::Serialization(_) | Self::Redis(_) | Self::Internal(_)
        )
    }

    /// 是否为资源不存在类错误
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound(_)
                | Self::MunicipalityNotFound(_)
                | Self::ZoneNotFound(_)
                | Self::CollectorNotFound(_)
                | Self::CollectionNotFound(_)
                | Self::RewardNotFound(_)
                | Self::TransactionNotFound(_)
                | Self::RfidCardNotFound(_)
                | Self::ReportNotFound(_)
                | Self::AlertNotFound(_)
        )
    }

    /// 获取错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::MunicipalityNotFound(_) => "MUNICIPALITY_NOT_FOUND",
            Self::ZoneNotFound(_) => "ZONE_NOT_FOUND",
            Self::CollectorNotFound(_) => "COLLECTOR_NOT_FOUND",
            Self::CollectionNotFound(_) => "COLLECTION_NOT_FOUND",
            Self::RewardNotFound(_) => "REWARD_NOT_FOUND",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::RfidCardNotFound(_) => "RFID_CARD_NOT_FOUND",
            Self::ReportNotFound(_) => "REPORT_NOT_FOUND",
            Self::AlertNotFound(_) => "ALERT_NOT_FOUND",
            Self::UserInactive(_) => "USER_INACTIVE",
            Self::NotACitizen(_) => "NOT_A_CITIZEN",
            Self::RfidCardInactive(_) => "RFID_CARD_INACTIVE",
            Self::MunicipalityMismatch { .. } => "MUNICIPALITY_MISMATCH",
            Self::InsufficientPoints { .. } => "INSUFFICIENT_POINTS",
            Self::RewardOutOfStock(_) => "REWARD_OUT_OF_STOCK",
            Self::RewardInactive(_) => "REWARD_INACTIVE",
            Self::RewardExpired(_) => "REWARD_EXPIRED",
            Self::RewardNotInMunicipality { .. } => "REWARD_NOT_IN_MUNICIPALITY",
            Self::InvalidTransactionState { .. } => "INVALID_TRANSACTION_STATE",
            Self::CollectorUnavailable { .. } => "COLLECTOR_UNAVAILABLE",
            Self::CollectorFull { .. } => "COLLECTOR_FULL",
            Self::InvalidWeight(_) => "INVALID_WEIGHT",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Redis(_) => "REDIS_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<SharedError> for RecyclingError {
    fn from(err: SharedError) -> Self {
        match err {
            SharedError::Database(e) => Self::Database(e),
            SharedError::Serialization(e) => Self::Serialization(e),
            SharedError::Redis(e) => Self::Redis(e.to_string()),
            other => Self::Internal(format!("[{}] {other}", other.code())),
        }
    }
}
