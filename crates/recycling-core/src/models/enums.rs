//! 领域枚举类型定义
//!
//! 所有枚举都支持数据库（sqlx，varchar 存储）和 JSON（serde）序列化，
//! 取值统一为大写下划线形式。

use serde::{Deserialize, Serialize};

/// 用户角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// 市民，投放回收物、赚取并兑换积分
    Citizen,
    /// 市政管理员，只能管理本市政的数据
    MunicipalityAdmin,
    /// 系统管理员，跨市政可见
    SystemAdmin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Citizen => "CITIZEN",
            Self::MunicipalityAdmin => "MUNICIPALITY_ADMIN",
            Self::SystemAdmin => "SYSTEM_ADMIN",
        }
    }

    /// 该角色是否必须归属某个市政
    pub fn requires_municipality(&self) -> bool {
        !matches!(self, Self::SystemAdmin)
    }
}

/// 回收点状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollectorStatus {
    #[default]
    Active,
    Inactive,
    /// 维护中，暂停接收投放
    Maintenance,
}

impl CollectorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
            Self::Maintenance => "MAINTENANCE",
        }
    }
}

/// 回收物类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecyclableType {
    Plastic,
    Glass,
    Metal,
    Paper,
    Cardboard,
    Organic,
    Electronic,
    Hazardous,
    General,
}

impl RecyclableType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plastic => "PLASTIC",
            Self::Glass => "GLASS",
            Self::Metal => "METAL",
            Self::Paper => "PAPER",
            Self::Cardboard => "CARDBOARD",
            Self::Organic => "ORGANIC",
            Self::Electronic => "ELECTRONIC",
            Self::Hazardous => "HAZARDOUS",
            Self::General => "GENERAL",
        }
    }
}

/// 投放核验方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationMethod {
    Rfid,
    Manual,
    QrCode,
    Sensor,
    Visual,
}

/// 奖励分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RewardCategory {
    Shopping,
    Entertainment,
    Dining,
    Services,
    Discounts,
}

/// 积分流水类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// 投放获得，积分为正
    Earned,
    /// 兑换消耗，积分为负
    Redeemed,
    Expired,
    /// 取消兑换后的退还记录
    Refunded,
}

/// 积分流水状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    #[default]
    Completed,
    Cancelled,
}

/// 区域类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ZoneType {
    Residential,
    Commercial,
    Industrial,
    Mixed,
}

/// 传感器类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SensorType {
    /// 重量（kg）
    Weight,
    /// 装载率（0-1）
    Occupancy,
    /// 温度（摄氏度）
    Temperature,
}

/// 传感器读数状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SensorStatus {
    Normal,
    High,
    Low,
    Error,
}

/// 报表类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportType {
    CollectionEfficiency,
    EnvironmentalImpact,
    UserParticipation,
    FinancialSummary,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CollectionEfficiency => "COLLECTION_EFFICIENCY",
            Self::EnvironmentalImpact => "ENVIRONMENTAL_IMPACT",
            Self::UserParticipation => "USER_PARTICIPATION",
            Self::FinancialSummary => "FINANCIAL_SUMMARY",
        }
    }
}

/// 报表状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Pending,
    Completed,
    Failed,
}

/// 指标来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricSource {
    WasteCollector,
    System,
    User,
    Sensor,
}

/// 告警类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    CollectorFull,
    MaintenanceDue,
    LowParticipation,
    SystemError,
    SecurityBreach,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CollectorFull => "COLLECTOR_FULL",
            Self::MaintenanceDue => "MAINTENANCE_DUE",
            Self::LowParticipation => "LOW_PARTICIPATION",
            Self::SystemError => "SYSTEM_ERROR",
            Self::SecurityBreach => "SECURITY_BREACH",
        }
    }
}

/// 告警级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

/// 告警来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSource {
    WasteCollector,
    System,
    Analytics,
    Security,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_serde_uses_screaming_snake_case() {
        assert_eq!(
            serde_json::to_string(&UserRole::MunicipalityAdmin).unwrap(),
            "\"MUNICIPALITY_ADMIN\""
        );
        assert_eq!(
            serde_json::to_string(&VerificationMethod::QrCode).unwrap(),
            "\"QR_CODE\""
        );
        let parsed: ReportType = serde_json::from_str("\"FINANCIAL_SUMMARY\"").unwrap();
        assert_eq!(parsed, ReportType::FinancialSummary);
    }

    #[test]
    fn test_as_str_matches_serde() {
        for t in [
            RecyclableType::Plastic,
            RecyclableType::Cardboard,
            RecyclableType::Electronic,
        ] {
            assert_eq!(serde_json::to_string(&t).unwrap(), format!("\"{}\"", t.as_str()));
        }
        assert_eq!(
            serde_json::to_string(&AlertType::CollectorFull).unwrap(),
            format!("\"{}\"", AlertType::CollectorFull.as_str())
        );
    }

    #[test]
    fn test_role_municipality_requirement() {
        assert!(UserRole::Citizen.requires_municipality());
        assert!(UserRole::MunicipalityAdmin.requires_municipality());
        assert!(!UserRole::SystemAdmin.requires_municipality());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(AlertSeverity::Critical > AlertSeverity::High);
        assert!(AlertSeverity::Low < AlertSeverity::Medium);
    }
}
