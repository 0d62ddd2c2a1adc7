//! 服务层数据传输对象
//!
//! 服务的输入参数与聚合输出，JSON 字段统一为 camelCase

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    Alert, RecyclableType, RewardTransaction, RfidCard, User, UserRole, VerificationMethod,
    WasteCollection,
};

// ==================== 投放 ====================

/// 投放请求，投放人由 user_id 或有效 RFID 卡号确定
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest {
    pub user_id: Option<i64>,
    pub rfid_card: Option<String>,
    pub collector_id: i64,
    pub weight: f64,
    pub recyclable_type: RecyclableType,
    pub verification_method: Option<VerificationMethod>,
}

/// 投放回执
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositReceipt {
    pub collection: WasteCollection,
    pub transaction: RewardTransaction,
    pub points_earned: i64,
    /// 投放后回收点装载率
    pub collector_fill_ratio: f64,
    /// 本次投放触发的满载告警
    pub alert: Option<Alert>,
}

// ==================== 兑换 ====================

/// 兑换回执
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionReceipt {
    pub transaction: RewardTransaction,
    pub reward_name: String,
    pub points_spent: i64,
    pub available_points: i64,
}

// ==================== 统计 ====================

/// 投放汇总
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSummary {
    pub total_collections: i64,
    pub total_weight: f64,
    pub total_points: i64,
    /// 参与投放的不同用户数
    pub participants: i64,
    pub average_weight: f64,
}

/// 环境效益
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentalImpact {
    /// 减排 CO2（kg）
    pub co2_saved: f64,
    /// 节约能源（kWh）
    pub energy_saved: f64,
    pub trees_equivalent: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MunicipalityStats {
    pub municipality_id: i64,
    pub total_users: i64,
    pub active_users: i64,
    pub total_collections: i64,
    pub total_weight: f64,
    pub total_points: i64,
    /// 参与率（百分比，保留一位小数）
    pub average_participation: f64,
    pub last_updated: DateTime<Utc>,
}

/// 按回收物类型的重量占比
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialShare {
    #[serde(rename = "type")]
    pub recyclable_type: RecyclableType,
    pub weight: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopCollector {
    pub collector_id: i64,
    pub name: String,
    pub total_weight: f64,
    pub collections: i64,
}

/// 按星期聚合的投放趋势
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub day: String,
    pub collections: i64,
    pub weight: f64,
}

/// 看板过滤条件，全部为空时结果会被缓存
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardFilter {
    pub recyclable_type: Option<RecyclableType>,
    pub collector_id: Option<i64>,
    pub zone_id: Option<i64>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DashboardFilter {
    pub fn is_empty(&self) -> bool {
        self.recyclable_type.is_none()
            && self.collector_id.is_none()
            && self.zone_id.is_none()
            && self.from.is_none()
            && self.to.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub municipality_id: i64,
    pub total_collections: i64,
    pub total_weight: f64,
    pub active_users: i64,
    pub total_points: i64,
    pub environmental_impact: EnvironmentalImpact,
    pub recent_alerts: Vec<Alert>,
    pub top_collectors: Vec<TopCollector>,
    pub material_distribution: Vec<MaterialShare>,
    pub collection_trends: Vec<TrendPoint>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MunicipalityOverview {
    pub municipality_id: i64,
    pub name: String,
    pub is_active: bool,
    pub citizens: i64,
    pub collections: i64,
    pub total_weight: f64,
    pub total_points: i64,
}

/// 系统总览（系统管理员）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemOverview {
    pub municipalities: i64,
    pub total_citizens: i64,
    pub total_collections: i64,
    pub total_weight: f64,
    pub total_points_distributed: i64,
    pub active_alerts: i64,
    pub per_municipality: Vec<MunicipalityOverview>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub user_id: i64,
    pub total_collections: i64,
    pub total_weight: f64,
    pub total_points: i64,
    pub average_weight: f64,
    pub collections_this_month: i64,
    pub points_this_month: i64,
    /// 在同市政市民中按累计积分的排名（从 1 开始）
    pub rank: i64,
    pub last_updated: DateTime<Utc>,
}

// ==================== 身份识别 ====================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub municipality_id: Option<i64>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub zip_code: Option<String>,
    pub is_active: bool,
    pub rfid_card: Option<RfidCard>,
    pub total_collections: i64,
    pub total_weight: f64,
    /// 可用积分
    pub total_points: i64,
    pub join_date: DateTime<Utc>,
    pub last_activity: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn new(user: User, rfid_card: Option<RfidCard>) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            municipality_id: user.municipality_id,
            phone: user.phone,
            address: user.address,
            city: user.city,
            zip_code: user.zip_code,
            is_active: user.is_active,
            rfid_card,
            total_collections: 0,
            total_weight: 0.0,
            total_points: 0,
            join_date: user.created_at,
            last_activity: user.last_login_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityKind {
    Collection,
    Transaction,
}

/// 用户动态条目
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityItem {
    pub kind: ActivityKind,
    pub id: i64,
    pub description: String,
    pub points: i64,
    pub weight: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_share_serializes_type_key() {
        let share = MaterialShare {
            recyclable_type: RecyclableType::Glass,
            weight: 12.5,
            percentage: 50.0,
        };
        let json = serde_json::to_value(&share).unwrap();
        assert_eq!(json["type"], "GLASS");
        assert_eq!(json["percentage"], 50.0);
    }

    #[test]
    fn test_dashboard_filter_emptiness() {
        assert!(DashboardFilter::default().is_empty());
        let filter = DashboardFilter {
            collector_id: Some(3),
            ..Default::default()
        };
        assert!(!filter.is_empty());
    }
}
