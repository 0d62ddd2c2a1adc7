//! 请求 DTO 定义
//!
//! 所有 REST API 的请求体和查询参数结构

use chrono::{DateTime, Utc};
use metalix_core::{
    AlertSeverity, AlertSource, AlertType, Boundaries, CollectorStatus, ContactInfo, Location,
    MetricSource, RecyclableType, ReportType, RewardCategory, SensorType, TransactionStatus,
    TransactionType, UserChanges, UserRole, VerificationMethod, ZoneType,
};
use serde::Deserialize;
use validator::Validate;

// ==================== 认证 ====================

/// 登录请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "邮箱格式不正确"))]
    pub email: String,
    #[validate(length(min = 1, message = "密码不能为空"))]
    pub password: String,
}

/// 市民注册请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "邮箱格式不正确"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "密码长度必须在8-128个字符之间"))]
    pub password: String,
    #[validate(length(min = 1, max = 100, message = "名字长度必须在1-100个字符之间"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "姓氏长度必须在1-100个字符之间"))]
    pub last_name: String,
    pub municipality_id: i64,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub zip_code: Option<String>,
}

// ==================== 用户 ====================

/// 管理员创建用户请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(email(message = "邮箱格式不正确"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "密码长度必须在8-128个字符之间"))]
    pub password: String,
    #[validate(length(min = 1, max = 100, message = "名字长度必须在1-100个字符之间"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "姓氏长度必须在1-100个字符之间"))]
    pub last_name: String,
    #[serde(default = "default_role")]
    pub role: UserRole,
    pub municipality_id: Option<i64>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub zip_code: Option<String>,
}

fn default_role() -> UserRole {
    UserRole::Citizen
}

/// 更新用户请求
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100, message = "名字长度必须在1-100个字符之间"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100, message = "姓氏长度必须在1-100个字符之间"))]
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub zip_code: Option<String>,
    /// 仅管理员可修改
    pub is_active: Option<bool>,
}

impl From<UpdateUserRequest> for UserChanges {
    fn from(req: UpdateUserRequest) -> Self {
        Self {
            first_name: req.first_name,
            last_name: req.last_name,
            phone: req.phone,
            address: req.address,
            city: req.city,
            zip_code: req.zip_code,
            is_active: req.is_active,
        }
    }
}

/// 用户列表过滤
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub municipality_id: Option<i64>,
    pub role: Option<UserRole>,
    pub q: Option<String>,
    pub is_active: Option<bool>,
}

/// 活动流参数
#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<usize>,
}

// ==================== 市政与区域 ====================

/// 创建市政请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMunicipalityRequest {
    #[validate(length(min = 1, max = 200, message = "市政名称长度必须在1-200个字符之间"))]
    pub name: String,
    #[validate(length(min = 2, max = 20, message = "市政编码长度必须在2-20个字符之间"))]
    pub code: String,
    #[validate(length(min = 1, max = 100, message = "地区不能为空"))]
    pub region: String,
    #[validate(range(min = 0, message = "人口不能为负数"))]
    pub population: i64,
    #[validate(range(min = 0.0, message = "面积不能为负数"))]
    pub area: f64,
    pub contact_info: ContactInfo,
}

/// 创建区域请求，市政管理员省略 municipalityId 时默认本市政
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateZoneRequest {
    pub municipality_id: Option<i64>,
    #[validate(length(min = 1, max = 200, message = "区域名称长度必须在1-200个字符之间"))]
    pub name: String,
    pub boundaries: Boundaries,
    #[validate(range(min = 0, message = "人口不能为负数"))]
    pub population: i64,
    pub zone_type: ZoneType,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MunicipalityFilterQuery {
    pub municipality_id: Option<i64>,
}

// ==================== 回收点 ====================

/// 创建回收点请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCollectorRequest {
    pub municipality_id: Option<i64>,
    pub zone_id: Option<i64>,
    #[validate(length(min = 1, max = 200, message = "回收点名称长度必须在1-200个字符之间"))]
    pub name: String,
    pub location: Location,
    #[validate(range(exclusive_min = 0.0, message = "容量必须大于0"))]
    pub capacity: f64,
}

/// 回收点列表过滤
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectorQuery {
    pub municipality_id: Option<i64>,
    pub zone_id: Option<i64>,
    pub status: Option<CollectorStatus>,
}

/// 修改回收点状态
#[derive(Debug, Deserialize)]
pub struct UpdateCollectorStatusRequest {
    pub status: CollectorStatus,
}

/// 传感器读数上报
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SensorReadingRequest {
    pub collector_id: i64,
    pub sensor_type: SensorType,
    pub value: f64,
    #[validate(length(min = 1, max = 20, message = "单位不能为空"))]
    pub unit: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorQuery {
    pub collector_id: Option<i64>,
    pub limit: Option<i64>,
}

// ==================== 投放 ====================

/// 投放列表过滤
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionQuery {
    pub user_id: Option<i64>,
    pub collector_id: Option<i64>,
    pub municipality_id: Option<i64>,
    pub recyclable_type: Option<RecyclableType>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCollectionRequest {
    pub method: VerificationMethod,
}

// ==================== 奖励与流水 ====================

/// 创建奖励请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRewardRequest {
    pub municipality_id: Option<i64>,
    #[validate(length(min = 1, max = 200, message = "奖励名称长度必须在1-200个字符之间"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 1, message = "所需积分必须大于0"))]
    pub points_cost: i64,
    pub category: RewardCategory,
    #[validate(range(min = 0, message = "库存不能为负数"))]
    pub stock: i32,
    pub valid_until: Option<DateTime<Utc>>,
}

/// 奖励列表过滤
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardQuery {
    pub municipality_id: Option<i64>,
    pub category: Option<RewardCategory>,
    #[serde(default)]
    pub available_only: bool,
}

/// 积分流水过滤
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionQuery {
    pub user_id: Option<i64>,
    pub municipality_id: Option<i64>,
    pub transaction_type: Option<TransactionType>,
    pub status: Option<TransactionStatus>,
}

// ==================== RFID ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCardRequest {
    pub user_id: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RfidCardQuery {
    pub user_id: Option<i64>,
    pub municipality_id: Option<i64>,
    pub is_active: Option<bool>,
}

// ==================== 监控 ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    pub report_type: ReportType,
    pub municipality_id: Option<i64>,
}

/// 指标上报
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMetricRequest {
    #[validate(length(min = 1, max = 100, message = "指标名称长度必须在1-100个字符之间"))]
    pub name: String,
    pub value: f64,
    #[serde(default)]
    pub unit: String,
    pub source: MetricSource,
    pub municipality_id: Option<i64>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricQuery {
    pub municipality_id: Option<i64>,
    pub name: Option<String>,
    pub limit: Option<i64>,
}

/// 创建告警
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlertRequest {
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    #[validate(length(min = 1, max = 500, message = "告警内容长度必须在1-500个字符之间"))]
    pub message: String,
    pub source: AlertSource,
    pub municipality_id: Option<i64>,
    pub collector_id: Option<i64>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertQuery {
    pub municipality_id: Option<i64>,
    pub is_resolved: Option<bool>,
}

// ==================== 分页 ====================

/// 分页参数
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    20
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl PaginationParams {
    pub fn page(&self) -> i64 {
        self.page.max(1)
    }

    /// 数据库查询的 offset
    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }

    /// 每页条数，限制在 1..=100
    pub fn limit(&self) -> i64 {
        self.page_size.clamp(1, 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_params_default() {
        let params = PaginationParams::default();
        assert_eq!(params.page, 1);
        assert_eq!(params.page_size, 20);
    }

    #[test]
    fn test_pagination_offset() {
        let params = PaginationParams {
            page: 3,
            page_size: 10,
        };
        assert_eq!(params.offset(), 20);
        assert_eq!(params.limit(), 10);
    }

    #[test]
    fn test_pagination_clamping() {
        let params = PaginationParams {
            page: 0,
            page_size: 10,
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.offset(), 0);

        let params = PaginationParams {
            page: 2,
            page_size: 500,
        };
        assert_eq!(params.limit(), 100);
        assert_eq!(params.offset(), 100);

        let params = PaginationParams {
            page: 1,
            page_size: 0,
        };
        assert_eq!(params.limit(), 1);
    }

    #[test]
    fn test_register_request_validation() {
        let request = RegisterRequest {
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Costa".to_string(),
            municipality_id: 1,
            phone: None,
            address: None,
            city: None,
            zip_code: None,
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
        assert!(!fields.contains_key("first_name"));
    }

    #[test]
    fn test_create_reward_request_validation() {
        let request: CreateRewardRequest = serde_json::from_value(serde_json::json!({
            "name": "Bilhete de cinema",
            "pointsCost": 0,
            "category": "ENTERTAINMENT",
            "stock": -1
        }))
        .unwrap();
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("points_cost"));
        assert!(errors.field_errors().contains_key("stock"));
    }

    #[test]
    fn test_create_user_defaults_to_citizen() {
        let request: CreateUserRequest = serde_json::from_value(serde_json::json!({
            "email": "joao@metalix.test",
            "password": "password123",
            "firstName": "João",
            "lastName": "Pereira"
        }))
        .unwrap();
        assert_eq!(request.role, UserRole::Citizen);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_collector_capacity_must_be_positive() {
        let request: CreateCollectorRequest = serde_json::from_value(serde_json::json!({
            "name": "Ecoponto Baixa",
            "location": {"latitude": 38.71, "longitude": -9.13, "address": "Rua do Ouro"},
            "capacity": 0.0
        }))
        .unwrap();
        assert!(request.validate().is_err());
    }
}
