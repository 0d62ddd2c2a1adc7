//! 监控实体：报表、指标、告警

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::enums::{AlertSeverity, AlertSource, AlertType, MetricSource, ReportStatus, ReportType};

/// 市政报表
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: i64,
    pub report_type: ReportType,
    pub municipality_id: i64,
    pub generated_by: i64,
    pub data: Value,
    pub status: ReportStatus,
    pub file_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReport {
    pub report_type: ReportType,
    pub municipality_id: i64,
    pub generated_by: i64,
    pub data: Value,
    pub status: ReportStatus,
    pub file_name: Option<String>,
}

/// 运行指标
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub id: i64,
    pub name: String,
    pub value: f64,
    pub unit: String,
    pub source: MetricSource,
    pub municipality_id: i64,
    pub metadata: Option<Value>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMetric {
    pub name: String,
    pub value: f64,
    pub unit: String,
    pub source: MetricSource,
    pub municipality_id: i64,
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Default)]
pub struct MetricFilter {
    pub municipality_id: Option<i64>,
    pub name: Option<String>,
}

/// 告警
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: i64,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub message: String,
    pub source: AlertSource,
    pub municipality_id: Option<i64>,
    pub collector_id: Option<i64>,
    pub is_resolved: bool,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct NewAlert {
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub message: String,
    pub source: AlertSource,
    pub municipality_id: Option<i64>,
    pub collector_id: Option<i64>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    pub municipality_id: Option<i64>,
    pub is_resolved: Option<bool>,
}
