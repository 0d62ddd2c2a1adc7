//! 回收点与传感器读数实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use super::enums::{CollectorStatus, SensorStatus, SensorType};

/// 回收点地理位置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
}

/// 容量比较的浮点容差（kg）
const CAPACITY_EPSILON: f64 = 1e-9;

/// 回收点（垃圾桶或回收站）
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WasteCollector {
    pub id: i64,
    pub municipality_id: i64,
    pub zone_id: Option<i64>,
    pub name: String,
    pub location: Json<Location>,
    pub status: CollectorStatus,
    /// 容量（kg）
    pub capacity: f64,
    /// 当前重量（kg）
    pub current_weight: f64,
    pub last_maintenance: Option<DateTime<Utc>>,
    pub next_maintenance: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WasteCollector {
    /// 装载率，范围通常在 0-1 之间
    pub fn fill_ratio(&self) -> f64 {
        if self.capacity <= 0.0 {
            return 0.0;
        }
        self.current_weight / self.capacity
    }

    pub fn remaining_capacity(&self) -> f64 {
        (self.capacity - self.current_weight).max(0.0)
    }

    /// 投放后不超过容量（`current_weight + weight <= capacity`）
    pub fn can_accept(&self, weight: f64) -> bool {
        self.current_weight + weight <= self.capacity + CAPACITY_EPSILON
    }

    pub fn accepts_deposits(&self) -> bool {
        self.status == CollectorStatus::Active
    }

    pub fn is_maintenance_due(&self, now: DateTime<Utc>) -> bool {
        self.next_maintenance.is_some_and(|next| next <= now)
    }
}

#[derive(Debug, Clone)]
pub struct NewCollector {
    pub municipality_id: i64,
    pub zone_id: Option<i64>,
    pub name: String,
    pub location: Location,
    pub capacity: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectorChanges {
    pub name: Option<String>,
    pub zone_id: Option<i64>,
    pub location: Option<Location>,
    pub capacity: Option<f64>,
}

/// 回收点列表过滤条件
#[derive(Debug, Clone, Default)]
pub struct CollectorFilter {
    pub municipality_id: Option<i64>,
    pub zone_id: Option<i64>,
    pub status: Option<CollectorStatus>,
}

/// 传感器读数
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    pub id: i64,
    pub collector_id: i64,
    pub sensor_type: SensorType,
    pub value: f64,
    pub unit: String,
    pub status: SensorStatus,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSensorReading {
    pub collector_id: i64,
    pub sensor_type: SensorType,
    pub value: f64,
    pub unit: String,
    pub status: SensorStatus,
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_fill_ratio_and_remaining() {
        let c = fixtures::collector(1, 1, 100.0, 45.0);
        assert!((c.fill_ratio() - 0.45).abs() < f64::EPSILON);
        assert!((c.remaining_capacity() - 55.0).abs() < f64::EPSILON);

        let over = fixtures::collector(2, 1, 100.0, 120.0);
        assert_eq!(over.remaining_capacity(), 0.0);
    }

    #[test]
    fn test_can_accept_exact_fill() {
        // 100.0 - 99.7 在浮点下略小于 0.3
        let c = fixtures::collector(1, 1, 100.0, 99.7);
        assert!(c.can_accept(0.3));
        assert!(!c.can_accept(0.31));

        let empty = fixtures::collector(2, 1, 50.0, 0.0);
        assert!(empty.can_accept(50.0));
        assert!(!empty.can_accept(50.001));
    }

    #[test]
    fn test_accepts_deposits_only_when_active() {
        let mut c = fixtures::collector(1, 1, 100.0, 0.0);
        assert!(c.accepts_deposits());
        c.status = CollectorStatus::Maintenance;
        assert!(!c.accepts_deposits());
    }

    #[test]
    fn test_maintenance_due() {
        let now = Utc::now();
        let mut c = fixtures::collector(1, 1, 100.0, 0.0);
        assert!(!c.is_maintenance_due(now));
        c.next_maintenance = Some(now - Duration::days(1));
        assert!(c.is_maintenance_due(now));
    }
}
