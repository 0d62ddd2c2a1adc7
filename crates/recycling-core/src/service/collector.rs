//! 回收点运维服务
//!
//! 维护清运、状态切换和传感器读数接入

use std::sync::Arc;

use chrono::{Duration, Utc};
use metalix_shared::cache::{Cache, CacheKey};
use metalix_shared::config::RewardsConfig;
use metalix_shared::observability::metrics;
use tracing::{info, instrument};

use crate::error::{RecyclingError, Result};
use crate::models::{
    AlertType, CollectorStatus, NewSensorReading, SensorReading, SensorStatus, SensorType,
    WasteCollector,
};
use crate::repository::{CollectorRepositoryTrait, MonitoringRepositoryTrait};

/// 高温阈值（摄氏度）
const MAX_TEMPERATURE_C: f64 = 60.0;
/// 低温阈值（摄氏度）
const MIN_TEMPERATURE_C: f64 = -20.0;

/// 根据读数推导传感器状态
///
/// WEIGHT 以 kg 计，OCCUPANCY 以 0-1 的装载率计，两者都相对容量判断
pub fn classify_reading(
    sensor_type: SensorType,
    value: f64,
    capacity: f64,
    threshold: f64,
) -> SensorStatus {
    if !value.is_finite() {
        return SensorStatus::Error;
    }
    match sensor_type {
        SensorType::Weight | SensorType::Occupancy => {
            if value < 0.0 {
                return SensorStatus::Error;
            }
            let ratio = match sensor_type {
                SensorType::Weight if capacity > 0.0 => value / capacity,
                SensorType::Weight => return SensorStatus::Error,
                _ => value,
            };
            if ratio >= threshold {
                SensorStatus::High
            } else {
                SensorStatus::Normal
            }
        }
        SensorType::Temperature => {
            if value > MAX_TEMPERATURE_C {
                SensorStatus::High
            } else if value < MIN_TEMPERATURE_C {
                SensorStatus::Low
            } else {
                SensorStatus::Normal
            }
        }
    }
}

/// 回收点运维服务
pub struct CollectorService<CR, MR>
where
    CR: CollectorRepositoryTrait,
    MR: MonitoringRepositoryTrait,
{
    collector_repo: Arc<CR>,
    monitoring_repo: Arc<MR>,
    cache: Arc<Cache>,
    rewards: RewardsConfig,
}

impl<CR, MR> CollectorService<CR, MR>
where
    CR: CollectorRepositoryTrait,
    MR: MonitoringRepositoryTrait,
{
    pub fn new(
        collector_repo: Arc<CR>,
        monitoring_repo: Arc<MR>,
        cache: Arc<Cache>,
        rewards: RewardsConfig,
    ) -> Self {
        Self {
            collector_repo,
            monitoring_repo,
            cache,
            rewards,
        }
    }

    /// 读取回收点并校验管理范围
    pub async fn get_scoped(&self, id: i64, scope: Option<i64>) -> Result<WasteCollector> {
        let collector = self
            .collector_repo
            .get(id)
            .await?
            .ok_or(RecyclingError::CollectorNotFound(id))?;
        if let Some(expected) = scope
            && expected != collector.municipality_id
        {
            return Err(RecyclingError::MunicipalityMismatch {
                expected,
                actual: collector.municipality_id,
            });
        }
        Ok(collector)
    }

    /// 记录一次清运维护
    ///
    /// 清空回收点，下次维护时间顺延配置的天数，并解决该点的满载告警
    #[instrument(skip(self))]
    pub async fn record_maintenance(&self, id: i64, scope: Option<i64>) -> Result<WasteCollector> {
        self.get_scoped(id, scope).await?;

        let next = Utc::now() + Duration::days(self.rewards.maintenance_interval_days);
        let collector = self
            .collector_repo
            .record_maintenance(id, next)
            .await?
            .ok_or(RecyclingError::CollectorNotFound(id))?;

        let resolved = self
            .monitoring_repo
            .resolve_collector_alerts(id, AlertType::CollectorFull)
            .await?;
        metrics::set_collector_fill(id, collector.fill_ratio());
        self.cache
            .invalidate(&CacheKey::municipality_keys(collector.municipality_id))
            .await;

        info!(collector_id = id, resolved_alerts = resolved, next_maintenance = %next, "回收点维护完成");
        Ok(collector)
    }

    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: i64,
        status: CollectorStatus,
        scope: Option<i64>,
    ) -> Result<WasteCollector> {
        self.get_scoped(id, scope).await?;
        let collector = self
            .collector_repo
            .update_status(id, status)
            .await?
            .ok_or(RecyclingError::CollectorNotFound(id))?;
        info!(collector_id = id, status = status.as_str(), "回收点状态已更新");
        Ok(collector)
    }

    /// 接入一条传感器读数，状态由读数推导
    #[instrument(skip(self, unit))]
    pub async fn ingest_reading(
        &self,
        collector_id: i64,
        sensor_type: SensorType,
        value: f64,
        unit: String,
        scope: Option<i64>,
    ) -> Result<SensorReading> {
        let collector = self.get_scoped(collector_id, scope).await?;
        let status = classify_reading(
            sensor_type,
            value,
            collector.capacity,
            self.rewards.alert_threshold,
        );

        self.collector_repo
            .insert_sensor_reading(&NewSensorReading {
                collector_id,
                sensor_type,
                value,
                unit,
                status,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::collector::fixtures::collector;
    use crate::repository::{MockCollectorRepositoryTrait, MockMonitoringRepositoryTrait};
    use metalix_shared::config::RedisConfig;

    fn service(
        collectors: MockCollectorRepositoryTrait,
        monitoring: MockMonitoringRepositoryTrait,
    ) -> CollectorService<MockCollectorRepositoryTrait, MockMonitoringRepositoryTrait> {
        let cache = Cache::new(&RedisConfig {
            url: "redis://127.0.0.1:1".to_string(),
            pool_size: 1,
        })
        .unwrap();
        CollectorService::new(
            Arc::new(collectors),
            Arc::new(monitoring),
            Arc::new(cache),
            RewardsConfig::default(),
        )
    }

    #[test]
    fn test_classify_weight_relative_to_capacity() {
        assert_eq!(classify_reading(SensorType::Weight, 50.0, 100.0, 0.9), SensorStatus::Normal);
        assert_eq!(classify_reading(SensorType::Weight, 90.0, 100.0, 0.9), SensorStatus::High);
        assert_eq!(classify_reading(SensorType::Weight, -1.0, 100.0, 0.9), SensorStatus::Error);
    }

    #[test]
    fn test_classify_occupancy() {
        assert_eq!(classify_reading(SensorType::Occupancy, 0.3, 100.0, 0.9), SensorStatus::Normal);
        assert_eq!(classify_reading(SensorType::Occupancy, 0.95, 100.0, 0.9), SensorStatus::High);
        assert_eq!(classify_reading(SensorType::Occupancy, f64::NAN, 100.0, 0.9), SensorStatus::Error);
    }

    #[test]
    fn test_classify_temperature() {
        assert_eq!(classify_reading(SensorType::Temperature, 25.0, 100.0, 0.9), SensorStatus::Normal);
        assert_eq!(classify_reading(SensorType::Temperature, 61.0, 100.0, 0.9), SensorStatus::High);
        assert_eq!(classify_reading(SensorType::Temperature, -25.0, 100.0, 0.9), SensorStatus::Low);
    }

    #[tokio::test]
    async fn test_maintenance_resets_and_resolves_alerts() {
        let mut collectors = MockCollectorRepositoryTrait::new();
        collectors
            .expect_get()
            .returning(|id| Ok(Some(collector(id, 1, 100.0, 95.0))));
        collectors
            .expect_record_maintenance()
            .times(1)
            .withf(|_, next| *next > Utc::now() + Duration::days(29))
            .returning(|id, next| {
                let mut c = collector(id, 1, 100.0, 0.0);
                c.next_maintenance = Some(next);
                c.last_maintenance = Some(Utc::now());
                Ok(Some(c))
            });
        let mut monitoring = MockMonitoringRepositoryTrait::new();
        monitoring
            .expect_resolve_collector_alerts()
            .withf(|id, t| *id == 4 && *t == AlertType::CollectorFull)
            .times(1)
            .returning(|_, _| Ok(1));

        let c = service(collectors, monitoring)
            .record_maintenance(4, Some(1))
            .await
            .unwrap();
        assert_eq!(c.current_weight, 0.0);
        assert!(c.next_maintenance.is_some());
    }

    #[tokio::test]
    async fn test_maintenance_out_of_scope() {
        let mut collectors = MockCollectorRepositoryTrait::new();
        collectors
            .expect_get()
            .returning(|id| Ok(Some(collector(id, 2, 100.0, 0.0))));
        collectors.expect_record_maintenance().never();

        let err = service(collectors, MockMonitoringRepositoryTrait::new())
            .record_maintenance(4, Some(1))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "MUNICIPALITY_MISMATCH");
    }

    #[tokio::test]
    async fn test_ingest_reading_derives_status() {
        let mut collectors = MockCollectorRepositoryTrait::new();
        collectors
            .expect_get()
            .returning(|id| Ok(Some(collector(id, 1, 200.0, 0.0))));
        collectors.expect_insert_sensor_reading().returning(|r| {
            Ok(SensorReading {
                id: 1,
                collector_id: r.collector_id,
                sensor_type: r.sensor_type,
                value: r.value,
                unit: r.unit.clone(),
                status: r.status,
                recorded_at: Utc::now(),
            })
        });

        let reading = service(collectors, MockMonitoringRepositoryTrait::new())
            .ingest_reading(3, SensorType::Weight, 190.0, "kg".to_string(), None)
            .await
            .unwrap();
        assert_eq!(reading.status, SensorStatus::High);
    }

    #[tokio::test]
    async fn test_missing_collector() {
        let mut collectors = MockCollectorRepositoryTrait::new();
        collectors.expect_get().returning(|_| Ok(None));
        let err = service(collectors, MockMonitoringRepositoryTrait::new())
            .update_status(9, CollectorStatus::Inactive, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RecyclingError::CollectorNotFound(9)));
    }
}
