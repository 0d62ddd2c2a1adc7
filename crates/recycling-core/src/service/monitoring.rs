//! 监控与报表服务
//!
//! 报表在请求时同步生成，构建失败时以 FAILED 状态落库

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use metalix_shared::config::RewardsConfig;
use metalix_shared::observability::metrics;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use crate::error::{RecyclingError, Result};
use crate::models::{
    Alert, AlertFilter, CollectionFilter, CollectorFilter, Metric, MetricFilter, NewAlert,
    NewMetric, NewReport, Report, ReportStatus, ReportType, TransactionFilter, TransactionStatus,
    TransactionType, WasteCollection,
};
use crate::repository::{
    CollectionRepositoryTrait, CollectorRepositoryTrait, MonitoringRepositoryTrait,
    TransactionRepositoryTrait, UserRepositoryTrait,
};
use crate::service::stats;

pub const DEFAULT_METRICS_LIMIT: i64 = 50;
pub const MAX_METRICS_LIMIT: i64 = 500;

/// 报表文件名：`{类型小写}_{YYYYMMDD}.json`
pub fn report_file_name(report_type: ReportType, at: DateTime<Utc>) -> String {
    format!(
        "{}_{}.json",
        report_type.as_str().to_lowercase(),
        at.format("%Y%m%d")
    )
}

/// 投放记录覆盖的日期区间
fn collection_period(collections: &[WasteCollection]) -> String {
    let first = collections.iter().map(|c| c.created_at).min();
    let last = collections.iter().map(|c| c.created_at).max();
    match (first, last) {
        (Some(first), Some(last)) => format!(
            "{} to {}",
            first.format("%Y-%m-%d"),
            last.format("%Y-%m-%d")
        ),
        _ => "-".to_string(),
    }
}

fn check_scope(scope: Option<i64>, actual: Option<i64>) -> Result<()> {
    match (scope, actual) {
        (Some(expected), Some(actual)) if expected != actual => {
            Err(RecyclingError::MunicipalityMismatch { expected, actual })
        }
        // 市政管理员看不到不属于任何市政的系统告警
        (Some(expected), None) => Err(RecyclingError::MunicipalityMismatch {
            expected,
            actual: 0,
        }),
        _ => Ok(()),
    }
}

/// 监控与报表服务
pub struct MonitoringService<UR, CR, CoR, TR, MR>
where
    UR: UserRepositoryTrait,
    CR: CollectorRepositoryTrait,
    CoR: CollectionRepositoryTrait,
    TR: TransactionRepositoryTrait,
    MR: MonitoringRepositoryTrait,
{
    user_repo: Arc<UR>,
    collector_repo: Arc<CR>,
    collection_repo: Arc<CoR>,
    transaction_repo: Arc<TR>,
    monitoring_repo: Arc<MR>,
    rewards: RewardsConfig,
}

impl<UR, CR, CoR, TR, MR> MonitoringService<UR, CR, CoR, TR, MR>
where
    UR: UserRepositoryTrait,
    CR: CollectorRepositoryTrait,
    CoR: CollectionRepositoryTrait,
    TR: TransactionRepositoryTrait,
    MR: MonitoringRepositoryTrait,
{
    pub fn new(
        user_repo: Arc<UR>,
        collector_repo: Arc<CR>,
        collection_repo: Arc<CoR>,
        transaction_repo: Arc<TR>,
        monitoring_repo: Arc<MR>,
        rewards: RewardsConfig,
    ) -> Self {
        Self {
            user_repo,
            collector_repo,
            collection_repo,
            transaction_repo,
            monitoring_repo,
            rewards,
        }
    }

    // ==================== 报表 ====================

    /// 生成报表并落库
    #[instrument(skip(self))]
    pub async fn generate_report(
        &self,
        report_type: ReportType,
        municipality_id: i64,
        generated_by: i64,
    ) -> Result<Report> {
        let now = Utc::now();
        let (data, status) = match self.build_report_data(report_type, municipality_id).await {
            Ok(data) => (data, ReportStatus::Completed),
            Err(e) => {
                warn!(report_type = report_type.as_str(), error = %e, "报表生成失败");
                (json!({ "error": e.to_string() }), ReportStatus::Failed)
            }
        };

        let report = self
            .monitoring_repo
            .create_report(&NewReport {
                report_type,
                municipality_id,
                generated_by,
                data,
                status,
                file_name: Some(report_file_name(report_type, now)),
            })
            .await?;

        info!(report_id = report.id, report_type = report_type.as_str(), "报表已生成");
        Ok(report)
    }

    async fn build_report_data(&self, report_type: ReportType, municipality_id: i64) -> Result<Value> {
        let collection_filter = CollectionFilter {
            municipality_id: Some(municipality_id),
            ..Default::default()
        };

        match report_type {
            ReportType::CollectionEfficiency => {
                let collector_filter = CollectorFilter {
                    municipality_id: Some(municipality_id),
                    ..Default::default()
                };
                let (collections, collectors) = futures::try_join!(
                    self.collection_repo.list_all(&collection_filter),
                    self.collector_repo.list(&collector_filter),
                )?;
                let summary = stats::summarize_collections(&collections);
                let efficiency = if collectors.is_empty() {
                    0.0
                } else {
                    let total: f64 = collectors.iter().map(|c| c.fill_ratio() * 100.0).sum();
                    stats::round1(total / collectors.len() as f64)
                };
                Ok(json!({
                    "totalCollections": summary.total_collections,
                    "totalWeight": summary.total_weight,
                    "averageWeight": summary.average_weight,
                    "efficiency": efficiency,
                    "period": collection_period(&collections),
                }))
            }
            ReportType::EnvironmentalImpact => {
                let collections = self.collection_repo.list_all(&collection_filter).await?;
                let summary = stats::summarize_collections(&collections);
                let impact = stats::environmental_impact(summary.total_weight, &self.rewards);
                Ok(json!({
                    "totalWeight": summary.total_weight,
                    "co2Saved": impact.co2_saved,
                    "energySaved": impact.energy_saved,
                    "treesEquivalent": impact.trees_equivalent,
                }))
            }
            ReportType::UserParticipation => {
                let (citizens, collections) = futures::try_join!(
                    self.user_repo.list_citizens(Some(municipality_id)),
                    self.collection_repo.list_all(&collection_filter),
                )?;
                let total = citizens.len() as i64;
                let active = citizens.iter().filter(|u| u.is_active).count() as i64;
                let participants = collections
                    .iter()
                    .map(|c| c.user_id)
                    .collect::<HashSet<_>>()
                    .len() as i64;
                Ok(json!({
                    "totalCitizens": total,
                    "activeCitizens": active,
                    "participants": participants,
                    "participationRate": stats::participation_rate(participants, total),
                }))
            }
            ReportType::FinancialSummary => {
                let filter = TransactionFilter {
                    municipality_id: Some(municipality_id),
                    ..Default::default()
                };
                let transactions = self.transaction_repo.list_all(&filter).await?;
                let distributed: i64 = transactions
                    .iter()
                    .filter(|t| t.transaction_type == TransactionType::Earned)
                    .map(|t| t.points)
                    .sum();
                let redeemed: Vec<i64> = transactions
                    .iter()
                    .filter(|t| {
                        t.transaction_type == TransactionType::Redeemed
                            && t.status == TransactionStatus::Completed
                    })
                    .map(|t| t.points.abs())
                    .collect();
                let points_redeemed: i64 = redeemed.iter().sum();
                Ok(json!({
                    "pointsDistributed": distributed,
                    "pointsRedeemed": points_redeemed,
                    "redemptions": redeemed.len(),
                    "outstandingPoints": distributed - points_redeemed,
                }))
            }
        }
    }

    pub async fn get_report(&self, id: i64, scope: Option<i64>) -> Result<Report> {
        let report = self
            .monitoring_repo
            .get_report(id)
            .await?
            .ok_or(RecyclingError::ReportNotFound(id))?;
        check_scope(scope, Some(report.municipality_id))?;
        Ok(report)
    }

    pub async fn list_reports(
        &self,
        municipality_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Report>, i64)> {
        self.monitoring_repo
            .list_reports(municipality_id, limit, offset)
            .await
    }

    // ==================== 指标 ====================

    pub async fn record_metric(&self, metric: &NewMetric) -> Result<Metric> {
        if !metric.value.is_finite() {
            return Err(RecyclingError::Validation("指标值必须是有限数".to_string()));
        }
        self.monitoring_repo.record_metric(metric).await
    }

    /// 指标列表，新的在前
    pub async fn list_metrics(&self, filter: &MetricFilter, limit: Option<i64>) -> Result<Vec<Metric>> {
        let limit = limit
            .unwrap_or(DEFAULT_METRICS_LIMIT)
            .clamp(1, MAX_METRICS_LIMIT);
        self.monitoring_repo.list_metrics(filter, limit).await
    }

    // ==================== 告警 ====================

    #[instrument(skip(self, alert), fields(alert_type = alert.alert_type.as_str()))]
    pub async fn create_alert(&self, alert: &NewAlert) -> Result<Alert> {
        let created = self.monitoring_repo.create_alert(alert).await?;
        metrics::record_alert_raised(created.alert_type.as_str(), created.severity.as_str());
        Ok(created)
    }

    pub async fn list_alerts(
        &self,
        filter: &AlertFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Alert>, i64)> {
        self.monitoring_repo.list_alerts(filter, limit, offset).await
    }

    /// 解决告警，重复解决直接返回当前状态
    #[instrument(skip(self))]
    pub async fn resolve_alert(&self, id: i64, scope: Option<i64>) -> Result<Alert> {
        let alert = self
            .monitoring_repo
            .get_alert(id)
            .await?
            .ok_or(RecyclingError::AlertNotFound(id))?;
        check_scope(scope, alert.municipality_id)?;
        if alert.is_resolved {
            return Ok(alert);
        }

        let resolved = self
            .monitoring_repo
            .resolve_alert(id)
            .await?
            .ok_or(RecyclingError::AlertNotFound(id))?;
        info!(alert_id = id, "告警已解决");
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::collection::fixtures::collection;
    use crate::models::collector::fixtures::collector;
    use crate::models::monitoring::fixtures::open_alert;
    use crate::models::reward::fixtures::transaction;
    use crate::models::user::fixtures::citizen;
    use crate::models::RecyclableType;
    use crate::repository::{
        MockCollectionRepositoryTrait, MockCollectorRepositoryTrait,
        MockMonitoringRepositoryTrait, MockTransactionRepositoryTrait, MockUserRepositoryTrait,
    };
    use chrono::TimeZone;

    type Service = MonitoringService<
        MockUserRepositoryTrait,
        MockCollectorRepositoryTrait,
        MockCollectionRepositoryTrait,
        MockTransactionRepositoryTrait,
        MockMonitoringRepositoryTrait,
    >;

    #[derive(Default)]
    struct Mocks {
        users: MockUserRepositoryTrait,
        collectors: MockCollectorRepositoryTrait,
        collections: MockCollectionRepositoryTrait,
        transactions: MockTransactionRepositoryTrait,
        monitoring: MockMonitoringRepositoryTrait,
    }

    impl Mocks {
        fn build(self) -> Service {
            MonitoringService::new(
                Arc::new(self.users),
                Arc::new(self.collectors),
                Arc::new(self.collections),
                Arc::new(self.transactions),
                Arc::new(self.monitoring),
                RewardsConfig::default(),
            )
        }
    }

    fn echo_report(mocks: &mut Mocks) {
        mocks.monitoring.expect_create_report().returning(|r| {
            Ok(Report {
                id: 1,
                report_type: r.report_type,
                municipality_id: r.municipality_id,
                generated_by: r.generated_by,
                data: r.data.clone(),
                status: r.status,
                file_name: r.file_name.clone(),
                created_at: Utc::now(),
            })
        });
    }

    #[test]
    fn test_report_file_name() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        assert_eq!(
            report_file_name(ReportType::CollectionEfficiency, at),
            "collection_efficiency_20240309.json"
        );
    }

    #[tokio::test]
    async fn test_collection_efficiency_report() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let mut mocks = Mocks::default();
        mocks.collections.expect_list_all().returning(move |_| {
            Ok(vec![
                collection(1, 7, 1, 2.0, RecyclableType::Glass, at),
                collection(2, 8, 2, 4.0, RecyclableType::Paper, at + chrono::Duration::days(30)),
            ])
        });
        mocks.collectors.expect_list().returning(|_| {
            Ok(vec![collector(1, 1, 100.0, 50.0), collector(2, 1, 100.0, 100.0)])
        });
        echo_report(&mut mocks);

        let report = mocks
            .build()
            .generate_report(ReportType::CollectionEfficiency, 1, 3)
            .await
            .unwrap();
        assert_eq!(report.status, ReportStatus::Completed);
        assert_eq!(report.data["totalCollections"], 2);
        assert_eq!(report.data["efficiency"], 75.0);
        assert_eq!(report.data["period"], "2024-01-01 to 2024-01-31");
        assert!(report.file_name.unwrap().starts_with("collection_efficiency_"));
    }

    #[tokio::test]
    async fn test_financial_summary_report() {
        let mut mocks = Mocks::default();
        mocks.transactions.expect_list_all().returning(|_| {
            Ok(vec![
                transaction(1, 7, TransactionType::Earned, 300, TransactionStatus::Completed),
                transaction(2, 7, TransactionType::Redeemed, -100, TransactionStatus::Completed),
                transaction(3, 7, TransactionType::Redeemed, -50, TransactionStatus::Cancelled),
                transaction(4, 7, TransactionType::Refunded, 50, TransactionStatus::Completed),
            ])
        });
        echo_report(&mut mocks);

        let report = mocks
            .build()
            .generate_report(ReportType::FinancialSummary, 1, 3)
            .await
            .unwrap();
        assert_eq!(report.data["pointsDistributed"], 300);
        assert_eq!(report.data["pointsRedeemed"], 100);
        assert_eq!(report.data["redemptions"], 1);
        assert_eq!(report.data["outstandingPoints"], 200);
    }

    #[tokio::test]
    async fn test_participation_report() {
        let now = Utc::now();
        let mut mocks = Mocks::default();
        mocks.users.expect_list_citizens().returning(|_| {
            let mut inactive = citizen(9, 1);
            inactive.is_active = false;
            Ok(vec![citizen(7, 1), citizen(8, 1), inactive, citizen(10, 1)])
        });
        mocks.collections.expect_list_all().returning(move |_| {
            Ok(vec![collection(1, 7, 1, 1.0, RecyclableType::Metal, now)])
        });
        echo_report(&mut mocks);

        let report = mocks
            .build()
            .generate_report(ReportType::UserParticipation, 1, 3)
            .await
            .unwrap();
        assert_eq!(report.data["totalCitizens"], 4);
        assert_eq!(report.data["activeCitizens"], 3);
        assert_eq!(report.data["participationRate"], 25.0);
    }

    #[tokio::test]
    async fn test_failed_build_is_stored() {
        let mut mocks = Mocks::default();
        mocks
            .collections
            .expect_list_all()
            .returning(|_| Err(RecyclingError::Internal("boom".to_string())));
        echo_report(&mut mocks);

        let report = mocks
            .build()
            .generate_report(ReportType::EnvironmentalImpact, 1, 3)
            .await
            .unwrap();
        assert_eq!(report.status, ReportStatus::Failed);
    }

    #[tokio::test]
    async fn test_resolve_twice_is_noop() {
        let mut mocks = Mocks::default();
        mocks.monitoring.expect_get_alert().returning(|id| {
            let mut alert = open_alert(id, 1, Utc::now());
            alert.is_resolved = true;
            alert.resolved_at = Some(Utc::now());
            Ok(Some(alert))
        });
        mocks.monitoring.expect_resolve_alert().never();

        let alert = mocks.build().resolve_alert(5, Some(1)).await.unwrap();
        assert!(alert.is_resolved);
    }

    #[tokio::test]
    async fn test_resolve_out_of_scope() {
        let mut mocks = Mocks::default();
        mocks
            .monitoring
            .expect_get_alert()
            .returning(|id| Ok(Some(open_alert(id, 2, Utc::now()))));

        let err = mocks.build().resolve_alert(5, Some(1)).await.unwrap_err();
        assert_eq!(err.error_code(), "MUNICIPALITY_MISMATCH");
    }

    #[tokio::test]
    async fn test_metrics_limit_defaults() {
        let mut mocks = Mocks::default();
        mocks
            .monitoring
            .expect_list_metrics()
            .withf(|_, limit| *limit == DEFAULT_METRICS_LIMIT)
            .returning(|_, _| Ok(vec![]));

        let metrics = mocks
            .build()
            .list_metrics(&MetricFilter::default(), None)
            .await
            .unwrap();
        assert!(metrics.is_empty());
    }
}
