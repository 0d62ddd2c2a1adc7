//! 监控仓储：报表、指标、告警

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::MonitoringRepositoryTrait;
use crate::error::Result;
use crate::models::{
    Alert, AlertFilter, AlertType, Metric, MetricFilter, NewAlert, NewMetric, NewReport, Report,
};

const REPORT_COLUMNS: &str =
    "id, report_type, municipality_id, generated_by, data, status, file_name, created_at";

const METRIC_COLUMNS: &str =
    "id, name, value, unit, source, municipality_id, metadata, recorded_at";

const ALERT_COLUMNS: &str = r#"
    id, alert_type, severity, message, source, municipality_id, collector_id,
    is_resolved, created_at, resolved_at, metadata
"#;

/// 监控仓储
pub struct MonitoringRepository {
    pool: PgPool,
}

impl MonitoringRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 报表 ====================

    pub async fn create_report(&self, report: &NewReport) -> Result<Report> {
        let report = sqlx::query_as::<_, Report>(&format!(
            r#"
            INSERT INTO reports (report_type, municipality_id, generated_by, data, status, file_name)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {REPORT_COLUMNS}
            "#
        ))
        .bind(report.report_type)
        .bind(report.municipality_id)
        .bind(report.generated_by)
        .bind(&report.data)
        .bind(report.status)
        .bind(&report.file_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(report)
    }

    pub async fn get_report(&self, id: i64) -> Result<Option<Report>> {
        let report = sqlx::query_as::<_, Report>(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(report)
    }

    pub async fn list_reports(
        &self,
        municipality_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Report>, i64)> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reports WHERE ($1::bigint IS NULL OR municipality_id = $1)",
        )
        .bind(municipality_id)
        .fetch_one(&self.pool)
        .await?;

        let reports = sqlx::query_as::<_, Report>(&format!(
            r#"
            SELECT {REPORT_COLUMNS} FROM reports
            WHERE ($1::bigint IS NULL OR municipality_id = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(municipality_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((reports, total))
    }

    // ==================== 指标 ====================

    pub async fn record_metric(&self, metric: &NewMetric) -> Result<Metric> {
        let metric = sqlx::query_as::<_, Metric>(&format!(
            r#"
            INSERT INTO metrics (name, value, unit, source, municipality_id, metadata)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {METRIC_COLUMNS}
            "#
        ))
        .bind(&metric.name)
        .bind(metric.value)
        .bind(&metric.unit)
        .bind(metric.source)
        .bind(metric.municipality_id)
        .bind(&metric.metadata)
        .fetch_one(&self.pool)
        .await?;

        Ok(metric)
    }

    pub async fn list_metrics(&self, filter: &MetricFilter, limit: i64) -> Result<Vec<Metric>> {
        let metrics = sqlx::query_as::<_, Metric>(&format!(
            r#"
            SELECT {METRIC_COLUMNS} FROM metrics
            WHERE ($1::bigint IS NULL OR municipality_id = $1)
              AND ($2::varchar IS NULL OR name = $2)
            ORDER BY recorded_at DESC, id DESC
            LIMIT $3
            "#
        ))
        .bind(filter.municipality_id)
        .bind(&filter.name)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(metrics)
    }

    // ==================== 告警 ====================

    pub async fn create_alert(&self, alert: &NewAlert) -> Result<Alert> {
        let alert = sqlx::query_as::<_, Alert>(&format!(
            r#"
            INSERT INTO alerts (alert_type, severity, message, source, municipality_id,
                                collector_id, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ALERT_COLUMNS}
            "#
        ))
        .bind(alert.alert_type)
        .bind(alert.severity)
        .bind(&alert.message)
        .bind(alert.source)
        .bind(alert.municipality_id)
        .bind(alert.collector_id)
        .bind(&alert.metadata)
        .fetch_one(&self.pool)
        .await?;

        Ok(alert)
    }

    pub async fn get_alert(&self, id: i64) -> Result<Option<Alert>> {
        let alert = sqlx::query_as::<_, Alert>(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(alert)
    }

    pub async fn list_alerts(
        &self,
        filter: &AlertFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Alert>, i64)> {
        let where_clause = r#"
            WHERE ($1::bigint IS NULL OR municipality_id = $1)
              AND ($2::boolean IS NULL OR is_resolved = $2)
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM alerts {where_clause}"))
            .bind(filter.municipality_id)
            .bind(filter.is_resolved)
            .fetch_one(&self.pool)
            .await?;

        let alerts = sqlx::query_as::<_, Alert>(&format!(
            r#"
            SELECT {ALERT_COLUMNS} FROM alerts {where_clause}
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(filter.municipality_id)
        .bind(filter.is_resolved)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((alerts, total))
    }

    pub async fn has_open_alert(&self, collector_id: i64, alert_type: AlertType) -> Result<bool> {
        let exists = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM alerts
                WHERE collector_id = $1 AND alert_type = $2 AND is_resolved = FALSE
            )
            "#,
        )
        .bind(collector_id)
        .bind(alert_type)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// 已解决的告警保持原解决时间
    pub async fn resolve_alert(&self, id: i64) -> Result<Option<Alert>> {
        let alert = sqlx::query_as::<_, Alert>(&format!(
            r#"
            UPDATE alerts SET
                is_resolved = TRUE,
                resolved_at = COALESCE(resolved_at, NOW())
            WHERE id = $1
            RETURNING {ALERT_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(alert)
    }

    pub async fn resolve_collector_alerts(
        &self,
        collector_id: i64,
        alert_type: AlertType,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE alerts SET is_resolved = TRUE, resolved_at = NOW()
            WHERE collector_id = $1 AND alert_type = $2 AND is_resolved = FALSE
            "#,
        )
        .bind(collector_id)
        .bind(alert_type)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn count_open_alerts(&self, municipality_id: Option<i64>) -> Result<i64> {
        let count = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM alerts
            WHERE is_resolved = FALSE
              AND ($1::bigint IS NULL OR municipality_id = $1)
            "#,
        )
        .bind(municipality_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

#[async_trait]
impl MonitoringRepositoryTrait for MonitoringRepository {
    async fn create_report(&self, report: &NewReport) -> Result<Report> {
        self.create_report(report).await
    }

    async fn get_report(&self, id: i64) -> Result<Option<Report>> {
        self.get_report(id).await
    }

    async fn list_reports(
        &self,
        municipality_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Report>, i64)> {
        self.list_reports(municipality_id, limit, offset).await
    }

    async fn record_metric(&self, metric: &NewMetric) -> Result<Metric> {
        self.record_metric(metric).await
    }

    async fn list_metrics(&self, filter: &MetricFilter, limit: i64) -> Result<Vec<Metric>> {
        self.list_metrics(filter, limit).await
    }

    async fn create_alert(&self, alert: &NewAlert) -> Result<Alert> {
        self.create_alert(alert).await
    }

    async fn get_alert(&self, id: i64) -> Result<Option<Alert>> {
        self.get_alert(id).await
    }

    async fn list_alerts(
        &self,
        filter: &AlertFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Alert>, i64)> {
        self.list_alerts(filter, limit, offset).await
    }

    async fn has_open_alert(&self, collector_id: i64, alert_type: AlertType) -> Result<bool> {
        self.has_open_alert(collector_id, alert_type).await
    }

    async fn resolve_alert(&self, id: i64) -> Result<Option<Alert>> {
        self.resolve_alert(id).await
    }

    async fn resolve_collector_alerts(
        &self,
        collector_id: i64,
        alert_type: AlertType,
    ) -> Result<u64> {
        self.resolve_collector_alerts(collector_id, alert_type).await
    }

    async fn count_open_alerts(&self, municipality_id: Option<i64>) -> Result<i64> {
        self.count_open_alerts(municipality_id).await
    }
}
