//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 初始化 Prometheus 指标导出
///
/// 在独立端口上启动 `/metrics` 端点。
pub async fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    register_common_metrics(&config.service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!("deposits_total", "Total number of recycling deposits");
    metrics::describe_counter!(
        "deposited_weight_grams_total",
        "Total deposited weight in grams"
    );
    metrics::describe_counter!("points_issued_total", "Total reward points issued");

    metrics::describe_counter!("redemptions_total", "Total number of reward redemptions");
    metrics::describe_histogram!(
        "redemption_duration_seconds",
        "Redemption duration in seconds"
    );

    metrics::describe_counter!("alerts_raised_total", "Total number of alerts raised");
    metrics::describe_gauge!("collector_fill_ratio", "Current fill ratio of a collector");

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

/// 记录 HTTP 请求
#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录一次投放
#[inline]
pub fn record_deposit(material: &str, status: &str, weight_kg: f64, points: i64) {
    metrics::counter!(
        "deposits_total",
        "material" => material.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    if status == "success" {
        metrics::counter!("deposited_weight_grams_total", "material" => material.to_string())
            .increment((weight_kg * 1000.0).round().max(0.0) as u64);
        metrics::counter!("points_issued_total").increment(points.max(0) as u64);
    }
}

/// 记录兑换
#[inline]
pub fn record_redemption(status: &str, duration_secs: f64) {
    metrics::counter!("redemptions_total", "status" => status.to_string()).increment(1);
    metrics::histogram!("redemption_duration_seconds", "status" => status.to_string())
        .record(duration_secs);
}

/// 记录告警
#[inline]
pub fn record_alert_raised(alert_type: &str, severity: &str) {
    metrics::counter!(
        "alerts_raised_total",
        "alert_type" => alert_type.to_string(),
        "severity" => severity.to_string()
    )
    .increment(1);
}

/// 更新回收点装载率
#[inline]
pub fn set_collector_fill(collector_id: i64, ratio: f64) {
    metrics::gauge!("collector_fill_ratio", "collector_id" => collector_id.to_string()).set(ratio);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_functions_do_not_panic() {
        // 未安装 recorder 时记录操作应为空操作
        record_http_request("GET", "/api/rewards", 200, 0.1);
        record_deposit("PLASTIC", "success", 1.25, 25);
        record_deposit("GLASS", "rejected", 0.0, 0);
        record_redemption("success", 0.3);
        record_alert_raised("COLLECTOR_FULL", "HIGH");
        set_collector_fill(1, 0.95);
    }
}
