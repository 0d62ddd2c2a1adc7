//! Metalix 回收积分平台 REST API
//!
//! 市民、市政管理员和系统管理员通过该服务完成投放、兑换、管理和监控。
//!
//! ## 核心功能
//!
//! - **认证**：JWT 登录、市民注册、登录失败锁定
//! - **用户与身份**：用户管理、RFID 卡、个人档案和活动流
//! - **回收**：区域、回收点、传感器读数和投放记录
//! - **积分**：奖励管理、兑换与取消、积分流水
//! - **统计与监控**：市政看板、系统概览、报表、指标和告警
//!
//! ## 模块结构
//!
//! - `auth`: JWT、密码哈希和访问范围校验
//! - `dto`: 请求和响应的数据传输对象
//! - `error`: 错误类型定义
//! - `handlers`: HTTP 请求处理器
//! - `middleware`: 认证和角色检查中间件
//! - `routes`: 路由配置
//! - `state`: 应用状态

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::{
    Json, Router,
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{Next, from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::get,
};
use metalix_shared::config::CorsConfig;
use metalix_shared::database::Database;
use metalix_shared::observability::middleware as obs_middleware;
use serde_json::json;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

pub use error::{ApiError, Result};
pub use state::AppState;

const SERVICE_NAME: &str = "metalix-api";

/// 组装完整的应用路由和中间件
///
/// 中间件由外到内：request_id、http_tracing、CORS、压缩、安全头、认证。
/// CORS 在认证之外，预检请求不需要 Token。
pub fn app(state: AppState, cors: &CorsConfig) -> Router {
    Router::new()
        .nest("/api", routes::api_routes())
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ))
        .layer(from_fn(security_headers))
        .layer(CompressionLayer::new())
        .layer(build_cors(cors))
        .layer(from_fn(obs_middleware::http_tracing))
        .layer(from_fn(obs_middleware::request_id))
        .with_state(state)
}

/// 按配置构建 CORS 层，"*" 表示允许全部来源
pub fn build_cors(config: &CorsConfig) -> CorsLayer {
    let allowed = config.allowed_origins.trim();
    if allowed == "*" {
        info!("CORS allowed_origins: * (all origins)");
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    info!("CORS allowed_origins: {}", allowed);
    let origins: Vec<HeaderValue> = allowed
        .split(',')
        .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// 为所有响应注入 HTTP 安全头
async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::STRICT_TRANSPORT_SECURITY,
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    // 依赖 CSP，显式关闭旧的 XSS 过滤
    headers.insert(header::X_XSS_PROTECTION, HeaderValue::from_static("0"));
    response
}

/// 存活探针：服务进程正常即返回 ok
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME
    }))
}

/// 就绪探针：检查数据库和 Redis 连接是否可用，任一失败返回 503
async fn readiness_check(State(state): State<AppState>) -> Response {
    let db = Database::from_pool(state.pool.clone());
    let (db_result, cache_result) = tokio::join!(db.health_check(), state.cache.health_check());
    let db_ok = db_result.is_ok();
    let cache_ok = cache_result.is_ok();
    let all_ok = db_ok && cache_ok;

    let status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = json!({
        "status": if all_ok { "ok" } else { "degraded" },
        "service": SERVICE_NAME,
        "checks": {
            "database": if db_ok { "ok" } else { "fail" },
            "redis": if cache_ok { "ok" } else { "fail" }
        }
    });
    (status, Json(body)).into_response()
}
