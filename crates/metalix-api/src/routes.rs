//! 路由配置模块
//!
//! 定义所有 REST API 端点的路由映射。
//! 路由按可访问角色分组，每组通过 route_layer 挂载角色检查；
//! 同一路径的不同方法可以分属不同的组。

use axum::{
    Router,
    middleware::from_fn,
    routing::{delete, get, patch, post, put},
};

use crate::{
    auth::access::{ADMINS, CITIZEN_ONLY, SYSTEM_ONLY},
    handlers,
    middleware::require_roles,
    state::AppState,
};

/// 认证路由，登录和注册为公开路由
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/me", get(handlers::auth::me))
        .route("/auth/refresh", post(handlers::auth::refresh))
}

/// 所有已登录用户可访问的路由
///
/// 市民只能访问本人的数据，范围在 handler 中校验
fn authenticated_routes() -> Router<AppState> {
    Router::new()
        // 用户自助
        .route(
            "/users/{id}",
            get(handlers::user::get_user).patch(handlers::user::update_user),
        )
        .route("/users/{id}/profile", get(handlers::user::get_profile))
        .route("/users/{id}/stats", get(handlers::user::get_stats))
        .route("/users/{id}/points", get(handlers::user::get_points))
        .route(
            "/users/{id}/transactions",
            get(handlers::user::list_transactions),
        )
        .route(
            "/users/{id}/collections",
            get(handlers::user::list_collections),
        )
        .route("/users/{id}/activity", get(handlers::user::get_activity))
        // 市政（列表为公开路由）
        .route(
            "/municipalities",
            get(handlers::municipality::list_municipalities),
        )
        .route(
            "/municipalities/{id}",
            get(handlers::municipality::get_municipality),
        )
        // 区域与回收点只读
        .route("/zones", get(handlers::zone::list_zones))
        .route("/zones/{id}", get(handlers::zone::get_zone))
        .route("/collectors", get(handlers::collector::list_collectors))
        .route("/collectors/{id}", get(handlers::collector::get_collector))
        // 投放
        .route(
            "/collections",
            get(handlers::collection::list_collections)
                .post(handlers::collection::create_collection),
        )
        .route(
            "/collections/{id}",
            get(handlers::collection::get_collection),
        )
        // 奖励与流水
        .route("/rewards", get(handlers::reward::list_rewards))
        .route("/rewards/{id}", get(handlers::reward::get_reward))
        .route(
            "/reward-transactions",
            get(handlers::transaction::list_transactions),
        )
}

/// 管理员路由（市政管理员和系统管理员）
fn admin_routes() -> Router<AppState> {
    Router::new()
        // 用户管理
        .route(
            "/users",
            get(handlers::user::list_users).post(handlers::user::create_user),
        )
        .route("/users/{id}", delete(handlers::user::deactivate_user))
        // 市政
        .route(
            "/municipalities/{id}",
            patch(handlers::municipality::update_municipality),
        )
        .route(
            "/municipalities/{id}/stats",
            get(handlers::municipality::get_stats),
        )
        .route(
            "/municipalities/{id}/dashboard",
            get(handlers::municipality::get_dashboard),
        )
        // 区域
        .route("/zones", post(handlers::zone::create_zone))
        .route(
            "/zones/{id}",
            patch(handlers::zone::update_zone).delete(handlers::zone::delete_zone),
        )
        // 回收点
        .route("/collectors", post(handlers::collector::create_collector))
        .route(
            "/collectors/{id}",
            patch(handlers::collector::update_collector)
                .delete(handlers::collector::deactivate_collector),
        )
        .route(
            "/collectors/{id}/status",
            put(handlers::collector::update_status),
        )
        .route(
            "/collectors/{id}/maintenance",
            post(handlers::collector::record_maintenance),
        )
        .route(
            "/sensor-data",
            get(handlers::collector::list_sensor_data)
                .post(handlers::collector::ingest_sensor_data),
        )
        // 投放核验
        .route(
            "/collections/{id}/verify",
            patch(handlers::collection::verify_collection),
        )
        // 奖励管理
        .route("/rewards", post(handlers::reward::create_reward))
        .route(
            "/rewards/{id}",
            patch(handlers::reward::update_reward).delete(handlers::reward::deactivate_reward),
        )
        .route(
            "/reward-transactions/{id}/cancel",
            post(handlers::transaction::cancel_transaction),
        )
        // RFID 卡
        .route(
            "/rfid-cards",
            get(handlers::rfid::list_cards).post(handlers::rfid::issue_card),
        )
        .route(
            "/rfid-cards/lookup/{card_number}",
            get(handlers::rfid::lookup_card),
        )
        .route(
            "/rfid-cards/{id}/deactivate",
            patch(handlers::rfid::deactivate_card),
        )
        // 监控
        .route(
            "/reports",
            get(handlers::monitoring::list_reports).post(handlers::monitoring::create_report),
        )
        .route("/reports/{id}", get(handlers::monitoring::get_report))
        .route(
            "/metrics",
            get(handlers::monitoring::list_metrics).post(handlers::monitoring::record_metric),
        )
        .route(
            "/alerts",
            get(handlers::monitoring::list_alerts).post(handlers::monitoring::create_alert),
        )
        .route(
            "/alerts/{id}/resolve",
            patch(handlers::monitoring::resolve_alert),
        )
        .route_layer(from_fn(require_roles(ADMINS)))
}

/// 仅系统管理员可访问的路由
fn system_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/municipalities",
            post(handlers::municipality::create_municipality),
        )
        .route(
            "/municipalities/{id}",
            delete(handlers::municipality::deactivate_municipality),
        )
        .route("/system/overview", get(handlers::system::overview))
        .route_layer(from_fn(require_roles(SYSTEM_ONLY)))
}

/// 仅市民可访问的路由
fn citizen_routes() -> Router<AppState> {
    Router::new()
        .route("/rewards/{id}/redeem", post(handlers::reward::redeem_reward))
        .route_layer(from_fn(require_roles(CITIZEN_ONLY)))
}

/// 构建完整的 API 路由，挂载在 /api 下
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(authenticated_routes())
        .merge(admin_routes())
        .merge(system_routes())
        .merge(citizen_routes())
}
