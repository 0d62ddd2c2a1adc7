//! Metalix 回收积分平台 REST API 服务

use std::sync::Arc;

use metalix_api::{AppState, auth::hash_password};
use metalix_core::{NewUser, UserRole};
use metalix_shared::{
    cache::Cache,
    config::{AppConfig, AuthConfig},
    database::Database,
    observability,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 配置加载顺序：config/default.toml -> config/{env}.toml -> config/metalix-api.toml -> 环境变量
    let config = AppConfig::load("metalix-api")?;

    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;

    info!(
        environment = %config.environment,
        "Starting metalix-api on {}",
        config.server_addr()
    );

    let db = Database::connect(&config.database).await?;
    if config.database.run_migrations {
        db.run_migrations().await?;
    }
    let cache = Arc::new(Cache::new(&config.redis)?);
    if let Err(e) = cache.health_check().await {
        // Redis 不可用时统计直接查库，不阻止启动
        warn!(error = %e, "Redis 不可用，统计缓存将被绕过");
    }

    let state = AppState::new(
        db.pool().clone(),
        cache,
        config.auth.clone(),
        config.rewards.clone(),
    );
    bootstrap_system_admin(&state, &config.auth).await?;

    let app = metalix_api::app(state, &config.cors);

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    // 收到 SIGTERM 或 Ctrl+C 后停止接收新连接，等待已有请求处理完毕
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");

    Ok(())
}

/// 首次启动时创建系统管理员
///
/// 仅在配置了账号密码且库中还没有系统管理员时执行
async fn bootstrap_system_admin(state: &AppState, auth: &AuthConfig) -> anyhow::Result<()> {
    let (Some(email), Some(password)) = (
        auth.bootstrap_admin_email.as_deref(),
        auth.bootstrap_admin_password.as_deref(),
    ) else {
        return Ok(());
    };

    if state.repos.users.count_by_role(UserRole::SystemAdmin).await? > 0 {
        return Ok(());
    }

    let password_hash = hash_password(password)?;
    let admin = state
        .repos
        .users
        .create(&NewUser {
            email: email.trim().to_lowercase(),
            password_hash,
            first_name: "System".to_string(),
            last_name: "Administrator".to_string(),
            role: UserRole::SystemAdmin,
            municipality_id: None,
            phone: None,
            address: None,
            city: None,
            zip_code: None,
        })
        .await?;

    info!(user_id = admin.id, email = %admin.email, "已创建初始系统管理员");
    Ok(())
}

/// 监听关闭信号
///
/// 容器编排通过 SIGTERM 通知停止，本地开发通过 Ctrl+C
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
