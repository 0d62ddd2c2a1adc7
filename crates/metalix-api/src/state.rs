//! 应用状态定义
//!
//! 包含 Axum 路由共享的连接池、缓存、JWT 管理器、仓储和服务

use std::sync::Arc;

use metalix_core::{
    CollectionRepository, CollectionService, CollectorRepository, CollectorService,
    DashboardService, IdentificationService, LedgerService, MonitoringRepository,
    MonitoringService, MunicipalityRepository, PgCollectionService, PgCollectorService,
    PgDashboardService, PgIdentificationService, PgLedgerService, PgMonitoringService,
    PgRedemptionService, RedemptionService, RewardRepository, RfidCardRepository,
    TransactionRepository, UserRepository,
};
use metalix_shared::cache::Cache;
use metalix_shared::config::{AuthConfig, RewardsConfig};
use sqlx::PgPool;

use crate::auth::{JwtConfig, JwtManager};

/// 仓储集合
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<UserRepository>,
    pub municipalities: Arc<MunicipalityRepository>,
    pub collectors: Arc<CollectorRepository>,
    pub collections: Arc<CollectionRepository>,
    pub rewards: Arc<RewardRepository>,
    pub transactions: Arc<TransactionRepository>,
    pub rfid_cards: Arc<RfidCardRepository>,
    pub monitoring: Arc<MonitoringRepository>,
}

impl Repositories {
    pub fn new(pool: &PgPool) -> Self {
        Self {
            users: Arc::new(UserRepository::new(pool.clone())),
            municipalities: Arc::new(MunicipalityRepository::new(pool.clone())),
            collectors: Arc::new(CollectorRepository::new(pool.clone())),
            collections: Arc::new(CollectionRepository::new(pool.clone())),
            rewards: Arc::new(RewardRepository::new(pool.clone())),
            transactions: Arc::new(TransactionRepository::new(pool.clone())),
            rfid_cards: Arc::new(RfidCardRepository::new(pool.clone())),
            monitoring: Arc::new(MonitoringRepository::new(pool.clone())),
        }
    }
}

/// Axum 应用共享状态
///
/// 所有字段通过 Arc 在 handler 间共享，Clone 开销很小
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL 连接池
    pub pool: PgPool,
    /// Redis 缓存客户端
    pub cache: Arc<Cache>,
    pub jwt_manager: Arc<JwtManager>,
    pub auth: Arc<AuthConfig>,
    pub repos: Repositories,

    pub ledger_service: Arc<PgLedgerService>,
    pub redemption_service: Arc<PgRedemptionService>,
    pub collection_service: Arc<PgCollectionService>,
    pub collector_service: Arc<PgCollectorService>,
    pub identification_service: Arc<PgIdentificationService>,
    pub dashboard_service: Arc<PgDashboardService>,
    pub monitoring_service: Arc<PgMonitoringService>,
}

impl AppState {
    /// 按配置装配仓储和服务
    pub fn new(pool: PgPool, cache: Arc<Cache>, auth: AuthConfig, rewards: RewardsConfig) -> Self {
        let repos = Repositories::new(&pool);
        let jwt_manager = Arc::new(JwtManager::new(JwtConfig::from(&auth)));

        let ledger_service = Arc::new(LedgerService::new(repos.transactions.clone()));
        let redemption_service = Arc::new(RedemptionService::new(
            repos.users.clone(),
            repos.rewards.clone(),
            repos.transactions.clone(),
        ));
        let collection_service = Arc::new(CollectionService::new(
            repos.users.clone(),
            repos.collectors.clone(),
            repos.collections.clone(),
            repos.rfid_cards.clone(),
            repos.monitoring.clone(),
            cache.clone(),
            rewards.clone(),
        ));
        let collector_service = Arc::new(CollectorService::new(
            repos.collectors.clone(),
            repos.monitoring.clone(),
            cache.clone(),
            rewards.clone(),
        ));
        let identification_service = Arc::new(IdentificationService::new(
            repos.users.clone(),
            repos.collections.clone(),
            repos.transactions.clone(),
            repos.rfid_cards.clone(),
        ));
        let dashboard_service = Arc::new(DashboardService::new(
            repos.municipalities.clone(),
            repos.users.clone(),
            repos.collectors.clone(),
            repos.collections.clone(),
            repos.transactions.clone(),
            repos.monitoring.clone(),
            cache.clone(),
            rewards.clone(),
        ));
        let monitoring_service = Arc::new(MonitoringService::new(
            repos.users.clone(),
            repos.collectors.clone(),
            repos.collections.clone(),
            repos.transactions.clone(),
            repos.monitoring.clone(),
            rewards,
        ));

        Self {
            pool,
            cache,
            jwt_manager,
            auth: Arc::new(auth),
            repos,
            ledger_service,
            redemption_service,
            collection_service,
            collector_service,
            identification_service,
            dashboard_service,
            monitoring_service,
        }
    }
}
