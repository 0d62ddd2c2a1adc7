//! 统计看板服务
//!
//! 并行拉取记录后在内存中聚合，未过滤的结果写入 Redis 缓存

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metalix_shared::cache::{Cache, CacheKey};
use metalix_shared::config::RewardsConfig;
use tracing::instrument;

use crate::error::{RecyclingError, Result};
use crate::models::{
    AlertFilter, CollectionFilter, CollectorFilter, TransactionFilter, TransactionType,
    UserPoints,
};
use crate::repository::{
    CollectionRepositoryTrait, CollectorRepositoryTrait, MonitoringRepositoryTrait,
    MunicipalityRepositoryTrait, TransactionRepositoryTrait, UserRepositoryTrait,
};
use crate::service::dto::{
    DashboardData, DashboardFilter, MunicipalityOverview, MunicipalityStats, SystemOverview,
    UserStats,
};
use crate::service::stats;

const DASHBOARD_ALERTS: i64 = 5;
const DASHBOARD_TOP_COLLECTORS: usize = 5;

/// 统计看板服务
pub struct DashboardService<MuR, UR, CR, CoR, TR, MR>
where
    MuR: MunicipalityRepositoryTrait,
    UR: UserRepositoryTrait,
    CR: CollectorRepositoryTrait,
    CoR: CollectionRepositoryTrait,
    TR: TransactionRepositoryTrait,
    MR: MonitoringRepositoryTrait,
{
    municipality_repo: Arc<MuR>,
    user_repo: Arc<UR>,
    collector_repo: Arc<CR>,
    collection_repo: Arc<CoR>,
    transaction_repo: Arc<TR>,
    monitoring_repo: Arc<MR>,
    cache: Arc<Cache>,
    rewards: RewardsConfig,
}

impl<MuR, UR, CR, CoR, TR, MR> DashboardService<MuR, UR, CR, CoR, TR, MR>
where
    MuR: MunicipalityRepositoryTrait,
    UR: UserRepositoryTrait,
    CR: CollectorRepositoryTrait,
    CoR: CollectionRepositoryTrait,
    TR: TransactionRepositoryTrait,
    MR: MonitoringRepositoryTrait,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        municipality_repo: Arc<MuR>,
        user_repo: Arc<UR>,
        collector_repo: Arc<CR>,
        collection_repo: Arc<CoR>,
        transaction_repo: Arc<TR>,
        monitoring_repo: Arc<MR>,
        cache: Arc<Cache>,
        rewards: RewardsConfig,
    ) -> Self {
        Self {
            municipality_repo,
            user_repo,
            collector_repo,
            collection_repo,
            transaction_repo,
            monitoring_repo,
            cache,
            rewards,
        }
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(self.rewards.dashboard_cache_ttl_secs)
    }

    async fn ensure_municipality(&self, municipality_id: i64) -> Result<()> {
        self.municipality_repo
            .get(municipality_id)
            .await?
            .map(|_| ())
            .ok_or(RecyclingError::MunicipalityNotFound(municipality_id))
    }

    /// 市政统计
    #[instrument(skip(self))]
    pub async fn municipality_stats(&self, municipality_id: i64) -> Result<MunicipalityStats> {
        self.ensure_municipality(municipality_id).await?;

        let key = CacheKey::municipality_stats(municipality_id);
        self.cache
            .get_or_set(&key, self.ttl(), || async {
                let filter = CollectionFilter {
                    municipality_id: Some(municipality_id),
                    ..Default::default()
                };
                let (citizens, collections) = futures::try_join!(
                    self.user_repo.list_citizens(Some(municipality_id)),
                    self.collection_repo.list_all(&filter),
                )?;
                Ok::<_, RecyclingError>(stats::municipality_stats(
                    municipality_id,
                    &citizens,
                    &collections,
                    Utc::now(),
                ))
            })
            .await
    }

    /// 市政看板，带过滤条件时不走缓存
    #[instrument(skip(self, filter))]
    pub async fn dashboard(
        &self,
        municipality_id: i64,
        filter: DashboardFilter,
    ) -> Result<DashboardData> {
        self.ensure_municipality(municipality_id).await?;

        if filter.is_empty() {
            let key = CacheKey::municipality_dashboard(municipality_id);
            self.cache
                .get_or_set(&key, self.ttl(), || {
                    self.build_dashboard(municipality_id, &filter)
                })
                .await
        } else {
            self.build_dashboard(municipality_id, &filter).await
        }
    }

    async fn build_dashboard(
        &self,
        municipality_id: i64,
        filter: &DashboardFilter,
    ) -> Result<DashboardData> {
        let collection_filter = CollectionFilter {
            municipality_id: Some(municipality_id),
            ..Default::default()
        };
        let collector_filter = CollectorFilter {
            municipality_id: Some(municipality_id),
            ..Default::default()
        };
        let alert_filter = AlertFilter {
            municipality_id: Some(municipality_id),
            is_resolved: Some(false),
        };
        let (collections, collectors, (alerts, _)) = futures::try_join!(
            self.collection_repo.list_all(&collection_filter),
            self.collector_repo.list(&collector_filter),
            self.monitoring_repo
                .list_alerts(&alert_filter, DASHBOARD_ALERTS, 0),
        )?;

        let collections = stats::apply_dashboard_filter(collections, &collectors, filter);
        let summary = stats::summarize_collections(&collections);

        Ok(DashboardData {
            municipality_id,
            total_collections: summary.total_collections,
            total_weight: summary.total_weight,
            active_users: summary.participants,
            total_points: summary.total_points,
            environmental_impact: stats::environmental_impact(summary.total_weight, &self.rewards),
            recent_alerts: stats::recent_open_alerts(alerts, DASHBOARD_ALERTS as usize),
            top_collectors: stats::top_collectors(
                &collections,
                &collectors,
                DASHBOARD_TOP_COLLECTORS,
            ),
            material_distribution: stats::material_distribution(&collections),
            collection_trends: stats::weekday_trends(&collections),
            last_updated: Utc::now(),
        })
    }

    /// 系统总览（系统管理员）
    #[instrument(skip(self))]
    pub async fn system_overview(&self) -> Result<SystemOverview> {
        let key = CacheKey::system_overview();
        self.cache
            .get_or_set(&key, self.ttl(), || self.build_system_overview())
            .await
    }

    async fn build_system_overview(&self) -> Result<SystemOverview> {
        let collection_filter = CollectionFilter::default();
        let (municipalities, citizens, collections, active_alerts) = futures::try_join!(
            self.municipality_repo.list(false),
            self.user_repo.list_citizens(None),
            self.collection_repo.list_all(&collection_filter),
            self.monitoring_repo.count_open_alerts(None),
        )?;

        let mut citizens_by_muni: HashMap<i64, i64> = HashMap::new();
        for u in &citizens {
            if let Some(id) = u.municipality_id {
                *citizens_by_muni.entry(id).or_default() += 1;
            }
        }
        let mut collections_by_muni: HashMap<i64, (i64, f64, i64)> = HashMap::new();
        for c in &collections {
            let entry = collections_by_muni.entry(c.municipality_id).or_default();
            entry.0 += 1;
            entry.1 += c.weight;
            entry.2 += c.points;
        }

        let per_municipality = municipalities
            .iter()
            .map(|m| {
                let (count, weight, points) =
                    collections_by_muni.get(&m.id).copied().unwrap_or_default();
                MunicipalityOverview {
                    municipality_id: m.id,
                    name: m.name.clone(),
                    is_active: m.is_active,
                    citizens: citizens_by_muni.get(&m.id).copied().unwrap_or(0),
                    collections: count,
                    total_weight: weight,
                    total_points: points,
                }
            })
            .collect();

        let summary = stats::summarize_collections(&collections);
        Ok(SystemOverview {
            municipalities: municipalities.len() as i64,
            total_citizens: citizens.len() as i64,
            total_collections: summary.total_collections,
            total_weight: summary.total_weight,
            total_points_distributed: summary.total_points,
            active_alerts,
            per_municipality,
            last_updated: Utc::now(),
        })
    }

    /// 用户统计，排名在同市政市民中按累计获得积分计算
    #[instrument(skip(self))]
    pub async fn user_stats(&self, user_id: i64) -> Result<UserStats> {
        let user = self
            .user_repo
            .get(user_id)
            .await?
            .ok_or(RecyclingError::UserNotFound(user_id))?;

        let collection_filter = CollectionFilter {
            user_id: Some(user_id),
            ..Default::default()
        };
        let earned_filter = TransactionFilter {
            municipality_id: user.municipality_id,
            transaction_type: Some(TransactionType::Earned),
            ..Default::default()
        };
        let (collections, transactions, citizens, municipality_earned) = futures::try_join!(
            self.collection_repo.list_all(&collection_filter),
            self.transaction_repo.list_by_user(user_id),
            self.user_repo.list_citizens(user.municipality_id),
            self.transaction_repo.list_all(&earned_filter),
        )?;

        let now = Utc::now();
        let points = UserPoints::from_transactions(user_id, &transactions, now);
        let earned = stats::earned_by_user(&municipality_earned);
        let rank = stats::rank_of(user_id, &citizens, &earned);

        Ok(stats::user_stats(
            user_id,
            &collections,
            points.total_points,
            rank,
            now,
        ))
    }
}
