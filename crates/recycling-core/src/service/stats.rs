//! 统计聚合
//!
//! 看板与报表的纯函数实现，对已拉取的记录做内存归约

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Datelike, Utc};
use metalix_shared::config::RewardsConfig;

use crate::models::{
    Alert, RecyclableType, RewardTransaction, TransactionType, User, WasteCollection,
    WasteCollector,
};
use crate::service::dto::{
    CollectionSummary, DashboardFilter, EnvironmentalImpact, MaterialShare, MunicipalityStats,
    TopCollector, TrendPoint, UserStats,
};

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// 保留一位小数
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn summarize_collections(collections: &[WasteCollection]) -> CollectionSummary {
    let total_collections = collections.len() as i64;
    let total_weight: f64 = collections.iter().map(|c| c.weight).sum();
    let total_points: i64 = collections.iter().map(|c| c.points).sum();
    let participants = collections
        .iter()
        .map(|c| c.user_id)
        .collect::<HashSet<_>>()
        .len() as i64;
    let average_weight = if total_collections > 0 {
        total_weight / total_collections as f64
    } else {
        0.0
    };

    CollectionSummary {
        total_collections,
        total_weight,
        total_points,
        participants,
        average_weight,
    }
}

pub fn environmental_impact(total_weight: f64, rewards: &RewardsConfig) -> EnvironmentalImpact {
    let co2_saved = total_weight * rewards.co2_kg_per_kg;
    let trees_equivalent = if rewards.co2_kg_per_tree > 0.0 {
        (co2_saved / rewards.co2_kg_per_tree).floor() as i64
    } else {
        0
    };

    EnvironmentalImpact {
        co2_saved,
        energy_saved: total_weight * rewards.energy_kwh_per_kg,
        trees_equivalent,
    }
}

/// 参与率百分比，无用户时为 0
pub fn participation_rate(participants: i64, total_users: i64) -> f64 {
    if total_users <= 0 {
        return 0.0;
    }
    round1(participants as f64 / total_users as f64 * 100.0)
}

pub fn municipality_stats(
    municipality_id: i64,
    citizens: &[User],
    collections: &[WasteCollection],
    now: DateTime<Utc>,
) -> MunicipalityStats {
    let summary = summarize_collections(collections);
    let total_users = citizens.len() as i64;
    let active_users = citizens.iter().filter(|u| u.is_active).count() as i64;

    MunicipalityStats {
        municipality_id,
        total_users,
        active_users,
        total_collections: summary.total_collections,
        total_weight: summary.total_weight,
        total_points: summary.total_points,
        average_participation: participation_rate(summary.participants, total_users),
        last_updated: now,
    }
}

/// 按总重量排序的回收点，重量相同按投放次数
pub fn top_collectors(
    collections: &[WasteCollection],
    collectors: &[WasteCollector],
    limit: usize,
) -> Vec<TopCollector> {
    let mut totals: HashMap<i64, (f64, i64)> = HashMap::new();
    for c in collections {
        let entry = totals.entry(c.collector_id).or_default();
        entry.0 += c.weight;
        entry.1 += 1;
    }

    let names: HashMap<i64, &str> = collectors.iter().map(|c| (c.id, c.name.as_str())).collect();

    let mut ranked: Vec<TopCollector> = totals
        .into_iter()
        .map(|(collector_id, (total_weight, collections))| TopCollector {
            collector_id,
            name: names
                .get(&collector_id)
                .map(|n| n.to_string())
                .unwrap_or_else(|| format!("#{collector_id}")),
            total_weight,
            collections,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.total_weight
            .total_cmp(&a.total_weight)
            .then(b.collections.cmp(&a.collections))
            .then(a.collector_id.cmp(&b.collector_id))
    });
    ranked.truncate(limit);
    ranked
}

/// 各类回收物的重量与占比，按重量降序
pub fn material_distribution(collections: &[WasteCollection]) -> Vec<MaterialShare> {
    let total: f64 = collections.iter().map(|c| c.weight).sum();
    if total <= 0.0 {
        return Vec::new();
    }

    let mut weights: HashMap<RecyclableType, f64> = HashMap::new();
    for c in collections {
        *weights.entry(c.recyclable_type).or_default() += c.weight;
    }

    let mut shares: Vec<MaterialShare> = weights
        .into_iter()
        .map(|(recyclable_type, weight)| MaterialShare {
            recyclable_type,
            weight,
            percentage: round1(weight / total * 100.0),
        })
        .collect();
    shares.sort_by(|a, b| {
        b.weight
            .total_cmp(&a.weight)
            .then(a.recyclable_type.cmp(&b.recyclable_type))
    });
    shares
}

/// 周一到周日七个桶，重量保留一位小数
pub fn weekday_trends(collections: &[WasteCollection]) -> Vec<TrendPoint> {
    let mut buckets = [(0_i64, 0.0_f64); 7];
    for c in collections {
        let idx = c.created_at.weekday().num_days_from_monday() as usize;
        buckets[idx].0 += 1;
        buckets[idx].1 += c.weight;
    }

    WEEKDAYS
        .iter()
        .zip(buckets)
        .map(|(day, (collections, weight))| TrendPoint {
            day: day.to_string(),
            collections,
            weight: round1(weight),
        })
        .collect()
}

/// 最近的未解决告警，新的在前
pub fn recent_open_alerts(mut alerts: Vec<Alert>, limit: usize) -> Vec<Alert> {
    alerts.retain(|a| !a.is_resolved);
    alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    alerts.truncate(limit);
    alerts
}

/// 看板过滤：按回收物类型、回收点、区域和时间段
pub fn apply_dashboard_filter(
    collections: Vec<WasteCollection>,
    collectors: &[WasteCollector],
    filter: &DashboardFilter,
) -> Vec<WasteCollection> {
    if filter.is_empty() {
        return collections;
    }

    let zone_members: Option<HashSet<i64>> = filter.zone_id.map(|zone_id| {
        collectors
            .iter()
            .filter(|c| c.zone_id == Some(zone_id))
            .map(|c| c.id)
            .collect()
    });

    collections
        .into_iter()
        .filter(|c| filter.recyclable_type.is_none_or(|t| c.recyclable_type == t))
        .filter(|c| filter.collector_id.is_none_or(|id| c.collector_id == id))
        .filter(|c| {
            zone_members
                .as_ref()
                .is_none_or(|members| members.contains(&c.collector_id))
        })
        .filter(|c| filter.from.is_none_or(|from| c.created_at >= from))
        .filter(|c| filter.to.is_none_or(|to| c.created_at <= to))
        .collect()
}

/// 每个用户的累计获得积分
pub fn earned_by_user(transactions: &[RewardTransaction]) -> HashMap<i64, i64> {
    let mut earned = HashMap::new();
    for t in transactions
        .iter()
        .filter(|t| t.transaction_type == TransactionType::Earned)
    {
        *earned.entry(t.user_id).or_default() += t.points;
    }
    earned
}

/// 排名：比该用户积分严格更高的市民数 + 1，同分并列
pub fn rank_of(user_id: i64, citizens: &[User], earned: &HashMap<i64, i64>) -> i64 {
    let own = earned.get(&user_id).copied().unwrap_or(0);
    let ahead = citizens
        .iter()
        .filter(|u| u.id != user_id)
        .filter(|u| earned.get(&u.id).copied().unwrap_or(0) > own)
        .count() as i64;
    ahead + 1
}

pub fn user_stats(
    user_id: i64,
    collections: &[WasteCollection],
    total_points: i64,
    rank: i64,
    now: DateTime<Utc>,
) -> UserStats {
    let summary = summarize_collections(collections);
    let this_month: Vec<&WasteCollection> = collections
        .iter()
        .filter(|c| c.created_at.year() == now.year() && c.created_at.month() == now.month())
        .collect();

    UserStats {
        user_id,
        total_collections: summary.total_collections,
        total_weight: summary.total_weight,
        total_points,
        average_weight: summary.average_weight,
        collections_this_month: this_month.len() as i64,
        points_this_month: this_month.iter().map(|c| c.points).sum(),
        rank,
        last_updated: now,
    }
}
