//! Redis 缓存管理模块
//!
//! 提供 Redis 连接管理和常用缓存操作封装，主要用于看板聚合结果缓存。

use crate::config::RedisConfig;
use crate::error::{Result, SharedError};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Redis 缓存客户端
#[derive(Clone)]
pub struct Cache {
    client: Client,
}

impl Cache {
    /// 创建 Redis 客户端（不会立即建立连接）
    pub fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;
        info!("Redis client created");
        Ok(Self { client })
    }

    async fn get_conn(&self) -> Result<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(SharedError::from)
    }

    /// 健康检查
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.get_conn().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(SharedError::from)
    }

    /// 获取值
    #[instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.get_conn().await?;
        let value: Option<String> = conn.get(key).await?;

        match value {
            Some(v) => Ok(Some(serde_json::from_str(&v)?)),
            None => Ok(None),
        }
    }

    /// 设置值
    #[instrument(skip(self, value))]
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let mut conn = self.get_conn().await?;
        let serialized = serde_json::to_string(value)?;

        let _: () = conn.set_ex(key, serialized, ttl.as_secs()).await?;
        Ok(())
    }

    /// 批量删除指定键
    #[instrument(skip(self))]
    pub async fn delete_many(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.get_conn().await?;
        let count: u64 = conn.del(keys).await?;
        Ok(count)
    }

    /// 读取缓存，未命中时调用 loader 并回写
    ///
    /// Redis 故障只记录告警并直接走 loader，不影响请求结果
    #[instrument(skip(self, loader))]
    pub async fn get_or_set<T, F, Fut, E>(
        &self,
        key: &str,
        ttl: Duration,
        loader: F,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = std::result::Result<T, E>>,
    {
        match self.get::<T>(key).await {
            Ok(Some(cached)) => return Ok(cached),
            Ok(None) => {}
            Err(e) => warn!(key, error = %e, "读取缓存失败，回源加载"),
        }

        let value = loader().await?;
        if let Err(e) = self.set(key, &value, ttl).await {
            warn!(key, error = %e, "写入缓存失败");
        }

        Ok(value)
    }

    /// 批量失效，失败只记录告警
    pub async fn invalidate(&self, keys: &[String]) {
        if let Err(e) = self.delete_many(keys).await {
            warn!(?keys, error = %e, "缓存失效失败");
        }
    }
}

/// 缓存键生成器
pub struct CacheKey;

impl CacheKey {
    pub fn municipality_dashboard(municipality_id: i64) -> String {
        format!("metalix:dashboard:{}", municipality_id)
    }

    pub fn municipality_stats(municipality_id: i64) -> String {
        format!("metalix:stats:municipality:{}", municipality_id)
    }

    pub fn system_overview() -> String {
        "metalix:stats:system".to_string()
    }

    /// 回收点数据变化时需要失效的键
    pub fn municipality_keys(municipality_id: i64) -> Vec<String> {
        vec![
            Self::municipality_dashboard(municipality_id),
            Self::municipality_stats(municipality_id),
            Self::system_overview(),
        ]
    }
}
