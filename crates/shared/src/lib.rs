//! Metalix 共享库
//!
//! 包含各 crate 共用的配置加载、错误处理、数据库连接、缓存和可观测性基础设施。

pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod observability;
pub mod test_utils;
