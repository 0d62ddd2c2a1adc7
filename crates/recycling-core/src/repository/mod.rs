//! 数据库仓储层
//!
//! 提供所有实体的数据访问接口，封装 SQL 操作细节。
//!
//! ## 设计原则
//!
//! - 仓储只负责数据持久化，业务校验在服务层完成
//! - 使用 SQLx 运行时查询，枚举以 varchar 存储
//! - 兑换、投放、发卡等多表写操作在仓储内部用事务保证原子性
//! - 定义 trait 接口以支持 mock 测试

mod collection_repo;
mod collector_repo;
mod monitoring_repo;
mod municipality_repo;
mod reward_repo;
mod rfid_repo;
mod traits;
mod transaction_repo;
mod user_repo;

pub use collection_repo::CollectionRepository;
pub use collector_repo::CollectorRepository;
pub use monitoring_repo::MonitoringRepository;
pub use municipality_repo::MunicipalityRepository;
pub use reward_repo::RewardRepository;
pub use rfid_repo::RfidCardRepository;
pub use traits::*;
pub use transaction_repo::TransactionRepository;
pub use user_repo::UserRepository;
