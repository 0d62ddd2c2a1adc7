//! PostgreSQL 仓储集成测试
//!
//! 投放、兑换和取消兑换都在仓储内部开事务，mock 覆盖不到锁和回滚，
//! 因此用真实数据库验证。
//!
//! ## 运行方式
//!
//! ```bash
//! DATABASE_URL=postgres://... cargo test -p metalix-core --test pg_flow_test -- --ignored
//! ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use fake::Fake;
use fake::faker::name::en::{FirstName, LastName};
use metalix_core::error::RecyclingError;
use metalix_core::models::{
    CollectorStatus, ContactInfo, Location, NewCollector, NewDeposit, NewMunicipality, NewReward,
    NewUser, RecyclableType, RewardCategory, RewardChanges, TransactionStatus, TransactionType,
    UserPoints, UserRole,
};
use metalix_core::repository::{
    CollectionRepository, CollectorRepository, MunicipalityRepository, RewardRepository,
    RfidCardRepository, TransactionRepository, UserRepository,
};
use metalix_shared::database::Database;
use metalix_shared::test_utils::{test_database_config, test_email, test_municipality_code};

// ==================== 辅助函数 ====================

async fn setup() -> Database {
    let db = Database::connect(&test_database_config())
        .await
        .expect("无法连接数据库，请确保 PostgreSQL 正在运行");
    db.run_migrations().await.expect("迁移失败");
    db
}

async fn seed_municipality(db: &Database) -> i64 {
    MunicipalityRepository::new(db.pool().clone())
        .create(&NewMunicipality {
            name: "Integração".to_string(),
            code: test_municipality_code(),
            region: "Lisboa".to_string(),
            population: 1000,
            area: 10.0,
            contact_info: ContactInfo {
                email: test_email("muni"),
                phone: "+351 210 000 000".to_string(),
                address: "Praça do Município".to_string(),
                website: None,
            },
        })
        .await
        .expect("创建市政失败")
        .id
}

async fn seed_citizen(db: &Database, municipality_id: i64) -> i64 {
    UserRepository::new(db.pool().clone())
        .create(&NewUser {
            email: test_email("citizen"),
            password_hash: "$2b$04$integration".to_string(),
            first_name: FirstName().fake(),
            last_name: LastName().fake(),
            role: UserRole::Citizen,
            municipality_id: Some(municipality_id),
            phone: None,
            address: None,
            city: None,
            zip_code: None,
        })
        .await
        .expect("创建市民失败")
        .id
}

async fn seed_collector(db: &Database, municipality_id: i64, capacity: f64) -> i64 {
    CollectorRepository::new(db.pool().clone())
        .create(&NewCollector {
            municipality_id,
            zone_id: None,
            name: "Ecoponto Teste".to_string(),
            location: Location {
                latitude: 38.72,
                longitude: -9.14,
                address: "Rua Augusta".to_string(),
            },
            capacity,
        })
        .await
        .expect("创建回收点失败")
        .id
}

async fn seed_reward(db: &Database, municipality_id: i64, points_cost: i64, stock: i32) -> i64 {
    RewardRepository::new(db.pool().clone())
        .create(&NewReward {
            municipality_id,
            name: format!("Voucher {}", test_municipality_code()),
            description: "Integração".to_string(),
            points_cost,
            category: RewardCategory::Shopping,
            stock,
            valid_until: None,
        })
        .await
        .expect("创建奖励失败")
        .id
}

fn deposit(user_id: i64, collector_id: i64, municipality_id: i64, weight: f64) -> NewDeposit {
    NewDeposit {
        user_id,
        collector_id,
        municipality_id,
        weight,
        recyclable_type: RecyclableType::Plastic,
        points: (weight * 20.0).floor() as i64,
        verification_method: None,
        rfid_card: None,
        description: "集成测试投放".to_string(),
    }
}

// ==================== 投放 ====================

#[tokio::test]
#[ignore = "需要 PostgreSQL 数据库连接"]
async fn test_deposit_writes_collection_transaction_and_weight() {
    let db = setup().await;
    let municipality_id = seed_municipality(&db).await;
    let user_id = seed_citizen(&db, municipality_id).await;
    let collector_id = seed_collector(&db, municipality_id, 100.0).await;

    let outcome = CollectionRepository::new(db.pool().clone())
        .record_deposit(&deposit(user_id, collector_id, municipality_id, 2.5))
        .await
        .unwrap();

    assert_eq!(outcome.collection.points, 50);
    assert_eq!(outcome.transaction.transaction_type, TransactionType::Earned);
    assert_eq!(outcome.transaction.collection_id, Some(outcome.collection.id));
    assert!((outcome.collector.current_weight - 2.5).abs() < 1e-9);

    let txs = TransactionRepository::new(db.pool().clone())
        .list_by_user(user_id)
        .await
        .unwrap();
    let points = UserPoints::from_transactions(user_id, &txs, Utc::now());
    assert_eq!(points.available_points, 50);
}

#[tokio::test]
#[ignore = "需要 PostgreSQL 数据库连接"]
async fn test_deposit_over_capacity_rolls_back() {
    let db = setup().await;
    let municipality_id = seed_municipality(&db).await;
    let user_id = seed_citizen(&db, municipality_id).await;
    let collector_id = seed_collector(&db, municipality_id, 5.0).await;
    let repo = CollectionRepository::new(db.pool().clone());

    repo.record_deposit(&deposit(user_id, collector_id, municipality_id, 4.0))
        .await
        .unwrap();
    let err = repo
        .record_deposit(&deposit(user_id, collector_id, municipality_id, 2.0))
        .await
        .unwrap_err();
    assert!(matches!(err, RecyclingError::CollectorFull { .. }));

    let collector = CollectorRepository::new(db.pool().clone())
        .get(collector_id)
        .await
        .unwrap()
        .unwrap();
    assert!((collector.current_weight - 4.0).abs() < 1e-9);
    assert_eq!(collector.status, CollectorStatus::Active);
}

// ==================== 兑换 ====================

#[tokio::test]
#[ignore = "需要 PostgreSQL 数据库连接"]
async fn test_concurrent_redemptions_never_overdraw() {
    let db = setup().await;
    let municipality_id = seed_municipality(&db).await;
    let user_id = seed_citizen(&db, municipality_id).await;
    let collector_id = seed_collector(&db, municipality_id, 1000.0).await;
    // 5 kg = 100 积分，只够兑换一次
    CollectionRepository::new(db.pool().clone())
        .record_deposit(&deposit(user_id, collector_id, municipality_id, 5.0))
        .await
        .unwrap();
    let reward_id = seed_reward(&db, municipality_id, 80, 10).await;

    let repo = Arc::new(RewardRepository::new(db.pool().clone()));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let repo = repo.clone();
            tokio::spawn(async move { repo.redeem(user_id, reward_id, Utc::now()).await })
        })
        .collect();

    let mut succeeded = 0;
    let mut insufficient = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(RecyclingError::InsufficientPoints { .. }) => insufficient += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(succeeded, 1);
    assert_eq!(insufficient, 1);

    let txs = TransactionRepository::new(db.pool().clone())
        .list_by_user(user_id)
        .await
        .unwrap();
    let points = UserPoints::from_transactions(user_id, &txs, Utc::now());
    assert_eq!(points.available_points, 20);

    let reward = repo.get(reward_id).await.unwrap().unwrap();
    assert_eq!(reward.stock, 9);
}

#[tokio::test]
#[ignore = "需要 PostgreSQL 数据库连接"]
async fn test_concurrent_redemption_receipts_report_locked_balance() {
    let db = setup().await;
    let municipality_id = seed_municipality(&db).await;
    let user_id = seed_citizen(&db, municipality_id).await;
    let collector_id = seed_collector(&db, municipality_id, 1000.0).await;
    // 100 积分，两次 40 积分的兑换都能成功
    CollectionRepository::new(db.pool().clone())
        .record_deposit(&deposit(user_id, collector_id, municipality_id, 5.0))
        .await
        .unwrap();
    let reward_id = seed_reward(&db, municipality_id, 40, 10).await;

    let repo = Arc::new(RewardRepository::new(db.pool().clone()));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let repo = repo.clone();
            tokio::spawn(async move { repo.redeem(user_id, reward_id, Utc::now()).await })
        })
        .collect();

    let mut balances = Vec::new();
    for handle in handles {
        balances.push(handle.await.unwrap().unwrap().available_after);
    }
    balances.sort_unstable();
    assert_eq!(balances, vec![20, 60]);
}

#[tokio::test]
#[ignore = "需要 PostgreSQL 数据库连接"]
async fn test_cancel_redemption_restores_points_and_stock() {
    let db = setup().await;
    let municipality_id = seed_municipality(&db).await;
    let user_id = seed_citizen(&db, municipality_id).await;
    let collector_id = seed_collector(&db, municipality_id, 1000.0).await;
    CollectionRepository::new(db.pool().clone())
        .record_deposit(&deposit(user_id, collector_id, municipality_id, 10.0))
        .await
        .unwrap();
    let reward_id = seed_reward(&db, municipality_id, 150, 1).await;
    let repo = RewardRepository::new(db.pool().clone());

    let redeemed = repo
        .redeem(user_id, reward_id, Utc::now())
        .await
        .unwrap()
        .transaction;
    assert_eq!(redeemed.points, -150);
    assert_eq!(repo.get(reward_id).await.unwrap().unwrap().stock, 0);

    let outcome = repo.cancel_redemption(redeemed.id).await.unwrap();
    assert_eq!(outcome.cancelled.status, TransactionStatus::Cancelled);
    assert_eq!(outcome.refund.transaction_type, TransactionType::Refunded);
    assert_eq!(outcome.refund.points, 150);
    assert_eq!(repo.get(reward_id).await.unwrap().unwrap().stock, 1);

    let err = repo.cancel_redemption(redeemed.id).await.unwrap_err();
    assert_eq!(err.error_code(), "INVALID_TRANSACTION_STATE");

    let txs = TransactionRepository::new(db.pool().clone())
        .list_by_user(user_id)
        .await
        .unwrap();
    let points = UserPoints::from_transactions(user_id, &txs, Utc::now());
    assert_eq!(points.available_points, 200);
}

#[tokio::test]
#[ignore = "需要 PostgreSQL 数据库连接"]
async fn test_update_reward_sets_and_clears_valid_until() {
    let db = setup().await;
    let municipality_id = seed_municipality(&db).await;
    let reward_id = seed_reward(&db, municipality_id, 100, 5).await;
    let repo = RewardRepository::new(db.pool().clone());

    let expiry = Utc::now() + Duration::days(30);
    let updated = repo
        .update(
            reward_id,
            &RewardChanges {
                valid_until: Some(expiry),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert!(updated.valid_until.is_some());

    // 只改库存不影响有效期
    let updated = repo
        .update(
            reward_id,
            &RewardChanges {
                stock: Some(8),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert!(updated.valid_until.is_some());
    assert_eq!(updated.stock, 8);

    let cleared = repo
        .update(
            reward_id,
            &RewardChanges {
                clear_valid_until: true,
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert!(cleared.valid_until.is_none());
    assert_eq!(cleared.stock, 8);
}

// ==================== RFID ====================

#[tokio::test]
#[ignore = "需要 PostgreSQL 数据库连接"]
async fn test_issue_card_deactivates_previous() {
    let db = setup().await;
    let municipality_id = seed_municipality(&db).await;
    let user_id = seed_citizen(&db, municipality_id).await;
    let repo = RfidCardRepository::new(db.pool().clone());

    let first = repo
        .issue(user_id, &format!("RFIDT{user_id}"))
        .await
        .unwrap();
    let second = repo
        .issue(user_id, &format!("RFIDT{user_id}-2"))
        .await
        .unwrap();

    let active = repo.find_active_by_user(user_id).await.unwrap().unwrap();
    assert_eq!(active.id, second.id);
    let old = repo.get(first.id).await.unwrap().unwrap();
    assert!(!old.is_active);
    assert_eq!(repo.count_by_user(user_id).await.unwrap(), 2);
}
