//! test_utils 模块的集成测试

use chrono::{Duration, Utc};
use metalix_shared::test_utils::*;
use serde_json::json;

#[test]
fn test_unique_email_generation() {
    let a = test_email("citizen");
    let b = test_email("citizen");
    assert_ne!(a, b);
    assert!(a.starts_with("citizen-"));
    assert!(a.ends_with("@metalix.test"));
}

#[test]
fn test_municipality_code_is_uppercase() {
    let code = test_municipality_code();
    assert!(code.starts_with('T'));
    assert_eq!(code, code.to_uppercase());
}

#[test]
fn test_register_request_shape() {
    let body = TestDataGenerator::register_request("a@b.test", 3);
    assert_eq!(body["email"], "a@b.test");
    assert_eq!(body["municipalityId"], 3);
    TestAssertions::assert_json_has_field(&body, "password");
    TestAssertions::assert_json_has_field(&body, "firstName");
}

#[test]
fn test_deposit_request_shape() {
    let body = TestDataGenerator::deposit_request(1, 2, 1.5, "PLASTIC");
    assert_eq!(body["weight"], 1.5);
    assert_eq!(body["recyclableType"], "PLASTIC");
}

#[test]
fn test_reward_request_names_are_unique() {
    let a = TestDataGenerator::reward_request(1, 100, 5);
    let b = TestDataGenerator::reward_request(1, 100, 5);
    assert_ne!(a["name"], b["name"]);
    assert_eq!(a["pointsCost"], 100);
}

#[test]
fn test_api_envelope_assertions() {
    TestAssertions::assert_api_success(&json!({"success": true, "code": "SUCCESS"}));
    TestAssertions::assert_api_error(
        &json!({"success": false, "code": "INSUFFICIENT_POINTS"}),
        "INSUFFICIENT_POINTS",
    );
}

#[test]
#[should_panic]
fn test_api_success_assertion_fails_on_error() {
    TestAssertions::assert_api_success(&json!({"success": false, "code": "NOT_FOUND"}));
}

#[test]
fn test_time_within() {
    let now = Utc::now();
    TestAssertions::assert_time_within(now, now + Duration::seconds(1), Duration::seconds(2));
}

#[test]
fn test_config_helpers() {
    let db = test_database_config();
    assert_eq!(db.max_connections, 5);
    let auth = test_auth_config();
    assert_eq!(auth.jwt_issuer, "metalix-test");
    assert!(test_redis_config().url.starts_with("redis://"));
}
