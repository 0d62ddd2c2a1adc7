//! HTTP 请求处理器模块
//!
//! 包含所有 REST API 端点的处理器实现

pub mod auth;
pub mod collection;
pub mod collector;
pub mod monitoring;
pub mod municipality;
pub mod reward;
pub mod rfid;
pub mod system;
pub mod transaction;
pub mod user;
pub mod zone;

use metalix_core::{RecyclingError, User};

use crate::auth::Claims;
use crate::error::{ApiError, Result};
use crate::state::AppState;

pub(crate) async fn load_user(state: &AppState, id: i64) -> Result<User> {
    Ok(state
        .repos
        .users
        .get(id)
        .await?
        .ok_or(RecyclingError::UserNotFound(id))?)
}

/// 写操作的目标市政：市政管理员默认并只能是本市政，系统管理员必须显式指定
pub(crate) fn target_municipality(claims: &Claims, requested: Option<i64>) -> Result<i64> {
    claims
        .scoped_filter(requested)?
        .ok_or_else(|| ApiError::Validation("必须指定 municipalityId".to_string()))
}
