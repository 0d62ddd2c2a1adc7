//! 认证 API 处理器
//!
//! 登录、注册、登出、当前用户和 Token 刷新

use axum::{Extension, Json, extract::State};
use chrono::{Duration, Utc};
use metalix_core::{NewUser, RecyclingError, User, UserRole};
use tracing::{info, warn};
use validator::Validate;

use crate::{
    auth::{Claims, hash_password, verify_password},
    dto::{
        ApiResponse, LoginRequest, LoginResponse, RefreshResponse, RegisterRequest,
        RegisterResponse,
    },
    error::{ApiError, Result},
    handlers::load_user,
    state::AppState,
};

/// 用户登录
///
/// POST /api/auth/login
///
/// 邮箱不存在和密码错误返回同一个错误码；连续失败达到上限后锁定账户
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>> {
    req.validate()?;

    let user = state
        .repos
        .users
        .find_by_email(req.email.trim())
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    let now = Utc::now();
    if !user.is_active {
        warn!(user_id = user.id, "已停用账户尝试登录");
        return Err(ApiError::UserDisabled);
    }
    if user.is_locked(now) {
        warn!(user_id = user.id, "锁定中的账户尝试登录");
        return Err(ApiError::UserLocked);
    }

    if !verify_password(&req.password, &user.password_hash)? {
        let lock_until = now + Duration::minutes(state.auth.lock_minutes);
        state
            .repos
            .users
            .record_login_failure(user.id, state.auth.max_failed_logins, lock_until)
            .await?;
        warn!(
            user_id = user.id,
            attempts = user.failed_login_attempts + 1,
            "登录失败：密码错误"
        );
        return Err(ApiError::InvalidCredentials);
    }

    state.repos.users.record_login_success(user.id).await?;
    let (token, expires_at) = state.jwt_manager.generate_token(&user)?;
    info!(user_id = user.id, role = user.role.as_str(), "用户登录成功");

    let user = User {
        failed_login_attempts: 0,
        locked_until: None,
        last_login_at: Some(now),
        ..user
    };

    Ok(Json(ApiResponse::success(LoginResponse {
        token,
        expires_at,
        user,
    })))
}

/// 市民注册
///
/// POST /api/auth/register
///
/// 注册成功后自动发放第一张 RFID 卡并直接返回登录 Token
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<RegisterResponse>>> {
    req.validate()?;

    let municipality = state
        .repos
        .municipalities
        .get(req.municipality_id)
        .await?
        .ok_or(RecyclingError::MunicipalityNotFound(req.municipality_id))?;
    if !municipality.is_active {
        return Err(ApiError::Validation(format!(
            "市政 {} 暂未开放注册",
            municipality.name
        )));
    }

    let password_hash = hash_password(&req.password)?;
    let user = state
        .repos
        .users
        .create(&NewUser {
            email: req.email.trim().to_lowercase(),
            password_hash,
            first_name: req.first_name,
            last_name: req.last_name,
            role: UserRole::Citizen,
            municipality_id: Some(municipality.id),
            phone: req.phone,
            address: req.address,
            city: req.city,
            zip_code: req.zip_code,
        })
        .await?;

    // 账户已创建，发卡失败只记录日志，管理员可稍后补发
    let rfid_card = match state.identification_service.issue_card(user.id).await {
        Ok(card) => Some(card),
        Err(e) => {
            warn!(user_id = user.id, error = %e, "注册后自动发卡失败");
            None
        }
    };

    let (token, expires_at) = state.jwt_manager.generate_token(&user)?;
    info!(
        user_id = user.id,
        municipality_id = municipality.id,
        "市民注册成功"
    );

    Ok(Json(ApiResponse::success(RegisterResponse {
        token,
        expires_at,
        user,
        rfid_card,
    })))
}

/// 用户登出
///
/// POST /api/auth/logout
pub async fn logout(Extension(claims): Extension<Claims>) -> Result<Json<ApiResponse<()>>> {
    // JWT 无状态，客户端丢弃 Token 即可
    info!(user_id = %claims.sub, "用户登出");
    Ok(Json(ApiResponse::success_empty()))
}

/// 当前用户信息
///
/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResponse<User>>> {
    let user = load_user(&state, claims.user_id()?).await?;
    if !user.is_active {
        return Err(ApiError::UserDisabled);
    }
    Ok(Json(ApiResponse::success(user)))
}

/// 刷新 Token
///
/// POST /api/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResponse<RefreshResponse>>> {
    // 停用的账户不能续期
    let user = load_user(&state, claims.user_id()?).await?;
    if !user.is_active {
        return Err(ApiError::UserDisabled);
    }

    let (token, expires_at) = state.jwt_manager.generate_token(&user)?;
    Ok(Json(ApiResponse::success(RefreshResponse {
        token,
        expires_at,
    })))
}
