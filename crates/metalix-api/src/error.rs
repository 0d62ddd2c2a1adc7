//! API 错误类型定义
//!
//! 把认证错误和领域错误统一映射为 HTTP 状态码与响应信封

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use metalix_core::RecyclingError;
use serde_json::json;

/// API 层错误类型
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // 认证错误
    #[error("未授权: {0}")]
    Unauthorized(String),
    #[error("禁止访问: {0}")]
    Forbidden(String),
    #[error("邮箱或密码错误")]
    InvalidCredentials,
    #[error("用户已被禁用")]
    UserDisabled,
    #[error("用户已被锁定，请稍后重试")]
    UserLocked,

    // 验证错误
    #[error("参数验证失败: {0}")]
    Validation(String),

    #[error("资源不存在: {0}")]
    NotFound(String),

    // 领域错误
    #[error(transparent)]
    Domain(#[from] RecyclingError),

    // 系统错误
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
    #[error("内部错误: {0}")]
    Internal(String),
}

impl ApiError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) | Self::UserDisabled | Self::UserLocked => StatusCode::FORBIDDEN,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Domain(e) => domain_status(e),
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::UserDisabled => "USER_DISABLED",
            Self::UserLocked => "USER_LOCKED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Domain(e) => e.error_code(),
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn is_system_error(&self) -> bool {
        self.status_code() == StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn domain_status(err: &RecyclingError) -> StatusCode {
    match err {
        e if e.is_not_found() => StatusCode::NOT_FOUND,
        RecyclingError::MunicipalityMismatch { .. }
        | RecyclingError::UserInactive(_)
        | RecyclingError::NotACitizen(_) => StatusCode::FORBIDDEN,
        RecyclingError::Validation(_) | RecyclingError::InvalidWeight(_) => StatusCode::BAD_REQUEST,
        e if e.is_business_error() => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志
        let message = if self.is_system_error() {
            tracing::error!(error = %self, code = self.error_code(), "请求处理失败");
            "服务内部错误，请稍后重试".to_string()
        } else {
            self.to_string()
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

/// 从 validator 错误转换
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

/// API 层 Result 类型别名
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    fn all_error_variants() -> Vec<(ApiError, StatusCode, &'static str)> {
        vec![
            (ApiError::Unauthorized("token expired".into()), StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            (ApiError::InvalidCredentials, StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            (ApiError::Forbidden("role".into()), StatusCode::FORBIDDEN, "FORBIDDEN"),
            (ApiError::UserDisabled, StatusCode::FORBIDDEN, "USER_DISABLED"),
            (ApiError::UserLocked, StatusCode::FORBIDDEN, "USER_LOCKED"),
            (ApiError::Validation("email".into()), StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            (ApiError::NotFound("route".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            // 领域错误按类别映射
            (RecyclingError::RewardNotFound(1).into(), StatusCode::NOT_FOUND, "REWARD_NOT_FOUND"),
            (RecyclingError::RfidCardNotFound("RFID001".into()).into(), StatusCode::NOT_FOUND, "RFID_CARD_NOT_FOUND"),
            (
                RecyclingError::MunicipalityMismatch { expected: 1, actual: 2 }.into(),
                StatusCode::FORBIDDEN,
                "MUNICIPALITY_MISMATCH",
            ),
            (RecyclingError::NotACitizen(3).into(), StatusCode::FORBIDDEN, "NOT_A_CITIZEN"),
            (RecyclingError::UserInactive(3).into(), StatusCode::FORBIDDEN, "USER_INACTIVE"),
            (RecyclingError::InvalidWeight(-1.0).into(), StatusCode::BAD_REQUEST, "INVALID_WEIGHT"),
            (RecyclingError::Validation("x".into()).into(), StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            (
                RecyclingError::InsufficientPoints { required: 500, available: 120 }.into(),
                StatusCode::CONFLICT,
                "INSUFFICIENT_POINTS",
            ),
            (RecyclingError::RewardOutOfStock(1).into(), StatusCode::CONFLICT, "REWARD_OUT_OF_STOCK"),
            (
                RecyclingError::CollectorFull { collector_id: 1, remaining: 0.5 }.into(),
                StatusCode::CONFLICT,
                "COLLECTOR_FULL",
            ),
            (RecyclingError::Conflict("email".into()).into(), StatusCode::CONFLICT, "CONFLICT"),
            (RecyclingError::Redis("down".into()).into(), StatusCode::INTERNAL_SERVER_ERROR, "REDIS_ERROR"),
            (RecyclingError::Internal("boom".into()).into(), StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            (ApiError::Database(sqlx::Error::PoolTimedOut), StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            (ApiError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        ]
    }

    #[test]
    fn test_error_status_and_codes() {
        for (err, status, code) in all_error_variants() {
            assert_eq!(err.status_code(), status, "status mismatch for {err:?}");
            assert_eq!(err.error_code(), code, "code mismatch for {err:?}");
        }
    }

    #[tokio::test]
    async fn test_business_error_body_keeps_message() {
        let err: ApiError = RecyclingError::InsufficientPoints {
            required: 500,
            available: 120,
        }
        .into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "INSUFFICIENT_POINTS");
        assert!(body["message"].as_str().unwrap().contains("500"));
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn test_system_error_hides_detail() {
        let err = ApiError::Internal("connection string leaked".into());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "服务内部错误，请稍后重试");
    }
}
