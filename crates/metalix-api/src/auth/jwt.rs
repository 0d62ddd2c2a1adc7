//! JWT Token 处理
//!
//! 提供 JWT Token 的生成和验证功能

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use metalix_core::{User, UserRole};
use metalix_shared::config::AuthConfig;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// JWT 配置
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// 签名密钥
    pub secret: String,
    /// Token 过期时间（秒）
    pub expires_in_secs: i64,
    /// Token 签发者
    pub issuer: String,
}

impl From<&AuthConfig> for JwtConfig {
    fn from(config: &AuthConfig) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            expires_in_secs: config.jwt_expires_secs,
            issuer: config.jwt_issuer.clone(),
        }
    }
}

/// JWT Claims（Token 载荷）
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// 用户 ID
    pub sub: String,
    pub email: String,
    pub role: UserRole,
    /// 所属市政，系统管理员为空
    pub municipality_id: Option<i64>,
    /// 签发时间
    pub iat: i64,
    /// 过期时间
    pub exp: i64,
    /// 签发者
    pub iss: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, ApiError> {
        self.sub
            .parse()
            .map_err(|_| ApiError::Unauthorized("无效的用户 ID".to_string()))
    }
}

/// JWT 管理器
#[derive(Clone)]
pub struct JwtManager {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtManager {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// 为用户签发 Token，返回 (token, 过期时间戳)
    pub fn generate_token(&self, user: &User) -> Result<(String, i64), ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.config.expires_in_secs);

        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role,
            municipality_id: user.municipality_id,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.issuer.clone(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Internal(format!("JWT 生成失败: {}", e)))?;

        Ok((token, exp.timestamp()))
    }

    /// 验证并解析 JWT Token
    pub fn verify_token(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ApiError::Unauthorized("Token 已过期".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => {
                    ApiError::Unauthorized("Token 签发者不匹配".to_string())
                }
                _ => ApiError::Unauthorized(format!("Token 验证失败: {}", e)),
            },
        )?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metalix_shared::test_utils::test_auth_config;

    fn manager() -> JwtManager {
        JwtManager::new(JwtConfig::from(&test_auth_config()))
    }

    fn admin_user() -> User {
        let now = Utc::now();
        User {
            id: 12,
            email: "gestor@cm-porto.pt".to_string(),
            password_hash: String::new(),
            first_name: "Rui".to_string(),
            last_name: "Gestor".to_string(),
            role: UserRole::MunicipalityAdmin,
            municipality_id: Some(3),
            phone: None,
            address: None,
            city: None,
            zip_code: None,
            is_active: true,
            failed_login_attempts: 0,
            locked_until: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_generate_and_verify_token() {
        let manager = manager();
        let (token, exp) = manager.generate_token(&admin_user()).unwrap();
        assert!(exp > Utc::now().timestamp());

        let claims = manager.verify_token(&token).unwrap();
        assert_eq!(claims.sub, "12");
        assert_eq!(claims.user_id().unwrap(), 12);
        assert_eq!(claims.role, UserRole::MunicipalityAdmin);
        assert_eq!(claims.municipality_id, Some(3));
        assert_eq!(claims.iss, "metalix-test");
    }

    #[test]
    fn test_invalid_token() {
        let result = manager().verify_token("invalid.token.here");
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn test_expired_token() {
        let mut config = JwtConfig::from(&test_auth_config());
        // 超出默认 60 秒的时钟容差
        config.expires_in_secs = -120;
        let manager = JwtManager::new(config);
        let (token, _) = manager.generate_token(&admin_user()).unwrap();

        match manager.verify_token(&token) {
            Err(ApiError::Unauthorized(msg)) => assert_eq!(msg, "Token 已过期"),
            other => panic!("expected expired token, got {other:?}"),
        }
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let mut other = JwtConfig::from(&test_auth_config());
        other.issuer = "someone-else".to_string();
        let (token, _) = JwtManager::new(other).generate_token(&admin_user()).unwrap();

        assert!(manager().verify_token(&token).is_err());
    }

    #[test]
    fn test_system_admin_has_no_municipality() {
        let manager = manager();
        let mut user = admin_user();
        user.role = UserRole::SystemAdmin;
        user.municipality_id = None;
        let (token, _) = manager.generate_token(&user).unwrap();

        let claims = manager.verify_token(&token).unwrap();
        assert_eq!(claims.role, UserRole::SystemAdmin);
        assert!(claims.municipality_id.is_none());
    }
}
