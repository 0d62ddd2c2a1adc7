//! 认证模块
//!
//! 提供 JWT Token 生成、验证、密码处理和访问范围校验

pub mod access;
mod jwt;
mod password;

pub use access::{
    ensure_municipality, ensure_not_self_deactivation, ensure_user_access, ensure_user_management,
};
pub use jwt::{Claims, JwtConfig, JwtManager};
pub use password::{hash_password, verify_password};
