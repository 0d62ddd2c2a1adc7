//! 角色与市政范围校验
//!
//! 系统管理员不受市政限制；市政管理员只能访问本市政的数据；
//! 市民只能访问自己的数据。

use metalix_core::{User, UserRole};

use super::Claims;
use crate::error::{ApiError, Result};

pub const ADMINS: &[UserRole] = &[UserRole::MunicipalityAdmin, UserRole::SystemAdmin];
pub const SYSTEM_ONLY: &[UserRole] = &[UserRole::SystemAdmin];
pub const CITIZEN_ONLY: &[UserRole] = &[UserRole::Citizen];

impl Claims {
    pub fn is_system_admin(&self) -> bool {
        self.role == UserRole::SystemAdmin
    }

    pub fn is_admin(&self) -> bool {
        ADMINS.contains(&self.role)
    }

    /// 当前用户的市政范围，系统管理员为 None
    pub fn scope(&self) -> Result<Option<i64>> {
        if self.is_system_admin() {
            return Ok(None);
        }
        self.municipality_id
            .map(Some)
            .ok_or_else(|| ApiError::Forbidden("账户未关联市政".to_string()))
    }

    /// 列表查询的市政过滤：系统管理员可自选，其余角色强制为本市政
    pub fn scoped_filter(&self, requested: Option<i64>) -> Result<Option<i64>> {
        match self.scope()? {
            None => Ok(requested),
            Some(own) => match requested {
                Some(other) if other != own => Err(forbidden_municipality(own, other)),
                _ => Ok(Some(own)),
            },
        }
    }
}

fn forbidden_municipality(own: i64, other: i64) -> ApiError {
    metalix_core::RecyclingError::MunicipalityMismatch {
        expected: own,
        actual: other,
    }
    .into()
}

/// 校验当前用户可访问指定市政的数据
pub fn ensure_municipality(claims: &Claims, municipality_id: i64) -> Result<()> {
    match claims.scope()? {
        Some(own) if own != municipality_id => Err(forbidden_municipality(own, municipality_id)),
        _ => Ok(()),
    }
}

/// 校验当前用户可访问目标用户：本人、同市政管理员或系统管理员
pub fn ensure_user_access(claims: &Claims, target: &User) -> Result<()> {
    if claims.user_id()? == target.id || claims.is_system_admin() {
        return Ok(());
    }
    if claims.role == UserRole::MunicipalityAdmin {
        return match (claims.municipality_id, target.municipality_id) {
            (Some(own), Some(theirs)) if own == theirs => Ok(()),
            (Some(own), theirs) => Err(forbidden_municipality(own, theirs.unwrap_or_default())),
            _ => Err(ApiError::Forbidden("账户未关联市政".to_string())),
        };
    }
    Err(ApiError::Forbidden("只能访问本人的数据".to_string()))
}

/// 管理员对目标用户的管理权限（不含本人访问）
pub fn ensure_user_management(claims: &Claims, target: &User) -> Result<()> {
    if !claims.is_admin() {
        return Err(ApiError::Forbidden("需要管理员权限".to_string()));
    }
    ensure_user_access(claims, target)
}

/// 管理员不能停用自己的账户
pub fn ensure_not_self_deactivation(claims: &Claims, target_id: i64) -> Result<()> {
    if claims.user_id()? == target_id {
        return Err(ApiError::Validation("不能停用自己的账户".to_string()));
    }
    Ok(())
}
