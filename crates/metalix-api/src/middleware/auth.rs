//! JWT 认证中间件
//!
//! 验证请求中的 Bearer Token 并将 Claims 注入请求扩展

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::state::AppState;

/// 无需认证的路由
const PUBLIC_PATHS: &[(Option<Method>, &str)] = &[
    (None, "/health"),
    (None, "/ready"),
    (None, "/api/auth/login"),
    (None, "/api/auth/register"),
    // 注册页需要的市政列表
    (Some(Method::GET), "/api/municipalities"),
];

/// 精确匹配路径，避免 /api/municipalities/{id} 被当作公开路由
pub fn is_public(method: &Method, path: &str) -> bool {
    let path = path.trim_end_matches('/');
    PUBLIC_PATHS.iter().any(|(m, p)| {
        *p == path && m.as_ref().is_none_or(|required| required == method)
    })
}

/// 认证中间件
///
/// 从 Authorization header 中提取 Bearer Token，验证后将 Claims 注入请求扩展
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if is_public(request.method(), request.uri().path()) {
        return next.run(request).await;
    }

    let token = match request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
    {
        Some(token) => token.trim().to_string(),
        None => return unauthorized_response("缺少认证 Token"),
    };

    match state.jwt_manager.verify_token(&token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => unauthorized_response(&e.to_string()),
    }
}

pub(crate) fn unauthorized_response(message: &str) -> Response {
    let body = json!({
        "success": false,
        "code": "UNAUTHORIZED",
        "message": message,
        "data": null
    });

    (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
}
