//! 角色检查中间件
//!
//! 按路由组限制可访问的角色，细粒度的市政范围在 handler 中校验

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metalix_core::UserRole;
use serde_json::json;
use std::future::Future;
use std::pin::Pin;

use super::auth::unauthorized_response;
use crate::auth::Claims;

/// 角色检查中间件工厂
///
/// # 示例
/// ```ignore
/// Router::new()
///     .route("/system/overview", get(overview))
///     .route_layer(axum::middleware::from_fn(require_roles(SYSTEM_ONLY)))
/// ```
pub fn require_roles(
    roles: &'static [UserRole],
) -> impl Fn(Request<Body>, Next) -> Pin<Box<dyn Future<Output = Response> + Send>> + Clone + Send
{
    move |request: Request<Body>, next: Next| Box::pin(check_role(request, next, roles))
}

async fn check_role(request: Request<Body>, next: Next, roles: &'static [UserRole]) -> Response {
    let role = match request.extensions().get::<Claims>() {
        Some(claims) => claims.role,
        None => return unauthorized_response("未认证"),
    };

    if roles.contains(&role) {
        return next.run(request).await;
    }

    forbidden_response(&format!("角色 {} 无权访问该资源", role.as_str()))
}

fn forbidden_response(message: &str) -> Response {
    let body = json!({
        "success": false,
        "code": "FORBIDDEN",
        "message": message,
        "data": null
    });

    (StatusCode::FORBIDDEN, axum::Json(body)).into_response()
}
