use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::{header, Method},
    Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::auth::cookies::ACCESS_COOKIE;
use crate::auth::extractors::AuthenticatedUser;
use crate::auth::token::{verify_token, TokenKind};
use crate::error::AppError;

/// Requests that never carry a session: health checks, registration, login and the
/// read-only task view.
fn is_public(method: &Method, path: &str) -> bool {
    let path = path.trim_end_matches('/');
    path == "/health"
        || path == "/api/v1/user/login"
        || (method == Method::POST && path == "/api/v1/user")
        || (method == Method::GET && path == "/api/v1/task")
}

/// Session token from the `accessToken` cookie, falling back to `Authorization: Bearer`.
fn access_token(req: &ServiceRequest) -> Option<String> {
    req.cookie(ACCESS_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| {
            req.headers()
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
                .map(str::to_string)
        })
}

/// Verifies the caller's access token and stores an [`AuthenticatedUser`] in the request
/// extensions for handlers to extract.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if is_public(req.method(), req.path()) {
            return Box::pin(self.service.call(req));
        }

        let verified = access_token(&req)
            .ok_or_else(|| AppError::Unauthorized("Unauthorized request".into()))
            .and_then(|token| verify_token(&token, TokenKind::Access));

        match verified {
            Ok(claims) => {
                req.extensions_mut().insert(AuthenticatedUser(claims.sub));
                Box::pin(self.service.call(req))
            }
            Err(app_err) => {
                log::debug!("rejected {} {}: {}", req.method(), req.path(), app_err);
                Box::pin(async move { Err(app_err.into()) })
            }
        }
    }
}
