use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    error, http::Method, Error, HttpMessage,
};
use futures::future::{ok, LocalBoxFuture, Ready};
use std::task::{Context, Poll};
use tracing::debug;

use super::validate_token;

pub struct AuthenticationMiddleware {
    jwt_secret: String,
    exclude_routes: Vec<String>,
}

impl AuthenticationMiddleware {
    pub fn new(jwt_secret: String) -> Self {
        Self {
            jwt_secret,
            exclude_routes: vec!["/health".to_string()],
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthenticationMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthenticationMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthenticationMiddlewareService {
            service,
            jwt_secret: self.jwt_secret.clone(),
            exclude_routes: self.exclude_routes.clone(),
        })
    }
}

pub struct AuthenticationMiddlewareService<S> {
    service: S,
    jwt_secret: String,
    exclude_routes: Vec<String>,
}

impl<S, B> Service<ServiceRequest> for AuthenticationMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // Excluded routes and CORS preflights pass through untouched
        if req.method() == Method::OPTIONS
            || self.exclude_routes.iter().any(|route| route == req.path())
        {
            let fut = self.service.call(req);
            return Box::pin(async move {
                let res = fut.await?;
                Ok(res)
            });
        }

        let token = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|auth_str| auth_str.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string());

        let token = match token {
            Some(token) if !token.is_empty() => token,
            _ => {
                return Box::pin(async move {
                    Err(error::ErrorUnauthorized("Missing authorization token"))
                });
            }
        };

        let claims = match validate_token(&token, &self.jwt_secret) {
            Ok(claims) => claims,
            Err(e) => {
                debug!("Rejected token for {}: {}", req.path(), e);
                return Box::pin(async move { Err(e) });
            }
        };

        req.extensions_mut().insert(claims);

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res)
        })
    }
}
