use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    error, Error,
};
use futures::future::{ok, LocalBoxFuture, Ready};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    task::{Context, Poll},
    time::{Duration, Instant},
};
use tracing::warn;

const WINDOW: Duration = Duration::from_secs(60);

/// Per-IP request budget per minute. Search-as-you-type list queries are
/// the main thing this bounds.
#[derive(Clone)]
pub struct RateLimiter {
    requests_per_minute: usize,
    ip_tracking: Arc<Mutex<HashMap<String, (usize, Instant)>>>,
}

impl RateLimiter {
    pub fn new(requests_per_minute: usize) -> Self {
        RateLimiter {
            requests_per_minute,
            ip_tracking: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Counts one request from `ip`; `false` once the budget is spent.
    fn admit(&self, ip: &str, now: Instant) -> bool {
        let mut ip_map = self
            .ip_tracking
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // Forget clients whose window has closed
        ip_map.retain(|_, (_, started)| now.duration_since(*started) <= WINDOW);

        match ip_map.get_mut(ip) {
            Some((count, _)) if *count >= self.requests_per_minute => false,
            Some((count, _)) => {
                *count += 1;
                true
            }
            None => {
                ip_map.insert(ip.to_string(), (1, now));
                true
            }
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RateLimiterMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RateLimiterMiddleware {
            service,
            limiter: self.clone(),
        })
    }
}

pub struct RateLimiterMiddleware<S> {
    service: S,
    limiter: RateLimiter,
}

impl<S, B> Service<ServiceRequest> for RateLimiterMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
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
        if req.path() != "/health" {
            let ip = req
                .connection_info()
                .realip_remote_addr()
                .unwrap_or("unknown")
                .to_string();

            if !self.limiter.admit(&ip, Instant::now()) {
                warn!("Rate limit exceeded for {}", ip);
                return Box::pin(async move {
                    Err(error::ErrorTooManyRequests(
                        "Rate limit exceeded. Try again later.",
                    ))
                });
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_is_per_ip_and_resets_after_a_minute() {
        let limiter = RateLimiter::new(2);
        let start = Instant::now();

        assert!(limiter.admit("10.0.0.1", start));
        assert!(limiter.admit("10.0.0.1", start));
        assert!(!limiter.admit("10.0.0.1", start));
        assert!(limiter.admit("10.0.0.2", start));

        let later = start + WINDOW + Duration::from_secs(1);
        assert!(limiter.admit("10.0.0.1", later));
    }
}
