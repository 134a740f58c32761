// src/middleware/rate_limit.rs

use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    body::Body,
    extract::{ConnectInfo, FromRequestParts, State},
    http::{request::Parts, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::{common::error::AppError, config::AppState, middleware::i18n::Locale};

const CLEANUP_EVERY: Duration = Duration::from_secs(5 * 60);
const IDLE_AFTER: Duration = Duration::from_secs(3 * 60);

#[derive(Debug, Clone)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
    last_seen: Instant,
}

/// Token bucket por IP de cliente.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    buckets: Arc<DashMap<IpAddr, Bucket>>,
    refill_per_sec: f64,
    capacity: f64,
}

impl RateLimiter {
    pub fn new(rps: u32, burst: u32) -> Self {
        Self {
            buckets: Arc::new(DashMap::new()),
            refill_per_sec: f64::from(rps),
            capacity: f64::from(burst.max(1)),
        }
    }

    pub fn allow(&self, ip: IpAddr) -> bool {
        self.allow_at(ip, Instant::now())
    }

    fn allow_at(&self, ip: IpAddr, now: Instant) -> bool {
        let mut bucket = self.buckets.entry(ip).or_insert_with(|| Bucket {
            tokens: self.capacity,
            last_refill: now,
            last_seen: now,
        });
        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        bucket.last_refill = now;
        bucket.last_seen = now;
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Remove visitantes que não aparecem há mais de `idle`.
    pub fn evict_idle(&self, idle: Duration) -> usize {
        self.evict_idle_at(idle, Instant::now())
    }

    fn evict_idle_at(&self, idle: Duration, now: Instant) -> usize {
        let before = self.buckets.len();
        self.buckets
            .retain(|_, b| now.saturating_duration_since(b.last_seen) < idle);
        before - self.buckets.len()
    }

    pub fn tracked(&self) -> usize {
        self.buckets.len()
    }

    /// Tarefa de limpeza periódica (a cada 5 minutos, remove ociosos há 3).
    pub fn spawn_cleanup(&self) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(CLEANUP_EVERY);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = limiter.evict_idle(IDLE_AFTER);
                if removed > 0 {
                    tracing::debug!(removed, "Visitantes ociosos removidos do rate limiter");
                }
            }
        })
    }
}

/// Primeiro salto do `X-Forwarded-For`; senão o endereço do socket.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse().ok())
        .or_else(|| peer.map(|addr| addr.ip()))
}

fn peer_addr(request: &Request<Body>) -> Option<SocketAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}

/// IP do cliente para os handlers (gravado como `consent_ip` nos leads).
#[derive(Debug, Clone, Copy)]
pub struct ClientIp(pub Option<IpAddr>);

impl ClientIp {
    pub fn to_string_opt(self) -> Option<String> {
        self.0.map(|ip| ip.to_string())
    }
}

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(ClientIp(client_ip(&parts.headers, peer)))
    }
}

async fn limit_with(limiter: &RateLimiter, state: &AppState, request: Request<Body>, next: Next) -> Response {
    let ip = client_ip(request.headers(), peer_addr(&request));
    // Sem IP identificável não há como limitar.
    if let Some(ip) = ip {
        if !limiter.allow(ip) {
            tracing::warn!(%ip, path = %request.uri().path(), "Limite de requisições excedido");
            let locale = Locale::from_headers(request.headers(), &state.i18n_store);
            return AppError::RateLimited
                .to_api_error(&locale, &state.i18n_store)
                .into_response();
        }
    }
    next.run(request).await
}

pub async fn rate_limit(State(state): State<AppState>, request: Request<Body>, next: Next) -> Response {
    limit_with(&state.rate_limiter, &state, request, next).await
}

/// Limite mais rígido para as rotas públicas de escrita.
pub async fn strict_rate_limit(State(state): State<AppState>, request: Request<Body>, next: Next) -> Response {
    limit_with(&state.strict_rate_limiter, &state, request, next).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn burst_then_reject() {
        let limiter = RateLimiter::new(2, 5);
        let now = Instant::now();
        for _ in 0..5 {
            assert!(limiter.allow_at(ip("10.0.0.1"), now));
        }
        assert!(!limiter.allow_at(ip("10.0.0.1"), now));
        // Outro cliente tem o próprio balde.
        assert!(limiter.allow_at(ip("10.0.0.2"), now));
    }

    #[test]
    fn tokens_refill_over_time() {
        let limiter = RateLimiter::new(2, 1);
        let now = Instant::now();
        assert!(limiter.allow_at(ip("10.0.0.1"), now));
        assert!(!limiter.allow_at(ip("10.0.0.1"), now));
        assert!(limiter.allow_at(ip("10.0.0.1"), now + Duration::from_millis(600)));
    }

    #[test]
    fn idle_visitors_are_evicted() {
        let limiter = RateLimiter::new(10, 20);
        let now = Instant::now();
        limiter.allow_at(ip("10.0.0.1"), now);
        limiter.allow_at(ip("10.0.0.2"), now + Duration::from_secs(200));

        let removed = limiter.evict_idle_at(IDLE_AFTER, now + Duration::from_secs(240));
        assert_eq!(removed, 1);
        assert_eq!(limiter.tracked(), 1);
    }

    #[test]
    fn forwarded_for_wins_over_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        let peer: SocketAddr = "127.0.0.1:5000".parse().unwrap();
        assert_eq!(client_ip(&headers, Some(peer)), Some(ip("203.0.113.7")));
        assert_eq!(client_ip(&HeaderMap::new(), Some(peer)), Some(ip("127.0.0.1")));
        assert_eq!(client_ip(&HeaderMap::new(), None), None);
    }
}
