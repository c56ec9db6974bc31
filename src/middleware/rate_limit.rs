// Sliding-window limiter for OTP and login endpoints
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::http::HeaderMap;

#[derive(Debug, Clone)]
pub struct RateLimiter {
    requests: Arc<Mutex<HashMap<String, Vec<Instant>>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            requests: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window,
        }
    }

    pub fn is_allowed(&self, key: &str) -> bool {
        let mut requests = self.requests.lock().unwrap_or_else(|p| p.into_inner());
        let now = Instant::now();

        let entry = requests.entry(key.to_string()).or_default();
        entry.retain(|&timestamp| now.duration_since(timestamp) < self.window);

        if entry.len() < self.max_requests {
            entry.push(now);
            true
        } else {
            false
        }
    }

    /// Drops keys with no hits left in the window. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let mut requests = self.requests.lock().unwrap_or_else(|p| p.into_inner());
        let now = Instant::now();
        let before = requests.len();

        requests.retain(|_, hits| {
            hits.retain(|&timestamp| now.duration_since(timestamp) < self.window);
            !hits.is_empty()
        });

        before - requests.len()
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.requests.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}

/// Client IP from the proxy headers, or "unknown".
pub fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn otp_rate_limiter() -> RateLimiter {
    RateLimiter::new(3, Duration::from_secs(600)) // 3 sends per 10 minutes
}

pub fn login_rate_limiter() -> RateLimiter {
    RateLimiter::new(10, Duration::from_secs(300)) // 10 attempts per 5 minutes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_per_key() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.is_allowed("+919876543210"));
        assert!(limiter.is_allowed("+919876543210"));
        assert!(!limiter.is_allowed("+919876543210"));
        assert!(limiter.is_allowed("+919876543211"));
    }

    #[test]
    fn test_window_expires() {
        let limiter = RateLimiter::new(1, Duration::from_millis(20));
        assert!(limiter.is_allowed("k"));
        assert!(!limiter.is_allowed("k"));
        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.is_allowed("k"));
    }

    #[test]
    fn test_prune_drops_idle_keys() {
        let limiter = RateLimiter::new(3, Duration::from_millis(20));
        for i in 0..50 {
            assert!(limiter.is_allowed(&format!("+9198765432{:02}", i)));
        }
        assert_eq!(limiter.tracked_keys(), 50);
        assert_eq!(limiter.prune(), 0);

        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.is_allowed("fresh"));

        assert_eq!(limiter.prune(), 50);
        assert_eq!(limiter.tracked_keys(), 1);
        assert!(limiter.is_allowed("+919876543200"));
    }

    #[test]
    fn test_client_ip() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers), "unknown");

        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        assert_eq!(client_ip(&headers), "203.0.113.7");
    }
}
