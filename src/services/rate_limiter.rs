//! Rate limiter for login attempts
//!
//! Two sliding windows kept in memory:
//! - failed logins per username
//! - login requests per IP address
//!
//! Thresholds come from [`RateLimitConfig`].

use crate::config::RateLimitConfig;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::net::IpAddr;
use tokio::sync::RwLock;

type Attempts<K> = RwLock<HashMap<K, Vec<DateTime<Utc>>>>;

/// Login rate limiter
pub struct LoginRateLimiter {
    config: RateLimitConfig,
    username_attempts: Attempts<String>,
    ip_attempts: Attempts<IpAddr>,
}

impl LoginRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            username_attempts: RwLock::new(HashMap::new()),
            ip_attempts: RwLock::new(HashMap::new()),
        }
    }

    fn username_window(&self) -> Duration {
        Duration::seconds(self.config.login_window_secs)
    }

    fn ip_window(&self) -> Duration {
        Duration::seconds(self.config.ip_window_secs)
    }

    /// Seconds to wait before the username may try again, if limited
    pub async fn username_retry_after(&self, username: &str) -> Option<i64> {
        let mut attempts = self.username_attempts.write().await;
        let key = username.to_lowercase();
        let times = attempts.get_mut(&key)?;
        retry_after(
            times,
            Utc::now(),
            self.username_window(),
            self.config.login_attempts,
        )
    }

    pub async fn record_failed_attempt(&self, username: &str) {
        let mut attempts = self.username_attempts.write().await;
        attempts
            .entry(username.to_lowercase())
            .or_default()
            .push(Utc::now());
    }

    /// Forget failed attempts after a successful login
    pub async fn clear_username_attempts(&self, username: &str) {
        let mut attempts = self.username_attempts.write().await;
        attempts.remove(&username.to_lowercase());
    }

    /// Seconds to wait before the IP may send another login request, if limited
    pub async fn ip_retry_after(&self, ip: IpAddr) -> Option<i64> {
        let mut attempts = self.ip_attempts.write().await;
        let times = attempts.get_mut(&ip)?;
        retry_after(times, Utc::now(), self.ip_window(), self.config.ip_requests)
    }

    pub async fn record_ip_request(&self, ip: IpAddr) {
        let mut attempts = self.ip_attempts.write().await;
        attempts.entry(ip).or_default().push(Utc::now());
    }

    /// Drop stale entries; run periodically
    pub async fn cleanup(&self) -> usize {
        let now = Utc::now();
        let username_cutoff = now - self.username_window();
        let ip_cutoff = now - self.ip_window();

        let mut removed = 0;
        {
            let mut attempts = self.username_attempts.write().await;
            let before = attempts.len();
            attempts.retain(|_, times| {
                times.retain(|time| *time > username_cutoff);
                !times.is_empty()
            });
            removed += before - attempts.len();
        }
        {
            let mut attempts = self.ip_attempts.write().await;
            let before = attempts.len();
            attempts.retain(|_, times| {
                times.retain(|time| *time > ip_cutoff);
                !times.is_empty()
            });
            removed += before - attempts.len();
        }
        removed
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

/// Prune `times` to the window and report the wait when `limit` is reached
fn retry_after(
    times: &mut Vec<DateTime<Utc>>,
    now: DateTime<Utc>,
    window: Duration,
    limit: usize,
) -> Option<i64> {
    let cutoff = now - window;
    times.retain(|time| *time > cutoff);

    if times.len() < limit {
        return None;
    }
    let oldest = times.iter().min()?;
    Some(((*oldest + window) - now).num_seconds().max(1))
}
