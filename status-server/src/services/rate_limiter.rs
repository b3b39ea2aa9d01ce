//! Login attempt limiting
//!
//! In-process keyed limiter: each email gets a burst of `attempts` that
//! refills evenly over `period`.

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use status_common::config::RateLimitSettings;
use status_common::{Error, Result};
use std::num::NonZeroU32;
use std::time::Duration;

pub struct LoginRateLimiter {
    limiter: DefaultKeyedRateLimiter<String>,
    period_secs: u64,
}

impl LoginRateLimiter {
    pub fn new(settings: &RateLimitSettings) -> Result<Self> {
        let attempts = NonZeroU32::new(settings.login_attempts)
            .ok_or_else(|| Error::Config("rate_limit.login_attempts must be > 0".to_string()))?;
        if settings.login_period_secs == 0 {
            return Err(Error::Config("rate_limit.login_period_secs must be > 0".to_string()));
        }
        let period = Duration::from_secs(settings.login_period_secs);
        let quota = Quota::with_period(period / attempts.get())
            .ok_or_else(|| {
                Error::Config(format!(
                    "rate_limit.login_attempts ({}) too large for rate_limit.login_period_secs ({})",
                    attempts, settings.login_period_secs
                ))
            })?
            .allow_burst(attempts);

        Ok(Self {
            limiter: RateLimiter::keyed(quota),
            period_secs: settings.login_period_secs,
        })
    }

    /// Count one attempt for `email`, failing once the budget is spent
    pub fn check(&self, email: &str) -> Result<()> {
        self.limiter
            .check_key(&email.trim().to_lowercase())
            .map_err(|_| {
                Error::RateLimited(format!(
                    "Too many login attempts. Please try again in {} seconds.",
                    self.period_secs
                ))
            })
    }

    /// Drop state for keys whose budget has fully refilled
    pub fn prune(&self) {
        self.limiter.retain_recent();
    }
}
