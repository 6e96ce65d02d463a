use std::{net::IpAddr, num::NonZeroU32, sync::Arc, time::Duration};

use governor::{DefaultKeyedRateLimiter, Quota};

use crate::config::RateLimit;

/// Per-client request budget backed by a keyed GCRA limiter.
///
/// A client may spend `max_requests` at once; one request is replenished every
/// `window / max_requests`.
#[derive(Clone)]
pub struct RateLimiter {
    limit: RateLimit,
    clients: Arc<DefaultKeyedRateLimiter<IpAddr>>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("limit", &self.limit)
            .field("clients", &self.clients.len())
            .finish()
    }
}

/// Converts a configured limit into a governor quota.
fn quota(limit: RateLimit) -> Quota {
    let burst = NonZeroU32::new(limit.max_requests).unwrap_or(NonZeroU32::MIN);
    let period = (limit.window / burst.get()).max(Duration::from_nanos(1));
    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}

impl RateLimiter {
    pub fn new(limit: RateLimit) -> Self {
        Self {
            limit,
            clients: Arc::new(governor::RateLimiter::keyed(quota(limit))),
        }
    }

    pub fn limit(&self) -> RateLimit {
        self.limit
    }

    /// Counts one request from `client`. Returns `false` once the client has
    /// used up its allowance.
    pub fn check(&self, client: IpAddr) -> bool {
        self.clients.check_key(&client).is_ok()
    }

    /// Forgets clients whose budget is full again.
    pub fn retain_recent(&self) {
        self.clients.retain_recent();
        self.clients.shrink_to_fit();
    }

    /// Number of clients currently tracked.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
