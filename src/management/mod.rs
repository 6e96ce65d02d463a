mod cache;
mod rate_limit;
mod session;

pub use cache::ResponseCache;
pub use rate_limit::RateLimiter;
pub use session::SessionStore;
