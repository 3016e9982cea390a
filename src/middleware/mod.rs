//! Cross-cutting HTTP middleware: request validation, security headers,
//! client IP extraction and rate limiting.

pub mod ip;
pub mod rate_limit;
pub mod security_headers;
pub mod validation;

pub use rate_limit::{EndpointRateLimiter, RateLimiter};
