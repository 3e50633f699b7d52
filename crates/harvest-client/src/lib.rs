mod client;
mod config;
mod envelope;
mod error;
mod rate_limiter;
mod transport;

pub use client::QueryClient;
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use rate_limiter::RateLimiter;
pub use transport::{RawResponse, ReqwestTransport, Transport};
