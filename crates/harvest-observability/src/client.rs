use std::time::Duration;

use metrics::{counter, histogram};

pub fn record_explorer_request(provider: &str, status: &str, duration: Duration) {
    counter!(
        "harvest_explorer_requests_total",
        "provider" => provider.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "harvest_explorer_request_duration_seconds",
        "provider" => provider.to_string(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());
}

/// `signal` is either "http_429" or "soft".
pub fn record_rate_limit_cooldown(provider: &str, signal: &str, cooldown: Duration) {
    counter!(
        "harvest_rate_limit_cooldowns_total",
        "provider" => provider.to_string(),
        "signal" => signal.to_string()
    )
    .increment(1);
    histogram!(
        "harvest_rate_limit_cooldown_seconds",
        "provider" => provider.to_string(),
        "signal" => signal.to_string()
    )
    .record(cooldown.as_secs_f64());
}
