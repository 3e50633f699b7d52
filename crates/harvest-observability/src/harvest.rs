use std::time::Duration;

use metrics::{counter, histogram};

pub fn record_page(chain: &str, kind: &str, examined: usize, new: usize) {
    counter!(
        "harvest_pages_total",
        "chain" => chain.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
    counter!(
        "harvest_elements_examined_total",
        "chain" => chain.to_string(),
        "kind" => kind.to_string()
    )
    .increment(examined as u64);
    counter!(
        "harvest_elements_new_total",
        "chain" => chain.to_string(),
        "kind" => kind.to_string()
    )
    .increment(new as u64);
}

/// `stop_reason` is one of "empty", "count_reached", "stale_page".
pub fn record_walk(chain: &str, kind: &str, stop_reason: &str, pages: usize, duration: Duration) {
    counter!(
        "harvest_walks_total",
        "chain" => chain.to_string(),
        "kind" => kind.to_string(),
        "stop_reason" => stop_reason.to_string()
    )
    .increment(1);
    histogram!(
        "harvest_walk_pages",
        "chain" => chain.to_string(),
        "kind" => kind.to_string()
    )
    .record(pages as f64);
    histogram!(
        "harvest_walk_duration_seconds",
        "chain" => chain.to_string(),
        "kind" => kind.to_string()
    )
    .record(duration.as_secs_f64());
}

pub fn record_hydration_batch(
    chain: &str,
    kind: &str,
    status: &str,
    ids: usize,
    duration: Duration,
) {
    counter!(
        "harvest_hydration_batches_total",
        "chain" => chain.to_string(),
        "kind" => kind.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "harvest_hydration_batch_ids",
        "chain" => chain.to_string(),
        "kind" => kind.to_string()
    )
    .record(ids as f64);
    histogram!(
        "harvest_hydration_batch_duration_seconds",
        "chain" => chain.to_string(),
        "kind" => kind.to_string(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());
}
