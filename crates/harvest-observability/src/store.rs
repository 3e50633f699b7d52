use std::time::Duration;

use metrics::{counter, histogram};

pub fn record_sector_flush(store: &str, records: usize, duration: Duration) {
    counter!("harvest_sector_flushes_total", "store" => store.to_string()).increment(1);
    histogram!("harvest_sector_flush_records", "store" => store.to_string()).record(records as f64);
    histogram!(
        "harvest_sector_flush_duration_seconds",
        "store" => store.to_string()
    )
    .record(duration.as_secs_f64());
}

pub fn record_sector_load(store: &str, found: bool) {
    counter!(
        "harvest_sector_loads_total",
        "store" => store.to_string(),
        "found" => found.to_string()
    )
    .increment(1);
}
