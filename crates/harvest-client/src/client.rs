use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use harvest_observability as observability;
use serde_json::Value;
use tokio::{
    sync::{Mutex, OwnedSemaphorePermit, Semaphore},
    time::Instant,
};

use crate::{
    ClientConfig, ClientError, RateLimiter, Result,
    envelope::{self, EnvelopeOutcome},
    transport::{ReqwestTransport, Transport},
};

const ERROR_BODY_PREVIEW_CHARS: usize = 256;

/// Issues explorer requests and hides rate limiting from callers.
///
/// Every attempt, retries included, waits for the rate limiter and a slot
/// among `max_in_flight`. A 429 or a throttling message is retried
/// indefinitely after a cooldown; every other failure is returned.
///
/// Cooldowns are serialized behind one lock. A caller that was throttled
/// while another caller was already cooling down takes the lock after that
/// cooldown has finished and retries without sleeping again.
pub struct QueryClient {
    transport: Arc<dyn Transport>,
    limiter: RateLimiter,
    in_flight: Arc<Semaphore>,
    /// When the most recent cooldown finished.
    cooldown: Mutex<Option<Instant>>,
    cooldowns: AtomicU64,
    rate_limit_cooldown: Duration,
    soft_rate_limit_cooldown: Duration,
}

impl QueryClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(config)?);
        Ok(Self::with_transport(transport, config))
    }

    pub fn with_transport(transport: Arc<dyn Transport>, config: &ClientConfig) -> Self {
        let max_in_flight = config.max_in_flight.max(1);
        if max_in_flight != config.max_in_flight {
            tracing::warn!(
                configured = config.max_in_flight,
                effective = max_in_flight,
                "Explorer client max_in_flight too low; clamped"
            );
        }

        Self {
            transport,
            limiter: RateLimiter::for_config(config),
            in_flight: Arc::new(Semaphore::new(max_in_flight)),
            cooldown: Mutex::new(None),
            cooldowns: AtomicU64::new(0),
            rate_limit_cooldown: config.rate_limit_cooldown(),
            soft_rate_limit_cooldown: config.soft_rate_limit_cooldown(),
        }
    }

    /// Number of cooldown sleeps performed so far.
    pub fn cooldowns(&self) -> u64 {
        self.cooldowns.load(Ordering::Relaxed)
    }

    /// POST `body` to `path` and return the envelope's `data` payload.
    pub async fn query(&self, path: &str, body: &Value) -> Result<Value> {
        loop {
            // Nobody sends while a cooldown is in progress.
            drop(self.cooldown.lock().await);

            let sent_at = Instant::now();
            let response = {
                let _permit = self.acquire_permit().await?;
                self.limiter.acquire().await;
                let response = self.transport.post_json(path, body).await;
                let status = match &response {
                    Ok(raw) => raw.status.to_string(),
                    Err(_) => "error".to_string(),
                };
                observability::record_explorer_request(
                    self.transport.name(),
                    &status,
                    sent_at.elapsed(),
                );
                response?
            };

            if response.status == 429 {
                tracing::debug!(path, "Explorer returned HTTP 429");
                self.cool_down(sent_at, self.rate_limit_cooldown, "http_429")
                    .await;
                continue;
            }

            if !(200..300).contains(&response.status) {
                return Err(ClientError::Transport {
                    status: response.status,
                    message: preview(&response.body),
                });
            }

            match envelope::interpret(&response.body)? {
                EnvelopeOutcome::Payload(data) => return Ok(data),
                EnvelopeOutcome::SoftRateLimit(message) => {
                    tracing::debug!(path, message = %message, "Explorer reported soft rate limit");
                    self.cool_down(sent_at, self.soft_rate_limit_cooldown, "soft")
                        .await;
                }
            }
        }
    }

    async fn acquire_permit(&self) -> Result<OwnedSemaphorePermit> {
        Arc::clone(&self.in_flight)
            .acquire_owned()
            .await
            .map_err(|_| ClientError::SemaphoreClosed)
    }

    async fn cool_down(&self, sent_at: Instant, cooldown: Duration, signal: &'static str) {
        let mut last_finished = self.cooldown.lock().await;
        if last_finished.is_some_and(|finished| finished > sent_at) {
            return;
        }

        tracing::warn!(
            signal,
            cooldown_ms = cooldown.as_millis() as u64,
            "Explorer rate limit hit; cooling down"
        );
        tokio::time::sleep(cooldown).await;

        *last_finished = Some(Instant::now());
        self.cooldowns.fetch_add(1, Ordering::Relaxed);
        observability::record_rate_limit_cooldown(self.transport.name(), signal, cooldown);
    }
}

fn preview(body: &str) -> String {
    body.chars().take(ERROR_BODY_PREVIEW_CHARS).collect()
}
