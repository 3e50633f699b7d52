use serde::Deserialize;
use serde_json::Value;

use crate::{ClientError, Result};

const RATE_LIMIT_PATTERNS: [&str; 3] = ["rate limit", "too many requests", "request limit"];

/// Explorer response envelope: `{"code": 0, "message": "Success", "data": ...}`.
#[derive(Debug, Deserialize)]
struct Envelope {
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, PartialEq)]
pub(crate) enum EnvelopeOutcome {
    Payload(Value),
    /// Throttling reported inside a 200 response.
    SoftRateLimit(String),
}

pub(crate) fn interpret(body: &str) -> Result<EnvelopeOutcome> {
    let envelope: Envelope =
        serde_json::from_str(body).map_err(|error| ClientError::Protocol {
            reason: format!("malformed envelope: {error}"),
        })?;

    if envelope.code == 0 {
        return Ok(EnvelopeOutcome::Payload(envelope.data));
    }

    if is_rate_limit_message(&envelope.message) {
        return Ok(EnvelopeOutcome::SoftRateLimit(envelope.message));
    }

    Err(ClientError::Protocol {
        reason: format!("explorer code {}: {}", envelope.code, envelope.message),
    })
}

fn is_rate_limit_message(message: &str) -> bool {
    let lowered = message.to_ascii_lowercase();
    RATE_LIMIT_PATTERNS
        .iter()
        .any(|pattern| lowered.contains(pattern))
}
