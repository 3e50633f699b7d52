use harvest_client::ClientError;
use harvest_domain::MergeIdentityError;
use harvest_sector_store::StoreError;
use thiserror::Error;

/// Errors surfaced by the fetch engine.
///
/// Rate limiting never appears here; it is absorbed by the query client.
#[derive(Error, Debug)]
pub enum HarvestError {
    /// Transport or envelope failure from the explorer client
    #[error("Explorer client error: {0}")]
    Client(#[from] ClientError),

    /// Sector store failure
    #[error("Sector store error: {0}")]
    Store(#[from] StoreError),

    /// Detail response paired with the wrong record
    #[error("Merge identity error: {0}")]
    Merge(#[from] MergeIdentityError),

    /// Envelope payload does not have the shape the adapter expects
    #[error("Unexpected explorer payload: {reason}")]
    Protocol { reason: String },

    /// A hydration batch failed; earlier batches are already persisted
    #[error("Hydration aborted with {remaining} ids unfetched: {source}")]
    Hydration {
        remaining: usize,
        #[source]
        source: Box<HarvestError>,
    },

    /// Caller cancelled the operation
    #[error("Operation cancelled")]
    Cancelled,
}

impl HarvestError {
    pub(crate) fn protocol(reason: impl Into<String>) -> Self {
        Self::Protocol {
            reason: reason.into(),
        }
    }

    /// True when this error, or the batch error it wraps, is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Hydration { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, HarvestError>;
