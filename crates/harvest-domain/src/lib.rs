mod chain_id;
mod record;
mod record_id;
mod record_kind;

pub use chain_id::ChainId;
pub use record::{MergeIdentityError, Record, RecordState};
pub use record_id::{RecordId, RecordIdParseError};
pub use record_kind::RecordKind;
