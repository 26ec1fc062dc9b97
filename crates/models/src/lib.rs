//! Data model of the shared business-name list.
//! - `BusinessRecord`: one submitted name with its ratings.
//! - `Snapshot`: the whole ordered list, the unit of remote storage.
//! - Legacy-tolerant decoding: documents written before ids/authors/timestamps
//!   existed still load and can be repaired.

pub mod errors;
pub mod category;
pub mod rating;
pub mod record;
pub mod snapshot;

pub use category::Category;
pub use errors::ModelError;
pub use rating::{Rating, RatingChange, RatingSummary};
pub use record::{BusinessRecord, RecordId};
pub use snapshot::Snapshot;
