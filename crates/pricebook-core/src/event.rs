//! Domain event model.
//!
//! Events travel as [`LogRecord`]s (undecoded payload bytes) through the live
//! log and the capture archive; the replication engine decodes them into
//! [`Event`]s at the single point where the malformed-event policy applies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The closed set of domain facts the replica understands.
///
/// Extended by adding a variant, never by runtime type inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventPayload {
    /// A category markup rate changed. A non-positive rate removes the
    /// category entry (see the reducer).
    MarkupUpdated {
        /// Product category the markup applies to.
        category: String,
        /// New markup rate.
        rate: f64,
    },
    /// A brand display name was created or renamed.
    BrandUpdated {
        /// Stable brand code.
        code: String,
        /// Display name.
        name: String,
    },
    /// The fallback markup for categories without an explicit entry changed.
    DefaultMarkupSet {
        /// New default markup rate.
        rate: f64,
    },
}

impl EventPayload {
    /// Returns the payload type name (used for logging/routing).
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::MarkupUpdated { .. } => "pricing.markup_updated",
            Self::BrandUpdated { .. } => "pricing.brand_updated",
            Self::DefaultMarkupSet { .. } => "pricing.default_markup_set",
        }
    }
}

/// Wire form of an event as yielded by the live log and the archive.
///
/// The payload is kept as raw bytes; sequence metadata is available even when
/// the payload turns out to be undecodable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Unique event identifier assigned by the producer.
    pub event_id: Uuid,
    /// Partition this record belongs to.
    pub partition_key: String,
    /// Sequence number assigned by the log service; strictly monotonic and
    /// gap-free within a partition.
    pub sequence_number: i64,
    /// Serialized [`EventPayload`] bytes.
    pub payload: Vec<u8>,
    /// When the log service accepted the record. Informational only.
    pub enqueued_at: DateTime<Utc>,
}

/// A fully decoded domain event.
#[derive(Debug, Clone)]
pub struct Event {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Partition this event belongs to.
    pub partition_key: String,
    /// Sequence number within the partition.
    pub sequence_number: i64,
    /// Decoded domain fact.
    pub payload: EventPayload,
    /// When the log service accepted the event.
    pub enqueued_at: DateTime<Utc>,
}
