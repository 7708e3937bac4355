//! Builders for wire records used across the test suites.

use chrono::{TimeZone, Utc};
use pricebook_core::codec;
use pricebook_core::event::{EventPayload, LogRecord};
use uuid::Uuid;

/// Builds a record carrying a well-formed payload.
///
/// # Panics
///
/// Panics if payload encoding fails, which cannot happen for finite rates.
#[must_use]
pub fn record(partition_key: &str, sequence: i64, payload: &EventPayload) -> LogRecord {
    LogRecord {
        event_id: Uuid::new_v4(),
        partition_key: partition_key.to_owned(),
        sequence_number: sequence,
        payload: codec::encode_payload(payload).unwrap(),
        enqueued_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
    }
}

/// Builds a record whose payload is not decodable as any known variant.
#[must_use]
pub fn malformed_record(partition_key: &str, sequence: i64) -> LogRecord {
    LogRecord {
        event_id: Uuid::new_v4(),
        partition_key: partition_key.to_owned(),
        sequence_number: sequence,
        payload: b"{\"type\":\"NotAKnownVariant\"}".to_vec(),
        enqueued_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
    }
}

/// Shorthand for a markup-update record.
#[must_use]
pub fn markup_record(partition_key: &str, sequence: i64, category: &str, rate: f64) -> LogRecord {
    record(
        partition_key,
        sequence,
        &EventPayload::MarkupUpdated {
            category: category.to_owned(),
            rate,
        },
    )
}
