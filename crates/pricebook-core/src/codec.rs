//! Wire codec for event payloads and snapshot envelopes.
//!
//! Schema evolution policy: the payload enum grows by adding variants, so an
//! old decoder confronted with an unknown tag reports `MalformedEvent` and
//! the engine's configured policy decides what happens. Snapshot envelopes
//! carry a schema version and a SHA-256 checksum; a decoder refuses versions
//! newer than it understands and envelopes whose checksum does not match.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ReplicaError;
use crate::event::{Event, EventPayload, LogRecord};
use crate::state::PricingState;

/// Snapshot envelope schema version written by this codec.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Durable form of a serialized state.
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEnvelope {
    schema_version: u32,
    sequence_number: i64,
    checksum: String,
    state: PricingState,
}

/// Serializes an [`EventPayload`] to bytes.
///
/// # Errors
///
/// Returns `MalformedEvent` if serialization fails (which only happens for
/// non-finite floats under `serde_json`).
pub fn encode_payload(payload: &EventPayload) -> Result<Vec<u8>, ReplicaError> {
    serde_json::to_vec(payload).map_err(|e| ReplicaError::MalformedEvent {
        sequence: -1,
        reason: e.to_string(),
    })
}

/// Deserializes payload bytes belonging to `sequence`.
///
/// # Errors
///
/// Returns `MalformedEvent` on invalid JSON or an unknown variant tag.
pub fn decode_payload(sequence: i64, bytes: &[u8]) -> Result<EventPayload, ReplicaError> {
    serde_json::from_slice(bytes).map_err(|e| ReplicaError::MalformedEvent {
        sequence,
        reason: e.to_string(),
    })
}

/// Decodes a wire record into a domain [`Event`].
///
/// # Errors
///
/// Returns `MalformedEvent` if the record payload cannot be decoded.
pub fn decode_record(record: &LogRecord) -> Result<Event, ReplicaError> {
    let payload = decode_payload(record.sequence_number, &record.payload)?;
    Ok(Event {
        event_id: record.event_id,
        partition_key: record.partition_key.clone(),
        sequence_number: record.sequence_number,
        payload,
        enqueued_at: record.enqueued_at,
    })
}

/// Serializes a state into a snapshot envelope.
///
/// # Errors
///
/// Returns `SnapshotWrite` if serialization fails.
pub fn encode_state(state: &PricingState) -> Result<Vec<u8>, ReplicaError> {
    let state_bytes =
        serde_json::to_vec(state).map_err(|e| ReplicaError::SnapshotWrite(e.to_string()))?;
    let envelope = SnapshotEnvelope {
        schema_version: SNAPSHOT_SCHEMA_VERSION,
        sequence_number: state.as_of_sequence,
        checksum: sha256_hex(&state_bytes),
        state: state.clone(),
    };
    serde_json::to_vec(&envelope).map_err(|e| ReplicaError::SnapshotWrite(e.to_string()))
}

/// Deserializes and verifies a snapshot envelope.
///
/// # Errors
///
/// Returns `Bootstrap` on invalid JSON, an unsupported schema version, a
/// checksum mismatch, or a sequence number disagreeing with the state.
pub fn decode_state(bytes: &[u8]) -> Result<PricingState, ReplicaError> {
    let envelope: SnapshotEnvelope = serde_json::from_slice(bytes)
        .map_err(|e| ReplicaError::Bootstrap(format!("snapshot envelope undecodable: {e}")))?;
    if envelope.schema_version > SNAPSHOT_SCHEMA_VERSION {
        return Err(ReplicaError::Bootstrap(format!(
            "snapshot schema version {} is newer than supported version {}",
            envelope.schema_version, SNAPSHOT_SCHEMA_VERSION
        )));
    }
    let state_bytes = serde_json::to_vec(&envelope.state)
        .map_err(|e| ReplicaError::Bootstrap(e.to_string()))?;
    if sha256_hex(&state_bytes) != envelope.checksum {
        return Err(ReplicaError::Bootstrap(format!(
            "snapshot checksum mismatch at sequence {}",
            envelope.sequence_number
        )));
    }
    if envelope.sequence_number != envelope.state.as_of_sequence {
        return Err(ReplicaError::Bootstrap(format!(
            "snapshot envelope sequence {} disagrees with state sequence {}",
            envelope.sequence_number, envelope.state.as_of_sequence
        )));
    }
    Ok(envelope.state)
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut encoded = String::with_capacity(digest.len() * 2);
    for byte in digest {
        encoded.push_str(&format!("{byte:02x}"));
    }
    encoded
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use crate::codec::{decode_payload, decode_record, decode_state, encode_payload, encode_state};
    use crate::error::ReplicaError;
    use crate::event::{EventPayload, LogRecord};
    use crate::reducer::apply;
    use crate::state::PricingState;

    fn record(sequence: i64, payload: Vec<u8>) -> LogRecord {
        LogRecord {
            event_id: Uuid::new_v4(),
            partition_key: "pricing-0".to_owned(),
            sequence_number: sequence,
            payload,
            enqueued_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_payload_round_trips() {
        let payload = EventPayload::MarkupUpdated {
            category: "T-Shirt".to_owned(),
            rate: 3.0,
        };

        let bytes = encode_payload(&payload).unwrap();
        let decoded = decode_payload(7, &bytes).unwrap();

        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_decode_payload_rejects_unknown_tag() {
        let bytes = br#"{"type":"SurgePricingEnabled","factor":2.0}"#;

        let err = decode_payload(42, bytes).unwrap_err();

        match err {
            ReplicaError::MalformedEvent { sequence, .. } => assert_eq!(sequence, 42),
            other => panic!("expected MalformedEvent, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_record_carries_metadata_through() {
        let payload = encode_payload(&EventPayload::DefaultMarkupSet { rate: 1.1 }).unwrap();
        let rec = record(9, payload);

        let event = decode_record(&rec).unwrap();

        assert_eq!(event.sequence_number, 9);
        assert_eq!(event.event_id, rec.event_id);
        assert_eq!(event.payload, EventPayload::DefaultMarkupSet { rate: 1.1 });
    }

    #[test]
    fn test_snapshot_round_trips() {
        let event = crate::event::Event {
            event_id: Uuid::new_v4(),
            partition_key: "pricing-0".to_owned(),
            sequence_number: 0,
            payload: EventPayload::MarkupUpdated {
                category: "T-Shirt".to_owned(),
                rate: 3.0,
            },
            enqueued_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
        };
        let state = apply(&PricingState::empty(), &event);

        let bytes = encode_state(&state).unwrap();
        let restored = decode_state(&bytes).unwrap();

        assert_eq!(restored, state);
    }

    #[test]
    fn test_decode_state_rejects_tampered_payload() {
        let bytes = encode_state(&PricingState::empty()).unwrap();
        let tampered = String::from_utf8(bytes)
            .unwrap()
            .replace("\"default_markup\":0.0", "\"default_markup\":9.0");

        let err = decode_state(tampered.as_bytes()).unwrap_err();

        match err {
            ReplicaError::Bootstrap(reason) => assert!(reason.contains("checksum")),
            other => panic!("expected Bootstrap, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_state_rejects_newer_schema_version() {
        let bytes = encode_state(&PricingState::empty()).unwrap();
        let bumped = String::from_utf8(bytes)
            .unwrap()
            .replace("\"schema_version\":1", "\"schema_version\":99");

        let err = decode_state(bumped.as_bytes()).unwrap_err();

        match err {
            ReplicaError::Bootstrap(reason) => assert!(reason.contains("schema version")),
            other => panic!("expected Bootstrap, got {other:?}"),
        }
    }
}
