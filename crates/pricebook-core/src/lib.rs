//! Pricebook Core — shared domain abstractions.
//!
//! This crate defines the event model, the reduced pricing state, the pure
//! reducer, the wire codec, and the async traits for the three external
//! collaborators (live log, capture archive, snapshot store). It contains no
//! infrastructure code.

pub mod archive;
pub mod clock;
pub mod codec;
pub mod error;
pub mod event;
pub mod log;
pub mod reducer;
pub mod snapshot;
pub mod state;
