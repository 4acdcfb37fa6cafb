//! Wire payload encode/decode.
//!
//! Stands in for a code-generated schema module (SPEC_FULL.md's own
//! framing note permits this): each [`durable_types::EntryPayload`] variant
//! is serialized with `serde_json` inside the frame payload produced by
//! [`crate::codec::Codec`].

use durable_types::EntryPayload;

use crate::error::RuntimeError;

pub fn encode(payload: &EntryPayload) -> Result<Vec<u8>, RuntimeError> {
    serde_json::to_vec(payload).map_err(|e| RuntimeError::decode(e.to_string()))
}

pub fn decode(bytes: &[u8]) -> Result<EntryPayload, RuntimeError> {
    serde_json::from_slice(bytes).map_err(|e| RuntimeError::decode(e.to_string()))
}
