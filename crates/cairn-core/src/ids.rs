//! Identifier newtypes.
//!
//! [`DocId`] is content-derived and stable across re-ingestion of identical content.
//! [`ChunkId`] is always of the form `<docId>_chunk_<ordinal>` (spec §3) so that a chunk's
//! owning document can be recovered without a back-pointer — the arena-plus-identifier
//! pattern spec §9 calls for instead of a cyclic `Document <-> Chunk` reference.
//! [`SessionId`] is an opaque, unguessable token (spec §4.5 invariant: >= 128 bits of
//! entropy), generated from an OS-backed CSPRNG rather than `Uuid::new_v4` (a v4 UUID only
//! carries 122 random bits once the version/variant nibbles are fixed).

use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable, content-derived document identifier (e.g. a hex digest of canonicalized
/// content). Opaque to every consumer except the out-of-scope ingestion pipeline that
/// mints it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocId(pub String);

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the form `<docId>_chunk_<ordinal>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkId(pub String);

impl ChunkId {
    /// Build a chunk identifier from its owning document and ordinal position.
    pub fn new(doc_id: &DocId, ordinal: usize) -> Self {
        Self(format!("{}_chunk_{}", doc_id.0, ordinal))
    }

    /// Recover the owning document id by stripping the `_chunk_<ordinal>` suffix.
    ///
    /// Returns `None` if the identifier was not built by [`ChunkId::new`] (e.g. a
    /// hand-constructed id in a test fixture that doesn't follow the convention).
    pub fn doc_id(&self) -> Option<DocId> {
        let (doc_part, _) = self.0.rsplit_once("_chunk_")?;
        Some(DocId(doc_part.to_string()))
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque session identifier with at least 128 bits of CSPRNG-sourced entropy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId([u8; 16]);

impl SessionId {
    /// Mint a fresh, unguessable session id.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Parse a previously-issued session id from its hex representation.
    pub fn parse(s: &str) -> Option<Self> {
        if s.len() != 32 {
            return None;
        }
        let mut bytes = [0u8; 16];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let hex = std::str::from_utf8(chunk).ok()?;
            bytes[i] = u8::from_str_radix(hex, 16).ok()?;
        }
        Some(Self(bytes))
    }

    /// View this id as a [`Uuid`] for interop with error reporting and HTTP payloads,
    /// which use `Uuid` as their wire/identifier type. The 128 bits are identical; this is
    /// a relabeling, not a re-derivation, so it carries no entropy loss.
    pub fn as_uuid(&self) -> Uuid {
        Uuid::from_bytes(self.0)
    }
}

impl From<Uuid> for SessionId {
    fn from(uuid: Uuid) -> Self {
        Self(*uuid.as_bytes())
    }
}

impl From<SessionId> for Uuid {
    fn from(id: SessionId) -> Self {
        id.as_uuid()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_id_recovers_doc_id() {
        let doc = DocId("abc123".to_string());
        let chunk = ChunkId::new(&doc, 4);
        assert_eq!(chunk.0, "abc123_chunk_4");
        assert_eq!(chunk.doc_id(), Some(doc));
    }

    #[test]
    fn session_id_round_trips_through_display_and_parse() {
        let id = SessionId::generate();
        let s = id.to_string();
        assert_eq!(s.len(), 32);
        assert_eq!(SessionId::parse(&s), Some(id));
    }

    #[test]
    fn session_id_generate_is_not_all_zero_and_varies() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert_ne!(a.0, [0u8; 16]);
    }
}
