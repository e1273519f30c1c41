// src/identifier.rs
//
// Stable name keys for node types and endpoints.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Stable instance id of a node within a prototype.
///
/// `0` is reserved for "the graph itself" (graph boundary and local
/// variable termini of a connection).
pub type NodeId = u64;

/// Node id used by connection termini that refer to the owning graph.
pub const GRAPH_NODE_ID: NodeId = 0;

const FNV_PRIME: u32 = 16_777_619;
const OFFSET_BASIS: u32 = 2_166_136_261;

/// 32-bit FNV-1a hash of `name`, followed by one round for a terminating NUL.
///
/// Pure function of the bytes, so identifiers are stable across runs and
/// across hosts. Bytes are sign-extended before mixing, which keeps
/// non-ASCII names hashing the same as in existing assets.
pub const fn fnv_hash(name: &str) -> u32 {
    let bytes = name.as_bytes();
    let mut hash = OFFSET_BASIS;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as i8 as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash = hash.wrapping_mul(FNV_PRIME);
    hash
}

/// A hashed name used as a lookup key.
///
/// Equality, ordering and hashing only look at the 32-bit hash. The debug
/// name is kept for diagnostics when the identifier was built from a static
/// string; identifiers read back from persisted data only carry the hash.
#[derive(Clone, Copy, Default)]
pub struct Identifier {
    hash: u32,
    dbg_name: Option<&'static str>,
}

impl Identifier {
    /// Identifier for a static name, keeping the name for diagnostics.
    pub const fn new(name: &'static str) -> Self {
        Self {
            hash: fnv_hash(name),
            dbg_name: Some(name),
        }
    }

    /// Identifier for a name only known at runtime. Only the hash is kept.
    pub fn hashed(name: &str) -> Self {
        Self::from_hash(fnv_hash(name))
    }

    pub const fn from_hash(hash: u32) -> Self {
        Self {
            hash,
            dbg_name: None,
        }
    }

    #[inline]
    pub const fn raw(&self) -> u32 {
        self.hash
    }

    pub fn dbg_name(&self) -> Option<&'static str> {
        self.dbg_name
    }
}

impl From<&'static str> for Identifier {
    fn from(name: &'static str) -> Self {
        Self::new(name)
    }
}

impl From<u32> for Identifier {
    fn from(hash: u32) -> Self {
        Self::from_hash(hash)
    }
}

impl From<Identifier> for u32 {
    fn from(id: Identifier) -> Self {
        id.hash
    }
}

// Persisted as the bare hash; the debug name never leaves the process.
impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.hash)
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u32::deserialize(deserializer).map(Identifier::from_hash)
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Identifier {}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hash.cmp(&other.hash)
    }
}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.dbg_name {
            Some(name) => write!(f, "{:?}({:#010x})", name, self.hash),
            None => write!(f, "{:#010x}", self.hash),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.dbg_name {
            Some(name) => f.write_str(name),
            None => write!(f, "{:#010x}", self.hash),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable() {
        // FNV-1a over "" plus the NUL round.
        assert_eq!(fnv_hash(""), OFFSET_BASIS.wrapping_mul(FNV_PRIME));
        assert_eq!(fnv_hash("Value1"), fnv_hash("Value1"));
        assert_ne!(fnv_hash("Value1"), fnv_hash("Value2"));
    }

    #[test]
    fn test_non_ascii_bytes_are_sign_extended() {
        // "é" is 0xC3 0xA9 in UTF-8
        let mut expected = OFFSET_BASIS;
        for byte in [0xFFFF_FFC3_u32, 0xFFFF_FFA9] {
            expected ^= byte;
            expected = expected.wrapping_mul(FNV_PRIME);
        }
        expected = expected.wrapping_mul(FNV_PRIME);

        assert_eq!(fnv_hash("é"), expected);
        // ASCII is unaffected
        assert_eq!(
            fnv_hash("A"),
            ((OFFSET_BASIS ^ 0x41).wrapping_mul(FNV_PRIME)).wrapping_mul(FNV_PRIME),
        );
    }

    #[test]
    fn test_persists_as_bare_hash() {
        let id = Identifier::new("Value1");
        let bytes = bincode::serialize(&id).unwrap();
        assert_eq!(bytes, id.raw().to_le_bytes());

        // Decoding from a short-lived buffer must not need a 'static borrow
        let decoded: Identifier = bincode::deserialize(&bytes.clone()).unwrap();
        assert_eq!(decoded, id);
        assert_eq!(decoded.dbg_name(), None);
    }

    #[test]
    fn test_equality_ignores_debug_name() {
        let named = Identifier::new("Out");
        let runtime = Identifier::hashed("Out");
        let raw = Identifier::from_hash(named.raw());

        assert_eq!(named, runtime);
        assert_eq!(named, raw);
        assert_eq!(named.dbg_name(), Some("Out"));
        assert_eq!(raw.dbg_name(), None);
    }

    #[test]
    fn test_const_construction() {
        const ADD: Identifier = Identifier::new("Add (Float)");
        assert_eq!(ADD, Identifier::hashed("Add (Float)"));
        assert_eq!(ADD.to_string(), "Add (Float)");
    }
}
