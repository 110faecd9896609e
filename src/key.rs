//! Compile-time-constructible hashed string keys, and the opaque 32-bit
//! identifiers built on top of them.

use std::borrow::Cow;
use std::fmt;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

const fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

/// A hashed string token used as a map key everywhere in this crate: event
/// kinds, graphics-system input/output names, config keys, resource ids.
///
/// Equality and ordering compare the hash only, never the original string —
/// collisions are a programmer error, not something this type guards against.
#[derive(Clone, Copy)]
pub struct HashKey {
    hash: u64,
    // Kept only for diagnostics (Debug/Display); never compared.
    text: &'static str,
}

impl HashKey {
    /// Computes the hash at compile time from a `&'static str`.
    #[must_use]
    pub const fn new(text: &'static str) -> Self {
        Self {
            hash: fnv1a(text.as_bytes()),
            text,
        }
    }

    /// Computes the hash at runtime from any string-like value. The
    /// original text is not retained (it may not be `'static`), so
    /// `as_str` and `Debug` fall back to the hash for keys built this way.
    #[must_use]
    pub fn runtime(text: impl AsRef<str>) -> RuntimeHashKey {
        RuntimeHashKey {
            hash: fnv1a(text.as_ref().as_bytes()),
            text: text.as_ref().to_owned(),
        }
    }

    #[must_use]
    pub const fn hash(self) -> u64 {
        self.hash
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.text
    }
}

impl PartialEq for HashKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}
impl Eq for HashKey {}

impl PartialOrd for HashKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HashKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.hash.cmp(&other.hash)
    }
}
impl std::hash::Hash for HashKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}
impl fmt::Debug for HashKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HashKey({:#018x}, {:?})", self.hash, self.text)
    }
}
impl fmt::Display for HashKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// An owned, runtime-constructed variant of [`HashKey`] for strings that
/// aren't `'static` (e.g. loaded from a pipeline description file).
#[derive(Clone)]
pub struct RuntimeHashKey {
    hash: u64,
    text: String,
}

impl RuntimeHashKey {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            hash: fnv1a(text.as_bytes()),
            text,
        }
    }

    #[must_use]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn into_cow(self) -> Cow<'static, str> {
        Cow::Owned(self.text)
    }
}

impl PartialEq for RuntimeHashKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}
impl Eq for RuntimeHashKey {}
impl std::hash::Hash for RuntimeHashKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}
impl fmt::Debug for RuntimeHashKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RuntimeHashKey({:#018x}, {:?})", self.hash, self.text)
    }
}

/// Any partial-eq/hash implementation comparing a [`HashKey`] against a
/// [`RuntimeHashKey`] would need this — provided for lookup convenience.
impl PartialEq<RuntimeHashKey> for HashKey {
    fn eq(&self, other: &RuntimeHashKey) -> bool {
        self.hash == other.hash
    }
}

/// Anything that can address a hash-keyed map entry: both the
/// compile-time [`HashKey`] and the owned [`RuntimeHashKey`] (built from
/// strings that aren't `'static`, e.g. parsed from a file) implement
/// this, so callers can pass either into `Config`/`Inventory` lookups.
pub trait KeyLike {
    fn key_hash(&self) -> u64;
    fn key_text(&self) -> String;
}

impl KeyLike for HashKey {
    fn key_hash(&self) -> u64 {
        self.hash()
    }
    fn key_text(&self) -> String {
        self.as_str().to_string()
    }
}

impl KeyLike for RuntimeHashKey {
    fn key_hash(&self) -> u64 {
        self.hash()
    }
    fn key_text(&self) -> String {
        self.as_str().to_string()
    }
}

macro_rules! opaque_id {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl $name {
            pub const INVALID: Self = Self(u32::MAX);

            #[must_use]
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            #[must_use]
            pub const fn is_valid(self) -> bool {
                self.0 != Self::INVALID.0
            }

            #[must_use]
            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, concat!(stringify!($name), "({})"), self.0)
                } else {
                    write!(f, concat!(stringify!($name), "(INVALID)"))
                }
            }
        }
    };
}

opaque_id!(RenderDataID);
opaque_id!(TransformID);
opaque_id!(EffectID);
opaque_id!(ResourceHandle);
opaque_id!(ViewId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_purity() {
        const A: HashKey = HashKey::new("hello");
        const B: HashKey = HashKey::new("hello");
        assert_eq!(A, B);
        assert_eq!(A.hash(), B.hash());
    }

    #[test]
    fn fnv1a_matches_known_constants() {
        // Empty string hashes to the FNV offset basis.
        assert_eq!(fnv1a(b""), FNV_OFFSET_BASIS);
        assert_eq!(FNV_OFFSET_BASIS, 14_695_981_039_346_656_037);
        assert_eq!(FNV_PRIME, 1_099_511_628_211);
    }

    #[test]
    fn distinct_strings_hash_differently() {
        const A: HashKey = HashKey::new("A");
        const B: HashKey = HashKey::new("B");
        assert_ne!(A, B);
    }

    #[test]
    fn runtime_and_compile_time_agree() {
        const A: HashKey = HashKey::new("scene.json");
        let runtime = HashKey::runtime("scene.json");
        assert_eq!(A.hash(), runtime.hash());
    }

    #[test]
    fn opaque_id_invalid_sentinel() {
        assert!(!RenderDataID::INVALID.is_valid());
        assert!(RenderDataID::new(0).is_valid());
        assert_eq!(RenderDataID::default(), RenderDataID::INVALID);
    }
}
