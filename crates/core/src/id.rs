// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed identifiers for sessions and executions.
//!
//! An id is a 4-character family prefix plus a 19-character random token,
//! held inline so ids stay `Copy` through the registry map, error values,
//! and event envelopes. The family is a zero-sized [`IdKind`] marker on
//! [`TypedId`], so a session id and an execution id are different types
//! even though both are 23-byte strings on the wire.

use std::marker::PhantomData;

/// Total id length: prefix plus token.
pub const ID_LEN: usize = 23;
const TOKEN_LEN: usize = 19;

/// One id family. Implementors are uninhabited marker types; only the
/// wire prefix matters.
pub trait IdKind {
    /// 4-character family tag ending in `-`, e.g. `ses-`.
    const PREFIX: &'static str;
}

/// Inline identifier tagged with its family.
///
/// The empty id (via [`TypedId::empty`] or `Default`) marks "not assigned
/// yet"; writers and registries fill it in before anything reaches the
/// wire.
pub struct TypedId<K> {
    len: u8,
    bytes: [u8; ID_LEN],
    _kind: PhantomData<K>,
}

impl<K> TypedId<K> {
    pub const fn empty() -> Self {
        Self { len: 0, bytes: [0; ID_LEN], _kind: PhantomData }
    }

    pub fn as_str(&self) -> &str {
        // Only ever filled from &str, so the bytes stay valid UTF-8.
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<K: IdKind> TypedId<K> {
    /// Fresh random id carrying the family prefix.
    pub fn generate() -> Self {
        Self::fill(&format!("{}{}", K::PREFIX, nanoid::nanoid!(TOKEN_LEN)))
    }

    /// Wrap an existing id string (caller-chosen or echoed back by a
    /// client). Oversized input is clamped to [`ID_LEN`] bytes.
    pub fn from_string(value: impl AsRef<str>) -> Self {
        Self::fill(value.as_ref())
    }

    /// The random token without the family prefix.
    pub fn token(&self) -> &str {
        self.as_str().strip_prefix(K::PREFIX).unwrap_or_else(|| self.as_str())
    }

    fn fill(value: &str) -> Self {
        debug_assert!(
            value.len() <= ID_LEN,
            "id exceeds {} bytes ({} bytes): {:?}",
            ID_LEN,
            value.len(),
            value,
        );
        let len = value.len().min(ID_LEN);
        let mut bytes = [0u8; ID_LEN];
        bytes[..len].copy_from_slice(&value.as_bytes()[..len]);
        Self { len: len as u8, bytes, _kind: PhantomData }
    }
}

// Manual impls: derives would demand bounds on the uninhabited marker.

impl<K> Copy for TypedId<K> {}

impl<K> Clone for TypedId<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Default for TypedId<K> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<K> PartialEq for TypedId<K> {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl<K> Eq for TypedId<K> {}

impl<K> PartialEq<str> for TypedId<K> {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl<K> PartialEq<&str> for TypedId<K> {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl<K> std::hash::Hash for TypedId<K> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl<K> std::fmt::Debug for TypedId<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl<K> std::fmt::Display for TypedId<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<K: IdKind> From<&str> for TypedId<K> {
    fn from(value: &str) -> Self {
        Self::from_string(value)
    }
}

impl<K: IdKind> From<String> for TypedId<K> {
    fn from(value: String) -> Self {
        Self::from_string(value)
    }
}

impl<K> serde::Serialize for TypedId<K> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de, K: IdKind> serde::Deserialize<'de> for TypedId<K> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        if value.len() > ID_LEN {
            return Err(serde::de::Error::custom(format!(
                "id exceeds {ID_LEN} bytes: {value:?}"
            )));
        }
        Ok(Self::from_string(value))
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
