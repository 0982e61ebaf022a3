use core::fmt::{self, Debug, Display, Formatter};
use core::str::FromStr;

use serde::de::Error as SerdeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Width of a content identifier, in bytes. Sha2-256 digest.
pub const DIGEST_SIZE: usize = 32;

/// A content-addressed block identifier: the hash of a block's exact
/// encoded bytes. Also used to name tree roots.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Link([u8; DIGEST_SIZE]);

impl Link {
    /// Hashes `bytes` to produce the `Link` that names them.
    #[must_use]
    pub fn digest(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hasher.finalize().into())
    }

    /// Wraps an already-computed digest without re-hashing.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; DIGEST_SIZE]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; DIGEST_SIZE] {
        &self.0
    }
}

impl Debug for Link {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Link({})", self)
    }
}

impl Display for Link {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(&self.0).into_string())
    }
}

/// Error parsing a [`Link`] from its base58 text form.
#[derive(Debug, Error)]
pub enum ParseLinkError {
    #[error("invalid base58: {0}")]
    Base58(#[from] bs58::decode::Error),
    #[error("expected {DIGEST_SIZE} bytes, got {0}")]
    WrongLength(usize),
}

impl FromStr for Link {
    type Err = ParseLinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decoded = bs58::decode(s).into_vec()?;
        let bytes: [u8; DIGEST_SIZE] = decoded
            .try_into()
            .map_err(|v: Vec<u8>| ParseLinkError::WrongLength(v.len()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Link {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Link {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(SerdeError::custom)
    }
}

#[cfg(feature = "borsh")]
mod borsh_impl {
    use borsh::{BorshDeserialize, BorshSerialize};

    use super::{Link, DIGEST_SIZE};

    impl BorshSerialize for Link {
        fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
            self.0.serialize(writer)
        }
    }

    impl BorshDeserialize for Link {
        fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
            let bytes = <[u8; DIGEST_SIZE]>::deserialize_reader(reader)?;
            Ok(Self(bytes))
        }
    }
}

#[cfg(test)]
#[path = "tests/link.rs"]
mod tests;
