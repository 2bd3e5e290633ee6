//! Party identities and party-tagged messages.

use std::{
    fmt,
    fmt::{Debug, Display, Formatter},
    hash::Hash,
    str::FromStr,
};
use thiserror::Error;
use uuid::Uuid;

/// The party id could not be parsed.
#[derive(Error, Debug)]
#[error("invalid party id: {0}")]
pub struct InvalidPartyId(String);

/// An opaque party identifier.
///
/// Party ids are ordered byte strings. The ordering is what fixes the
/// evaluation-point assignment for a protocol run, so all parties must agree
/// on the full id list but nothing else about its contents.
#[derive(Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartyId(Vec<u8>);

impl FromStr for PartyId {
    type Err = InvalidPartyId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| InvalidPartyId(e.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Display for PartyId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

impl Debug for PartyId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "PartyId({self})")
    }
}

impl AsRef<[u8]> for PartyId {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl From<Vec<u8>> for PartyId {
    fn from(data: Vec<u8>) -> Self {
        PartyId(data)
    }
}

impl From<&[u8]> for PartyId {
    fn from(data: &[u8]) -> Self {
        PartyId(data.to_vec())
    }
}

impl From<Uuid> for PartyId {
    fn from(id: Uuid) -> PartyId {
        PartyId::from(id.as_ref())
    }
}

impl From<usize> for PartyId {
    fn from(num: usize) -> PartyId {
        PartyId(num.to_be_bytes().to_vec())
    }
}

/// A message tagged with the party that sent it.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartyMessage<T> {
    /// The sender party id.
    pub sender: PartyId,

    /// The message itself.
    pub message: T,
}

impl<T> PartyMessage<T> {
    /// Construct a new party message.
    pub fn new(sender: PartyId, message: T) -> Self {
        Self { sender, message }
    }

    /// Decompose this message into its sender and contents.
    pub fn into_parts(self) -> (PartyId, T) {
        (self.sender, self.message)
    }
}
