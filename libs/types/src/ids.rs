//! Identifier types for game entities
//!
//! Participants are addressed by a display name or by the connection that
//! joined them, symbols by the replay series name, and funds by the letter
//! of their slot inside a player (`a`, `b`, ...).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

/// Reserved participant id of the scripted automated participant.
pub const AI_PARTICIPANT_ID: &str = "AI";

/// Unique identifier for a participant within one session
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The reserved id of the automated participant
    pub fn ai() -> Self {
        Self(AI_PARTICIPANT_ID.to_string())
    }

    /// Whether this id denotes the automated participant
    pub fn is_ai(&self) -> bool {
        self.0 == AI_PARTICIPANT_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<ConnectionId> for ParticipantId {
    fn from(id: ConnectionId) -> Self {
        Self(id.to_string())
    }
}

/// Name of a replayed price series (e.g. `aaba.us`)
///
/// An empty symbol marks a fund whose series is not bound yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unbound(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identifier of a transport connection
///
/// Uses UUID v7 so connection ids sort by connect time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a fund inside a player, bound to the session symbol with the
/// same index.
///
/// Serialized as a lowercase letter: slot 0 is `"a"`, slot 1 is `"b"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FundSlot(u8);

impl FundSlot {
    /// Highest number of slots addressable by a single letter.
    pub const MAX: usize = 26;

    pub fn new(index: usize) -> Option<Self> {
        (index < Self::MAX).then_some(Self(index as u8))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn letter(self) -> char {
        (b'a' + self.0) as char
    }

    /// Parse the wire form (`"a"`, `"B"`, ...)
    pub fn parse(s: &str) -> Option<Self> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphabetic() => {
                Some(Self(c.to_ascii_lowercase() as u8 - b'a'))
            }
            _ => None,
        }
    }
}

impl fmt::Display for FundSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl Serialize for FundSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.letter())
    }
}

impl<'de> Deserialize<'de> for FundSlot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        FundSlot::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid fund slot: {raw:?}")))
    }
}
