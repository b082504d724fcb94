//! Leaderboard entry types
//!
//! `LeaderboardEntry` ranks the participants of the running session;
//! `GlobalLeaderboardEntry` is the persisted cross-session record.

use crate::ids::ParticipantId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Whether a participant is a person or the scripted replay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantKind {
    Human,
    Ai,
}

impl ParticipantKind {
    /// Classify by the reserved-id convention
    pub fn of(id: &ParticipantId) -> Self {
        if id.is_ai() {
            ParticipantKind::Ai
        } else {
            ParticipantKind::Human
        }
    }
}

/// Session leaderboard row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub player_id: ParticipantId,
    pub networth: f64,
    #[serde(rename = "type")]
    pub kind: ParticipantKind,
}

/// Persisted cross-session leaderboard row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalLeaderboardEntry {
    pub player_id: ParticipantId,
    pub networth: f64,
    pub timestamp: DateTime<Utc>,
}

/// Descending by net worth. Uses `total_cmp` so the order is total even
/// for NaN.
pub fn by_networth_desc(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_kind_by_id() {
        assert_eq!(ParticipantKind::of(&ParticipantId::ai()), ParticipantKind::Ai);
        assert_eq!(
            ParticipantKind::of(&ParticipantId::new("Player 1")),
            ParticipantKind::Human
        );
    }

    #[test]
    fn test_leaderboard_entry_wire_format() {
        let entry = LeaderboardEntry {
            player_id: ParticipantId::ai(),
            networth: 10_500.0,
            kind: ParticipantKind::Ai,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "ai");
        assert_eq!(json["player_id"], "AI");
    }

    #[test]
    fn test_by_networth_desc() {
        let mut values = vec![50.0, 100.0, 75.0];
        values.sort_by(|a, b| by_networth_desc(*a, *b));
        assert_eq!(values, vec![100.0, 75.0, 50.0]);
    }
}
