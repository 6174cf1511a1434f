//! Persisted records.
//!
//! - [`ServerState`]: one per ingesting token, lists its [`LogSession`]s.
//! - [`LogSession`]: one contiguous match/round recording.
//! - [`ChunkRecord`]: one durably stored byte range inside a session.
//! - [`LogSummary`]: read-only projection used for listings and `new_log`
//!   notifications.

use serde::{Deserialize, Serialize};

use crate::error::TypesError;
use crate::ids::{LogSessionId, ServerToken};
use crate::time::LogTimestamp;

/// Half-open byte range `[begin, end)` within a session's log stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ByteRange {
    /// First byte offset covered (inclusive).
    pub begin: u64,
    /// First byte offset not covered (exclusive).
    pub end: u64,
}

impl ByteRange {
    /// Build a range, rejecting `end < begin`.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::InvertedRange`] when `end < begin`.
    pub const fn new(begin: u64, end: u64) -> Result<Self, TypesError> {
        if end < begin {
            return Err(TypesError::InvertedRange { begin, end });
        }
        Ok(Self { begin, end })
    }

    /// Number of bytes covered.
    pub const fn len(&self) -> u64 {
        self.end.saturating_sub(self.begin)
    }

    /// Whether the range covers no bytes.
    pub const fn is_empty(&self) -> bool {
        self.end <= self.begin
    }
}

/// Game-state scalars attached to every chunk.
///
/// Carried through unchanged for audit and analytics; reassembly never
/// looks at them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Counter-terrorist score.
    #[serde(rename = "game_score_ct", default)]
    pub score_ct: i64,
    /// Terrorist score.
    #[serde(rename = "game_score_t", default)]
    pub score_t: i64,
    /// Round/game state label reported by the server.
    #[serde(rename = "game_state", default)]
    pub state: String,
    /// Counter-terrorist team name.
    #[serde(rename = "game_team_ct", default)]
    pub team_ct: String,
    /// Terrorist team name.
    #[serde(rename = "game_team_t", default)]
    pub team_t: String,
    /// First server tick covered by the chunk.
    #[serde(default)]
    pub tick_start: i64,
    /// Last server tick covered by the chunk.
    #[serde(default)]
    pub tick_end: i64,
}

/// One durably stored byte range within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Begin offset of the stored bytes (inclusive).
    pub begin_offset: u64,
    /// End offset of the stored bytes (exclusive).
    pub end_offset: u64,
    /// Timestamp the game server attached to the chunk.
    pub timestamp: LogTimestamp,
    /// Game-state scalars of the chunk.
    #[serde(flatten)]
    pub game: GameState,
}

impl ChunkRecord {
    /// Build a record covering `range`.
    pub const fn new(range: ByteRange, timestamp: LogTimestamp, game: GameState) -> Self {
        Self {
            begin_offset: range.begin,
            end_offset: range.end,
            timestamp,
            game,
        }
    }

    /// The byte range this record covers.
    pub const fn range(&self) -> ByteRange {
        ByteRange {
            begin: self.begin_offset,
            end: self.end_offset,
        }
    }
}

/// One contiguous logical match/round recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSession {
    /// Deterministic id (token + start time).
    #[serde(rename = "log_id")]
    pub id: LogSessionId,
    /// Timestamp of the chunk that opened the session.
    #[serde(rename = "log_start_time")]
    pub start_time: LogTimestamp,
    /// Map name the session was recorded on.
    #[serde(rename = "game_map")]
    pub map: String,
    /// Network address of the game server.
    pub server_addr: String,
    /// Timestamp of the most recent chunk.
    pub last_activity: LogTimestamp,
    /// Exclusive upper bound of the bytes stored for this session.
    ///
    /// Never decreases over the session's lifetime.
    pub last_byte_offset: u64,
    /// Begin offset of the first chunk the session was opened with.
    ///
    /// Non-zero means the head of the stream was never received.
    #[serde(default)]
    pub first_byte_offset: u64,
}

impl LogSession {
    /// Open a session from its first chunk.
    pub fn open(
        token: &ServerToken,
        range: ByteRange,
        timestamp: LogTimestamp,
        map: &str,
        server_addr: &str,
    ) -> Self {
        Self {
            id: LogSessionId::derive(token, &timestamp),
            start_time: timestamp,
            map: map.to_owned(),
            server_addr: server_addr.to_owned(),
            last_activity: timestamp,
            last_byte_offset: range.end,
            first_byte_offset: range.begin,
        }
    }

    /// Whether the session was opened without the start of the stream.
    pub const fn missing_head(&self) -> bool {
        self.first_byte_offset != 0
    }
}

/// Everything known about one ingesting token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerState {
    /// Token of the ingesting server.
    #[serde(rename = "server_instance_token")]
    pub token: ServerToken,
    /// Player/account identifier last reported by the server.
    #[serde(rename = "steam_id", default)]
    pub player_id: Option<String>,
    /// Sessions in creation order.
    #[serde(rename = "logs", default)]
    pub sessions: Vec<LogSession>,
}

impl ServerState {
    /// State for a token that has never been seen.
    pub const fn empty(token: ServerToken) -> Self {
        Self {
            token,
            player_id: None,
            sessions: Vec::new(),
        }
    }

    /// Look up a session by id.
    pub fn session(&self, id: &LogSessionId) -> Option<&LogSession> {
        self.sessions.iter().find(|s| &s.id == id)
    }
}

/// Read-only summary of one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSummary {
    /// Owning token.
    #[serde(rename = "server_instance_token")]
    pub token: ServerToken,
    /// Session id.
    #[serde(rename = "log_id")]
    pub session_id: LogSessionId,
    /// Session start time.
    #[serde(rename = "log_start_time")]
    pub start_time: LogTimestamp,
    /// Map name.
    #[serde(rename = "game_map")]
    pub map: String,
    /// Game server address.
    pub server_addr: String,
    /// Player/account identifier, if the server reported one.
    #[serde(rename = "steam_id")]
    pub player_id: Option<String>,
    /// Timestamp of the most recent chunk.
    pub last_activity: LogTimestamp,
    /// Whether the session is missing the start of its stream.
    pub missing_head: bool,
}

impl LogSummary {
    /// Project a session of `state` into a summary.
    pub fn of(state: &ServerState, session: &LogSession) -> Self {
        Self {
            token: state.token.clone(),
            session_id: session.id.clone(),
            start_time: session.start_time,
            map: session.map.clone(),
            server_addr: session.server_addr.clone(),
            player_id: state.player_id.clone(),
            last_activity: session.last_activity,
            missing_head: session.missing_head(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ts(raw: &str) -> LogTimestamp {
        raw.parse().unwrap()
    }

    #[test]
    fn byte_range_rejects_inverted() {
        assert!(ByteRange::new(10, 5).is_err());
        let r = ByteRange::new(5, 10).unwrap();
        assert_eq!(r.len(), 5);
        assert!(!r.is_empty());
        assert!(ByteRange::new(7, 7).unwrap().is_empty());
    }

    #[test]
    fn opened_session_tracks_head_gap() {
        let token = ServerToken::parse("srv").unwrap();
        let range = ByteRange::new(4096, 4200).unwrap();
        let session = LogSession::open(
            &token,
            range,
            ts("03/01/2025 - 10:00:00.000"),
            "de_dust2",
            "10.0.0.1:27015",
        );
        assert_eq!(session.last_byte_offset, 4200);
        assert!(session.missing_head());
        assert_eq!(session.id.as_str(), "srv_20250301-100000-000");
    }

    #[test]
    fn chunk_record_json_is_flat() {
        let record = ChunkRecord::new(
            ByteRange::new(0, 12).unwrap(),
            ts("03/01/2025 - 10:00:00.000"),
            GameState {
                score_ct: 3,
                state: String::from("live"),
                ..GameState::default()
            },
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["begin_offset"], 0);
        assert_eq!(json["end_offset"], 12);
        assert_eq!(json["game_score_ct"], 3);
        assert_eq!(json["game_state"], "live");
        let back: ChunkRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn summary_carries_player_id() {
        let token = ServerToken::parse("srv").unwrap();
        let session = LogSession::open(
            &token,
            ByteRange::new(0, 1).unwrap(),
            ts("03/01/2025 - 10:00:00.000"),
            "de_inferno",
            "",
        );
        let mut state = ServerState::empty(token);
        state.player_id = Some(String::from("76561198000000000"));
        state.sessions.push(session.clone());
        let summary = LogSummary::of(&state, &session);
        assert_eq!(summary.player_id.as_deref(), Some("76561198000000000"));
        assert!(!summary.missing_head);
    }
}
