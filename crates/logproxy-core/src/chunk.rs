//! Inbound chunk as handed to the reassembly engine.

use logproxy_types::{ByteRange, GameState, LogTimestamp, ServerToken};

use crate::error::ReassemblyError;

/// A validated chunk of one game server's log stream.
///
/// The payload length always equals the declared range length, so
/// `payload[0]` is the byte at `range.begin`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingChunk {
    token: ServerToken,
    range: ByteRange,
    payload: Vec<u8>,
    timestamp: LogTimestamp,
    map: String,
    server_addr: String,
    player_id: Option<String>,
    game: GameState,
}

impl IncomingChunk {
    /// Build a chunk from its required parts.
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError::LengthMismatch`] if `payload` is not
    /// exactly `range.len()` bytes long.
    pub fn new(
        token: ServerToken,
        range: ByteRange,
        payload: Vec<u8>,
        timestamp: LogTimestamp,
    ) -> Result<Self, ReassemblyError> {
        let actual = u64::try_from(payload.len()).unwrap_or(u64::MAX);
        if actual != range.len() {
            return Err(ReassemblyError::LengthMismatch {
                begin: range.begin,
                end: range.end,
                declared: range.len(),
                actual,
            });
        }
        Ok(Self {
            token,
            range,
            payload,
            timestamp,
            map: String::new(),
            server_addr: String::new(),
            player_id: None,
            game: GameState::default(),
        })
    }

    /// Set the map the chunk was recorded on.
    #[must_use]
    pub fn with_map(mut self, map: impl Into<String>) -> Self {
        self.map = map.into();
        self
    }

    /// Set the game server's network address.
    #[must_use]
    pub fn with_server_addr(mut self, addr: impl Into<String>) -> Self {
        self.server_addr = addr.into();
        self
    }

    /// Set the player/account id. Empty strings are treated as absent.
    #[must_use]
    pub fn with_player_id(mut self, player_id: impl Into<String>) -> Self {
        let player_id = player_id.into();
        self.player_id = (!player_id.is_empty()).then_some(player_id);
        self
    }

    /// Attach the game-state scalars.
    #[must_use]
    pub fn with_game_state(mut self, game: GameState) -> Self {
        self.game = game;
        self
    }

    /// Token of the sending server.
    pub const fn token(&self) -> &ServerToken {
        &self.token
    }

    /// Declared byte range.
    pub const fn range(&self) -> ByteRange {
        self.range
    }

    /// Raw bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Server-side timestamp of the chunk.
    pub const fn timestamp(&self) -> LogTimestamp {
        self.timestamp
    }

    /// Map name.
    pub fn map(&self) -> &str {
        &self.map
    }

    /// Game server address.
    pub fn server_addr(&self) -> &str {
        &self.server_addr
    }

    /// Player/account id, if one was sent.
    pub fn player_id(&self) -> Option<&str> {
        self.player_id.as_deref()
    }

    /// Game-state scalars.
    pub const fn game(&self) -> &GameState {
        &self.game
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn token() -> ServerToken {
        ServerToken::parse("srv").unwrap()
    }

    fn ts() -> LogTimestamp {
        "03/01/2025 - 10:00:00.000".parse().unwrap()
    }

    #[test]
    fn rejects_length_mismatch() {
        let range = ByteRange::new(0, 10).unwrap();
        let err = IncomingChunk::new(token(), range, b"short".to_vec(), ts()).unwrap_err();
        assert!(matches!(
            err,
            ReassemblyError::LengthMismatch {
                declared: 10,
                actual: 5,
                ..
            }
        ));
        assert!(err.is_rejection());
    }

    #[test]
    fn empty_player_id_is_absent() {
        let range = ByteRange::new(5, 5).unwrap();
        let chunk = IncomingChunk::new(token(), range, Vec::new(), ts())
            .unwrap()
            .with_player_id("");
        assert_eq!(chunk.player_id(), None);
        let chunk = chunk.with_player_id("7656");
        assert_eq!(chunk.player_id(), Some("7656"));
    }
}
