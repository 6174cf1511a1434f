//! Game-server ingest headers.
//!
//! Each chunk POST describes itself through `X-*` headers. The token and
//! both byte offsets are required; other numeric headers default to 0 and
//! text headers to the empty string.

use axum::body::Bytes;
use axum::http::HeaderMap;
use logproxy_core::IncomingChunk;
use logproxy_types::{ByteRange, GameState, LogTimestamp, ServerToken};

use crate::error::ApiError;

/// Token identifying the sending server instance.
pub const SERVER_INSTANCE_TOKEN: &str = "x-server-instance-token";
/// First byte offset of the chunk (inclusive).
pub const BEGIN_OFFSET: &str = "x-logbytes-beginoffset";
/// Last byte offset of the chunk (exclusive).
pub const END_OFFSET: &str = "x-logbytes-endoffset";
/// Server-side timestamp, `MM/DD/YYYY - HH:MM:SS.mmm`.
pub const TIMESTAMP: &str = "x-timestamp";
/// Map name.
pub const GAME_MAP: &str = "x-game-map";
/// Server network address.
pub const SERVER_ADDR: &str = "x-server-addr";
/// Player/account id.
pub const STEAM_ID: &str = "x-steamid";
/// Counter-terrorist score.
pub const SCORE_CT: &str = "x-game-scorect";
/// Terrorist score.
pub const SCORE_T: &str = "x-game-scoret";
/// Round/game state label.
pub const GAME_STATE: &str = "x-game-state";
/// Counter-terrorist team name.
pub const TEAM_CT: &str = "x-game-teamct";
/// Terrorist team name.
pub const TEAM_T: &str = "x-game-teamt";
/// First tick covered.
pub const TICK_START: &str = "x-tick-start";
/// Last tick covered.
pub const TICK_END: &str = "x-tick-end";

/// Response header set when a returned log is not fully backed by records.
pub const LOG_PARTIAL: &str = "x-log-partial";

/// Build an [`IncomingChunk`] from an ingest request.
///
/// # Errors
///
/// - [`ApiError::MissingHeader`] if the token or an offset is absent.
/// - [`ApiError::InvalidHeader`] if a header is not valid text or a
///   numeric header does not parse.
/// - [`ApiError::BadRequest`] if the token, range or timestamp is invalid,
///   or the body length disagrees with the offsets.
pub fn parse_chunk(headers: &HeaderMap, body: Bytes) -> Result<IncomingChunk, ApiError> {
    let token = ServerToken::parse(required(headers, SERVER_INSTANCE_TOKEN)?)?;
    let begin = parse_number(BEGIN_OFFSET, required(headers, BEGIN_OFFSET)?)?;
    let end = parse_number(END_OFFSET, required(headers, END_OFFSET)?)?;
    let range = ByteRange::new(begin, end)?;
    let timestamp: LogTimestamp = text(headers, TIMESTAMP)?.parse()?;

    let game = GameState {
        score_ct: number(headers, SCORE_CT)?,
        score_t: number(headers, SCORE_T)?,
        state: text(headers, GAME_STATE)?.to_owned(),
        team_ct: text(headers, TEAM_CT)?.to_owned(),
        team_t: text(headers, TEAM_T)?.to_owned(),
        tick_start: number(headers, TICK_START)?,
        tick_end: number(headers, TICK_END)?,
    };

    Ok(IncomingChunk::new(token, range, body.to_vec(), timestamp)?
        .with_map(text(headers, GAME_MAP)?)
        .with_server_addr(text(headers, SERVER_ADDR)?)
        .with_player_id(text(headers, STEAM_ID)?)
        .with_game_state(game))
}

fn required<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, ApiError> {
    let value = text(headers, name)?;
    if value.is_empty() {
        return Err(ApiError::MissingHeader(name));
    }
    Ok(value)
}

fn text<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, ApiError> {
    headers.get(name).map_or(Ok(""), |value| {
        value
            .to_str()
            .map(str::trim)
            .map_err(|e| ApiError::InvalidHeader {
                name,
                reason: e.to_string(),
            })
    })
}

fn number<T>(headers: &HeaderMap, name: &'static str) -> Result<T, ApiError>
where
    T: std::str::FromStr + Default,
    T::Err: std::fmt::Display,
{
    let raw = text(headers, name)?;
    if raw.is_empty() {
        return Ok(T::default());
    }
    parse_number(name, raw)
}

fn parse_number<T>(name: &'static str, raw: &str) -> Result<T, ApiError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ApiError::InvalidHeader {
        name,
        reason: format!("{raw:?}: {e}"),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn base_headers(begin: &str, end: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(SERVER_INSTANCE_TOKEN, HeaderValue::from_static("srv-1"));
        headers.insert(BEGIN_OFFSET, HeaderValue::from_str(begin).unwrap());
        headers.insert(END_OFFSET, HeaderValue::from_str(end).unwrap());
        headers.insert(TIMESTAMP, HeaderValue::from_static("01/30/2025 - 16:33:56.470"));
        headers
    }

    #[test]
    fn parses_full_header_set() {
        let mut headers = base_headers("0", "5");
        headers.insert(GAME_MAP, HeaderValue::from_static("de_ancient"));
        headers.insert(SERVER_ADDR, HeaderValue::from_static("10.1.1.1:27015"));
        headers.insert(STEAM_ID, HeaderValue::from_static("76561198000000001"));
        headers.insert(SCORE_CT, HeaderValue::from_static("4"));
        headers.insert(SCORE_T, HeaderValue::from_static("9"));
        headers.insert(GAME_STATE, HeaderValue::from_static("live"));
        headers.insert(TEAM_CT, HeaderValue::from_static("Blue"));
        headers.insert(TEAM_T, HeaderValue::from_static("Red"));
        headers.insert(TICK_START, HeaderValue::from_static("128"));
        headers.insert(TICK_END, HeaderValue::from_static("256"));

        let chunk = parse_chunk(&headers, Bytes::from_static(b"hello")).unwrap();
        assert_eq!(chunk.token().as_str(), "srv-1");
        assert_eq!(chunk.range(), ByteRange::new(0, 5).unwrap());
        assert_eq!(chunk.map(), "de_ancient");
        assert_eq!(chunk.server_addr(), "10.1.1.1:27015");
        assert_eq!(chunk.player_id(), Some("76561198000000001"));
        assert_eq!(chunk.game().score_t, 9);
        assert_eq!(chunk.game().team_ct, "Blue");
        assert_eq!(chunk.game().tick_end, 256);
    }

    #[test]
    fn optional_headers_default() {
        let chunk = parse_chunk(&base_headers("10", "12"), Bytes::from_static(b"ab")).unwrap();
        assert_eq!(chunk.map(), "");
        assert_eq!(chunk.player_id(), None);
        assert_eq!(chunk.game(), &GameState::default());
    }

    #[test]
    fn missing_token_is_rejected() {
        let mut headers = base_headers("0", "1");
        headers.remove(SERVER_INSTANCE_TOKEN);
        let err = parse_chunk(&headers, Bytes::from_static(b"x")).unwrap_err();
        assert!(matches!(err, ApiError::MissingHeader(SERVER_INSTANCE_TOKEN)));
    }

    #[test]
    fn missing_offset_is_rejected() {
        let mut headers = base_headers("0", "1");
        headers.remove(END_OFFSET);
        let err = parse_chunk(&headers, Bytes::from_static(b"x")).unwrap_err();
        assert!(matches!(err, ApiError::MissingHeader(END_OFFSET)));
    }

    #[test]
    fn non_numeric_offset_is_rejected() {
        let err = parse_chunk(&base_headers("zero", "1"), Bytes::from_static(b"x")).unwrap_err();
        assert!(matches!(err, ApiError::InvalidHeader { name: BEGIN_OFFSET, .. }));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = parse_chunk(&base_headers("9", "3"), Bytes::new()).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn body_must_match_offsets() {
        let err = parse_chunk(&base_headers("0", "10"), Bytes::from_static(b"short")).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn bad_timestamp_is_rejected() {
        let mut headers = base_headers("0", "1");
        headers.insert(TIMESTAMP, HeaderValue::from_static("yesterday"));
        let err = parse_chunk(&headers, Bytes::from_static(b"x")).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
