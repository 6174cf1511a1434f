//! Pure decisions behind chunk reassembly.
//!
//! Nothing here touches storage: given a token's state and a session's
//! chunk records, these functions say which session a chunk continues and
//! which of its bytes are new.

use chrono::TimeDelta;
use logproxy_types::{ByteRange, ChunkRecord, LogSession, LogTimestamp};

use crate::error::ReassemblyError;

/// What to append for a chunk once its session is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendPlan {
    /// The chunk covers no bytes.
    Empty,
    /// The chunk starts where the stored bytes end; append it all.
    Whole(ByteRange),
    /// The chunk re-sends stored bytes and extends past them.
    Suffix {
        /// Index into the payload of the first unseen byte.
        skip: usize,
        /// Range covered by the unseen bytes.
        range: ByteRange,
    },
    /// Everything in the chunk is already stored.
    Duplicate {
        /// Stored extent reached from the chunk's begin offset.
        stored: ByteRange,
    },
}

/// Whether a chunk continues `session`.
///
/// The chunk must start exactly where the session's bytes end, carry the
/// same map, and arrive less than `window` after the session's last
/// activity. Negative elapsed time (clock skew, reordered delivery) counts
/// as inside the window.
pub fn continues(
    session: &LogSession,
    begin: u64,
    timestamp: &LogTimestamp,
    map: &str,
    window: TimeDelta,
) -> bool {
    session.last_byte_offset == begin
        && timestamp.elapsed_since(&session.last_activity) < window
        && session.map == map
}

/// Index of the first session the chunk continues, in storage order.
pub fn find_continuation(
    sessions: &[LogSession],
    begin: u64,
    timestamp: &LogTimestamp,
    map: &str,
    window: TimeDelta,
) -> Option<usize> {
    sessions
        .iter()
        .position(|s| continues(s, begin, timestamp, map, window))
}

/// Decide which bytes of a chunk covering `range` still need storing.
///
/// The stored extent is followed from the chunk's begin offset through
/// every record covering it, so a chunk that starts inside stored bytes
/// keeps only what lies past them. A chunk re-sent after an earlier re-send
/// already extended it is recognised as a duplicate.
///
/// A chunk that starts on no stored byte is appended whole, but only where
/// the stored bytes end. Anywhere else it would leave a gap in the log.
///
/// # Errors
///
/// Returns [`ReassemblyError::MalformedOffsets`] if the unseen suffix would
/// start outside the payload, or if the chunk starts away from the end of
/// a session that already has records.
pub fn plan_append(
    records: &[ChunkRecord],
    range: ByteRange,
    payload_len: usize,
) -> Result<AppendPlan, ReassemblyError> {
    if range.is_empty() || payload_len == 0 {
        return Ok(AppendPlan::Empty);
    }

    let mut stored_end = range.begin;
    while let Some(next) = records
        .iter()
        .find(|r| r.begin_offset <= stored_end && stored_end < r.end_offset)
    {
        stored_end = next.end_offset;
    }

    if stored_end == range.begin {
        let tail = records.iter().map(|r| r.end_offset).max();
        return match tail {
            Some(tail) if tail != range.begin => Err(ReassemblyError::MalformedOffsets {
                begin: range.begin,
                end: range.end,
                stored_end: tail,
                payload_len,
            }),
            _ => Ok(AppendPlan::Whole(range)),
        };
    }

    if range.end <= stored_end {
        return Ok(AppendPlan::Duplicate {
            stored: ByteRange {
                begin: range.begin,
                end: stored_end,
            },
        });
    }

    let malformed = || ReassemblyError::MalformedOffsets {
        begin: range.begin,
        end: range.end,
        stored_end,
        payload_len,
    };
    let skip = stored_end
        .checked_sub(range.begin)
        .and_then(|s| usize::try_from(s).ok())
        .filter(|&s| s < payload_len)
        .ok_or_else(malformed)?;

    Ok(AppendPlan::Suffix {
        skip,
        range: ByteRange {
            begin: stored_end,
            end: range.end,
        },
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use logproxy_types::{GameState, ServerToken};

    use super::*;

    fn ts(raw: &str) -> LogTimestamp {
        raw.parse().unwrap()
    }

    fn record(begin: u64, end: u64) -> ChunkRecord {
        ChunkRecord::new(
            ByteRange::new(begin, end).unwrap(),
            ts("03/01/2025 - 10:00:00.000"),
            GameState::default(),
        )
    }

    fn session(last: u64, map: &str) -> LogSession {
        let token = ServerToken::parse("srv").unwrap();
        LogSession::open(
            &token,
            ByteRange::new(0, last).unwrap(),
            ts("03/01/2025 - 10:00:00.000"),
            map,
            "10.0.0.1:27015",
        )
    }

    #[test]
    fn continuation_requires_offset_window_and_map() {
        let window = TimeDelta::hours(2);
        let s = session(100, "de_dust2");
        let soon = ts("03/01/2025 - 10:10:00.000");
        let late = ts("03/01/2025 - 13:00:00.000");

        assert!(continues(&s, 100, &soon, "de_dust2", window));
        assert!(!continues(&s, 99, &soon, "de_dust2", window));
        assert!(!continues(&s, 100, &late, "de_dust2", window));
        assert!(!continues(&s, 100, &soon, "de_mirage", window));
    }

    #[test]
    fn window_is_exclusive() {
        let s = session(100, "de_dust2");
        let edge = ts("03/01/2025 - 12:00:00.000");
        assert!(!continues(&s, 100, &edge, "de_dust2", TimeDelta::hours(2)));
    }

    #[test]
    fn earlier_timestamp_counts_as_inside_window() {
        let s = session(100, "de_dust2");
        let before = ts("03/01/2025 - 09:59:00.000");
        assert!(continues(&s, 100, &before, "de_dust2", TimeDelta::hours(2)));
    }

    #[test]
    fn first_matching_session_wins() {
        let sessions = vec![session(50, "de_nuke"), session(100, "de_dust2"), session(100, "de_dust2")];
        let found = find_continuation(
            &sessions,
            100,
            &ts("03/01/2025 - 10:01:00.000"),
            "de_dust2",
            TimeDelta::hours(2),
        );
        assert_eq!(found, Some(1));
    }

    #[test]
    fn unmatched_begin_appends_whole_chunk() {
        let range = ByteRange::new(100, 150).unwrap();
        let plan = plan_append(&[record(0, 100)], range, 50).unwrap();
        assert_eq!(plan, AppendPlan::Whole(range));
    }

    #[test]
    fn extending_resend_appends_suffix() {
        let plan = plan_append(&[record(0, 100)], ByteRange::new(0, 150).unwrap(), 150).unwrap();
        assert_eq!(
            plan,
            AppendPlan::Suffix {
                skip: 100,
                range: ByteRange::new(100, 150).unwrap(),
            }
        );
    }

    #[test]
    fn subset_resend_is_duplicate() {
        let plan = plan_append(&[record(0, 100)], ByteRange::new(0, 60).unwrap(), 60).unwrap();
        assert!(matches!(plan, AppendPlan::Duplicate { .. }));
    }

    #[test]
    fn stored_extent_follows_contiguous_records() {
        let records = [record(0, 100), record(100, 150)];
        let plan = plan_append(&records, ByteRange::new(0, 150).unwrap(), 150).unwrap();
        assert_eq!(
            plan,
            AppendPlan::Duplicate {
                stored: ByteRange::new(0, 150).unwrap(),
            }
        );

        let plan = plan_append(&records, ByteRange::new(0, 170).unwrap(), 170).unwrap();
        assert_eq!(
            plan,
            AppendPlan::Suffix {
                skip: 150,
                range: ByteRange::new(150, 170).unwrap(),
            }
        );
    }

    #[test]
    fn begin_inside_stored_record_keeps_only_unseen_bytes() {
        let plan = plan_append(&[record(0, 10)], ByteRange::new(5, 15).unwrap(), 10).unwrap();
        assert_eq!(
            plan,
            AppendPlan::Suffix {
                skip: 5,
                range: ByteRange::new(10, 15).unwrap(),
            }
        );

        let plan = plan_append(&[record(0, 10)], ByteRange::new(3, 8).unwrap(), 5).unwrap();
        assert_eq!(
            plan,
            AppendPlan::Duplicate {
                stored: ByteRange::new(3, 10).unwrap(),
            }
        );
    }

    #[test]
    fn begin_away_from_stored_end_is_malformed() {
        let err = plan_append(&[record(0, 10)], ByteRange::new(20, 25).unwrap(), 5).unwrap_err();
        assert!(matches!(
            err,
            ReassemblyError::MalformedOffsets { stored_end: 10, .. }
        ));

        let err = plan_append(&[record(100, 150)], ByteRange::new(0, 50).unwrap(), 50).unwrap_err();
        assert!(matches!(
            err,
            ReassemblyError::MalformedOffsets { stored_end: 150, .. }
        ));
    }

    #[test]
    fn first_chunk_of_session_appends_whole() {
        let range = ByteRange::new(4096, 4200).unwrap();
        assert_eq!(plan_append(&[], range, 104).unwrap(), AppendPlan::Whole(range));
    }

    #[test]
    fn short_payload_is_malformed() {
        let err = plan_append(&[record(0, 100)], ByteRange::new(0, 150).unwrap(), 80).unwrap_err();
        assert!(matches!(
            err,
            ReassemblyError::MalformedOffsets { stored_end: 100, .. }
        ));
    }

    #[test]
    fn empty_chunk_plans_nothing() {
        let plan = plan_append(&[], ByteRange::new(10, 10).unwrap(), 0).unwrap();
        assert_eq!(plan, AppendPlan::Empty);
    }
}
