//! The reassembly engine.
//!
//! [`Reassembler::submit_chunk`] runs the whole decision for one chunk under
//! its token's lock:
//!
//! 1. Find the session the chunk continues, or open (or re-open) one.
//! 2. Plan which of its bytes are unseen.
//! 3. Persist the token's state, then append the unseen bytes.
//! 4. Notify the listener.
//!
//! A chunk rejected during planning mutates nothing. A failed append
//! restores the state persisted in step 3.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use logproxy_store::FileStore;
use logproxy_types::{ByteRange, ChunkRecord, LogSession, LogSessionId, LogSummary, ServerState};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::chunk::IncomingChunk;
use crate::correlation::{AppendPlan, find_continuation, plan_append};
use crate::error::ReassemblyError;
use crate::listener::ReassemblyListener;

/// Longest gap between two chunks that still continue the same session.
pub const DEFAULT_CORRELATION_WINDOW: Duration = Duration::from_secs(7_200);

/// What happened to the bytes of a submitted chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Disposition {
    /// Bytes covering this range were appended.
    Appended(ByteRange),
    /// Every byte was already stored.
    Duplicate,
    /// The chunk carried no bytes.
    Empty,
}

/// Result of submitting one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkOutcome {
    /// Session the chunk was assigned to.
    pub session_id: LogSessionId,
    /// Whether the chunk opened a new session.
    pub is_new_session: bool,
    /// What was stored.
    pub disposition: Disposition,
}

/// Assigns chunks to sessions and stores their unseen bytes.
#[derive(Clone)]
pub struct Reassembler {
    store: Arc<FileStore>,
    listener: Arc<dyn ReassemblyListener>,
    window: TimeDelta,
}

impl fmt::Debug for Reassembler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reassembler")
            .field("store", &self.store.root())
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl Reassembler {
    /// Create an engine over `store` that reports to `listener`.
    pub fn new(store: Arc<FileStore>, listener: Arc<dyn ReassemblyListener>) -> Self {
        Self {
            store,
            listener,
            window: to_delta(DEFAULT_CORRELATION_WINDOW),
        }
    }

    /// Override the correlation window.
    #[must_use]
    pub fn with_correlation_window(mut self, window: Duration) -> Self {
        self.window = to_delta(window);
        self
    }

    /// The store this engine writes to.
    pub const fn store(&self) -> &Arc<FileStore> {
        &self.store
    }

    /// Assign `chunk` to a session and store whatever part of it is new.
    ///
    /// Waiting for the token lock can be cancelled freely. Once the lock is
    /// held the mutation runs on its own task, so dropping the returned
    /// future never leaves it half done.
    ///
    /// # Errors
    ///
    /// - [`ReassemblyError::MalformedOffsets`] if the chunk's offsets do not
    ///   line up with the session's stored bytes; nothing is stored.
    /// - [`ReassemblyError::Store`] if the store fails.
    /// - [`ReassemblyError::Task`] if the mutation task panicked.
    pub async fn submit_chunk(&self, chunk: IncomingChunk) -> Result<ChunkOutcome, ReassemblyError> {
        let guard = self.store.lock_token(chunk.token()).await;
        let store = Arc::clone(&self.store);
        let listener = Arc::clone(&self.listener);
        let window = self.window;

        tokio::spawn(async move {
            let outcome = apply(&store, listener.as_ref(), window, &chunk).await;
            drop(guard);
            outcome
        })
        .await
        .map_err(|e| ReassemblyError::Task(e.to_string()))?
    }
}

fn to_delta(window: Duration) -> TimeDelta {
    TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX)
}

async fn apply(
    store: &FileStore,
    listener: &dyn ReassemblyListener,
    window: TimeDelta,
    chunk: &IncomingChunk,
) -> Result<ChunkOutcome, ReassemblyError> {
    let range = chunk.range();
    let timestamp = chunk.timestamp();
    let previous = store.load_server_state(chunk.token()).await?;
    let mut state = previous.clone();
    if let Some(player_id) = chunk.player_id() {
        state.player_id = Some(player_id.to_owned());
    }

    let continuation =
        find_continuation(&state.sessions, range.begin, &timestamp, chunk.map(), window);
    let (session_id, is_new_session) =
        if let Some(session) = continuation.and_then(|index| state.sessions.get_mut(index)) {
            session.last_activity = timestamp;
            session.last_byte_offset = range.end;
            (session.id.clone(), false)
        } else {
            open_session(&mut state, chunk)
        };

    let records = store.load_chunk_records(&session_id).await?;
    let plan = plan_append(&records, range, chunk.payload().len()).inspect_err(|e| {
        warn!(token = %chunk.token(), session_id = %session_id, error = %e, "Rejected chunk");
    })?;
    store.save_server_state(&state).await?;

    let disposition = match plan {
        AppendPlan::Empty => {
            if is_new_session {
                if let Err(e) = store.create_session_log(&session_id).await {
                    restore(store, &previous, &session_id, chunk).await;
                    return Err(e.into());
                }
            }
            Disposition::Empty
        }
        AppendPlan::Duplicate { stored } => {
            debug!(
                session_id = %session_id,
                begin = range.begin,
                end = range.end,
                stored_end = stored.end,
                "Duplicate chunk, nothing appended"
            );
            Disposition::Duplicate
        }
        AppendPlan::Whole(appended) => {
            commit(store, &previous, &session_id, chunk, chunk.payload(), appended).await?;
            listener.chunk_appended(&session_id, chunk.payload());
            Disposition::Appended(appended)
        }
        AppendPlan::Suffix { skip, range: appended } => {
            info!(
                session_id = %session_id,
                begin = range.begin,
                end = range.end,
                appended_from = appended.begin,
                "Re-sent chunk extends stored bytes, appending suffix"
            );
            let bytes = chunk.payload().get(skip..).unwrap_or_default();
            commit(store, &previous, &session_id, chunk, bytes, appended).await?;
            listener.chunk_appended(&session_id, bytes);
            Disposition::Appended(appended)
        }
    };

    if is_new_session {
        if let Some(session) = state.session(&session_id) {
            listener.session_opened(&LogSummary::of(&state, session));
        }
    }

    Ok(ChunkOutcome {
        session_id,
        is_new_session,
        disposition,
    })
}

/// Open a session for a chunk that continues none, or re-open the session
/// whose head it re-sends.
fn open_session(state: &mut ServerState, chunk: &IncomingChunk) -> (LogSessionId, bool) {
    let range = chunk.range();
    let timestamp = chunk.timestamp();
    let id = LogSessionId::derive(chunk.token(), &timestamp);

    if let Some(existing) = state.sessions.iter_mut().find(|s| s.id == id) {
        existing.last_activity = existing.last_activity.max(timestamp);
        existing.last_byte_offset = existing.last_byte_offset.max(range.end);
        debug!(session_id = %id, begin = range.begin, end = range.end, "Chunk re-sends session head");
        return (id, false);
    }

    if range.begin == 0 {
        info!(token = %chunk.token(), session_id = %id, map = chunk.map(), "New log session");
    } else {
        warn!(
            token = %chunk.token(),
            session_id = %id,
            begin = range.begin,
            "New log session does not start at offset 0, head of the log is missing"
        );
    }
    state.sessions.push(LogSession::open(
        chunk.token(),
        range,
        timestamp,
        chunk.map(),
        chunk.server_addr(),
    ));
    (id, true)
}

/// Append `bytes` and restore `previous` if that fails.
async fn commit(
    store: &FileStore,
    previous: &ServerState,
    session_id: &LogSessionId,
    chunk: &IncomingChunk,
    bytes: &[u8],
    range: ByteRange,
) -> Result<(), ReassemblyError> {
    let record = ChunkRecord::new(range, chunk.timestamp(), chunk.game().clone());
    if let Err(e) = store.append_chunk(session_id, bytes, &record).await {
        restore(store, previous, session_id, chunk).await;
        return Err(e.into());
    }
    Ok(())
}

/// Put back the state saved before a failed write.
async fn restore(
    store: &FileStore,
    previous: &ServerState,
    session_id: &LogSessionId,
    chunk: &IncomingChunk,
) {
    if let Err(e) = store.save_server_state(previous).await {
        error!(
            token = %chunk.token(),
            session_id = %session_id,
            error = %e,
            "Failed to restore server state after write failure"
        );
    }
}
