//! File-backed session store.
//!
//! [`FileStore`] owns every durable artifact: one `ServerState` document per
//! token, and per session an append-only byte log plus its `ChunkRecord`
//! list. Callers serialize mutations per token through
//! [`FileStore::lock_token`]; the store itself does no caching, every call
//! goes to disk.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use logproxy_types::{ByteRange, ChunkRecord, LogSessionId, LogSummary, ServerState, ServerToken};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::layout::{self, Layout, SERVER_STATE_SUFFIX};
use crate::locks::{TokenGuard, TokenLocks};

/// Full byte stream of one session plus how far its records vouch for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogContents {
    /// Bytes of the session log, in append order.
    pub bytes: Vec<u8>,
    /// Offset span covered by the chunk records, if any were readable.
    pub recorded: Option<ByteRange>,
    /// `true` when the record list was readable, its ranges follow one
    /// another without gaps or overlaps, and together they account for
    /// exactly the bytes on disk. `false` means the bytes are returned as-is but
    /// their bookkeeping is missing or stale.
    pub complete: bool,
}

/// Session store rooted at a data directory.
#[derive(Debug)]
pub struct FileStore {
    layout: Layout,
    locks: TokenLocks,
}

impl FileStore {
    /// Open (and create if needed) a store under `root`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory tree cannot be created.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let layout = Layout::new(root.into());
        for dir in [layout.servers_dir(), layout.sessions_dir()] {
            fs::create_dir_all(&dir)
                .await
                .map_err(StoreError::io("creating directory", &dir))?;
        }
        debug!(root = %layout.root().display(), "Session store opened");
        Ok(Self {
            layout,
            locks: TokenLocks::new(),
        })
    }

    /// Data directory this store writes under.
    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    /// Wait for exclusive write access to `token`.
    pub async fn lock_token(&self, token: &ServerToken) -> TokenGuard {
        self.locks.acquire(token).await
    }

    /// Load the state of `token`, or an empty state if it was never saved.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] or [`StoreError::Serialization`] if an
    /// existing document cannot be read.
    pub async fn load_server_state(&self, token: &ServerToken) -> Result<ServerState, StoreError> {
        let path = self.layout.server_state(token);
        Ok(read_json::<ServerState>(&path)
            .await?
            .unwrap_or_else(|| ServerState::empty(token.clone())))
    }

    /// Replace the persisted state of `state.token` wholesale.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the document cannot be written.
    pub async fn save_server_state(&self, state: &ServerState) -> Result<(), StoreError> {
        let path = self.layout.server_state(&state.token);
        write_json_atomic(&path, state).await
    }

    /// Load the chunk records of a session, in commit order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] or [`StoreError::Serialization`] if an
    /// existing record list cannot be read.
    pub async fn load_chunk_records(
        &self,
        id: &LogSessionId,
    ) -> Result<Vec<ChunkRecord>, StoreError> {
        let path = self.layout.chunk_records(id);
        Ok(read_json(&path).await?.unwrap_or_default())
    }

    /// Append `bytes` to the session log and `record` to its record list.
    ///
    /// If either write fails the byte log is truncated back to its previous
    /// length, so a failed call leaves neither half behind.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the log or the record list cannot be
    /// written, or [`StoreError::Serialization`] if the existing record
    /// list is unreadable.
    pub async fn append_chunk(
        &self,
        id: &LogSessionId,
        bytes: &[u8],
        record: &ChunkRecord,
    ) -> Result<(), StoreError> {
        let mut records = self.load_chunk_records(id).await?;

        let log_path = self.layout.session_log(id);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .await
            .map_err(StoreError::io("opening", &log_path))?;
        let previous_len = file
            .metadata()
            .await
            .map_err(StoreError::io("inspecting", &log_path))?
            .len();

        let written = async {
            file.write_all(bytes).await?;
            file.sync_data().await
        }
        .await;
        if let Err(source) = written {
            truncate_to(&mut file, &log_path, previous_len).await;
            return Err(StoreError::io("appending to", &log_path)(source));
        }

        records.push(record.clone());
        let records_path = self.layout.chunk_records(id);
        if let Err(e) = write_json_atomic(&records_path, &records).await {
            truncate_to(&mut file, &log_path, previous_len).await;
            return Err(e);
        }

        debug!(
            session_id = %id,
            begin = record.begin_offset,
            end = record.end_offset,
            bytes = bytes.len(),
            "Appended chunk"
        );
        Ok(())
    }

    /// Create the byte log of a session if it does not exist yet.
    ///
    /// A session opened by an empty chunk has no bytes to append, but its
    /// log should still be readable.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the log cannot be created.
    pub async fn create_session_log(&self, id: &LogSessionId) -> Result<(), StoreError> {
        let log_path = self.layout.session_log(id);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .await
            .map_err(StoreError::io("creating", &log_path))?;
        Ok(())
    }

    /// Read the whole byte log of a session.
    ///
    /// The bytes are returned even when the record list is missing or
    /// disagrees with them; [`LogContents::complete`] says which.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the session log was never
    /// written, or [`StoreError::Io`] if it cannot be read.
    pub async fn read_full_log(&self, id: &LogSessionId) -> Result<LogContents, StoreError> {
        let log_path = self.layout.session_log(id);
        let bytes = match fs::read(&log_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(format!("log {id}")));
            }
            Err(e) => return Err(StoreError::io("reading", &log_path)(e)),
        };

        let records = match self.load_chunk_records(id).await {
            Ok(records) => Some(records),
            Err(e) => {
                warn!(session_id = %id, error = %e, "Chunk records unreadable, returning raw log");
                None
            }
        };

        let recorded = records.as_deref().and_then(|records| {
            let first = records.first()?;
            let last = records.last()?;
            Some(ByteRange {
                begin: first.begin_offset,
                end: last.end_offset,
            })
        });
        let complete = records
            .as_deref()
            .is_some_and(|records| records_tile(records, bytes.len()));

        Ok(LogContents {
            bytes,
            recorded,
            complete,
        })
    }

    /// Summaries of every session of every token, most recent activity
    /// first.
    ///
    /// Server-state documents that cannot be read are skipped with a
    /// warning.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the servers directory cannot be listed.
    pub async fn list_sessions(&self) -> Result<Vec<LogSummary>, StoreError> {
        let dir = self.layout.servers_dir();
        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(StoreError::io("listing", &dir))?;

        let mut summaries = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(StoreError::io("listing", &dir))?
        {
            let path = entry.path();
            let is_state = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(SERVER_STATE_SUFFIX));
            if !is_state {
                continue;
            }
            match read_json::<ServerState>(&path).await {
                Ok(Some(state)) => {
                    summaries.extend(
                        state
                            .sessions
                            .iter()
                            .map(|session| LogSummary::of(&state, session)),
                    );
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable server state");
                }
            }
        }

        summaries.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        Ok(summaries)
    }
}

/// Read and decode a JSON document, `None` if it does not exist.
async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::io("reading", path)(e)),
    }
}

/// Replace a JSON document through a temp file and a rename.
async fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let encoded = serde_json::to_vec_pretty(value)?;
    let temp = layout::temp_path(path);

    let mut file = fs::File::create(&temp)
        .await
        .map_err(StoreError::io("creating", &temp))?;
    file.write_all(&encoded)
        .await
        .map_err(StoreError::io("writing", &temp))?;
    file.sync_all()
        .await
        .map_err(StoreError::io("syncing", &temp))?;
    drop(file);

    fs::rename(&temp, path)
        .await
        .map_err(StoreError::io("replacing", path))
}

/// Whether `records` follow one another end to begin and cover `len` bytes.
fn records_tile(records: &[ChunkRecord], len: usize) -> bool {
    let contiguous = records
        .windows(2)
        .all(|pair| matches!(pair, [prev, next] if prev.end_offset == next.begin_offset));
    let covered: u64 = records.iter().map(|r| r.range().len()).sum();
    contiguous && u64::try_from(len).is_ok_and(|len| len == covered)
}

/// Roll a byte log back to `len` after a failed append.
async fn truncate_to(file: &mut fs::File, path: &Path, len: u64) {
    if let Err(e) = file.set_len(len).await {
        warn!(
            path = %path.display(),
            len,
            error = %e,
            "Failed to roll back partial append"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use logproxy_types::{GameState, LogSession, LogTimestamp};
    use tempfile::TempDir;

    use super::*;

    fn ts(raw: &str) -> LogTimestamp {
        raw.parse().unwrap()
    }

    fn record(begin: u64, end: u64) -> ChunkRecord {
        ChunkRecord::new(
            ByteRange::new(begin, end).unwrap(),
            ts("05/10/2025 - 20:00:00.000"),
            GameState::default(),
        )
    }

    async fn create_test_store() -> (FileStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).await.unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn unknown_token_loads_empty_state() {
        let (store, _dir) = create_test_store().await;
        let token = ServerToken::parse("fresh").unwrap();
        let state = store.load_server_state(&token).await.unwrap();
        assert_eq!(state, ServerState::empty(token));
    }

    #[tokio::test]
    async fn server_state_is_replaced_wholesale() {
        let (store, _dir) = create_test_store().await;
        let token = ServerToken::parse("srv").unwrap();
        let mut state = ServerState::empty(token.clone());
        state.sessions.push(LogSession::open(
            &token,
            ByteRange::new(0, 10).unwrap(),
            ts("05/10/2025 - 20:00:00.000"),
            "de_nuke",
            "1.2.3.4:27015",
        ));
        store.save_server_state(&state).await.unwrap();

        state.sessions.clear();
        state.player_id = Some(String::from("42"));
        store.save_server_state(&state).await.unwrap();

        let loaded = store.load_server_state(&token).await.unwrap();
        assert!(loaded.sessions.is_empty());
        assert_eq!(loaded.player_id.as_deref(), Some("42"));
        assert!(!layout::temp_path(&store.layout.server_state(&token)).exists());
    }

    #[tokio::test]
    async fn append_then_read_full_log() {
        let (store, _dir) = create_test_store().await;
        let id = LogSessionId::parse("srv_20250510-200000-000").unwrap();

        assert!(store.load_chunk_records(&id).await.unwrap().is_empty());
        store.append_chunk(&id, b"hello ", &record(0, 6)).await.unwrap();
        store.append_chunk(&id, b"world", &record(6, 11)).await.unwrap();

        let records = store.load_chunk_records(&id).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].range(), ByteRange::new(6, 11).unwrap());

        let contents = store.read_full_log(&id).await.unwrap();
        assert_eq!(contents.bytes, b"hello world");
        assert_eq!(contents.recorded, Some(ByteRange::new(0, 11).unwrap()));
        assert!(contents.complete);
    }

    #[tokio::test]
    async fn reading_unwritten_log_is_not_found() {
        let (store, _dir) = create_test_store().await;
        let id = LogSessionId::parse("never_written").unwrap();
        let err = store.read_full_log(&id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn log_without_records_is_flagged_partial() {
        let (store, _dir) = create_test_store().await;
        let id = LogSessionId::parse("orphan").unwrap();
        store.append_chunk(&id, b"abc", &record(0, 3)).await.unwrap();
        std::fs::remove_file(store.layout.chunk_records(&id)).unwrap();

        let contents = store.read_full_log(&id).await.unwrap();
        assert_eq!(contents.bytes, b"abc");
        assert_eq!(contents.recorded, None);
        assert!(!contents.complete);
    }

    #[tokio::test]
    async fn corrupt_records_do_not_hide_the_log() {
        let (store, _dir) = create_test_store().await;
        let id = LogSessionId::parse("corrupt").unwrap();
        store.append_chunk(&id, b"abc", &record(0, 3)).await.unwrap();
        std::fs::write(store.layout.chunk_records(&id), b"{not json").unwrap();

        let contents = store.read_full_log(&id).await.unwrap();
        assert_eq!(contents.bytes, b"abc");
        assert!(!contents.complete);
    }

    #[tokio::test]
    async fn overlapping_records_are_flagged_partial() {
        let (store, _dir) = create_test_store().await;
        let id = LogSessionId::parse("overlap").unwrap();
        store.append_chunk(&id, b"0123456789", &record(0, 10)).await.unwrap();
        store.append_chunk(&id, b"56789", &record(5, 10)).await.unwrap();

        let contents = store.read_full_log(&id).await.unwrap();
        assert_eq!(contents.bytes.len(), 15);
        assert!(!contents.complete);
    }

    #[tokio::test]
    async fn gapped_records_are_flagged_partial() {
        let (store, _dir) = create_test_store().await;
        let id = LogSessionId::parse("gapped").unwrap();
        store.append_chunk(&id, b"abc", &record(0, 3)).await.unwrap();
        store.append_chunk(&id, b"xyz", &record(10, 13)).await.unwrap();

        let contents = store.read_full_log(&id).await.unwrap();
        assert_eq!(contents.recorded, Some(ByteRange::new(0, 13).unwrap()));
        assert!(!contents.complete);
    }

    #[tokio::test]
    async fn created_session_log_reads_as_empty() {
        let (store, _dir) = create_test_store().await;
        let id = LogSessionId::parse("quiet").unwrap();
        store.create_session_log(&id).await.unwrap();

        let contents = store.read_full_log(&id).await.unwrap();
        assert!(contents.bytes.is_empty());
        assert_eq!(contents.recorded, None);
        assert!(contents.complete);

        store.append_chunk(&id, b"abc", &record(0, 3)).await.unwrap();
        store.create_session_log(&id).await.unwrap();
        assert_eq!(store.read_full_log(&id).await.unwrap().bytes, b"abc");
    }

    #[tokio::test]
    async fn list_sessions_orders_by_last_activity_desc() {
        let (store, _dir) = create_test_store().await;

        for (raw_token, start, last) in [
            ("alpha", "05/10/2025 - 18:00:00.000", "05/10/2025 - 18:30:00.000"),
            ("bravo", "05/10/2025 - 19:00:00.000", "05/10/2025 - 21:00:00.000"),
        ] {
            let token = ServerToken::parse(raw_token).unwrap();
            let mut session = LogSession::open(
                &token,
                ByteRange::new(0, 1).unwrap(),
                ts(start),
                "de_mirage",
                "",
            );
            session.last_activity = ts(last);
            let mut state = ServerState::empty(token);
            state.sessions.push(session);
            store.save_server_state(&state).await.unwrap();
        }
        std::fs::write(store.layout.servers_dir().join("broken.json"), b"[").unwrap();

        let sessions = store.list_sessions().await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].token.as_str(), "bravo");
        assert_eq!(sessions[1].token.as_str(), "alpha");
    }
}
