//! File naming under the data directory.

use std::path::{Path, PathBuf};

use logproxy_types::{LogSessionId, ServerToken};

/// Directory holding one `ServerState` document per token.
const SERVERS_DIR: &str = "servers";

/// Directory holding byte logs and chunk-record lists.
const SESSIONS_DIR: &str = "sessions";

/// Suffix of server-state documents.
pub(crate) const SERVER_STATE_SUFFIX: &str = ".json";

/// Resolves every path the store touches.
#[derive(Debug, Clone)]
pub(crate) struct Layout {
    root: PathBuf,
}

impl Layout {
    pub(crate) const fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    pub(crate) fn servers_dir(&self) -> PathBuf {
        self.root.join(SERVERS_DIR)
    }

    pub(crate) fn sessions_dir(&self) -> PathBuf {
        self.root.join(SESSIONS_DIR)
    }

    pub(crate) fn server_state(&self, token: &ServerToken) -> PathBuf {
        self.servers_dir()
            .join(format!("{}{SERVER_STATE_SUFFIX}", token.as_str()))
    }

    pub(crate) fn session_log(&self, id: &LogSessionId) -> PathBuf {
        self.sessions_dir().join(format!("{}.log", id.as_str()))
    }

    pub(crate) fn chunk_records(&self, id: &LogSessionId) -> PathBuf {
        self.sessions_dir().join(format!("{}.chunks.json", id.as_str()))
    }
}

/// Temp sibling used while replacing `path`.
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
