//! Append-only record of moves between the two stores.
//!
//! A move writes a `begin` line carrying the full definition before touching
//! either store and a `commit` line once both stores are written. Any `begin`
//! without a matching `commit` is a move that was interrupted and is finished
//! by [`crate::state::ServerManager::recover`].

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::store::fs::{append_line, read_optional, write_atomic};
use crate::store::{ServerDefinition, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    /// Active store → disabled store.
    Disable,
    /// Disabled store → active store.
    Enable,
}

impl MoveDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disable => "disable",
            Self::Enable => "enable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingMove {
    pub id: Uuid,
    pub name: String,
    pub direction: MoveDirection,
    pub definition: ServerDefinition,
    pub at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum JournalRecord {
    Begin(PendingMove),
    Commit { id: Uuid, committed_at: String },
}

#[derive(Debug, Clone)]
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn begin(
        &self,
        name: &str,
        direction: MoveDirection,
        definition: &ServerDefinition,
    ) -> StoreResult<PendingMove> {
        let pending = PendingMove {
            id: Uuid::new_v4(),
            name: name.to_string(),
            direction,
            definition: definition.clone(),
            at: Utc::now().to_rfc3339(),
        };
        self.append(&JournalRecord::Begin(pending.clone()))?;
        debug!(id = %pending.id, name, direction = direction.as_str(), "journal begin");
        Ok(pending)
    }

    pub fn commit(&self, id: Uuid) -> StoreResult<()> {
        self.append(&JournalRecord::Commit {
            id,
            committed_at: Utc::now().to_rfc3339(),
        })?;
        debug!(%id, "journal commit");
        Ok(())
    }

    /// Begins without a commit, oldest first.
    ///
    /// A later begin for the same name supersedes an earlier one: it was
    /// planned against the stores as they stood after the earlier attempt.
    pub fn pending(&self) -> StoreResult<Vec<PendingMove>> {
        let Some(content) = read_optional(&self.path)? else {
            return Ok(Vec::new());
        };

        let mut open: Vec<PendingMove> = Vec::new();
        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<JournalRecord>(line) {
                Ok(JournalRecord::Begin(pending)) => {
                    open.retain(|p| p.name != pending.name);
                    open.push(pending);
                }
                Ok(JournalRecord::Commit { id, .. }) => {
                    open.retain(|p| p.id != id);
                }
                Err(e) => {
                    // A torn final line is what a crash mid-append leaves behind.
                    warn!(
                        path = %self.path.display(),
                        line = index + 1,
                        reason = %e,
                        "skipping unreadable journal line"
                    );
                }
            }
        }

        Ok(open)
    }

    /// Rewrites the journal keeping only uncommitted moves.
    pub fn compact(&self) -> StoreResult<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let pending = self.pending()?;
        let mut content = String::new();
        for pending in pending {
            content.push_str(&serde_json::to_string(&JournalRecord::Begin(pending))?);
            content.push('\n');
        }
        write_atomic(&self.path, content.as_bytes())
    }

    fn append(&self, record: &JournalRecord) -> StoreResult<()> {
        let line = serde_json::to_string(record)?;
        append_line(&self.path, &line)
    }
}
