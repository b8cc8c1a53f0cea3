use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::store::fs::{read_optional, write_atomic};
use crate::store::{
    DisabledDocument, HostDocument, ServerDefinition, ServerMap, StoreError, StoreResult,
    ACTIVE_FIELD,
};

/// Reads and writes the two documents that back the server stores.
///
/// The host document (`~/.claude.json`) is shared with Claude, so writes
/// re-read it and swap only `mcpServers`. The disabled document is private
/// and is rewritten wholesale.
#[derive(Debug, Clone)]
pub struct EntryStore {
    host_path: PathBuf,
    disabled_path: PathBuf,
}

impl EntryStore {
    pub fn new(host_path: impl Into<PathBuf>, disabled_path: impl Into<PathBuf>) -> Self {
        Self {
            host_path: host_path.into(),
            disabled_path: disabled_path.into(),
        }
    }

    pub fn host_path(&self) -> &Path {
        &self.host_path
    }

    pub fn disabled_path(&self) -> &Path {
        &self.disabled_path
    }

    /// Loads the active servers. Missing or unparseable files read as empty.
    pub fn read_host_document(&self) -> StoreResult<HostDocument> {
        let Some(content) = read_optional(&self.host_path)? else {
            debug!(path = %self.host_path.display(), "host document absent");
            return Ok(HostDocument::default());
        };
        match parse_host(&content) {
            Ok(servers) => {
                debug!(
                    path = %self.host_path.display(),
                    count = servers.len(),
                    "read host document"
                );
                Ok(HostDocument { servers })
            }
            Err(reason) => {
                warn!(
                    path = %self.host_path.display(),
                    %reason,
                    "host document is malformed; treating active servers as empty"
                );
                Ok(HostDocument::default())
            }
        }
    }

    /// Replaces `mcpServers` in the on-disk host document, keeping every
    /// other field and its position.
    ///
    /// Fails with [`StoreError::Malformed`] rather than replacing a document
    /// or a `mcpServers` value that could not be read.
    pub fn write_host_document(&self, doc: &HostDocument) -> StoreResult<()> {
        let mut root = match read_optional(&self.host_path)? {
            Some(content) => match serde_json::from_str::<Value>(&content) {
                Ok(Value::Object(map)) => map,
                Ok(_) => {
                    return Err(StoreError::Malformed {
                        path: self.host_path.clone(),
                        reason: "top-level value is not an object".to_string(),
                    })
                }
                Err(e) => {
                    return Err(StoreError::Malformed {
                        path: self.host_path.clone(),
                        reason: e.to_string(),
                    })
                }
            },
            None => Map::new(),
        };

        let servers = serde_json::to_value(&doc.servers)?;
        // Assigning through the existing slot keeps the key where it was.
        match root.get_mut(ACTIVE_FIELD) {
            Some(slot) if !slot.is_null() && !slot.is_object() => {
                return Err(StoreError::Malformed {
                    path: self.host_path.clone(),
                    reason: format!("`{ACTIVE_FIELD}` is not an object"),
                });
            }
            Some(slot) => *slot = servers,
            None => {
                root.insert(ACTIVE_FIELD.to_string(), servers);
            }
        }

        write_atomic(&self.host_path, &encode(&Value::Object(root))?)?;
        debug!(
            path = %self.host_path.display(),
            count = doc.servers.len(),
            "wrote host document"
        );
        Ok(())
    }

    /// Loads the disabled servers. Missing or unparseable files read as empty.
    pub fn read_disabled_store(&self) -> StoreResult<ServerMap> {
        let Some(content) = read_optional(&self.disabled_path)? else {
            debug!(path = %self.disabled_path.display(), "disabled store absent");
            return Ok(ServerMap::new());
        };
        match serde_json::from_str::<DisabledDocument>(&content) {
            Ok(doc) => {
                debug!(
                    path = %self.disabled_path.display(),
                    count = doc.servers.len(),
                    "read disabled store"
                );
                Ok(doc.servers)
            }
            Err(e) => {
                warn!(
                    path = %self.disabled_path.display(),
                    reason = %e,
                    "disabled store is malformed; treating it as empty"
                );
                Ok(ServerMap::new())
            }
        }
    }

    /// Rewrites the disabled document. An unreadable file already on disk is
    /// renamed to `<name>.<timestamp>.bak` first.
    pub fn write_disabled_store(&self, servers: &ServerMap) -> StoreResult<()> {
        self.set_aside_unreadable_disabled()?;
        let doc = DisabledDocument {
            servers: servers.clone(),
        };
        write_atomic(&self.disabled_path, &encode(&doc)?)?;
        debug!(
            path = %self.disabled_path.display(),
            count = servers.len(),
            "wrote disabled store"
        );
        Ok(())
    }

    fn set_aside_unreadable_disabled(&self) -> StoreResult<Option<PathBuf>> {
        let Some(content) = read_optional(&self.disabled_path)? else {
            return Ok(None);
        };
        let Err(e) = serde_json::from_str::<DisabledDocument>(&content) else {
            return Ok(None);
        };

        let file_name = self
            .disabled_path
            .file_name()
            .and_then(|v| v.to_str())
            .unwrap_or("disabled.json");
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%3f");
        let backup_path = self
            .disabled_path
            .with_file_name(format!("{file_name}.{stamp}.bak"));
        fs::rename(&self.disabled_path, &backup_path)
            .map_err(|err| StoreError::io(&backup_path, err))?;
        warn!(
            path = %self.disabled_path.display(),
            backup = %backup_path.display(),
            reason = %e,
            "disabled store is malformed; moved it aside before writing"
        );
        Ok(Some(backup_path))
    }
}

fn parse_host(content: &str) -> Result<ServerMap, String> {
    let root: Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
    let Value::Object(mut root) = root else {
        return Err("top-level value is not an object".to_string());
    };
    match root.remove(ACTIVE_FIELD) {
        None | Some(Value::Null) => Ok(ServerMap::new()),
        Some(Value::Object(entries)) => Ok(entries
            .into_iter()
            .map(|(name, entry)| (name, ServerDefinition::from_value(entry)))
            .collect()),
        Some(_) => Err(format!("`{ACTIVE_FIELD}` is not an object")),
    }
}

/// Two-space indented JSON with a trailing newline.
fn encode<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    Ok(bytes)
}
