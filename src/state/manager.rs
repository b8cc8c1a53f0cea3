use serde::Serialize;
use tracing::{info, warn};

use crate::state::journal::{Journal, MoveDirection, PendingMove};
use crate::store::{
    EntryStore, HostDocument, ServerDefinition, ServerMap, StoreError, StoreResult,
};

/// One row of [`ServerManager::list_servers`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListedServer {
    pub name: String,
    pub enabled: bool,
    /// The name is present in both stores (external edit).
    pub conflict: bool,
    pub definition: ServerDefinition,
}

/// What [`ServerManager::recover`] changed.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecoveryReport {
    /// Interrupted moves that were finished.
    pub replayed: Vec<PendingMove>,
    /// Interrupted moves that could not be finished and stay pending.
    pub failed: Vec<(PendingMove, String)>,
    /// Names found in both stores whose disabled copy was dropped.
    pub reconciled: Vec<String>,
}

impl RecoveryReport {
    pub fn is_empty(&self) -> bool {
        self.replayed.is_empty() && self.failed.is_empty() && self.reconciled.is_empty()
    }
}

/// Keeps every server in exactly one of the active and disabled stores.
///
/// A move writes the destination store before the source store, so a crash
/// between the two leaves a duplicate rather than losing the definition, and
/// the journal records the move so [`recover`](Self::recover) can finish it.
pub struct ServerManager {
    store: EntryStore,
    journal: Journal,
}

impl ServerManager {
    pub fn new(store: EntryStore, journal: Journal) -> Self {
        Self { store, journal }
    }

    /// Builds a manager and finishes anything a previous run left behind.
    pub fn open(store: EntryStore, journal: Journal) -> StoreResult<(Self, RecoveryReport)> {
        let manager = Self::new(store, journal);
        let report = manager.recover()?;
        Ok((manager, report))
    }

    pub fn store(&self) -> &EntryStore {
        &self.store
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn load_active(&self) -> StoreResult<ServerMap> {
        Ok(self.store.read_host_document()?.servers)
    }

    pub fn load_disabled(&self) -> StoreResult<ServerMap> {
        self.store.read_disabled_store()
    }

    /// Active servers in document order, then disabled ones.
    pub fn list_servers(&self) -> StoreResult<Vec<ListedServer>> {
        let active = self.load_active()?;
        let disabled = self.load_disabled()?;

        let mut servers = Vec::with_capacity(active.len() + disabled.len());
        for (name, definition) in &active {
            let conflict = disabled.contains_key(name);
            if conflict {
                warn!(name = %name, "server is both enabled and disabled; the enabled copy wins");
            }
            servers.push(ListedServer {
                name: name.clone(),
                enabled: true,
                conflict,
                definition: definition.clone(),
            });
        }
        for (name, definition) in &disabled {
            servers.push(ListedServer {
                name: name.clone(),
                enabled: false,
                conflict: active.contains_key(name),
                definition: definition.clone(),
            });
        }
        Ok(servers)
    }

    /// Looks a single server up; the active copy wins over a disabled one.
    pub fn get(&self, name: &str) -> StoreResult<ListedServer> {
        let active = self.load_active()?;
        let disabled = self.load_disabled()?;
        let conflict = active.contains_key(name) && disabled.contains_key(name);
        if let Some(definition) = active.get(name) {
            return Ok(ListedServer {
                name: name.to_string(),
                enabled: true,
                conflict,
                definition: definition.clone(),
            });
        }
        match disabled.get(name) {
            Some(definition) => Ok(ListedServer {
                name: name.to_string(),
                enabled: false,
                conflict,
                definition: definition.clone(),
            }),
            None => Err(StoreError::NotFound(name.to_string())),
        }
    }

    /// Creates `name` in the active store.
    ///
    /// A name that is currently disabled also counts as taken.
    pub fn add_server(&self, name: &str, definition: ServerDefinition) -> StoreResult<()> {
        let mut active = self.load_active()?;
        if active.contains_key(name) || self.load_disabled()?.contains_key(name) {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }
        active.insert(name.to_string(), definition);
        self.store.write_host_document(&HostDocument { servers: active })?;
        info!(name, "added server");
        Ok(())
    }

    /// Flips `name` between the stores and returns whether it is now enabled.
    pub fn toggle(&self, name: &str) -> StoreResult<bool> {
        let mut active = self.load_active()?;
        let mut disabled = self.load_disabled()?;

        if active.contains_key(name) {
            self.move_server(name, MoveDirection::Disable, &mut active, &mut disabled)?;
            Ok(false)
        } else if disabled.contains_key(name) {
            self.move_server(name, MoveDirection::Enable, &mut active, &mut disabled)?;
            Ok(true)
        } else {
            Err(StoreError::NotFound(name.to_string()))
        }
    }

    pub fn enable(&self, name: &str) -> StoreResult<()> {
        let mut active = self.load_active()?;
        if active.contains_key(name) {
            return Ok(());
        }
        let mut disabled = self.load_disabled()?;
        if !disabled.contains_key(name) {
            return Err(StoreError::NotFound(name.to_string()));
        }
        self.move_server(name, MoveDirection::Enable, &mut active, &mut disabled)
    }

    pub fn disable(&self, name: &str) -> StoreResult<()> {
        let mut active = self.load_active()?;
        let mut disabled = self.load_disabled()?;
        if active.contains_key(name) {
            return self.move_server(name, MoveDirection::Disable, &mut active, &mut disabled);
        }
        if disabled.contains_key(name) {
            return Ok(());
        }
        Err(StoreError::NotFound(name.to_string()))
    }

    /// Finishes interrupted moves, then drops the disabled copy of any name
    /// that is in both stores.
    ///
    /// A move that still cannot be finished (for example because the host
    /// document is unreadable) is reported and left in the journal.
    pub fn recover(&self) -> StoreResult<RecoveryReport> {
        let mut report = RecoveryReport::default();

        for pending in self.journal.pending()? {
            match self.replay(&pending) {
                Ok(()) => {
                    warn!(
                        name = %pending.name,
                        direction = pending.direction.as_str(),
                        started = %pending.at,
                        "finished interrupted move"
                    );
                    report.replayed.push(pending);
                }
                Err(e) => {
                    warn!(name = %pending.name, error = %e, "could not finish interrupted move");
                    report.failed.push((pending, e.to_string()));
                }
            }
        }

        let active = self.load_active()?;
        let mut disabled = self.load_disabled()?;
        let before = disabled.len();
        disabled.retain(|name, _| {
            let duplicate = active.contains_key(name);
            if duplicate {
                report.reconciled.push(name.clone());
            }
            !duplicate
        });
        if disabled.len() != before {
            self.store.write_disabled_store(&disabled)?;
            for name in &report.reconciled {
                warn!(name = %name, "dropped disabled copy of an enabled server");
            }
        }

        if report.failed.is_empty() {
            self.journal.compact()?;
        }
        Ok(report)
    }

    fn move_server(
        &self,
        name: &str,
        direction: MoveDirection,
        active: &mut ServerMap,
        disabled: &mut ServerMap,
    ) -> StoreResult<()> {
        let (source, target) = match direction {
            MoveDirection::Disable => (&*active, &*disabled),
            MoveDirection::Enable => (&*disabled, &*active),
        };
        let definition = source
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        if target.contains_key(name) {
            warn!(name, "replacing stale copy left in the destination store");
        }

        let pending = self.journal.begin(name, direction, &definition)?;
        match direction {
            MoveDirection::Disable => {
                disabled.insert(name.to_string(), definition);
                self.store.write_disabled_store(disabled)?;
                active.shift_remove(name);
                self.write_active(active)?;
            }
            MoveDirection::Enable => {
                active.insert(name.to_string(), definition);
                self.write_active(active)?;
                disabled.shift_remove(name);
                self.store.write_disabled_store(disabled)?;
            }
        }
        self.journal.commit(pending.id)?;

        info!(name, direction = direction.as_str(), "moved server");
        Ok(())
    }

    /// Makes the stores agree with a journalled move, touching only the
    /// documents that differ.
    fn replay(&self, pending: &PendingMove) -> StoreResult<()> {
        let mut active = self.load_active()?;
        let mut disabled = self.load_disabled()?;
        let name = pending.name.as_str();

        match pending.direction {
            MoveDirection::Disable => {
                if !disabled.contains_key(name) {
                    disabled.insert(name.to_string(), pending.definition.clone());
                    self.store.write_disabled_store(&disabled)?;
                }
                if active.shift_remove(name).is_some() {
                    self.write_active(&active)?;
                }
            }
            MoveDirection::Enable => {
                if !active.contains_key(name) {
                    active.insert(name.to_string(), pending.definition.clone());
                    self.write_active(&active)?;
                }
                if disabled.shift_remove(name).is_some() {
                    self.store.write_disabled_store(&disabled)?;
                }
            }
        }
        self.journal.commit(pending.id)
    }

    fn write_active(&self, servers: &ServerMap) -> StoreResult<()> {
        self.store.write_host_document(&HostDocument {
            servers: servers.clone(),
        })
    }
}
