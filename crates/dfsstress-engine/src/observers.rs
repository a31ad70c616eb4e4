use std::collections::HashSet;
use std::sync::Arc;

use dfsstress_core::{FsMount, Mount};

use crate::config::ConfigError;
use crate::error::StressError;

/// One mount point under observation.
pub struct Observer {
    /// Directory the mount is rooted at; doubles as its display name and
    /// feeds the origin tag embedded in generated filenames.
    pub dir: String,
    pub mount: Arc<dyn Mount>,
}

impl Observer {
    pub fn new(dir: impl Into<String>, mount: Arc<dyn Mount>) -> Self {
        Observer {
            dir: dir.into(),
            mount,
        }
    }
}

/// The server mount plus every client mount.
///
/// Index 0 is always the server. Clients (indices 1..) are both origins
/// and observers; the server is observer-only and originates nothing.
/// Every observer is expected to see every other origin's files, never
/// its own (the write already happened locally).
pub struct ObserverSet {
    observers: Vec<Observer>,
}

impl std::fmt::Debug for ObserverSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverSet")
            .field(
                "dirs",
                &self.observers.iter().map(|o| &o.dir).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ObserverSet {
    /// Assemble an observer set, rejecting duplicate mount directories.
    pub fn new(server: Observer, clients: Vec<Observer>) -> Result<Self, ConfigError> {
        if clients.is_empty() {
            return Err(ConfigError::NoClients);
        }

        let mut seen = HashSet::new();
        let mut observers = Vec::with_capacity(clients.len() + 1);
        observers.push(server);
        observers.extend(clients);
        for observer in &observers {
            if !seen.insert(observer.dir.as_str()) {
                return Err(ConfigError::DuplicateMount(observer.dir.clone()));
            }
        }

        Ok(ObserverSet { observers })
    }

    /// Open local filesystem mounts for the given directories.
    pub fn open(server_dir: &str, client_dirs: &[String]) -> Result<Self, StressError> {
        let server = Observer::new(
            server_dir,
            Arc::new(FsMount::new(server_dir)?) as Arc<dyn Mount>,
        );
        let clients = client_dirs
            .iter()
            .map(|dir| {
                Ok(Observer::new(
                    dir.clone(),
                    Arc::new(FsMount::new(dir)?) as Arc<dyn Mount>,
                ))
            })
            .collect::<Result<Vec<_>, StressError>>()?;
        Ok(Self::new(server, clients)?)
    }

    /// Total number of observers, server included.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Number of client mounts.
    pub fn client_count(&self) -> usize {
        self.observers.len() - 1
    }

    pub fn get(&self, index: usize) -> &Observer {
        &self.observers[index]
    }

    pub fn all(&self) -> &[Observer] {
        &self.observers
    }

    /// Observer indices that originate files (the clients).
    pub fn origins(&self) -> impl Iterator<Item = usize> {
        1..self.observers.len()
    }
}
