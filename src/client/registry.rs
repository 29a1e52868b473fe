//! Shared client registry.
//!
//! # Responsibilities
//! - Guarantee at most one live client per configuration identity
//! - Track holders per entry; tear the client down exactly once, when
//!   the last holder releases it
//! - Tear everything down at module shutdown
//!
//! # Design Decisions
//! - Sharded map (dashmap): creation for one unseen id runs under its
//!   shard entry lock, so concurrent acquires cannot race to build two
//!   clients, while different ids do not contend
//! - A failed build leaves the registry unchanged: no entry is inserted
//! - Ad-hoc handles never enter the map and are torn down unconditionally

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::client::handle::{ClientError, ClientHandle};
use crate::config::schema::ClientConfig;

/// Identity of one component activation holding a shared client. Used
/// for membership bookkeeping only, never for client lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HolderId(Uuid);

impl HolderId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for HolderId {
    fn default() -> Self {
        Self::new()
    }
}

struct SharedEntry {
    handle: Arc<ClientHandle>,
    holders: HashSet<HolderId>,
}

/// Registry of shared outbound clients, keyed by configuration identity.
pub struct ClientRegistry {
    entries: DashMap<String, SharedEntry>,
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Acquire the shared client for `config_id`, building it with
    /// `build` when no entry exists yet. Build failures leave the
    /// registry unchanged.
    pub fn acquire<F>(
        &self,
        config_id: &str,
        holder: HolderId,
        build: F,
    ) -> Result<Arc<ClientHandle>, ClientError>
    where
        F: FnOnce() -> Result<ClientHandle, ClientError>,
    {
        match self.entries.entry(config_id.to_string()) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().holders.insert(holder);
                tracing::debug!(
                    config_id = %config_id,
                    holders = entry.get().holders.len(),
                    "reusing shared http client"
                );
                Ok(entry.get().handle.clone())
            }
            Entry::Vacant(vacant) => {
                // Shard entry lock held across the build: a concurrent
                // acquire for this id waits here instead of racing.
                let handle = Arc::new(build()?);
                let mut holders = HashSet::new();
                holders.insert(holder);
                vacant.insert(SharedEntry {
                    handle: handle.clone(),
                    holders,
                });
                tracing::info!(config_id = %config_id, "created shared http client");
                Ok(handle)
            }
        }
    }

    /// Acquire a shared client built from `config`, using its id as the
    /// configuration identity.
    pub fn acquire_for(
        &self,
        config: &ClientConfig,
        holder: HolderId,
    ) -> Result<Arc<ClientHandle>, ClientError> {
        self.acquire(&config.id, holder, || ClientHandle::build(config))
    }

    /// Build an ad-hoc, unshared client. It is not registered; release
    /// it with [`ClientRegistry::release_adhoc`].
    pub fn acquire_adhoc(&self) -> Result<Arc<ClientHandle>, ClientError> {
        let handle = ClientHandle::build_default()?;
        tracing::debug!("created ad-hoc http client");
        Ok(Arc::new(handle))
    }

    /// Release one holder of `config_id`. When the last holder goes, the
    /// entry is removed and the client torn down exactly once.
    pub fn release(&self, config_id: &str, holder: &HolderId) {
        let mut teardown: Option<Arc<ClientHandle>> = None;

        if let Entry::Occupied(mut entry) = self.entries.entry(config_id.to_string()) {
            entry.get_mut().holders.remove(holder);
            if entry.get().holders.is_empty() {
                teardown = Some(entry.remove().handle);
            }
        }

        // Teardown happens outside the shard lock.
        if let Some(handle) = teardown {
            tracing::info!(config_id = %config_id, "last holder released, tearing down client");
            handle.close();
        }
    }

    /// Release an ad-hoc client. Ad-hoc clients are never shared, so the
    /// teardown is unconditional.
    pub fn release_adhoc(&self, handle: Arc<ClientHandle>) {
        handle.close();
    }

    /// Tear down every remaining entry. Used at module/process teardown
    /// so no pools or reactor tasks leak.
    pub fn shutdown_all(&self) {
        let ids: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            if let Some((_, entry)) = self.entries.remove(&id) {
                entry.handle.close();
            }
        }
        tracing::info!("client registry shut down");
    }

    /// Whether an entry exists for `config_id`.
    pub fn contains(&self, config_id: &str) -> bool {
        self.entries.contains_key(config_id)
    }

    /// Number of live shared entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
