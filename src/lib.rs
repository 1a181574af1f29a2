pub mod config;
pub mod controller;
pub mod datetime;
pub mod error;
pub mod filter;
pub mod headers;
pub mod link;
pub mod model;
pub mod parser;
pub mod rdf;
pub mod resource;
pub mod server;
pub mod storage;
pub mod store;
pub mod timemap;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::error::Result;
use crate::model::{description_id, Body, ResourceKind};
use crate::resource::{PutOutcome, ResourceStore};
use crate::storage::{Journal, JournalEntry};
use crate::store::MementoStore;

/// Original resources, their TimeMaps, and the journal both write through.
pub struct Repository {
    pub resources: ResourceStore,
    pub mementos: MementoStore,
    journal: Arc<Journal>,
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository").field("persistent", &self.journal.is_persistent()).finish()
    }
}

impl Repository {
    pub fn in_memory() -> Self {
        Self::with_journal(Arc::new(Journal::memory()))
    }

    /// Opens the journal at `path` and rebuilds the repository from it.
    pub fn open(path: &Path, strict_durability: bool) -> Result<Self> {
        let (journal, entries) = Journal::open(path, strict_durability)?;
        let repository = Self::with_journal(Arc::new(journal));

        let count = entries.len();
        for entry in entries {
            repository.replay(entry)?;
        }
        info!("Replayed {} journal entries from {}", count, path.display());
        Ok(repository)
    }

    fn with_journal(journal: Arc<Journal>) -> Self {
        Self {
            resources: ResourceStore::new(journal.clone()),
            mementos: MementoStore::new(journal.clone()),
            journal,
        }
    }

    fn replay(&self, entry: JournalEntry) -> Result<()> {
        match entry {
            JournalEntry::PutResource { .. } | JournalEntry::DeleteResource { .. } => self.resources.replay(entry),
            _ => self.mementos.replay(entry),
        }
    }

    pub fn is_versioned(&self, id: &str) -> Result<bool> {
        self.mementos.is_versioned(id)
    }

    /// Unversioned to Versioned. A binary's description is versioned with it.
    pub fn enable_versioning(&self, id: &str) -> Result<()> {
        let resource = self.resources.get(id)?;
        self.mementos.create_timemap(id)?;
        if resource.kind() == ResourceKind::NonRdfSource {
            self.mementos.create_timemap(&description_id(id))?;
        }
        Ok(())
    }

    /// Creates or replaces `id`, enabling versioning when asked to.
    pub fn put_resource(&self, id: &str, body: Body, versioned: bool) -> Result<PutOutcome> {
        let outcome = self.resources.put(id, body)?;
        if versioned {
            self.enable_versioning(id)?;
        }
        Ok(outcome)
    }

    /// Deletes `id` and everything under it, TimeMaps included.
    pub fn delete_resource(&self, id: &str) -> Result<()> {
        for removed in self.resources.delete(id)? {
            if self.mementos.is_versioned(&removed)? {
                self.mementos.delete_timemap(&removed)?;
            }
        }
        Ok(())
    }
}
