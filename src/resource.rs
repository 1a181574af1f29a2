//! ResourceStore: the original resources of the repository.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tracing::info;

use crate::datetime::MementoDatetime;
use crate::error::{Result, VersioningError};
use crate::model::{description_id, description_of, parent_id, Body, Resource, ResourceKind};
use crate::rdf::Graph;
use crate::storage::{Journal, JournalEntry, StoredBody};

/// Outcome of a `put`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Created,
    Replaced,
}

pub struct ResourceStore {
    resources: RwLock<BTreeMap<String, Arc<Resource>>>,
    journal: Arc<Journal>,
}

impl ResourceStore {
    /// A store holding only the root container.
    pub fn new(journal: Arc<Journal>) -> Self {
        let now = MementoDatetime::now();
        let root = Resource { id: String::new(), body: Body::Rdf(Graph::new()), created: now, last_modified: now };
        let mut resources = BTreeMap::new();
        resources.insert(String::new(), Arc::new(root));
        Self { resources: RwLock::new(resources), journal }
    }

    pub fn get(&self, id: &str) -> Result<Arc<Resource>> {
        self.resources.read()?.get(id).cloned().ok_or_else(|| VersioningError::NotFound(id.to_string()))
    }

    pub fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.resources.read()?.contains_key(id))
    }

    /// Creates or replaces `id`. A new binary also gets its description.
    pub fn put(&self, id: &str, body: Body) -> Result<PutOutcome> {
        let mut resources = self.resources.write()?;
        let now = MementoDatetime::now();

        let outcome = match resources.get(id) {
            Some(existing) if existing.kind() != body.kind() => {
                return Err(VersioningError::Conflict(format!(
                    "/{} is a {} and cannot be replaced by a {}",
                    id,
                    existing.kind(),
                    body.kind()
                )));
            }
            Some(_) => PutOutcome::Replaced,
            None => {
                if description_of(id).is_some() {
                    return Err(VersioningError::NotFound(id.to_string()));
                }
                match resources.get(parent_id(id)) {
                    Some(parent) if parent.kind() == ResourceKind::RdfSource && !parent.is_description() => {}
                    Some(_) => {
                        return Err(VersioningError::Conflict(format!("/{} cannot hold children", parent_id(id))))
                    }
                    None => return Err(VersioningError::NotFound(parent_id(id).to_string())),
                }
                PutOutcome::Created
            }
        };

        let created = resources.get(id).map_or(now, |r| r.created);
        let kind = body.kind();
        self.write(&mut resources, Resource { id: id.to_string(), body, created, last_modified: now })?;

        if outcome == PutOutcome::Created && kind == ResourceKind::NonRdfSource {
            let description = description_id(id);
            self.write(
                &mut resources,
                Resource { id: description, body: Body::Rdf(Graph::new()), created: now, last_modified: now },
            )?;
        }

        info!("{} /{} ({})", if outcome == PutOutcome::Created { "Created" } else { "Replaced" }, id, kind);
        Ok(outcome)
    }

    fn write(&self, resources: &mut BTreeMap<String, Arc<Resource>>, resource: Resource) -> Result<()> {
        self.journal.append(&JournalEntry::PutResource {
            id: resource.id.clone(),
            body: StoredBody::from_body(&resource.body)?,
            created: resource.created.timestamp(),
            last_modified: resource.last_modified.timestamp(),
        })?;
        resources.insert(resource.id.clone(), Arc::new(resource));
        Ok(())
    }

    /// Removes `id` with its description and descendants; returns every removed id.
    pub fn delete(&self, id: &str) -> Result<Vec<String>> {
        if id.is_empty() {
            return Err(VersioningError::MethodNotAllowed { allow: crate::controller::ROOT_ALLOW });
        }
        let mut resources = self.resources.write()?;
        if !resources.contains_key(id) {
            return Err(VersioningError::NotFound(id.to_string()));
        }

        let prefix = format!("{}/", id);
        let removed: Vec<String> =
            resources.keys().filter(|k| k.as_str() == id || k.starts_with(&prefix)).cloned().collect();

        self.journal.append(&JournalEntry::DeleteResource { id: id.to_string() })?;
        for key in &removed {
            resources.remove(key);
        }
        info!("Deleted /{} ({} resource(s))", id, removed.len());
        Ok(removed)
    }

    /// Ids of the resources `id` contains. Descriptions are not members.
    pub fn children(&self, id: &str) -> Result<Vec<String>> {
        let resources = self.resources.read()?;
        Ok(resources
            .keys()
            .filter(|k| !k.is_empty() && parent_id(k) == id && description_of(k).is_none())
            .cloned()
            .collect())
    }

    pub(crate) fn replay(&self, entry: JournalEntry) -> Result<()> {
        match entry {
            JournalEntry::PutResource { id, body, created, last_modified } => {
                let stamp = |secs| {
                    MementoDatetime::from_timestamp(secs)
                        .ok_or_else(|| VersioningError::BadRequest(format!("journal timestamp {} out of range", secs)))
                };
                let resource =
                    Resource { id: id.clone(), body: body.into_body()?, created: stamp(created)?, last_modified: stamp(last_modified)? };
                self.resources.write()?.insert(id, Arc::new(resource));
            }
            JournalEntry::DeleteResource { id } => {
                let prefix = format!("{}/", id);
                self.resources.write()?.retain(|k, _| k != &id && !k.starts_with(&prefix));
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ResourceStore {
        ResourceStore::new(Arc::new(Journal::memory()))
    }

    fn binary(content: &[u8]) -> Body {
        Body::Binary { content: content.to_vec(), media_type: "text/plain".into() }
    }

    #[test]
    fn put_creates_then_replaces() {
        let store = store();
        assert_eq!(store.put("c", Body::Rdf(Graph::new())).unwrap(), PutOutcome::Created);
        assert_eq!(store.put("c", Body::Rdf(Graph::new())).unwrap(), PutOutcome::Replaced);
        assert_eq!(store.children("").unwrap(), vec!["c".to_string()]);
    }

    #[test]
    fn binaries_get_descriptions() {
        let store = store();
        store.put("b", binary(b"binary content")).unwrap();
        let description = store.get("b/fcr:metadata").unwrap();
        assert_eq!(description.kind(), ResourceKind::RdfSource);
        assert!(store.children("b").unwrap().is_empty());
    }

    #[test]
    fn rejects_orphans_and_kind_changes() {
        let store = store();
        assert!(matches!(store.put("a/b", Body::Rdf(Graph::new())), Err(VersioningError::NotFound(_))));
        store.put("b", binary(b"x")).unwrap();
        assert!(matches!(store.put("b", Body::Rdf(Graph::new())), Err(VersioningError::Conflict(_))));
        assert!(matches!(store.put("b/child", Body::Rdf(Graph::new())), Err(VersioningError::Conflict(_))));
    }

    #[test]
    fn delete_cascades_to_descendants() {
        let store = store();
        store.put("a", Body::Rdf(Graph::new())).unwrap();
        store.put("a/b", binary(b"x")).unwrap();
        store.put("ab", Body::Rdf(Graph::new())).unwrap();

        let mut removed = store.delete("a").unwrap();
        removed.sort();
        assert_eq!(removed, vec!["a", "a/b", "a/b/fcr:metadata"]);
        assert!(store.exists("ab").unwrap());
        assert!(store.delete("").is_err());
    }
}
