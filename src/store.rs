//! MementoStore: TimeMaps and the mementos they hold.
//!
//! Each TimeMap sits behind its own lock. Creating a memento takes that lock
//! for writing, so the duplicate-datetime check and the insert happen as one
//! step per original while distinct originals never contend. The journal
//! append happens under the same lock and before the in-memory insert, with
//! the TimeMap registry read-locked throughout so a concurrent TimeMap
//! deletion is ordered wholly before or after the new memento.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};

use crate::datetime::MementoDatetime;
use crate::error::{Result, VersioningError};
use crate::model::{timemap_id, Body, Memento};
use crate::storage::{Journal, JournalEntry, StoredBody};

#[derive(Debug, Default)]
struct TimeMap {
    by_datetime: BTreeMap<MementoDatetime, Arc<Memento>>,
    by_token: HashMap<u64, MementoDatetime>,
}

impl TimeMap {
    fn insert(&mut self, memento: Arc<Memento>) {
        self.by_token.insert(memento.token(), memento.datetime());
        self.by_datetime.insert(memento.datetime(), memento);
    }

    fn get(&self, token: u64) -> Option<&Arc<Memento>> {
        self.by_token.get(&token).and_then(|dt| self.by_datetime.get(dt))
    }
}

pub struct MementoStore {
    timemaps: RwLock<HashMap<String, Arc<RwLock<TimeMap>>>>,
    next_token: AtomicU64,
    journal: Arc<Journal>,
}

impl MementoStore {
    pub fn new(journal: Arc<Journal>) -> Self {
        Self { timemaps: RwLock::new(HashMap::new()), next_token: AtomicU64::new(1), journal }
    }

    fn timemap(&self, original: &str) -> Result<Arc<RwLock<TimeMap>>> {
        let timemaps = self.timemaps.read()?;
        timemaps.get(original).cloned().ok_or_else(|| VersioningError::NotFound(timemap_id(original)))
    }

    pub fn is_versioned(&self, original: &str) -> Result<bool> {
        Ok(self.timemaps.read()?.contains_key(original))
    }

    /// Creates an empty TimeMap. Returns `false` when one already exists.
    pub fn create_timemap(&self, original: &str) -> Result<bool> {
        let mut timemaps = self.timemaps.write()?;
        if timemaps.contains_key(original) {
            return Ok(false);
        }
        self.journal.append(&JournalEntry::CreateTimeMap { original: original.to_string() })?;
        timemaps.insert(original.to_string(), Arc::default());
        info!("Versioning enabled for /{}", original);
        Ok(true)
    }

    /// Creates a memento of `original`.
    ///
    /// With a `datetime`, the memento holds `body`. Without one it is stamped
    /// with the current instant and holds whatever `current` returns, which
    /// is the original's state at this moment; `body` is ignored.
    pub fn create_memento(
        &self,
        original: &str,
        datetime: Option<MementoDatetime>,
        body: Option<Body>,
        current: impl FnOnce() -> Result<Body>,
    ) -> Result<Arc<Memento>> {
        self.timemap(original)?;

        let (datetime, body) = match datetime {
            Some(dt) => match body {
                None => return Err(VersioningError::EmptyBody),
                Some(Body::Rdf(graph)) if graph.is_empty() => return Err(VersioningError::EmptyBody),
                Some(body) => (dt, body),
            },
            None => (MementoDatetime::now(), current()?),
        };
        let stored = StoredBody::from_body(&body)?;

        // The registry stays read-locked until the insert so delete_timemap
        // cannot slip between the lookup and the commit.
        let timemaps = self.timemaps.read()?;
        let timemap = timemaps.get(original).ok_or_else(|| VersioningError::NotFound(timemap_id(original)))?;
        let mut timemap = timemap.write()?;
        if timemap.by_datetime.contains_key(&datetime) {
            debug!("Duplicate memento datetime {} for /{}", datetime, original);
            return Err(VersioningError::DuplicateDatetime(datetime.to_string()));
        }

        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        self.journal.append(&JournalEntry::CreateMemento {
            original: original.to_string(),
            token,
            datetime: datetime.timestamp(),
            body: stored,
        })?;

        let memento = Arc::new(Memento::new(original.to_string(), token, datetime, body));
        timemap.insert(memento.clone());
        info!("Created memento /{} at {}", memento.id(), datetime);
        Ok(memento)
    }

    /// Mementos of `original`, oldest first.
    pub fn list_mementos(&self, original: &str) -> Result<Vec<Arc<Memento>>> {
        let timemap = self.timemap(original)?;
        let timemap = timemap.read()?;
        Ok(timemap.by_datetime.values().cloned().collect())
    }

    pub fn get_memento(&self, original: &str, token: u64) -> Result<Arc<Memento>> {
        let timemap = self.timemap(original)?;
        let timemap = timemap.read()?;
        timemap
            .get(token)
            .cloned()
            .ok_or_else(|| VersioningError::NotFound(format!("{}/{}", timemap_id(original), token)))
    }

    /// TimeGate selection: the latest memento not after `instant`, or the
    /// earliest one when they all are. `None` for an empty TimeMap.
    pub fn memento_at(&self, original: &str, instant: MementoDatetime) -> Result<Option<Arc<Memento>>> {
        let timemap = self.timemap(original)?;
        let timemap = timemap.read()?;
        let found = timemap
            .by_datetime
            .range(..=instant)
            .next_back()
            .or_else(|| timemap.by_datetime.iter().next())
            .map(|(_, m)| m.clone());
        Ok(found)
    }

    /// Removes the TimeMap and every memento in it; versioning is off afterwards.
    pub fn delete_timemap(&self, original: &str) -> Result<()> {
        let mut timemaps = self.timemaps.write()?;
        if !timemaps.contains_key(original) {
            return Err(VersioningError::NotFound(timemap_id(original)));
        }
        self.journal.append(&JournalEntry::DeleteTimeMap { original: original.to_string() })?;
        timemaps.remove(original);
        info!("Deleted TimeMap of /{}", original);
        Ok(())
    }

    pub fn delete_memento(&self, original: &str, token: u64) -> Result<()> {
        let timemap = self.timemap(original)?;
        let mut timemap = timemap.write()?;
        let datetime = *timemap
            .by_token
            .get(&token)
            .ok_or_else(|| VersioningError::NotFound(format!("{}/{}", timemap_id(original), token)))?;

        self.journal.append(&JournalEntry::DeleteMemento { original: original.to_string(), token })?;
        timemap.by_token.remove(&token);
        timemap.by_datetime.remove(&datetime);
        info!("Deleted memento /{}/{}", timemap_id(original), token);
        Ok(())
    }

    /// Applies a journaled TimeMap or memento entry without re-journaling it.
    pub(crate) fn replay(&self, entry: JournalEntry) -> Result<()> {
        match entry {
            JournalEntry::CreateTimeMap { original } => {
                self.timemaps.write()?.entry(original).or_default();
            }
            JournalEntry::DeleteTimeMap { original } => {
                self.timemaps.write()?.remove(&original);
            }
            JournalEntry::CreateMemento { original, token, datetime, body } => {
                self.next_token.fetch_max(token + 1, Ordering::SeqCst);
                let datetime = MementoDatetime::from_timestamp(datetime)
                    .ok_or_else(|| VersioningError::BadRequest(format!("journal datetime {} out of range", datetime)))?;
                match self.timemap(&original) {
                    Ok(timemap) => {
                        let memento = Memento::new(original.clone(), token, datetime, body.into_body()?);
                        timemap.write()?.insert(Arc::new(memento));
                    }
                    Err(_) => warn!("Journal memento {} of /{} has no TimeMap; skipping", token, original),
                }
            }
            JournalEntry::DeleteMemento { original, token } => {
                if let Ok(timemap) = self.timemap(&original) {
                    let mut timemap = timemap.write()?;
                    if let Some(datetime) = timemap.by_token.remove(&token) {
                        timemap.by_datetime.remove(&datetime);
                    }
                }
            }
            JournalEntry::PutResource { .. } | JournalEntry::DeleteResource { .. } => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::{Graph, Term, Triple};

    fn label(value: &str) -> Body {
        let mut graph = Graph::new();
        graph.insert(Triple::new(Term::iri("http://localhost/c"), "info:test#label", Term::literal(value)));
        Body::Rdf(graph)
    }

    fn store() -> MementoStore {
        let store = MementoStore::new(Arc::new(Journal::memory()));
        store.create_timemap("c").unwrap();
        store
    }

    fn dt(s: &str) -> MementoDatetime {
        MementoDatetime::parse(s).unwrap()
    }

    #[test]
    fn rejects_duplicate_datetimes() {
        let store = store();
        let at = dt("Sat, 1 Jan 2000 00:00:00 GMT");
        store.create_memento("c", Some(at), Some(label("bar")), || Ok(label("foo"))).unwrap();
        let err = store.create_memento("c", Some(at), Some(label("far")), || Ok(label("foo"))).unwrap_err();
        assert!(matches!(err, VersioningError::DuplicateDatetime(_)));

        let mementos = store.list_mementos("c").unwrap();
        assert_eq!(mementos.len(), 1);
        assert_eq!(mementos[0].body(), &label("bar"));
    }

    #[test]
    fn without_datetime_captures_current_state() {
        let store = store();
        let m = store.create_memento("c", None, Some(label("bar")), || Ok(label("foo"))).unwrap();
        assert_eq!(m.body(), &label("foo"));
        assert_eq!(m.id(), format!("c/fcr:versions/{}", m.token()));
    }

    #[test]
    fn datetime_requires_a_body() {
        let store = store();
        let at = Some(dt("Sat, 1 Jan 2000 00:00:00 GMT"));
        assert!(matches!(store.create_memento("c", at, None, || Ok(label("foo"))), Err(VersioningError::EmptyBody)));
        assert!(matches!(
            store.create_memento("c", at, Some(Body::Rdf(Graph::new())), || Ok(label("foo"))),
            Err(VersioningError::EmptyBody)
        ));
        let empty_binary = Body::Binary { content: Vec::new(), media_type: "text/plain".into() };
        assert!(store.create_memento("c", at, Some(empty_binary), || Ok(label("foo"))).is_ok());
    }

    #[test]
    fn lists_in_datetime_order_and_selects_timegate() {
        let store = store();
        let later = dt("Tue, 3 Jun 2008 11:05:30 GMT");
        let earlier = dt("Sat, 1 Jan 2000 00:00:00 GMT");
        store.create_memento("c", Some(later), Some(label("b")), || Ok(label("x"))).unwrap();
        store.create_memento("c", Some(earlier), Some(label("a")), || Ok(label("x"))).unwrap();

        let datetimes: Vec<_> = store.list_mementos("c").unwrap().iter().map(|m| m.datetime()).collect();
        assert_eq!(datetimes, vec![earlier, later]);

        let pick = |s| store.memento_at("c", dt(s)).unwrap().unwrap().datetime();
        assert_eq!(pick("Sun, 1 Jan 2005 00:00:00 GMT"), earlier);
        assert_eq!(pick("Wed, 1 Jan 2020 00:00:00 GMT"), later);
        assert_eq!(pick("Thu, 1 Jan 1970 00:00:00 GMT"), earlier);
    }

    #[test]
    fn deleting_timemap_cascades() {
        let store = store();
        let m = store.create_memento("c", None, None, || Ok(label("foo"))).unwrap();
        store.delete_timemap("c").unwrap();

        assert!(!store.is_versioned("c").unwrap());
        assert!(matches!(store.list_mementos("c"), Err(VersioningError::NotFound(_))));
        assert!(matches!(store.get_memento("c", m.token()), Err(VersioningError::NotFound(_))));
    }

    #[test]
    fn deleting_one_memento_keeps_peers() {
        let store = store();
        let a = store.create_memento("c", Some(dt("1 Jan 2000 00:00 GMT")), Some(label("a")), || Ok(label("x"))).unwrap();
        let b = store.create_memento("c", Some(dt("1 Jan 2001 00:00 GMT")), Some(label("b")), || Ok(label("x"))).unwrap();
        store.delete_memento("c", a.token()).unwrap();

        assert!(store.get_memento("c", a.token()).is_err());
        assert_eq!(store.get_memento("c", b.token()).unwrap().body(), &label("b"));
        // The freed datetime may be reused.
        store.create_memento("c", Some(dt("1 Jan 2000 00:00 GMT")), Some(label("a2")), || Ok(label("x"))).unwrap();
    }

    #[test]
    fn tokens_are_not_reused_after_replay() {
        let store = MementoStore::new(Arc::new(Journal::memory()));
        store.replay(JournalEntry::CreateTimeMap { original: "c".into() }).unwrap();
        store
            .replay(JournalEntry::CreateMemento {
                original: "c".into(),
                token: 7,
                datetime: 946684800,
                body: StoredBody::Rdf("<http://localhost/c> <info:test#label> \"bar\" .".into()),
            })
            .unwrap();

        let m = store.create_memento("c", None, None, || Ok(label("foo"))).unwrap();
        assert_eq!(m.token(), 8);
        assert_eq!(store.get_memento("c", 7).unwrap().body(), &label("bar"));
    }

    #[test]
    fn timemap_dropped_while_capturing_refuses_the_memento() {
        let store = store();
        let result = store.create_memento("c", None, None, || {
            store.delete_timemap("c")?;
            Ok(label("foo"))
        });
        assert!(matches!(result, Err(VersioningError::NotFound(_))));
        assert!(!store.is_versioned("c").unwrap());
    }

    #[test]
    fn replay_skips_mementos_of_deleted_timemaps() {
        let store = MementoStore::new(Arc::new(Journal::memory()));
        store.replay(JournalEntry::CreateTimeMap { original: "c".into() }).unwrap();
        store.replay(JournalEntry::DeleteTimeMap { original: "c".into() }).unwrap();
        store
            .replay(JournalEntry::CreateMemento {
                original: "c".into(),
                token: 3,
                datetime: 946684800,
                body: StoredBody::Rdf("<http://localhost/c> <info:test#label> \"bar\" .".into()),
            })
            .unwrap();

        assert!(!store.is_versioned("c").unwrap());
        store.create_timemap("c").unwrap();
        let m = store.create_memento("c", None, None, || Ok(label("foo"))).unwrap();
        assert_eq!(m.token(), 4);
    }

    #[test]
    fn concurrent_mementos_at_one_datetime_admit_exactly_one() {
        let store = store();
        let at = dt("Sat, 1 Jan 2000 00:00:00 GMT");

        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let store = &store;
                    s.spawn(move || store.create_memento("c", Some(at), Some(label(&format!("v{}", i))), || Ok(label("x"))))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, VersioningError::DuplicateDatetime(_))));
        assert_eq!(store.list_mementos("c").unwrap().len(), 1);
    }
}
