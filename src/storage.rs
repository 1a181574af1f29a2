use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rkyv::{Archive, Deserialize, Serialize};
use tracing::{error, warn};

use crate::error::{Result, VersioningError};
use crate::model::Body;
use crate::rdf::RdfFormat;

/// A body as it is written to the journal. RDF travels as N-Triples.
#[derive(Archive, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[archive(check_bytes)]
pub enum StoredBody {
    Rdf(String),
    Binary { content: Vec<u8>, media_type: String },
}

impl StoredBody {
    pub fn from_body(body: &Body) -> Result<Self> {
        Ok(match body {
            Body::Rdf(graph) => StoredBody::Rdf(RdfFormat::NTriples.serialize(graph)?),
            Body::Binary { content, media_type } => {
                StoredBody::Binary { content: content.clone(), media_type: media_type.clone() }
            }
        })
    }

    pub fn into_body(self) -> Result<Body> {
        Ok(match self {
            StoredBody::Rdf(text) => Body::Rdf(RdfFormat::NTriples.parse(text.as_bytes(), "")?),
            StoredBody::Binary { content, media_type } => Body::Binary { content, media_type },
        })
    }
}

/// One committed mutation.
#[derive(Archive, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[archive(check_bytes)]
pub enum JournalEntry {
    PutResource { id: String, body: StoredBody, created: i64, last_modified: i64 },
    DeleteResource { id: String },
    CreateTimeMap { original: String },
    DeleteTimeMap { original: String },
    CreateMemento { original: String, token: u64, datetime: i64, body: StoredBody },
    DeleteMemento { original: String, token: u64 },
}

#[derive(Debug)]
pub struct Segment {
    pub file_path: PathBuf,
    file: File,
    current_offset: u64,
    strict: bool,
}

impl Segment {
    /// Opens (or creates) the segment and returns every intact entry in it.
    /// A torn or corrupt tail is cut off so later appends land after the
    /// last good record.
    pub fn open(path: &Path, strict: bool) -> io::Result<(Self, Vec<JournalEntry>)> {
        let mut file = OpenOptions::new().read(true).write(true).create(true).open(path)?;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;

        let mut entries = Vec::new();
        let mut offset = 0usize;
        while offset < bytes.len() {
            match decode_at(&bytes, offset) {
                Some((entry, next)) => {
                    entries.push(entry);
                    offset = next;
                }
                None => break,
            }
        }

        if offset < bytes.len() {
            warn!(
                "Journal {} has {} trailing byte(s) that do not form a record; truncating",
                path.display(),
                bytes.len() - offset
            );
            file.set_len(offset as u64)?;
            file.sync_all()?;
        }
        file.seek(SeekFrom::Start(offset as u64))?;

        Ok((Self { file_path: path.to_path_buf(), file, current_offset: offset as u64, strict }, entries))
    }

    pub fn append(&mut self, entry: &JournalEntry) -> io::Result<()> {
        let bytes = rkyv::to_bytes::<_, 1024>(entry).map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

        let start = self.current_offset;

        // Length-prefixed write format: [Length (4b)][Data (N bytes)]
        let mut record = Vec::with_capacity(4 + bytes.len());
        record.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        record.extend_from_slice(&bytes);

        self.file.seek(SeekFrom::Start(start))?;
        self.file.write_all(&record)?;
        if self.strict {
            self.file.sync_data()?;
        }

        self.current_offset += record.len() as u64;
        Ok(())
    }

}

fn decode_at(bytes: &[u8], offset: usize) -> Option<(JournalEntry, usize)> {
    let len_end = offset.checked_add(4)?;
    let len = u32::from_le_bytes(bytes.get(offset..len_end)?.try_into().ok()?) as usize;
    let end = len_end.checked_add(len)?;
    let entry = decode(bytes.get(len_end..end)?)?;
    Some((entry, end))
}

fn decode(bytes: &[u8]) -> Option<JournalEntry> {
    let mut aligned = rkyv::AlignedVec::with_capacity(bytes.len());
    aligned.extend_from_slice(bytes);

    let archived = rkyv::check_archived_root::<JournalEntry>(&aligned).ok()?;
    archived.deserialize(&mut rkyv::Infallible).ok()
}

/// The commit point of every mutation. Without a segment the repository
/// runs in memory only and appends always succeed.
#[derive(Debug, Default)]
pub struct Journal {
    segment: Mutex<Option<Segment>>,
}

impl Journal {
    pub fn memory() -> Self {
        Self::default()
    }

    pub fn open(path: &Path, strict: bool) -> io::Result<(Self, Vec<JournalEntry>)> {
        let (segment, entries) = Segment::open(path, strict)?;
        Ok((Self { segment: Mutex::new(Some(segment)) }, entries))
    }

    pub fn is_persistent(&self) -> bool {
        self.segment.lock().map(|s| s.is_some()).unwrap_or(false)
    }

    pub fn append(&self, entry: &JournalEntry) -> Result<()> {
        let mut segment = self.segment.lock().map_err(|_| VersioningError::Poisoned)?;
        if let Some(segment) = segment.as_mut() {
            segment.append(entry).map_err(|e| {
                error!("Journal append to {} failed: {}", segment.file_path.display(), e);
                VersioningError::Storage(e)
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<JournalEntry> {
        vec![
            JournalEntry::PutResource {
                id: "c".into(),
                body: StoredBody::Rdf("<http://localhost/c> <info:test#label> \"foo\" .\n".into()),
                created: 946684800,
                last_modified: 946684800,
            },
            JournalEntry::CreateTimeMap { original: "c".into() },
            JournalEntry::CreateMemento {
                original: "c".into(),
                token: 1,
                datetime: 946684800,
                body: StoredBody::Binary { content: b"binary content".to_vec(), media_type: "text/plain".into() },
            },
        ]
    }

    #[test]
    fn replays_what_was_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.dat");

        {
            let (mut segment, entries) = Segment::open(&path, true).unwrap();
            assert!(entries.is_empty());
            for entry in sample() {
                segment.append(&entry).unwrap();
            }
        }

        let (_, entries) = Segment::open(&path, false).unwrap();
        assert_eq!(entries, sample());
    }

    #[test]
    fn truncates_torn_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.dat");

        {
            let (mut segment, _) = Segment::open(&path, false).unwrap();
            for entry in sample() {
                segment.append(&entry).unwrap();
            }
        }
        let full = std::fs::metadata(&path).unwrap().len();
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            // A length prefix promising more bytes than follow.
            file.write_all(&64u32.to_le_bytes()).unwrap();
            file.write_all(b"partial").unwrap();
        }

        let (mut segment, entries) = Segment::open(&path, false).unwrap();
        assert_eq!(entries, sample());
        assert_eq!(std::fs::metadata(&path).unwrap().len(), full);

        let extra = JournalEntry::DeleteTimeMap { original: "c".into() };
        segment.append(&extra).unwrap();
        drop(segment);

        let (_, entries) = Segment::open(&path, false).unwrap();
        assert_eq!(entries.last(), Some(&extra));
        assert_eq!(entries.len(), 4);
    }

    #[test]
    fn memory_journal_accepts_everything() {
        let journal = Journal::memory();
        assert!(!journal.is_persistent());
        journal.append(&JournalEntry::DeleteResource { id: "x".into() }).unwrap();
    }
}
