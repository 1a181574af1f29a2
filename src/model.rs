use std::fmt;

use crate::datetime::MementoDatetime;
use crate::error::{Constraint, Result, VersioningError};
use crate::rdf::Graph;

pub const VERSIONS_SEGMENT: &str = "fcr:versions";
pub const METADATA_SEGMENT: &str = "fcr:metadata";

/// LDP interaction model of an original resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    RdfSource,
    NonRdfSource,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::RdfSource => f.write_str("rdf-source"),
            ResourceKind::NonRdfSource => f.write_str("non-rdf-source"),
        }
    }
}

/// The content of an original or a memento.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// User triples only; server-managed triples are never stored.
    Rdf(Graph),
    Binary { content: Vec<u8>, media_type: String },
}

impl Body {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Body::Rdf(_) => ResourceKind::RdfSource,
            Body::Binary { .. } => ResourceKind::NonRdfSource,
        }
    }

    pub fn as_graph(&self) -> Option<&Graph> {
        match self {
            Body::Rdf(graph) => Some(graph),
            Body::Binary { .. } => None,
        }
    }
}

/// An original resource: an RDF source, a binary, or a binary's description.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: String,
    pub body: Body,
    pub created: MementoDatetime,
    pub last_modified: MementoDatetime,
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        self.body.kind()
    }

    pub fn is_description(&self) -> bool {
        description_of(&self.id).is_some()
    }
}

/// A write-once snapshot of an original resource.
///
/// Fields are private and there are no setters: a memento only ever leaves
/// the store by deleting it or its TimeMap.
#[derive(Debug, Clone, PartialEq)]
pub struct Memento {
    original: String,
    token: u64,
    datetime: MementoDatetime,
    body: Body,
}

impl Memento {
    pub(crate) fn new(original: String, token: u64, datetime: MementoDatetime, body: Body) -> Self {
        Self { original, token, datetime, body }
    }

    /// Path of the memento relative to the repository root.
    pub fn id(&self) -> String {
        format!("{}/{}", timemap_id(&self.original), self.token)
    }

    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn datetime(&self) -> MementoDatetime {
        self.datetime
    }

    pub fn kind(&self) -> ResourceKind {
        self.body.kind()
    }

    pub fn body(&self) -> &Body {
        &self.body
    }
}

/// Which of the three faces of a versioned resource a request addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persona {
    Original,
    TimeMap,
    Memento(u64),
}

/// A parsed request path: the original it belongs to and the persona.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub id: String,
    pub persona: Persona,
}

impl Target {
    /// Parses a URL path such as `/a/b/fcr:versions/3`.
    pub fn parse(path: &str) -> Result<Self> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let (original, persona) = match segments.as_slice() {
            [head @ .., v, token] if *v == VERSIONS_SEGMENT => {
                let token = token
                    .parse::<u64>()
                    .ok()
                    .filter(|_| token.bytes().all(|b| b.is_ascii_digit()))
                    .ok_or_else(|| VersioningError::NotFound(path.to_string()))?;
                (head, Persona::Memento(token))
            }
            [head @ .., v] if *v == VERSIONS_SEGMENT => (head, Persona::TimeMap),
            all => (all, Persona::Original),
        };

        for (i, segment) in original.iter().enumerate() {
            let metadata = *segment == METADATA_SEGMENT && i == original.len() - 1 && i > 0;
            if segment.starts_with("fcr:") && !metadata {
                return Err(VersioningError::ConstrainedBy {
                    constraint: Constraint::ReservedPath,
                    message: format!("Path segment {} is reserved", segment),
                });
            }
        }

        Ok(Target { id: original.join("/"), persona })
    }
}

pub fn timemap_id(original: &str) -> String {
    if original.is_empty() {
        VERSIONS_SEGMENT.to_string()
    } else {
        format!("{}/{}", original, VERSIONS_SEGMENT)
    }
}

pub fn description_id(binary: &str) -> String {
    format!("{}/{}", binary, METADATA_SEGMENT)
}

/// The binary described by `id`, when `id` names a description.
pub fn description_of(id: &str) -> Option<&str> {
    id.strip_suffix(METADATA_SEGMENT).and_then(|rest| rest.strip_suffix('/'))
}

pub fn parent_id(id: &str) -> &str {
    id.rsplit_once('/').map_or("", |(parent, _)| parent)
}

/// Absolute URI of a repository path. The root is `{base}/`.
pub fn uri(base: &str, id: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_personas() {
        assert_eq!(Target::parse("/").unwrap(), Target { id: String::new(), persona: Persona::Original });
        assert_eq!(Target::parse("/a/b/").unwrap(), Target { id: "a/b".into(), persona: Persona::Original });
        assert_eq!(Target::parse("/a/fcr:versions").unwrap(), Target { id: "a".into(), persona: Persona::TimeMap });
        assert_eq!(
            Target::parse("/a/fcr:versions/42").unwrap(),
            Target { id: "a".into(), persona: Persona::Memento(42) }
        );
        assert_eq!(
            Target::parse("/a/fcr:metadata/fcr:versions").unwrap(),
            Target { id: "a/fcr:metadata".into(), persona: Persona::TimeMap }
        );
    }

    #[test]
    fn memento_tokens_are_digits() {
        assert!(matches!(Target::parse("/a/fcr:versions/abc"), Err(VersioningError::NotFound(_))));
        assert!(matches!(Target::parse("/a/fcr:versions/+1"), Err(VersioningError::NotFound(_))));
    }

    #[test]
    fn other_fcr_segments_are_reserved() {
        assert!(Target::parse("/a/fcr:tx").is_err());
        assert!(Target::parse("/fcr:metadata").is_err());
        assert!(Target::parse("/a/fcr:metadata/b").is_err());
    }

    #[test]
    fn path_helpers() {
        assert_eq!(timemap_id("a/b"), "a/b/fcr:versions");
        assert_eq!(description_of("a/fcr:metadata"), Some("a"));
        assert_eq!(description_of("a"), None);
        assert_eq!(parent_id("a/b"), "a");
        assert_eq!(parent_id("a"), "");
        assert_eq!(uri("http://localhost:8080/", ""), "http://localhost:8080/");
        assert_eq!(uri("http://localhost:8080", "a/b"), "http://localhost:8080/a/b");
    }
}
