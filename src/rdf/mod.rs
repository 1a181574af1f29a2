//! RDF terms, graphs and the codecs the repository reads and writes.
//!
//! Graphs are plain sets of triples: two graphs are equal when they hold the
//! same triples, which is the comparison mementos are held to. Parsing and
//! serialization go through sophia; [`Term`] and [`Triple`] convert to and
//! from its term model at the codec boundary.

pub mod parser;
pub mod serializer;
pub mod vocab;

use std::collections::BTreeSet;

use sophia_api::graph::Graph as SophiaGraph;
use sophia_api::term::{BnodeId, IriRef, LanguageTag, SimpleTerm, Term as SophiaTerm, TermKind};
use sophia_api::triple::Triple as SophiaTriple;
use thiserror::Error;

pub use serializer::RdfFormat;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RdfError {
    #[error("Invalid RDF syntax: {0}")]
    Syntax(String),

    #[error("Cannot resolve IRI <{0}>")]
    BadIri(String),

    #[error("Unsupported RDF term: {0}")]
    UnsupportedTerm(String),

    #[error("Could not write RDF: {0}")]
    Serialize(String),

    #[error("Unsupported RDF media type: {0}")]
    UnsupportedMediaType(String),

    #[error("RDF body is not valid UTF-8")]
    Encoding,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Literal {
    pub lexical: String,
    /// `None` for plain `xsd:string` and language-tagged literals.
    pub datatype: Option<String>,
    pub language: Option<String>,
}

impl Literal {
    pub fn plain(lexical: impl Into<String>) -> Self {
        Self { lexical: lexical.into(), datatype: None, language: None }
    }

    pub fn typed(lexical: impl Into<String>, datatype: &str) -> Self {
        let datatype = if datatype == vocab::XSD_STRING { None } else { Some(datatype.to_string()) };
        Self { lexical: lexical.into(), datatype, language: None }
    }

    pub fn lang(lexical: impl Into<String>, language: &str) -> Self {
        Self { lexical: lexical.into(), datatype: None, language: Some(language.to_ascii_lowercase()) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Term {
    Iri(String),
    Blank(String),
    Literal(Literal),
}

impl Term {
    pub fn iri(iri: impl Into<String>) -> Self {
        Term::Iri(iri.into())
    }

    pub fn literal(lexical: impl Into<String>) -> Self {
        Term::Literal(Literal::plain(lexical))
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    pub fn in_namespace(&self, namespace: &str) -> bool {
        self.as_iri().map_or(false, |iri| iri.starts_with(namespace))
    }

    /// Borrows the term as a sophia term.
    pub(crate) fn as_sophia(&self) -> SimpleTerm<'_> {
        match self {
            Term::Iri(iri) => SimpleTerm::Iri(IriRef::new_unchecked(iri.as_str().into())),
            Term::Blank(id) => SimpleTerm::BlankNode(BnodeId::new_unchecked(id.as_str().into())),
            Term::Literal(Literal { lexical, language: Some(language), .. }) => SimpleTerm::LiteralLanguage(
                lexical.as_str().into(),
                LanguageTag::new_unchecked(language.as_str().into()),
            ),
            Term::Literal(Literal { lexical, datatype, .. }) => SimpleTerm::LiteralDatatype(
                lexical.as_str().into(),
                IriRef::new_unchecked(datatype.as_deref().unwrap_or(vocab::XSD_STRING).into()),
            ),
        }
    }

    pub(crate) fn from_sophia<T: SophiaTerm>(term: T) -> Result<Self, RdfError> {
        let converted = match term.kind() {
            TermKind::Iri => term.iri().map(|iri| Term::Iri(iri.as_str().to_string())),
            TermKind::BlankNode => term.bnode_id().map(|id| Term::Blank(id.as_str().to_string())),
            TermKind::Literal => term.lexical_form().map(|lexical| {
                Term::Literal(match (term.language_tag(), term.datatype()) {
                    (Some(language), _) => Literal::lang(lexical.to_string(), language.as_str()),
                    (None, Some(datatype)) => Literal::typed(lexical.to_string(), datatype.as_str()),
                    (None, None) => Literal::plain(lexical.to_string()),
                })
            }),
            _ => None,
        };
        converted.ok_or_else(|| RdfError::UnsupportedTerm(format!("{:?}", term.kind())))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Triple {
    pub subject: Term,
    pub predicate: String,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: Term, predicate: impl Into<String>, object: Term) -> Self {
        Self { subject, predicate: predicate.into(), object }
    }

    pub(crate) fn from_sophia<T: SophiaTriple>(triple: T) -> Result<Self, RdfError> {
        let predicate = match Term::from_sophia(triple.p())? {
            Term::Iri(iri) => iri,
            other => return Err(RdfError::UnsupportedTerm(format!("{:?} in predicate position", other))),
        };
        Ok(Self::new(Term::from_sophia(triple.s())?, predicate, Term::from_sophia(triple.o())?))
    }

    pub(crate) fn as_sophia(&self) -> [SimpleTerm<'_>; 3] {
        [
            self.subject.as_sophia(),
            SimpleTerm::Iri(IriRef::new_unchecked(self.predicate.as_str().into())),
            self.object.as_sophia(),
        ]
    }

    /// True when any position of the triple is an IRI under `namespace`.
    pub fn mentions(&self, namespace: &str) -> bool {
        self.subject.in_namespace(namespace) || self.predicate.starts_with(namespace) || self.object.in_namespace(namespace)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    triples: BTreeSet<Triple>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, triple: Triple) -> bool {
        self.triples.insert(triple)
    }

    pub fn remove(&mut self, triple: &Triple) -> bool {
        self.triples.remove(triple)
    }

    pub fn contains(&self, triple: &Triple) -> bool {
        self.triples.contains(triple)
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }

    pub fn retain(&mut self, keep: impl FnMut(&Triple) -> bool) {
        self.triples.retain(keep)
    }

    /// Objects of every `subject predicate ?o` triple.
    pub fn objects<'a>(&'a self, subject: &'a Term, predicate: &'a str) -> impl Iterator<Item = &'a Term> + 'a {
        self.triples
            .iter()
            .filter(move |t| &t.subject == subject && t.predicate == predicate)
            .map(|t| &t.object)
    }

    /// Copies every triple of a sophia graph.
    pub(crate) fn from_sophia<G: SophiaGraph>(graph: &G) -> Result<Self, RdfError> {
        graph
            .triples()
            .map(|triple| {
                let triple = triple.map_err(|e| RdfError::Syntax(e.to_string()))?;
                Triple::from_sophia(triple)
            })
            .collect()
    }

    /// The triples as sophia triples borrowing from this graph.
    pub(crate) fn as_sophia(&self) -> Vec<[SimpleTerm<'_>; 3]> {
        self.triples.iter().map(Triple::as_sophia).collect()
    }
}

impl Extend<Triple> for Graph {
    fn extend<I: IntoIterator<Item = Triple>>(&mut self, iter: I) {
        self.triples.extend(iter)
    }
}

impl FromIterator<Triple> for Graph {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        Self { triples: iter.into_iter().collect() }
    }
}

impl IntoIterator for Graph {
    type Item = Triple;
    type IntoIter = std::collections::btree_set::IntoIter<Triple>;

    fn into_iter(self) -> Self::IntoIter {
        self.triples.into_iter()
    }
}

impl<'a> IntoIterator for &'a Graph {
    type Item = &'a Triple;
    type IntoIter = std::collections::btree_set::Iter<'a, Triple>;

    fn into_iter(self) -> Self::IntoIter {
        self.triples.iter()
    }
}
