//! TimeMap rendering: `application/link-format` and RDF.

use std::sync::Arc;

use crate::link::{format_links, WebLink};
use crate::model::{timemap_id, uri, Memento};
use crate::rdf::vocab::{LDP_CONTAINS, MEMENTO_DATETIME, MEMENTO_ORIGINAL, MEMENTO_TIMEGATE, MEMENTO_TIMEMAP, RDF_TYPE, XSD_DATE_TIME};
use crate::rdf::{Graph, Literal, Term, Triple};

pub const LINK_FORMAT: &str = "application/link-format";

/// A TimeMap as seen at one instant.
pub struct TimeMapView<'a> {
    pub base: &'a str,
    pub original: &'a str,
    /// Oldest first.
    pub mementos: &'a [Arc<Memento>],
}

impl<'a> TimeMapView<'a> {
    pub fn original_uri(&self) -> String {
        uri(self.base, self.original)
    }

    pub fn uri(&self) -> String {
        uri(self.base, &timemap_id(self.original))
    }

    pub fn links(&self) -> Vec<WebLink> {
        let original = self.original_uri();
        let mut links = vec![
            WebLink::new(original.clone()).rel("original"),
            WebLink::new(original).rel("timegate"),
            WebLink::new(self.uri()).rel("self").param("type", LINK_FORMAT),
        ];
        links.extend(self.mementos.iter().map(|m| {
            WebLink::new(uri(self.base, &m.id())).rel("memento").param("datetime", m.datetime().to_string())
        }));
        links
    }

    pub fn to_link_format(&self) -> String {
        format_links(&self.links())
    }

    /// The TimeMap as a graph about its own URI. `typed` adds
    /// `rdf:type memento:TimeMap`, which is otherwise only sent as a header.
    pub fn to_graph(&self, typed: bool) -> Graph {
        let subject = Term::iri(self.uri());
        let original = Term::iri(self.original_uri());

        let mut graph = Graph::new();
        graph.insert(Triple::new(subject.clone(), MEMENTO_ORIGINAL, original.clone()));
        graph.insert(Triple::new(subject.clone(), MEMENTO_TIMEGATE, original));
        if typed {
            graph.insert(Triple::new(subject.clone(), RDF_TYPE, Term::iri(MEMENTO_TIMEMAP)));
        }
        for m in self.mementos {
            let memento = Term::iri(uri(self.base, &m.id()));
            graph.insert(Triple::new(subject.clone(), LDP_CONTAINS, memento.clone()));
            graph.insert(Triple::new(
                memento,
                MEMENTO_DATETIME,
                Term::Literal(Literal::typed(m.datetime().to_xsd(), XSD_DATE_TIME)),
            ));
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::MementoDatetime;
    use crate::link::parse_links;
    use crate::model::Body;

    const BASE: &str = "http://localhost:8080";

    fn mementos() -> Vec<Arc<Memento>> {
        ["Sat, 1 Jan 2000 00:00:00 GMT", "Tue, 3 Jun 2008 11:05:30 GMT"]
            .iter()
            .enumerate()
            .map(|(i, dt)| {
                Arc::new(Memento::new(
                    "c".into(),
                    i as u64 + 1,
                    MementoDatetime::parse(dt).unwrap(),
                    Body::Rdf(Graph::new()),
                ))
            })
            .collect()
    }

    #[test]
    fn link_format_lists_every_relation() {
        let mementos = mementos();
        let view = TimeMapView { base: BASE, original: "c", mementos: &mementos };
        let body = view.to_link_format();

        assert!(body.starts_with("<http://localhost:8080/c>; rel=\"original\",\n<http://localhost:8080/c>; rel=\"timegate\""));
        assert!(body.contains("<http://localhost:8080/c/fcr:versions>; rel=\"self\"; type=\"application/link-format\""));
        assert!(body.contains(
            "<http://localhost:8080/c/fcr:versions/2>; rel=\"memento\"; datetime=\"Tue, 3 Jun 2008 11:05:30 GMT\""
        ));
    }

    #[test]
    fn link_format_round_trips() {
        let mementos = mementos();
        let view = TimeMapView { base: BASE, original: "c", mementos: &mementos };
        let tuples = |links: Vec<WebLink>| -> Vec<(String, String, Option<String>)> {
            links
                .into_iter()
                .map(|l| (l.get("rel").unwrap_or_default().to_string(), l.target.clone(), l.get("datetime").map(str::to_string)))
                .collect()
        };
        assert_eq!(tuples(parse_links(&view.to_link_format()).unwrap()), tuples(view.links()));
    }

    #[test]
    fn graph_is_about_the_timemap() {
        let mementos = mementos();
        let view = TimeMapView { base: BASE, original: "c", mementos: &mementos };
        let tm = Term::iri("http://localhost:8080/c/fcr:versions");

        let graph = view.to_graph(false);
        assert_eq!(graph.objects(&tm, LDP_CONTAINS).count(), 2);
        assert_eq!(graph.objects(&tm, RDF_TYPE).count(), 0);
        assert!(graph.contains(&Triple::new(
            Term::iri("http://localhost:8080/c/fcr:versions/1"),
            MEMENTO_DATETIME,
            Term::Literal(Literal::typed("2000-01-01T00:00:00Z", XSD_DATE_TIME)),
        )));
        assert_eq!(view.to_graph(true).objects(&tm, RDF_TYPE).count(), 1);
    }
}
