use tracing::debug;

use crate::error::{Result, VersioningError};
use crate::rdf::vocab::{FEDORA_NS, LDP_NS, MEMENTO_NS, RDF_TYPE};
use crate::rdf::{Graph, Triple};

/// How inbound server-managed triples are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Handling {
    /// Reject the whole body.
    #[default]
    Strict,
    /// Drop the offending triples and keep the rest (`Prefer: handling=lenient`).
    Lenient,
}

/// True for triples only the repository may assert: anything mentioning the
/// repository or Memento vocabularies, LDP predicates and LDP interaction types.
pub fn is_server_managed(triple: &Triple) -> bool {
    if triple.mentions(FEDORA_NS) || triple.mentions(MEMENTO_NS) {
        return true;
    }
    if triple.predicate.starts_with(LDP_NS) {
        return true;
    }
    triple.predicate == RDF_TYPE && triple.object.in_namespace(LDP_NS)
}

/// Checks an inbound body. `subject` is the resource the body is aimed at and
/// only shows up in diagnostics.
pub fn filter_body(graph: Graph, subject: &str, handling: Handling) -> Result<Graph> {
    let offending = graph.iter().filter(|t| is_server_managed(t)).count();
    if offending == 0 {
        return Ok(graph);
    }

    match handling {
        Handling::Strict => {
            let first = graph.iter().find(|t| is_server_managed(t));
            debug!("Rejecting body for {}: {} server-managed triple(s)", subject, offending);
            Err(VersioningError::server_managed(match first {
                Some(t) => format!("Could not persist triple containing predicate {} to {}", t.predicate, subject),
                None => format!("Server-managed triples are not allowed on {}", subject),
            }))
        }
        Handling::Lenient => {
            debug!("Dropping {} server-managed triple(s) from body for {}", offending, subject);
            let mut graph = graph;
            graph.retain(|t| !is_server_managed(t));
            Ok(graph)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::parser::parse_turtle;
    use crate::rdf::vocab::LDP_CONTAINS;
    use crate::rdf::Term;

    const SUBJECT: &str = "http://localhost/c";

    fn graph(turtle: &str) -> Graph {
        parse_turtle(turtle, Some(SUBJECT)).unwrap()
    }

    #[test]
    fn user_triples_pass_through() {
        let body = graph("<> <info:test#label> \"bar\" ; a <http://example.org/Thing> .");
        let out = filter_body(body.clone(), SUBJECT, Handling::Strict).unwrap();
        assert_eq!(out, body);
    }

    #[test]
    fn rejects_server_managed_triples() {
        for turtle in [
            "<> <http://fedora.info/definitions/v4/repository#created> \"2000\" .",
            "<> a <http://mementoweb.org/ns#Memento> .",
            "<> <http://www.w3.org/ns/ldp#contains> <child> .",
            "<> a <http://www.w3.org/ns/ldp#BasicContainer> .",
        ] {
            let err = filter_body(graph(turtle), SUBJECT, Handling::Strict).unwrap_err();
            assert_eq!(err.constraint(), Some(crate::error::Constraint::ServerManagedTriples), "{}", turtle);
        }
    }

    #[test]
    fn lenient_handling_strips() {
        let body = graph("<> <info:test#label> \"foo\" ; <http://www.w3.org/ns/ldp#contains> <child> .");
        let out = filter_body(body, SUBJECT, Handling::Lenient).unwrap();
        assert_eq!(out.len(), 1);
        assert!(!out.contains(&Triple::new(Term::iri(SUBJECT), LDP_CONTAINS, Term::iri("http://localhost/child"))));
    }

    #[test]
    fn empty_body_is_valid() {
        assert!(filter_body(Graph::new(), SUBJECT, Handling::Strict).unwrap().is_empty());
    }
}
