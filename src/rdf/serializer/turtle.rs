//! Turtle and N-Triples writers.
//!
//! Turtle is pretty-printed with the well-known namespaces as prefixes;
//! N-Triples writes one triple per line and is what the journal stores.

use sophia_api::prefix::Prefix;
use sophia_api::serializer::{Stringifier, TripleSerializer};
use sophia_iri::Iri;
use sophia_turtle::serializer::nt::NtSerializer;
use sophia_turtle::serializer::turtle::{TurtleConfig, TurtleSerializer};

use crate::rdf::vocab::PREFIXES;
use crate::rdf::{Graph, RdfError};

pub fn to_turtle(graph: &Graph) -> Result<String, RdfError> {
    let prefixes = PREFIXES
        .iter()
        .map(|(prefix, namespace)| {
            (Prefix::new_unchecked(Box::<str>::from(*prefix)), Iri::new_unchecked(Box::<str>::from(*namespace)))
        })
        .collect();
    let config = TurtleConfig::new().with_pretty(true).with_own_prefix_map(prefixes);

    let mut stringifier = TurtleSerializer::new_stringifier_with_config(config);
    stringifier.serialize_graph(&graph.as_sophia()).map_err(|e| RdfError::Serialize(e.to_string()))?;
    Ok(stringifier.as_str().to_string())
}

pub fn to_ntriples(graph: &Graph) -> Result<String, RdfError> {
    let mut stringifier = NtSerializer::new_stringifier();
    stringifier.serialize_graph(&graph.as_sophia()).map_err(|e| RdfError::Serialize(e.to_string()))?;
    Ok(stringifier.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::vocab::{LDP_CONTAINS, RDF_TYPE, XSD_INTEGER};
    use crate::rdf::{Literal, Term, Triple};

    fn sample() -> Graph {
        [
            Triple::new(Term::iri("http://localhost/c"), RDF_TYPE, Term::iri("http://www.w3.org/ns/ldp#Container")),
            Triple::new(Term::iri("http://localhost/c"), LDP_CONTAINS, Term::iri("http://localhost/c/a")),
            Triple::new(Term::iri("http://localhost/c"), "info:test#label", Term::literal("a \"quoted\"\nvalue")),
            Triple::new(Term::Blank("b0".into()), "info:test#n", Term::Literal(Literal::typed("5", XSD_INTEGER))),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn ntriples_writes_one_escaped_line_per_triple() {
        let nt = to_ntriples(&sample()).unwrap();
        assert_eq!(nt.lines().count(), 4);
        for line in nt.lines() {
            assert!(line.ends_with(" ."), "Line does not end with ' .': {line}");
        }
        assert!(nt.contains(r#""a \"quoted\"\nvalue""#), "{}", nt);
    }

    #[test]
    fn turtle_uses_known_prefixes() {
        let ttl = to_turtle(&sample()).unwrap();
        assert!(ttl.contains("ldp:contains"), "{}", ttl);
        assert!(!ttl.contains("<http://www.w3.org/ns/ldp#contains>"), "{}", ttl);
    }
}
