//! JSON-LD in expanded form.
//!
//! Output is the expanded document sophia writes from the graph. Input must
//! already be expanded: documents carrying `@context` are refused rather than
//! resolved.

use std::sync::Arc;

use serde_json::Value;
use sophia_api::dataset::Dataset;
use sophia_api::parser::QuadParser;
use sophia_api::quad::Quad;
use sophia_api::serializer::{QuadSerializer, Stringifier};
use sophia_api::source::QuadSource;
use sophia_api::term::SimpleTerm;
use sophia_inmem::dataset::LightDataset;
use sophia_iri::Iri;
use sophia_jsonld::loader::NoLoader;
use sophia_jsonld::{JsonLdOptions, JsonLdParser, JsonLdSerializer};

use crate::rdf::{Graph, RdfError, Triple};

pub fn to_json_ld(graph: &Graph) -> Result<String, RdfError> {
    let quads: Vec<([SimpleTerm<'_>; 3], Option<SimpleTerm<'_>>)> =
        graph.as_sophia().into_iter().map(|triple| (triple, None)).collect();

    let mut stringifier = JsonLdSerializer::new_stringifier();
    stringifier.serialize_dataset(&quads).map_err(|e| RdfError::Serialize(e.to_string()))?;
    Ok(stringifier.as_str().to_string())
}

/// Reads the default graph of an expanded document; relative IRIs resolve
/// against `base`.
pub fn from_json_ld(input: &str, base: Option<&str>) -> Result<Graph, RdfError> {
    let document: Value = serde_json::from_str(input).map_err(|e| RdfError::Syntax(e.to_string()))?;
    if has_context(&document) {
        return Err(RdfError::Syntax("@context is not supported; send expanded JSON-LD".to_string()));
    }

    let mut options = JsonLdOptions::new().with_default_document_loader::<NoLoader>();
    if let Some(b) = base.filter(|b| !b.is_empty()) {
        let iri = Iri::new(Arc::<str>::from(b)).map_err(|_| RdfError::BadIri(b.to_string()))?;
        options = options.with_base(iri);
    }
    let dataset: LightDataset = JsonLdParser::new_with_options(options)
        .parse_str(input)
        .collect_quads()
        .map_err(|e| RdfError::Syntax(e.to_string()))?;

    let mut graph = Graph::new();
    for quad in dataset.quads() {
        let quad = quad.map_err(|e| RdfError::Syntax(e.to_string()))?;
        if quad.g().is_none() {
            graph.insert(Triple::from_sophia([quad.s(), quad.p(), quad.o()])?);
        }
    }
    Ok(graph)
}

fn has_context(value: &Value) -> bool {
    match value {
        Value::Object(node) => node.contains_key("@context") || node.get("@graph").map_or(false, has_context),
        Value::Array(nodes) => nodes.iter().any(has_context),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::vocab::RDF_TYPE;
    use crate::rdf::{Literal, Term};

    #[test]
    fn writes_expanded_node_objects() {
        let graph: Graph = [
            Triple::new(Term::iri("http://localhost/a"), RDF_TYPE, Term::iri("http://example.org/Thing")),
            Triple::new(Term::iri("http://localhost/a"), "info:test#label", Term::literal("bar")),
        ]
        .into_iter()
        .collect();

        let value: Value = serde_json::from_str(&to_json_ld(&graph).unwrap()).unwrap();
        let node = &value[0];
        assert_eq!(node["@id"], "http://localhost/a");
        assert_eq!(node["@type"][0], "http://example.org/Thing");
        assert_eq!(node["info:test#label"][0]["@value"], "bar");
    }

    #[test]
    fn reads_values_and_nested_nodes() {
        let doc = r#"[{
            "@id": "",
            "info:test#label": [{ "@value": "foo" }],
            "info:test#part": [{
                "@id": "part",
                "info:test#label": [{ "@value": "p", "@language": "en" }]
            }]
        }]"#;
        let graph = from_json_ld(doc, Some("http://localhost/a")).unwrap();
        assert_eq!(graph.len(), 3);
        assert!(graph.contains(&Triple::new(Term::iri("http://localhost/a"), "info:test#label", Term::literal("foo"))));
        assert!(graph.contains(&Triple::new(
            Term::iri("http://localhost/a"),
            "info:test#part",
            Term::iri("http://localhost/part"),
        )));
        assert!(graph.contains(&Triple::new(
            Term::iri("http://localhost/part"),
            "info:test#label",
            Term::Literal(Literal::lang("p", "en")),
        )));
    }

    #[test]
    fn refuses_contexts() {
        let doc = r#"{ "@context": { "x": "http://x/" }, "@id": "urn:a", "x:p": "v" }"#;
        assert!(matches!(from_json_ld(doc, None), Err(RdfError::Syntax(_))));
        let nested = r#"{ "@graph": [{ "@context": {}, "@id": "urn:a" }] }"#;
        assert!(from_json_ld(nested, None).is_err());
    }
}
