//! Codecs for the RDF media types the repository negotiates.
//!
//! - **Turtle** ([`turtle`]): the default representation; also served for the N3 media types
//! - **N-Triples** ([`turtle::to_ntriples`]): the journal encoding of RDF bodies
//! - **JSON-LD** ([`jsonld`]): expanded form only, no `@context` processing

pub mod jsonld;
pub mod turtle;

use super::{parser, Graph, RdfError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RdfFormat {
    Turtle,
    JsonLd,
    NTriples,
    N3,
    RdfN3,
    ApplicationN3,
}

impl RdfFormat {
    /// Every supported format, in server preference order.
    pub const ALL: [RdfFormat; 6] = [
        RdfFormat::Turtle,
        RdfFormat::JsonLd,
        RdfFormat::NTriples,
        RdfFormat::N3,
        RdfFormat::RdfN3,
        RdfFormat::ApplicationN3,
    ];

    pub fn media_type(self) -> &'static str {
        match self {
            RdfFormat::Turtle => "text/turtle",
            RdfFormat::JsonLd => "application/ld+json",
            RdfFormat::NTriples => "application/n-triples",
            RdfFormat::N3 => "text/n3",
            RdfFormat::RdfN3 => "text/rdf+n3",
            RdfFormat::ApplicationN3 => "application/n3",
        }
    }

    pub fn from_media_type(content_type: &str) -> Option<Self> {
        let essence = media_type_essence(content_type);
        Self::ALL.into_iter().find(|f| f.media_type() == essence)
    }

    pub fn media_types() -> impl Iterator<Item = &'static str> {
        Self::ALL.into_iter().map(RdfFormat::media_type)
    }

    /// Reads `body`; relative IRIs resolve against `base`.
    pub fn parse(self, body: &[u8], base: &str) -> Result<Graph, RdfError> {
        let text = std::str::from_utf8(body).map_err(|_| RdfError::Encoding)?;
        match self {
            RdfFormat::JsonLd => jsonld::from_json_ld(text, Some(base)),
            _ => parser::parse_turtle(text, Some(base)),
        }
    }

    pub fn serialize(self, graph: &Graph) -> Result<String, RdfError> {
        match self {
            RdfFormat::JsonLd => jsonld::to_json_ld(graph),
            RdfFormat::NTriples => turtle::to_ntriples(graph),
            _ => turtle::to_turtle(graph),
        }
    }
}

/// `type/subtype` of a media type, lowercased and without parameters.
pub fn media_type_essence(content_type: &str) -> String {
    content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_media_types_with_parameters() {
        assert_eq!(RdfFormat::from_media_type("text/turtle; charset=utf-8"), Some(RdfFormat::Turtle));
        assert_eq!(RdfFormat::from_media_type("Application/LD+JSON"), Some(RdfFormat::JsonLd));
        assert_eq!(RdfFormat::from_media_type("application/octet-stream"), None);
    }

    #[test]
    fn every_format_reads_what_it_writes() {
        let source = "<http://localhost/a> <info:test#label> \"bar\"@en ;\n\
                      <info:test#n> 7 ;\n\
                      a <http://example.org/Thing> .\n\
                      <http://localhost/b> <info:test#ref> <http://localhost/a> .";
        let graph = parser::parse_turtle(source, None).unwrap();
        for format in RdfFormat::ALL {
            let text = format.serialize(&graph).unwrap();
            let back = format.parse(text.as_bytes(), "http://localhost/").unwrap();
            assert_eq!(back, graph, "{} did not survive\n{}", format.media_type(), text);
        }
    }
}
