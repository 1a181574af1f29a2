//! IRIs of the vocabularies the repository speaks.

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDF_FIRST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#first";

pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub const XSD_DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
pub const XSD_DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";

// --- LDP ---
pub const LDP_NS: &str = "http://www.w3.org/ns/ldp#";
pub const LDP_RESOURCE: &str = "http://www.w3.org/ns/ldp#Resource";
pub const LDP_RDF_SOURCE: &str = "http://www.w3.org/ns/ldp#RDFSource";
pub const LDP_NON_RDF_SOURCE: &str = "http://www.w3.org/ns/ldp#NonRDFSource";
pub const LDP_BASIC_CONTAINER: &str = "http://www.w3.org/ns/ldp#BasicContainer";
pub const LDP_CONTAINS: &str = "http://www.w3.org/ns/ldp#contains";
pub const LDP_CONSTRAINED_BY: &str = "http://www.w3.org/ns/ldp#constrainedBy";

// --- Memento ---
pub const MEMENTO_NS: &str = "http://mementoweb.org/ns#";
pub const MEMENTO_TYPE: &str = "http://mementoweb.org/ns#Memento";
pub const MEMENTO_TIMEMAP: &str = "http://mementoweb.org/ns#TimeMap";
pub const MEMENTO_ORIGINAL_RESOURCE: &str = "http://mementoweb.org/ns#OriginalResource";
pub const MEMENTO_ORIGINAL: &str = "http://mementoweb.org/ns#original";
pub const MEMENTO_TIMEGATE: &str = "http://mementoweb.org/ns#timegate";
pub const MEMENTO_DATETIME: &str = "http://mementoweb.org/ns#mementoDatetime";

// --- Repository (server-managed) ---
pub const FEDORA_NS: &str = "http://fedora.info/definitions/v4/repository#";
pub const FEDORA_CREATED: &str = "http://fedora.info/definitions/v4/repository#created";
pub const FEDORA_LAST_MODIFIED: &str = "http://fedora.info/definitions/v4/repository#lastModified";
pub const FEDORA_MIME_TYPE: &str = "http://fedora.info/definitions/v4/repository#mimeType";
pub const FEDORA_VERSIONED_RESOURCE: &str = "http://fedora.info/definitions/v4/repository#VersionedResource";
/// `Prefer` token naming the server-managed part of a representation.
pub const FEDORA_SERVER_MANAGED: &str = "http://fedora.info/definitions/v4/repository#ServerManaged";

/// Prefixes used when writing Turtle.
pub const PREFIXES: &[(&str, &str)] = &[
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
    ("ldp", LDP_NS),
    ("memento", MEMENTO_NS),
    ("fedora", FEDORA_NS),
];
