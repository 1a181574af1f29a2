use uuid::Uuid;
use warp::http::StatusCode;

use super::{allow, rdf_media_types, Request, Response, Shape, VersioningController};
use crate::datetime::MementoDatetime;
use crate::error::{Constraint, Result, VersioningError};
use crate::filter::filter_body;
use crate::link::WebLink;
use crate::model::{description_id, description_of, Body, Persona, Resource, ResourceKind};
use crate::rdf::parser::{parse_update, UpdateOp};
use crate::rdf::serializer::media_type_essence;
use crate::rdf::vocab::{
    FEDORA_CREATED, FEDORA_LAST_MODIFIED, FEDORA_MIME_TYPE, FEDORA_SERVER_MANAGED, FEDORA_VERSIONED_RESOURCE,
    LDP_BASIC_CONTAINER, LDP_CONTAINS, LDP_NON_RDF_SOURCE, LDP_RDF_SOURCE, LDP_RESOURCE, MEMENTO_ORIGINAL_RESOURCE,
    RDF_TYPE, XSD_DATE_TIME,
};
use crate::rdf::{Literal, RdfError, RdfFormat, Term, Triple};
use crate::resource::PutOutcome;

const SPARQL_UPDATE: &str = "application/sparql-update";
const OCTET_STREAM: &str = "application/octet-stream";

fn timestamp(dt: MementoDatetime) -> Term {
    Term::Literal(Literal::typed(dt.to_xsd(), XSD_DATE_TIME))
}

impl VersioningController {
    pub(super) fn get_original(&self, req: &Request, resource: &Resource) -> Result<Response> {
        let id = resource.id.as_str();
        let versioned = self.repo.is_versioned(id)?;

        if versioned {
            if let Some(accept_datetime) = req.header("accept-datetime") {
                return self.timegate(id, accept_datetime);
            }
        }

        let response = match &resource.body {
            Body::Binary { content, media_type } => {
                let response = Response::new(StatusCode::OK)
                    .body(media_type, content.clone())
                    .type_link(LDP_NON_RDF_SOURCE)
                    .link(WebLink::new(self.uri(&description_id(id))).rel("describedby"));
                self.with_digest(response, req, content)?
            }
            Body::Rdf(graph) => {
                let format = self.negotiate_rdf(req)?;
                let prefer = self.prefer(req);

                let mut graph = graph.clone();
                if !prefer.omits(FEDORA_SERVER_MANAGED) {
                    graph.extend(self.server_managed_triples(resource, versioned)?);
                }

                let mut response = Response::new(StatusCode::OK)
                    .body(format.media_type(), format.serialize(&graph)?)
                    .type_link(LDP_RDF_SOURCE)
                    .header("vary", "Accept");
                if !resource.is_description() {
                    response = response.type_link(LDP_BASIC_CONTAINER).header("accept-post", rdf_media_types());
                }
                if prefer.return_representation {
                    response = response.header("preference-applied", "return=representation");
                }
                response
            }
        };

        let mut response = response
            .type_link(LDP_RESOURCE)
            .allow(allow(Persona::Original, Shape::of(resource)))
            .header("last-modified", resource.last_modified.to_string());
        if versioned {
            response = self
                .versioning_links(response, id)
                .type_link(MEMENTO_ORIGINAL_RESOURCE)
                .header("vary", "Accept-Datetime");
        }
        Ok(response)
    }

    /// Triples the repository asserts about an original on its own behalf.
    fn server_managed_triples(&self, resource: &Resource, versioned: bool) -> Result<Vec<Triple>> {
        let subject = Term::iri(self.subject_uri(&resource.id));
        let mut triples = Vec::new();

        match description_of(&resource.id) {
            Some(binary_id) => {
                let binary = self.repo.resources.get(binary_id)?;
                triples.push(Triple::new(subject.clone(), RDF_TYPE, Term::iri(LDP_NON_RDF_SOURCE)));
                if let Body::Binary { media_type, .. } = &binary.body {
                    triples.push(Triple::new(subject.clone(), FEDORA_MIME_TYPE, Term::literal(media_type.clone())));
                }
                triples.push(Triple::new(subject.clone(), FEDORA_CREATED, timestamp(binary.created)));
                triples.push(Triple::new(subject.clone(), FEDORA_LAST_MODIFIED, timestamp(binary.last_modified)));
            }
            None => {
                triples.push(Triple::new(subject.clone(), RDF_TYPE, Term::iri(LDP_RDF_SOURCE)));
                triples.push(Triple::new(subject.clone(), RDF_TYPE, Term::iri(LDP_BASIC_CONTAINER)));
                triples.push(Triple::new(subject.clone(), FEDORA_CREATED, timestamp(resource.created)));
                triples.push(Triple::new(subject.clone(), FEDORA_LAST_MODIFIED, timestamp(resource.last_modified)));
                for child in self.repo.resources.children(&resource.id)? {
                    triples.push(Triple::new(subject.clone(), LDP_CONTAINS, Term::iri(self.uri(&child))));
                }
                if versioned {
                    triples.push(Triple::new(subject, RDF_TYPE, Term::iri(MEMENTO_ORIGINAL_RESOURCE)));
                }
            }
        }
        Ok(triples)
    }

    /// `Accept-Datetime` negotiation: redirect to the best memento.
    fn timegate(&self, id: &str, accept_datetime: &str) -> Result<Response> {
        let instant = MementoDatetime::parse(accept_datetime)?;
        let memento = self
            .repo
            .mementos
            .memento_at(id, instant)?
            .ok_or_else(|| VersioningError::NotAcceptable(format!("/{} has no mementos", id)))?;

        let response = Response::new(StatusCode::FOUND)
            .location(&self.uri(&memento.id()))
            .header("vary", "Accept-Datetime")
            .type_link(MEMENTO_ORIGINAL_RESOURCE);
        Ok(self.versioning_links(response, id))
    }

    /// PUT, and the creation half of POST. `existing` is `None` when `id` is new.
    pub(super) fn store_original(&self, req: &Request, id: &str, existing: Option<&Resource>) -> Result<Response> {
        let links = self.request_links(req)?;
        let declares = |type_iri: &str| links.iter().any(|l| l.has_rel("type") && l.target == type_iri);
        let versioned = declares(MEMENTO_ORIGINAL_RESOURCE) || declares(FEDORA_VERSIONED_RESOURCE);

        let content_type = req.header("content-type");
        let kind = match existing {
            Some(resource) => resource.kind(),
            None if declares(LDP_NON_RDF_SOURCE) => ResourceKind::NonRdfSource,
            None => match content_type {
                Some(ct) if RdfFormat::from_media_type(ct).is_none() => ResourceKind::NonRdfSource,
                _ => ResourceKind::RdfSource,
            },
        };

        let body = match kind {
            ResourceKind::RdfSource => {
                let subject = self.subject_uri(id);
                let graph = self.read_rdf(req, &subject)?;
                Body::Rdf(filter_body(graph, &subject, self.prefer(req).handling)?)
            }
            ResourceKind::NonRdfSource => Body::Binary {
                content: req.body.clone(),
                media_type: content_type.unwrap_or(OCTET_STREAM).to_string(),
            },
        };

        let outcome = self.repo.put_resource(id, body, versioned)?;
        let response = match outcome {
            PutOutcome::Created => Response::created(&self.uri(id)),
            PutOutcome::Replaced => Response::new(StatusCode::NO_CONTENT),
        };
        if self.repo.is_versioned(id)? {
            return Ok(self.versioning_links(response, id).type_link(MEMENTO_ORIGINAL_RESOURCE));
        }
        Ok(response)
    }

    pub(super) fn post_original(&self, req: &Request, container: &Resource) -> Result<Response> {
        let slug = req.header("slug").filter(|s| !s.is_empty());
        let name = match slug {
            Some(slug) if slug.contains('/') => {
                return Err(VersioningError::BadRequest(format!("Slug '{}' may not contain '/'", slug)));
            }
            Some(slug) if slug.starts_with("fcr:") => {
                return Err(VersioningError::ConstrainedBy {
                    constraint: Constraint::ReservedPath,
                    message: format!("Slug '{}' uses a reserved prefix", slug),
                });
            }
            Some(slug) => slug.to_string(),
            None => Uuid::new_v4().to_string(),
        };

        let id = if container.id.is_empty() { name } else { format!("{}/{}", container.id, name) };
        if self.repo.resources.exists(&id)? {
            return Err(VersioningError::Conflict(format!("/{} already exists", id)));
        }
        self.store_original(req, &id, None)
    }

    /// SPARQL Update restricted to `INSERT DATA` and `DELETE DATA`.
    pub(super) fn patch_original(&self, req: &Request, resource: &Resource) -> Result<Response> {
        let content_type = req.header("content-type").map(media_type_essence);
        if content_type.as_deref() != Some(SPARQL_UPDATE) {
            return Err(VersioningError::UnsupportedMediaType(content_type.unwrap_or_default()));
        }
        let text = std::str::from_utf8(&req.body).map_err(|_| RdfError::Encoding)?;

        let subject = self.subject_uri(&resource.id);
        let handling = self.prefer(req).handling;
        let mut graph = resource.body.as_graph().cloned().unwrap_or_default();

        for op in parse_update(text, Some(&subject))? {
            match op {
                UpdateOp::Insert(inserted) => graph.extend(filter_body(inserted, &subject, handling)?),
                UpdateOp::Delete(deleted) => {
                    for triple in &filter_body(deleted, &subject, handling)? {
                        graph.remove(triple);
                    }
                }
            }
        }

        self.repo.resources.put(&resource.id, Body::Rdf(graph))?;
        Ok(Response::new(StatusCode::NO_CONTENT))
    }

    pub(super) fn delete_original(&self, resource: &Resource) -> Result<Response> {
        self.repo.delete_resource(&resource.id)?;
        Ok(Response::new(StatusCode::NO_CONTENT))
    }
}
