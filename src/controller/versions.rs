use warp::http::StatusCode;

use super::{rdf_media_types, Request, Response, VersioningController, MEMENTO_ALLOW, TIMEMAP_ALLOW};
use crate::error::{Result, VersioningError};
use crate::filter::{filter_body, Handling};
use crate::headers::negotiate;
use crate::model::{Body, Resource, ResourceKind};
use crate::rdf::vocab::{LDP_NON_RDF_SOURCE, LDP_RDF_SOURCE, LDP_RESOURCE, MEMENTO_TIMEMAP, MEMENTO_TYPE};
use crate::rdf::RdfFormat;
use crate::timemap::{TimeMapView, LINK_FORMAT};

impl VersioningController {
    pub(super) fn get_timemap(&self, req: &Request, original: &Resource) -> Result<Response> {
        let mementos = self.repo.mementos.list_mementos(&original.id)?;
        let view = TimeMapView { base: &self.config.base_url, original: &original.id, mementos: &mementos };

        let offered: Vec<&'static str> = std::iter::once(LINK_FORMAT).chain(RdfFormat::media_types()).collect();
        let accept = req.header("accept");
        let media_type = negotiate(accept, &offered)
            .ok_or_else(|| VersioningError::NotAcceptable(accept.unwrap_or_default().to_string()))?;

        let body = match RdfFormat::from_media_type(media_type) {
            Some(format) => format.serialize(&view.to_graph(self.config.timemap_body_typing))?,
            None => view.to_link_format(),
        };

        let response = Response::new(StatusCode::OK)
            .body(media_type, body)
            .type_link(MEMENTO_TIMEMAP)
            .type_link(LDP_RESOURCE)
            .allow(TIMEMAP_ALLOW)
            .header("accept-post", rdf_media_types())
            .header("vary", "Accept");
        Ok(self.versioning_links(response, &original.id))
    }

    /// POST to a TimeMap.
    pub(super) fn create_memento(&self, req: &Request, original: &Resource) -> Result<Response> {
        if req.header("slug").is_some() {
            return Err(VersioningError::BadRequest("Slug is not allowed when creating a memento".to_string()));
        }
        let datetime = self.memento_datetime(req)?;

        let body = match original.kind() {
            ResourceKind::RdfSource => {
                if datetime.is_some() && !req.has_body() {
                    return Err(VersioningError::EmptyBody);
                }
                if req.has_body() {
                    let subject = self.subject_uri(&original.id);
                    let graph = self.read_rdf(req, &subject)?;
                    Some(Body::Rdf(filter_body(graph, &subject, Handling::Strict)?))
                } else {
                    None
                }
            }
            ResourceKind::NonRdfSource => match datetime {
                Some(_) => {
                    let media_type = req.header("content-type").ok_or(VersioningError::MissingMediaType)?;
                    Some(Body::Binary { content: req.body.clone(), media_type: media_type.to_string() })
                }
                None => None,
            },
        };

        let memento = self.repo.mementos.create_memento(&original.id, datetime, body, || {
            Ok(self.repo.resources.get(&original.id)?.body.clone())
        })?;

        Ok(Response::created(&self.uri(&memento.id())).header("memento-datetime", memento.datetime().to_string()))
    }

    pub(super) fn delete_timemap(&self, original: &Resource) -> Result<Response> {
        self.repo.mementos.delete_timemap(&original.id)?;
        Ok(Response::new(StatusCode::NO_CONTENT))
    }

    pub(super) fn get_memento(&self, req: &Request, original: &Resource, token: u64) -> Result<Response> {
        let memento = self.repo.mementos.get_memento(&original.id, token)?;

        let response = match memento.body() {
            Body::Binary { content, media_type } => {
                let response =
                    Response::new(StatusCode::OK).body(media_type, content.clone()).type_link(LDP_NON_RDF_SOURCE);
                self.with_digest(response, req, content)?
            }
            Body::Rdf(graph) => {
                let format = self.negotiate_rdf(req)?;
                Response::new(StatusCode::OK)
                    .body(format.media_type(), format.serialize(graph)?)
                    .type_link(LDP_RDF_SOURCE)
                    .header("vary", "Accept")
            }
        };

        let response = response
            .header("memento-datetime", memento.datetime().to_string())
            .type_link(MEMENTO_TYPE)
            .type_link(LDP_RESOURCE)
            .allow(MEMENTO_ALLOW);
        Ok(self.versioning_links(response, &original.id))
    }

    pub(super) fn delete_memento(&self, original: &Resource, token: u64) -> Result<Response> {
        self.repo.mementos.delete_memento(&original.id, token)?;
        Ok(Response::new(StatusCode::NO_CONTENT))
    }
}
