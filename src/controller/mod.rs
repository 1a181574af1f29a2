//! The versioning state machine.
//!
//! A request is reduced to `(persona, shape, verb)` and dispatched through one
//! flat table. Persona is Original, TimeMap or Memento; shape is what kind of
//! original backs it. Handlers live in [`original`] and [`versions`].

mod original;
pub mod response;
mod versions;

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error};
use warp::http::{HeaderMap, Method};

pub use response::Response;

use crate::config::ServerConfig;
use crate::datetime::MementoDatetime;
use crate::error::{Result, VersioningError};
use crate::headers::{digest_header, negotiate, want_digest, Prefer};
use crate::link::{parse_links, WebLink};
use crate::model::{description_of, timemap_id, uri, Persona, Resource, ResourceKind, Target};
use crate::rdf::serializer::media_type_essence;
use crate::rdf::{Graph, RdfError, RdfFormat};
use crate::Repository;

pub const MEMENTO_ALLOW: &str = "GET, HEAD, OPTIONS, DELETE";
pub const TIMEMAP_ALLOW: &str = "GET, HEAD, OPTIONS, POST, DELETE";
pub const CONTAINER_ALLOW: &str = "GET, HEAD, OPTIONS, POST, PUT, PATCH, DELETE";
pub const ROOT_ALLOW: &str = "GET, HEAD, OPTIONS, POST, PUT, PATCH";
pub const BINARY_ALLOW: &str = "GET, HEAD, OPTIONS, PUT, DELETE";
pub const DESCRIPTION_ALLOW: &str = "GET, HEAD, OPTIONS, PUT, PATCH";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Head,
    Options,
    Post,
    Put,
    Patch,
    Delete,
    Other,
}

impl Verb {
    pub fn from_method(method: &Method) -> Self {
        match *method {
            Method::GET => Verb::Get,
            Method::HEAD => Verb::Head,
            Method::OPTIONS => Verb::Options,
            Method::POST => Verb::Post,
            Method::PUT => Verb::Put,
            Method::PATCH => Verb::Patch,
            Method::DELETE => Verb::Delete,
            _ => Verb::Other,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Verb::Get => "GET",
            Verb::Head => "HEAD",
            Verb::Options => "OPTIONS",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
            Verb::Other => "OTHER",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct Request {
    pub verb: Verb,
    /// URL path, without query.
    pub path: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Request {
    pub fn new(verb: Verb, path: impl Into<String>, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self { verb, path: path.into(), headers, body }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
    }

    pub fn header_all(&self, name: &str) -> Vec<&str> {
        self.headers.get_all(name).iter().filter_map(|v| v.to_str().ok()).collect()
    }

    fn has_body(&self) -> bool {
        self.body.iter().any(|b| !b.is_ascii_whitespace())
    }
}

/// What kind of original backs a request; decides the verbs allowed on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Root,
    Container,
    Binary,
    Description,
}

impl Shape {
    fn of(resource: &Resource) -> Self {
        if resource.id.is_empty() {
            Shape::Root
        } else if resource.is_description() {
            Shape::Description
        } else if resource.kind() == ResourceKind::NonRdfSource {
            Shape::Binary
        } else {
            Shape::Container
        }
    }
}

fn allow(persona: Persona, shape: Shape) -> &'static str {
    match (persona, shape) {
        (Persona::Memento(_), _) => MEMENTO_ALLOW,
        (Persona::TimeMap, _) => TIMEMAP_ALLOW,
        (Persona::Original, Shape::Root) => ROOT_ALLOW,
        (Persona::Original, Shape::Container) => CONTAINER_ALLOW,
        (Persona::Original, Shape::Binary) => BINARY_ALLOW,
        (Persona::Original, Shape::Description) => DESCRIPTION_ALLOW,
    }
}

pub struct VersioningController {
    repo: Arc<Repository>,
    config: ServerConfig,
}

impl VersioningController {
    pub fn new(repo: Arc<Repository>, config: ServerConfig) -> Self {
        Self { repo, config }
    }

    pub fn repository(&self) -> &Arc<Repository> {
        &self.repo
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn handle(&self, request: Request) -> Response {
        let mut response = match self.dispatch(&request) {
            Ok(response) => response,
            Err(err) => {
                if err.status().is_server_error() {
                    error!("{} {} failed: {}", request.verb, request.path, err);
                } else {
                    debug!("{} {} rejected ({}): {}", request.verb, request.path, err.status(), err);
                }
                let request_uri = format!("{}{}", self.config.base_url, request.path);
                Response::from_error(&err, &request_uri, &self.config)
            }
        };
        if request.verb == Verb::Head {
            response.body.clear();
        }
        response
    }

    fn dispatch(&self, req: &Request) -> Result<Response> {
        let target = Target::parse(&req.path)?;

        let resource = match self.repo.resources.get(&target.id) {
            Ok(resource) => resource,
            Err(VersioningError::NotFound(_)) if target.persona == Persona::Original && req.verb == Verb::Put => {
                return self.store_original(req, &target.id, None);
            }
            Err(err) => return Err(err),
        };

        if target.persona != Persona::Original && !self.repo.is_versioned(&target.id)? {
            return Err(VersioningError::NotFound(req.path.clone()));
        }
        if let Persona::Memento(token) = target.persona {
            self.repo.mementos.get_memento(&target.id, token)?;
        }

        let shape = Shape::of(&resource);
        debug!("{} /{} as {:?} of {:?}", req.verb, target.id, target.persona, shape);

        match (target.persona, shape, req.verb) {
            (persona, shape, Verb::Options) => Ok(self.options(persona, shape, &target.id)),

            (Persona::Original, _, Verb::Get | Verb::Head) => self.get_original(req, &resource),
            (Persona::Original, _, Verb::Put) => self.store_original(req, &resource.id, Some(&resource)),
            (Persona::Original, Shape::Root | Shape::Container, Verb::Post) => self.post_original(req, &resource),
            (Persona::Original, Shape::Root | Shape::Container | Shape::Description, Verb::Patch) => {
                self.patch_original(req, &resource)
            }
            (Persona::Original, Shape::Container | Shape::Binary, Verb::Delete) => self.delete_original(&resource),

            (Persona::TimeMap, _, Verb::Get | Verb::Head) => self.get_timemap(req, &resource),
            (Persona::TimeMap, _, Verb::Post) => self.create_memento(req, &resource),
            (Persona::TimeMap, _, Verb::Delete) => self.delete_timemap(&resource),

            (Persona::Memento(token), _, Verb::Get | Verb::Head) => self.get_memento(req, &resource, token),
            (Persona::Memento(token), _, Verb::Delete) => self.delete_memento(&resource, token),

            (persona, shape, _) => Err(VersioningError::MethodNotAllowed { allow: allow(persona, shape) }),
        }
    }

    fn options(&self, persona: Persona, shape: Shape, id: &str) -> Response {
        let vary = if self.repo.is_versioned(id).unwrap_or(false) { "Accept-Datetime" } else { "Accept" };
        let response = Response::new(warp::http::StatusCode::OK).allow(allow(persona, shape)).header("vary", vary);
        match (persona, shape) {
            (Persona::TimeMap, _) | (Persona::Original, Shape::Root | Shape::Container) => {
                response.header("accept-post", rdf_media_types())
            }
            _ => response,
        }
    }

    // --- SHARED HELPERS ---

    fn uri(&self, id: &str) -> String {
        uri(&self.config.base_url, id)
    }

    /// URI that triples of `id` are about: a description talks about its binary.
    fn subject_uri(&self, id: &str) -> String {
        self.uri(description_of(id).unwrap_or(id))
    }

    fn negotiate_rdf(&self, req: &Request) -> Result<RdfFormat> {
        let offered: Vec<&'static str> = RdfFormat::media_types().collect();
        let accept = req.header("accept");
        negotiate(accept, &offered)
            .and_then(RdfFormat::from_media_type)
            .ok_or_else(|| VersioningError::NotAcceptable(accept.unwrap_or_default().to_string()))
    }

    /// Parses the request body as RDF. An empty body without a
    /// `Content-Type` is an empty graph.
    fn read_rdf(&self, req: &Request, base: &str) -> Result<Graph> {
        match req.header("content-type") {
            Some(content_type) => match RdfFormat::from_media_type(content_type) {
                Some(format) => Ok(format.parse(&req.body, base)?),
                None => Err(RdfError::UnsupportedMediaType(media_type_essence(content_type)).into()),
            },
            None if !req.has_body() => Ok(Graph::new()),
            None => Err(VersioningError::UnsupportedMediaType("missing Content-Type".to_string())),
        }
    }

    fn prefer(&self, req: &Request) -> Prefer {
        Prefer::parse(req.header_all("prefer"))
    }

    fn request_links(&self, req: &Request) -> Result<Vec<WebLink>> {
        let mut links = Vec::new();
        for value in req.header_all("link") {
            links.extend(parse_links(value).map_err(|e| VersioningError::BadRequest(e.to_string()))?);
        }
        Ok(links)
    }

    fn memento_datetime(&self, req: &Request) -> Result<Option<MementoDatetime>> {
        match req.header("memento-datetime") {
            Some(value) => Ok(Some(MementoDatetime::parse(value)?)),
            None => Ok(None),
        }
    }

    /// `original timegate` and `timemap` links of a versioned original.
    fn versioning_links(&self, response: Response, id: &str) -> Response {
        let original = self.uri(id);
        response
            .link(WebLink::new(original).rel("original timegate"))
            .link(WebLink::new(self.uri(&timemap_id(id))).rel("timemap"))
    }

    /// Answers `Want-Digest` for binary content.
    fn with_digest(&self, response: Response, req: &Request, content: &[u8]) -> Result<Response> {
        match req.header("want-digest") {
            Some(wanted) => {
                let algorithms = want_digest(wanted)?;
                Ok(response.header("digest", digest_header(&algorithms, content)))
            }
            None => Ok(response),
        }
    }
}

fn rdf_media_types() -> String {
    RdfFormat::media_types().collect::<Vec<_>>().join(", ")
}
