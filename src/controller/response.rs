use warp::http::header::{HeaderValue, IntoHeaderName, ALLOW, CONTENT_TYPE, LINK, LOCATION};
use warp::http::{HeaderMap, StatusCode};

use crate::config::ServerConfig;
use crate::error::VersioningError;
use crate::link::WebLink;
use crate::rdf::vocab::LDP_CONSTRAINED_BY;

pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// A finished answer, independent of the HTTP server that sends it.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self { status, headers: HeaderMap::new(), body: Vec::new() }
    }

    /// Appends a header. Values that are not valid header text are dropped.
    pub fn header<K: IntoHeaderName>(mut self, name: K, value: impl AsRef<str>) -> Self {
        if let Ok(value) = HeaderValue::from_str(value.as_ref()) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn link(self, link: WebLink) -> Self {
        self.header(LINK, link.to_string())
    }

    pub fn type_link(self, type_iri: &str) -> Self {
        self.link(WebLink::new(type_iri).rel("type"))
    }

    pub fn allow(self, allow: &str) -> Self {
        self.header(ALLOW, allow)
    }

    pub fn location(self, uri: &str) -> Self {
        self.header(LOCATION, uri)
    }

    pub fn body(mut self, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self.header(CONTENT_TYPE, content_type)
    }

    /// 201 with `Location` and the new URI as a plain-text body.
    pub fn created(uri: &str) -> Self {
        Response::new(StatusCode::CREATED).location(uri).body(TEXT_PLAIN, uri.as_bytes().to_vec())
    }

    /// Renders `err` as `text/plain`. Constraint violations advertise their
    /// document with `anchor` set to the request URI.
    pub fn from_error(err: &VersioningError, request_uri: &str, config: &ServerConfig) -> Self {
        let mut response = Response::new(err.status()).body(TEXT_PLAIN, err.to_string());
        if let Some(constraint) = err.constraint() {
            let document = config.constraint_uri(constraint);
            response = response.link(WebLink::new(document).rel(LDP_CONSTRAINED_BY).param("anchor", request_uri));
        }
        if let VersioningError::MethodNotAllowed { allow } = err {
            response = response.allow(allow);
        }
        response
    }

    /// All values of `name`, in order.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers.get_all(name).iter().filter_map(|v| v.to_str().ok()).collect()
    }

    pub fn into_http(self) -> warp::http::Response<Vec<u8>> {
        let mut response = warp::http::Response::new(self.body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Constraint;

    #[test]
    fn constrained_errors_carry_link() {
        let err = VersioningError::ConstrainedBy {
            constraint: Constraint::ServerManagedTriples,
            message: "no".into(),
        };
        let config = ServerConfig::new("localhost:80", Some("http://localhost"));
        let response = Response::from_error(&err, "http://localhost/c/fcr:versions", &config);
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        let links = response.header_values("link");
        assert_eq!(links.len(), 1);
        assert!(links[0].starts_with("<http://localhost/static/constraints/ServerManagedPropertyException.rttl>"));
        assert!(links[0].contains("rel=\"http://www.w3.org/ns/ldp#constrainedBy\""));
        assert!(links[0].contains("anchor=\"http://localhost/c/fcr:versions\""));
        assert_eq!(response.header_values("content-type"), vec![TEXT_PLAIN]);
    }

    #[test]
    fn method_not_allowed_lists_methods() {
        let err = VersioningError::MethodNotAllowed { allow: "GET, HEAD" };
        let response = Response::from_error(&err, "http://localhost/", &ServerConfig::default());
        assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.header_values("allow"), vec!["GET, HEAD"]);
    }
}
