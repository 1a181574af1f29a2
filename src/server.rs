use std::convert::Infallible;
use std::error::Error;
use std::sync::Arc;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use futures::StreamExt;
use tracing::{error, info, warn};
use warp::http::{HeaderMap, Method, StatusCode};
use warp::path::FullPath;
use warp::{Filter, Rejection};

use crate::controller::response::TEXT_PLAIN;
use crate::controller::{Request, Response, Verb, VersioningController};
use crate::error::Constraint;

const TURTLE: &str = "text/turtle";

#[derive(Debug)]
struct PayloadTooLarge {
    limit: u64,
}

impl warp::reject::Reject for PayloadTooLarge {}

#[derive(Debug)]
struct UnreadableBody;

impl warp::reject::Reject for UnreadableBody {}

pub struct LdpServer {
    controller: Arc<VersioningController>,
}

impl LdpServer {
    pub fn new(controller: Arc<VersioningController>) -> Self {
        Self { controller }
    }

    /// Serves until ctrl-c.
    pub async fn run(&self, addr: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        let socket = tokio::net::lookup_host(addr)
            .await?
            .next()
            .ok_or_else(|| format!("{} did not resolve to an address", addr))?;

        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Could not listen for shutdown signal: {}", e);
            }
        };
        let (bound, server) =
            warp::serve(routes(self.controller.clone())).try_bind_with_graceful_shutdown(socket, shutdown)?;

        info!("Listening on {} (base {})", bound, self.controller.config().base_url);
        server.await;
        info!("Shutting down");
        Ok(())
    }
}

/// Every route the server answers. Anything outside the constraint
/// documents goes to the controller.
pub fn routes(
    controller: Arc<VersioningController>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Infallible> + Clone {
    let limit = controller.config().max_body_bytes;

    // 1. GET /static/constraints/{document}
    let constraints = warp::get()
        .and(warp::path!("static" / "constraints" / String))
        .map(|document: String| constraint_document(&document).into_http());

    // 2. Everything else
    let ldp = warp::method()
        .and(warp::path::full())
        .and(warp::header::headers_cloned())
        .and(bounded_body(limit))
        .and(with_controller(controller))
        .and_then(handle);

    constraints.or(ldp).recover(recover)
}

fn with_controller(
    controller: Arc<VersioningController>,
) -> impl Filter<Extract = (Arc<VersioningController>,), Error = Infallible> + Clone {
    warp::any().map(move || controller.clone())
}

/// Reads the request body, refusing it once it passes `limit` bytes. A
/// declared `Content-Length` is checked up front; chunked bodies are cut off
/// while streaming.
fn bounded_body(limit: u64) -> impl Filter<Extract = (Bytes,), Error = Rejection> + Clone {
    warp::header::optional::<u64>("content-length").and(warp::body::stream()).and_then(
        move |length: Option<u64>, chunks| read_bounded(length, chunks, limit),
    )
}

async fn read_bounded<S, B>(length: Option<u64>, chunks: S, limit: u64) -> Result<Bytes, Rejection>
where
    S: futures::Stream<Item = Result<B, warp::Error>>,
    B: Buf,
{
    if length.map_or(false, |length| length > limit) {
        return Err(warp::reject::custom(PayloadTooLarge { limit }));
    }

    futures::pin_mut!(chunks);
    let mut body = BytesMut::new();
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.map_err(|e| {
            warn!("Failed reading request body: {}", e);
            warp::reject::custom(UnreadableBody)
        })?;
        if (body.len() + chunk.remaining()) as u64 > limit {
            return Err(warp::reject::custom(PayloadTooLarge { limit }));
        }
        body.put(chunk);
    }
    Ok(body.freeze())
}

async fn handle(
    method: Method,
    path: FullPath,
    headers: HeaderMap,
    body: Bytes,
    controller: Arc<VersioningController>,
) -> Result<warp::http::Response<Vec<u8>>, Infallible> {
    let request = Request::new(Verb::from_method(&method), path.as_str(), headers, body.to_vec());
    let response = match tokio::task::spawn_blocking(move || controller.handle(request)).await {
        Ok(response) => response,
        Err(e) => {
            error!("Request task failed: {}", e);
            Response::new(StatusCode::INTERNAL_SERVER_ERROR).body(TEXT_PLAIN, "Internal server error")
        }
    };
    Ok(response.into_http())
}

fn constraint_document(name: &str) -> Response {
    match Constraint::from_document(name) {
        Some(constraint) => {
            let body = format!(
                "@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .\n\n<> rdfs:comment \"{}\" .\n",
                constraint.description()
            );
            Response::new(StatusCode::OK).body(TURTLE, body)
        }
        None => Response::new(StatusCode::NOT_FOUND).body(TEXT_PLAIN, format!("No constraint document {}", name)),
    }
}

fn too_large(limit: u64) -> Response {
    Response::new(StatusCode::PAYLOAD_TOO_LARGE).body(TEXT_PLAIN, format!("Request body exceeds {} bytes", limit))
}

async fn recover(rejection: Rejection) -> Result<warp::http::Response<Vec<u8>>, Infallible> {
    let response = if let Some(too_large_body) = rejection.find::<PayloadTooLarge>() {
        too_large(too_large_body.limit)
    } else if rejection.is_not_found() {
        Response::new(StatusCode::NOT_FOUND).body(TEXT_PLAIN, "Not found")
    } else {
        Response::new(StatusCode::BAD_REQUEST).body(TEXT_PLAIN, format!("Malformed request: {:?}", rejection))
    };
    Ok(response.into_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::Repository;

    fn controller(max_body_bytes: u64) -> Arc<VersioningController> {
        let mut config = ServerConfig::new("localhost:8080", Some("http://localhost:8080"));
        config.max_body_bytes = max_body_bytes;
        Arc::new(VersioningController::new(Arc::new(Repository::in_memory()), config))
    }

    #[tokio::test]
    async fn serves_constraint_documents() {
        let api = routes(controller(1024));
        let res = warp::test::request()
            .method("GET")
            .path("/static/constraints/MementoBodyRequiredException.rttl")
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["content-type"], TURTLE);
        assert!(String::from_utf8_lossy(res.body()).contains("rdfs:comment"));

        let res = warp::test::request().method("GET").path("/static/constraints/Nope.rttl").reply(&api).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn oversized_bodies_are_refused() {
        let api = routes(controller(8));
        let res = warp::test::request()
            .method("PUT")
            .path("/big")
            .header("content-type", "text/turtle")
            .body("<> <http://example.org/p> \"far too long\" .")
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn chunked_bodies_are_cut_off_at_the_limit() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let (addr, server) = warp::serve(routes(controller(16))).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let chunk = format!("{:x}\r\n{}\r\n", 12, "x".repeat(12));
        let request = format!(
            "PUT /big HTTP/1.1\r\nHost: localhost\r\nContent-Type: text/turtle\r\n\
             Transfer-Encoding: chunked\r\nConnection: close\r\n\r\n{}{}0\r\n\r\n",
            chunk, chunk
        );
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut reply = Vec::new();
        tokio::time::timeout(std::time::Duration::from_secs(5), stream.read_to_end(&mut reply))
            .await
            .unwrap()
            .unwrap();
        let reply = String::from_utf8_lossy(&reply);
        assert!(reply.starts_with("HTTP/1.1 413"), "{}", reply);
    }

    #[tokio::test]
    async fn other_paths_reach_the_controller() {
        let api = routes(controller(1024));
        let res = warp::test::request().method("GET").path("/").reply(&api).await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = warp::test::request().method("GET").path("/missing").reply(&api).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
