//! Serves a small route table over HTTP/1.1.
//!
//! ```text
//! cargo run --example server
//! curl -v http://127.0.0.1:8080/product/135
//! ```
//!
//! The listen address can be changed through `MICRO_ROUTER_ADDR`.

use http::{HeaderName, HeaderValue, Request};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use micro_router::middleware::{SetHeader, Trace};
use micro_router::{Router, RouterError, route_fn};
use std::error::Error;
use std::fmt::Write;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

const DEFAULT_ADDR: &str = "127.0.0.1:8080";

fn router() -> Result<Router, RouterError> {
    let mut router = Router::builder()
        .route("^/help$", route_fn(|resp, _req, _params| resp.body_mut().push_str("Gotcha! You are in the help page =)")))
        .route(
            "^/product/(?P<pid>[0-9]+)$",
            route_fn(|resp, _req, params| {
                let _ = write!(resp.body_mut(), "Product ID is {}", params.get("pid").unwrap_or_default());
            }),
        )
        .route(
            "^/category/(?P<cid>[0-9]+)$",
            route_fn(|resp, _req, params| {
                let _ = write!(resp.body_mut(), "Category ID is {}", params.get("cid").unwrap_or_default());
            }),
        )
        .build()?;

    router.add_middleware(Trace);
    router.add_middleware(SetHeader::new(HeaderName::from_static("server"), HeaderValue::from_static("micro-router")));

    Ok(router)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let router = Arc::new(router()?);

    let address = std::env::var("MICRO_ROUTER_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let tcp_listener = TcpListener::bind(&address).await?;
    info!("start listening at {}", address);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        let (tcp_stream, _remote_addr) = tokio::select! {
            _ = &mut shutdown => {
                info!("received ctrl-c, shutting down");
                return Ok(());
            }
            accepted = tcp_listener.accept() => match accepted {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            },
        };

        let router = Arc::clone(&router);

        tokio::spawn(async move {
            let service = service_fn(move |req: Request<Incoming>| {
                let router = Arc::clone(&router);
                async move {
                    let (parts, body) = req.into_parts();
                    let body = body.collect().await?.to_bytes();
                    let req = Request::from_parts(parts, body);
                    Ok::<_, hyper::Error>(router.handle(&req).await)
                }
            });

            if let Err(e) = http1::Builder::new().serve_connection(TokioIo::new(tcp_stream), service).await {
                error!("service has error, cause {}, connection shutdown", e);
            }
        });
    }
}
